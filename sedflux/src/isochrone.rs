//! Evolutionary model isochrones
//!
//! An isochrone grid tabulates, per age, how luminosity maps to mass,
//! radius, surface gravity, and effective temperature for a family of
//! evolutionary models. The pipeline inverts it: given a bolometric
//! luminosity with uncertainty and an age range, bracket the age with
//! tabulated curves, scan the luminosity window, and report the midpoint
//! and half-range of the parameter envelope.
//!
//! Grid files are one ASCII table per model with comma-separated columns
//! `age[Gyr], mass[Msun], teff[K], lbol[log L/Lsun], logg, radius[Rsun]`.
//! Masses and radii are exposed in Jovian units, the convention of the
//! downstream parameter table.

use std::path::Path;

use log::warn;
use thiserror::Error;

use crate::constants::CGS;
use crate::interp::{interp_many, linspace};

/// Errors that can occur loading or querying isochrone grids
#[derive(Debug, Error)]
pub enum IsochroneError {
    #[error("Cannot parse line {line} of isochrone table: {text:?}")]
    Parse { line: usize, text: String },

    #[error("Isochrone table {0:?} contains no rows")]
    EmptyGrid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The parameters an isochrone grid can be inverted for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsoParam {
    /// Radius in Jupiter radii
    Radius,
    /// Mass in Jupiter masses
    Mass,
    /// log10 surface gravity (cgs)
    Logg,
    /// Effective temperature in Kelvin
    Teff,
}

/// One age slice of the grid, sorted by luminosity
#[derive(Debug, Clone)]
struct AgeCurve {
    age_gyr: f64,
    lbol: Vec<f64>,
    mass: Vec<f64>,
    teff: Vec<f64>,
    logg: Vec<f64>,
    radius: Vec<f64>,
}

impl AgeCurve {
    fn column(&self, param: IsoParam) -> &[f64] {
        match param {
            IsoParam::Radius => &self.radius,
            IsoParam::Mass => &self.mass,
            IsoParam::Logg => &self.logg,
            IsoParam::Teff => &self.teff,
        }
    }
}

/// An immutable isochrone grid for one named evolutionary model
#[derive(Debug, Clone)]
pub struct Isochrone {
    name: String,
    curves: Vec<AgeCurve>,
}

impl Isochrone {
    /// Build a grid from raw rows of
    /// `(age[Gyr], mass[Msun], teff[K], lbol[log L/Lsun], logg, radius[Rsun])`.
    ///
    /// Rows are grouped by age and each group sorted by luminosity; masses
    /// and radii are converted to Jovian units.
    pub fn from_rows(name: &str, rows: &[[f64; 6]]) -> Result<Self, IsochroneError> {
        if rows.is_empty() {
            return Err(IsochroneError::EmptyGrid(name.to_string()));
        }

        let mut sorted: Vec<[f64; 6]> = rows.to_vec();
        sorted.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap());

        let mut curves: Vec<AgeCurve> = Vec::new();
        for row in sorted {
            let [age, mass, teff, lbol, logg, radius] = row;
            let mass_mjup = mass * CGS::MSUN_IN_MJUP;
            let radius_rjup = radius * CGS::RSUN_IN_RJUP;

            match curves.last_mut() {
                Some(curve) if curve.age_gyr == age => {
                    curve.lbol.push(lbol);
                    curve.mass.push(mass_mjup);
                    curve.teff.push(teff);
                    curve.logg.push(logg);
                    curve.radius.push(radius_rjup);
                }
                _ => curves.push(AgeCurve {
                    age_gyr: age,
                    lbol: vec![lbol],
                    mass: vec![mass_mjup],
                    teff: vec![teff],
                    logg: vec![logg],
                    radius: vec![radius_rjup],
                }),
            }
        }

        // Each age slice must be traversable by luminosity
        for curve in &mut curves {
            let mut order: Vec<usize> = (0..curve.lbol.len()).collect();
            order.sort_by(|&i, &j| curve.lbol[i].partial_cmp(&curve.lbol[j]).unwrap());
            let reorder = |v: &[f64]| -> Vec<f64> { order.iter().map(|&i| v[i]).collect() };
            curve.mass = reorder(&curve.mass);
            curve.teff = reorder(&curve.teff);
            curve.logg = reorder(&curve.logg);
            curve.radius = reorder(&curve.radius);
            curve.lbol = reorder(&curve.lbol);
        }

        Ok(Self {
            name: name.to_string(),
            curves,
        })
    }

    /// Load a grid from its ASCII table.
    ///
    /// `#` starts a comment; a non-numeric first row is treated as a
    /// header and skipped.
    pub fn from_file(name: &str, path: &Path) -> Result<Self, IsochroneError> {
        let content = std::fs::read_to_string(path)?;

        let mut rows: Vec<[f64; 6]> = Vec::new();
        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .collect();

            let parsed: Result<Vec<f64>, _> = fields.iter().map(|s| s.parse::<f64>()).collect();
            match parsed {
                Ok(values) if values.len() >= 6 => {
                    rows.push([
                        values[0], values[1], values[2], values[3], values[4], values[5],
                    ]);
                }
                Ok(_) => {
                    return Err(IsochroneError::Parse {
                        line: lineno + 1,
                        text: raw.to_string(),
                    })
                }
                Err(_) if rows.is_empty() => {
                    // Header row
                    continue;
                }
                Err(_) => {
                    return Err(IsochroneError::Parse {
                        line: lineno + 1,
                        text: raw.to_string(),
                    })
                }
            }
        }

        Self::from_rows(name, &rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tabulated ages in Gyr, ascending
    pub fn ages(&self) -> Vec<f64> {
        self.curves.iter().map(|c| c.age_gyr).collect()
    }

    /// Index pair of the tabulated curves bracketing `age`, clamped (with
    /// a warning) outside the tabulated range
    fn bracket(&self, age_gyr: f64) -> (usize, usize) {
        let n = self.curves.len();
        let first = self.curves[0].age_gyr;
        let last = self.curves[n - 1].age_gyr;

        if age_gyr < first {
            warn!(
                "Age {:.4} Gyr is younger than the youngest {} isochrone ({:.4} Gyr), clamping",
                age_gyr, self.name, first
            );
            return (0, 0);
        }
        if age_gyr > last {
            warn!(
                "Age {:.4} Gyr is older than the oldest {} isochrone ({:.4} Gyr), clamping",
                age_gyr, self.name, last
            );
            return (n - 1, n - 1);
        }

        let upper = self
            .curves
            .iter()
            .position(|c| c.age_gyr >= age_gyr)
            .unwrap_or(n - 1);
        let lower = if self.curves[upper].age_gyr == age_gyr {
            upper
        } else {
            upper - 1
        };
        (lower, upper)
    }

    /// Parameter values along the luminosity window, vertically
    /// interpolated to `age_gyr` between its bracketing curves
    fn values_at_age(&self, age_gyr: f64, x_grid: &[f64], param: IsoParam) -> Vec<f64> {
        let (lo, hi) = self.bracket(age_gyr);
        let lo_curve = &self.curves[lo];
        let hi_curve = &self.curves[hi];

        let y_lo = interp_many(x_grid, &lo_curve.lbol, lo_curve.column(param));
        if lo == hi {
            return y_lo;
        }
        let y_hi = interp_many(x_grid, &hi_curve.lbol, hi_curve.column(param));

        let t = (age_gyr - lo_curve.age_gyr) / (hi_curve.age_gyr - lo_curve.age_gyr);
        y_lo.iter()
            .zip(y_hi.iter())
            .map(|(&a, &b)| a * (1.0 - t) + b * t)
            .collect()
    }

    /// Invert the grid at a luminosity and age range.
    ///
    /// A fine luminosity grid spans `lbol ± lbol_unc`; the parameter is
    /// evaluated along it at both ends of the age range, and the midpoint
    /// and half-range of the resulting envelope are returned as
    /// (value, uncertainty). Luminosities outside the tabulated range are
    /// clamped with a warning.
    pub fn evaluate(
        &self,
        lbol: (f64, f64),
        age_range_gyr: (f64, f64),
        param: IsoParam,
    ) -> (f64, f64) {
        let (z, z_unc) = lbol;
        let (age_min, age_max) = age_range_gyr;

        let grid_min = self
            .curves
            .iter()
            .flat_map(|c| c.lbol.first().copied())
            .fold(f64::INFINITY, f64::min);
        let grid_max = self
            .curves
            .iter()
            .flat_map(|c| c.lbol.last().copied())
            .fold(f64::NEG_INFINITY, f64::max);
        if z - z_unc < grid_min || z + z_unc > grid_max {
            warn!(
                "Lbol window [{:.3}, {:.3}] reaches outside the {} grid [{:.3}, {:.3}], clamping",
                z - z_unc,
                z + z_unc,
                self.name,
                grid_min,
                grid_max
            );
        }

        let x_grid = linspace(z - z_unc, z + z_unc, 20);

        let mut values = self.values_at_age(age_min, &x_grid, param);
        values.extend(self.values_at_age(age_max, &x_grid, param));

        let y_min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let y_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        ((y_min + y_max) / 2.0, (y_max - y_min) / 2.0)
    }
}

/// Evaluate several model families and combine them into the widest
/// envelope.
///
/// Each model contributes its own (value, uncertainty) interval; the
/// combination is the midpoint and half-range of the union interval.
/// Returns None with no models.
pub fn evaluate_models(
    models: &[Isochrone],
    lbol: (f64, f64),
    age_range_gyr: (f64, f64),
    param: IsoParam,
) -> Option<(f64, f64)> {
    if models.is_empty() {
        return None;
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for model in models {
        let (value, unc) = model.evaluate(lbol, age_range_gyr, param);
        lo = lo.min(value - unc);
        hi = hi.max(value + unc);
    }

    Some(((hi + lo) / 2.0, (hi - lo) / 2.0))
}
