//! Bandpasses and the per-band photometry table
//!
//! A `Bandpass` is the read-only description of a photometric filter: its
//! response curve, effective wavelength, magnitude zero point, and
//! extinction coefficient. Bandpasses reach the pipeline through an
//! explicitly passed `BandpassRegistry` so tests can substitute synthetic
//! filters; a built-in registry covers the common survey bands.
//!
//! The `PhotometryTable` keys measurements by band name, derives flux
//! columns from magnitudes, and recomputes the absolute-frame columns from
//! scratch whenever the distance changes.

use std::collections::HashMap;
use std::path::Path;

use log::warn;
use ndarray::Array1;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::interp::linspace;
use crate::spectrum::Spectrum;
use crate::units::Unit;

/// Errors that can occur with bandpass and photometry operations
#[derive(Debug, Error)]
pub enum PhotometryError {
    #[error("Wavelength and throughput vectors must have the same length")]
    LengthMismatch,

    #[error("Bandpass wavelengths must be in ascending order")]
    NotAscending,

    #[error("Throughput values must be non-negative")]
    NegativeThroughput,

    #[error("Unknown bandpass: {0}")]
    UnknownBand(String),

    #[error("Photometry file must contain the columns 'band', 'magnitude', 'uncertainty'")]
    MissingColumns,

    #[error("Cannot parse line {line}: {text:?}")]
    Parse { line: usize, text: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A photometric filter: response curve plus calibration metadata
#[derive(Debug, Clone)]
pub struct Bandpass {
    name: String,
    /// Wavelength grid in microns, ascending
    wave: Array1<f64>,
    /// Relative throughput per grid point
    throughput: Array1<f64>,
    /// Throughput-weighted effective wavelength in microns
    eff_wave: f64,
    /// Flux density of a zero-magnitude source, erg s⁻¹ cm⁻² Å⁻¹
    zero_point: f64,
    /// Band extinction per unit V-band extinction (A_band / A_V)
    ext_coeff: f64,
}

impl Bandpass {
    /// Create a bandpass from a tabulated response curve.
    ///
    /// # Arguments
    ///
    /// * `name` - The band name used as the photometry table key
    /// * `wave` - Wavelength grid in microns, ascending
    /// * `throughput` - Relative response at each grid point
    /// * `zero_point` - Flux density of a zero-magnitude source (erg/s/cm²/Å)
    /// * `ext_coeff` - A_band / A_V extinction coefficient
    pub fn from_table(
        name: &str,
        wave: Vec<f64>,
        throughput: Vec<f64>,
        zero_point: f64,
        ext_coeff: f64,
    ) -> Result<Self, PhotometryError> {
        if wave.len() != throughput.len() || wave.len() < 2 {
            return Err(PhotometryError::LengthMismatch);
        }
        for i in 1..wave.len() {
            if wave[i] <= wave[i - 1] {
                return Err(PhotometryError::NotAscending);
            }
        }
        if throughput.iter().any(|&t| t < 0.0) {
            return Err(PhotometryError::NegativeThroughput);
        }

        // Throughput-weighted mean wavelength via the trapezoid rule
        let mut weighted = 0.0;
        let mut total = 0.0;
        for i in 0..wave.len() - 1 {
            let dw = wave[i + 1] - wave[i];
            weighted += dw * (wave[i] * throughput[i] + wave[i + 1] * throughput[i + 1]) / 2.0;
            total += dw * (throughput[i] + throughput[i + 1]) / 2.0;
        }
        if total <= 0.0 {
            return Err(PhotometryError::NegativeThroughput);
        }

        Ok(Self {
            name: name.to_string(),
            eff_wave: weighted / total,
            wave: Array1::from_vec(wave),
            throughput: Array1::from_vec(throughput),
            zero_point,
            ext_coeff,
        })
    }

    /// Create a flat-topped bandpass spanning `lo..hi` microns.
    ///
    /// The top is sampled on a regular grid with zero-response guard points
    /// just outside the edges, the same construction the synthetic filters
    /// in the tests use.
    pub fn tophat(
        name: &str,
        lo: f64,
        hi: f64,
        zero_point: f64,
        ext_coeff: f64,
    ) -> Result<Self, PhotometryError> {
        let smol = 1e-6;
        let mut wave = vec![lo - smol];
        let mut resp = vec![0.0];
        for w in linspace(lo, hi, 21) {
            wave.push(w);
            resp.push(1.0);
        }
        wave.push(hi + smol);
        resp.push(0.0);
        Self::from_table(name, wave, resp, zero_point, ext_coeff)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wavelength grid in microns
    pub fn wave(&self) -> &Array1<f64> {
        &self.wave
    }

    /// Relative throughput per grid point
    pub fn throughput(&self) -> &Array1<f64> {
        &self.throughput
    }

    /// Throughput-weighted effective wavelength in microns
    pub fn eff_wave(&self) -> f64 {
        self.eff_wave
    }

    /// Full wavelength span of the response curve in microns
    pub fn width(&self) -> f64 {
        self.wave[self.wave.len() - 1] - self.wave[0]
    }

    pub fn ext_coeff(&self) -> f64 {
        self.ext_coeff
    }

    pub fn zero_point(&self) -> f64 {
        self.zero_point
    }

    /// Convert an apparent magnitude in this band to a flux density.
    ///
    /// F = zp·10^(−0.4 m); the uncertainty is F·(ln10/2.5)·σ_m, NaN when
    /// the magnitude uncertainty is unknown.
    pub fn mag_to_flux(&self, mag: f64, mag_unc: f64) -> (f64, f64) {
        let flux = self.zero_point * 10f64.powf(-0.4 * mag);
        let unc = flux * (10f64.ln() / 2.5) * mag_unc;
        (flux, unc)
    }
}

/// Shift an apparent magnitude to the absolute frame at the given distance.
///
/// M = m − 5·log10(d/10pc); the distance uncertainty enters as
/// (5/ln10)·(σ_d/d) in quadrature. NaN magnitude uncertainty stays NaN.
pub fn mag_to_absolute(mag: f64, mag_unc: f64, distance_pc: (f64, f64)) -> (f64, f64) {
    let (d, d_unc) = distance_pc;
    let abs_mag = mag - 5.0 * (d / 10.0).log10();
    let dist_term = (5.0 / 10f64.ln()) * (d_unc / d);
    let abs_unc = (mag_unc * mag_unc + dist_term * dist_term).sqrt();
    (abs_mag, abs_unc)
}

/// A read-only, dependency-injected bandpass lookup
#[derive(Debug, Clone, Default)]
pub struct BandpassRegistry {
    bands: HashMap<String, Bandpass>,
}

impl BandpassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a bandpass
    pub fn insert(&mut self, bandpass: Bandpass) {
        self.bands.insert(bandpass.name().to_string(), bandpass);
    }

    /// Look up a bandpass by name
    pub fn get(&self, name: &str) -> Option<&Bandpass> {
        self.bands.get(name)
    }

    /// All registered bandpasses, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Bandpass> {
        self.bands.values()
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// The built-in registry with the common survey bands
    pub fn builtin() -> &'static BandpassRegistry {
        static BUILTIN: Lazy<BandpassRegistry> = Lazy::new(|| {
            // (name, lower um, upper um, zero point erg/s/cm²/Å, A_band/A_V)
            let bands = [
                ("Johnson.B", 0.38, 0.49, 6.32e-9, 1.32),
                ("Johnson.V", 0.50, 0.59, 3.63e-9, 1.00),
                ("Cousins.R", 0.55, 0.80, 2.18e-9, 0.82),
                ("Cousins.I", 0.70, 0.92, 1.13e-9, 0.60),
                ("SDSS.g", 0.40, 0.55, 5.45e-9, 1.19),
                ("SDSS.r", 0.55, 0.69, 2.50e-9, 0.83),
                ("SDSS.i", 0.69, 0.82, 1.39e-9, 0.61),
                ("SDSS.z", 0.82, 0.92, 8.39e-10, 0.45),
                ("2MASS.J", 1.08, 1.40, 3.13e-10, 0.29),
                ("2MASS.H", 1.48, 1.82, 1.13e-10, 0.18),
                ("2MASS.Ks", 1.95, 2.36, 4.28e-11, 0.12),
                ("WISE.W1", 2.75, 3.87, 8.18e-12, 0.07),
                ("WISE.W2", 4.00, 5.30, 2.42e-12, 0.05),
                ("WISE.W3", 7.50, 16.50, 6.52e-14, 0.09),
                ("WISE.W4", 19.80, 25.50, 5.09e-15, 0.06),
            ];

            let mut registry = BandpassRegistry::new();
            for (name, lo, hi, zp, ext) in bands {
                registry.insert(
                    Bandpass::tophat(name, lo, hi, zp, ext)
                        .expect("built-in bandpass definitions are valid"),
                );
            }
            registry
        });
        &BUILTIN
    }
}

/// Which flux frame to read from the photometry table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotFrame {
    Apparent,
    Absolute,
}

/// One photometric measurement and its derived columns
#[derive(Debug, Clone)]
pub struct PhotometryEntry {
    pub band: String,
    /// Effective wavelength in microns
    pub eff_wave: f64,
    /// Magnitude as observed, before dereddening
    pub observed_mag: f64,
    /// Dereddened apparent magnitude
    pub app_mag: f64,
    /// Magnitude uncertainty, NaN when unknown
    pub app_mag_unc: f64,
    /// Apparent flux density, erg s⁻¹ cm⁻² Å⁻¹
    pub app_flux: f64,
    pub app_flux_unc: f64,
    /// Absolute magnitude, NaN until a distance is set
    pub abs_mag: f64,
    pub abs_mag_unc: f64,
    pub abs_flux: f64,
    pub abs_flux_unc: f64,
    /// A_band / A_V
    pub ext_coeff: f64,
    bandpass: Bandpass,
}

impl PhotometryEntry {
    pub fn bandpass(&self) -> &Bandpass {
        &self.bandpass
    }
}

/// The keyed collection of photometric measurements, ordered by effective
/// wavelength
#[derive(Debug, Clone, Default)]
pub struct PhotometryTable {
    entries: Vec<PhotometryEntry>,
}

impl PhotometryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a measurement, replacing any existing entry for the same band.
    ///
    /// The magnitude is dereddened by `ext_coeff × a_v` before the flux
    /// columns are derived. A zero or absent magnitude uncertainty is
    /// stored as NaN (unknown).
    pub fn add(&mut self, bandpass: &Bandpass, mag: f64, mag_unc: Option<f64>, a_v: f64) {
        let mag_unc = match mag_unc {
            Some(u) if u > 0.0 => u,
            _ => f64::NAN,
        };

        let dereddened = mag - bandpass.ext_coeff() * a_v;
        let (app_flux, app_flux_unc) = bandpass.mag_to_flux(dereddened, mag_unc);

        // Replace-on-duplicate: at most one entry per band
        self.entries.retain(|e| e.band != bandpass.name());

        self.entries.push(PhotometryEntry {
            band: bandpass.name().to_string(),
            eff_wave: bandpass.eff_wave(),
            observed_mag: mag,
            app_mag: dereddened,
            app_mag_unc: mag_unc,
            app_flux,
            app_flux_unc,
            abs_mag: f64::NAN,
            abs_mag_unc: f64::NAN,
            abs_flux: f64::NAN,
            abs_flux_unc: f64::NAN,
            ext_coeff: bandpass.ext_coeff(),
            bandpass: bandpass.clone(),
        });

        self.entries
            .sort_by(|a, b| a.eff_wave.partial_cmp(&b.eff_wave).unwrap());
    }

    /// Add a measurement by band name through a registry
    pub fn add_band(
        &mut self,
        registry: &BandpassRegistry,
        band: &str,
        mag: f64,
        mag_unc: Option<f64>,
        a_v: f64,
    ) -> Result<(), PhotometryError> {
        let bandpass = registry
            .get(band)
            .ok_or_else(|| PhotometryError::UnknownBand(band.to_string()))?;
        self.add(bandpass, mag, mag_unc, a_v);
        Ok(())
    }

    /// Load measurements from an ASCII table with the columns
    /// `band magnitude uncertainty` (whitespace or comma separated,
    /// `#` starts a comment). Unknown bands are skipped with a warning.
    pub fn add_file(
        &mut self,
        path: &Path,
        registry: &BandpassRegistry,
        a_v: f64,
    ) -> Result<usize, PhotometryError> {
        let content = std::fs::read_to_string(path)?;

        let mut added = 0;
        let mut header_seen = false;
        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .collect();

            if !header_seen {
                header_seen = true;
                if fields.len() < 3
                    || fields[0] != "band"
                    || fields[1] != "magnitude"
                    || fields[2] != "uncertainty"
                {
                    return Err(PhotometryError::MissingColumns);
                }
                continue;
            }

            if fields.len() < 2 {
                return Err(PhotometryError::Parse {
                    line: lineno + 1,
                    text: raw.to_string(),
                });
            }

            let mag: f64 = fields[1].parse().map_err(|_| PhotometryError::Parse {
                line: lineno + 1,
                text: raw.to_string(),
            })?;
            let unc = fields
                .get(2)
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|u| u.is_finite());

            match self.add_band(registry, fields[0], mag, unc, a_v) {
                Ok(()) => added += 1,
                Err(PhotometryError::UnknownBand(name)) => {
                    warn!("Skipping unknown bandpass {:?} in {}", name, path.display());
                }
                Err(err) => return Err(err),
            }
        }

        Ok(added)
    }

    /// Remove a band; returns true if it was present
    pub fn drop_band(&mut self, band: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.band != band);
        self.entries.len() != before
    }

    pub fn get(&self, band: &str) -> Option<&PhotometryEntry> {
        self.entries.iter().find(|e| e.band == band)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in effective-wavelength order
    pub fn iter(&self) -> impl Iterator<Item = &PhotometryEntry> {
        self.entries.iter()
    }

    /// Shortest effective wavelength in the table, microns
    pub fn min_eff_wave(&self) -> Option<f64> {
        self.entries.first().map(|e| e.eff_wave)
    }

    /// Longest effective wavelength in the table, microns
    pub fn max_eff_wave(&self) -> Option<f64> {
        self.entries.last().map(|e| e.eff_wave)
    }

    /// Recompute the derived columns for the given distance and reddening.
    ///
    /// Apparent columns are rebuilt from the observed magnitudes (so a
    /// changed A_V takes effect) and absolute columns from the apparent
    /// ones; with no distance the absolute columns are reset to NaN.
    pub fn calibrate(&mut self, distance_pc: Option<(f64, f64)>, a_v: f64) {
        for entry in &mut self.entries {
            entry.app_mag = entry.observed_mag - entry.bandpass.ext_coeff() * a_v;
            let (app_flux, app_flux_unc) =
                entry.bandpass.mag_to_flux(entry.app_mag, entry.app_mag_unc);
            entry.app_flux = app_flux;
            entry.app_flux_unc = app_flux_unc;

            match distance_pc {
                Some(distance) => {
                    let (abs_mag, abs_unc) =
                        mag_to_absolute(entry.app_mag, entry.app_mag_unc, distance);
                    let (abs_flux, abs_flux_unc) = entry.bandpass.mag_to_flux(abs_mag, abs_unc);
                    entry.abs_mag = abs_mag;
                    entry.abs_mag_unc = abs_unc;
                    entry.abs_flux = abs_flux;
                    entry.abs_flux_unc = abs_flux_unc;
                }
                None => {
                    entry.abs_mag = f64::NAN;
                    entry.abs_mag_unc = f64::NAN;
                    entry.abs_flux = f64::NAN;
                    entry.abs_flux_unc = f64::NAN;
                }
            }
        }
    }

    /// The photometric piece of the SED: one sample per band with a
    /// positive flux and known positive uncertainty.
    ///
    /// Returns None when no band qualifies.
    pub fn to_spectrum(&self, frame: PhotFrame) -> Option<Spectrum> {
        let mut wave = Vec::new();
        let mut flux = Vec::new();
        let mut unc = Vec::new();

        for entry in &self.entries {
            let (f, e) = match frame {
                PhotFrame::Apparent => (entry.app_flux, entry.app_flux_unc),
                PhotFrame::Absolute => (entry.abs_flux, entry.abs_flux_unc),
            };
            if f.is_finite() && f > 0.0 && e.is_finite() && e > 0.0 {
                wave.push(entry.eff_wave);
                flux.push(f);
                unc.push(e);
            }
        }

        Spectrum::new(wave, flux, unc, Unit::Micron, Unit::FlamCgs).ok()
    }
}
