//! Spectrum model for SED construction
//!
//! A `Spectrum` is the ordered (wavelength, flux, uncertainty) triple every
//! pipeline stage works on. Wavelengths are kept strictly increasing, and
//! all operations return new spectra; the only way to get an invalid one is
//! to never construct it.
//!
//! Native units are microns and erg s⁻¹ cm⁻² Å⁻¹, the scale the photometric
//! zero points are expressed in.

use log::warn;
use ndarray::Array1;
use thiserror::Error;

use crate::constants::CGS;
use crate::interp::interp;
use crate::photometry::{Bandpass, PhotometryTable};
use crate::units::{Dimension, Unit, UnitError};

/// Errors that can occur with spectrum operations
#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error(
        "Wavelength, flux, and uncertainty arrays must have the same length, got {wave}/{flux}/{unc}"
    )]
    ShapeMismatch { wave: usize, flux: usize, unc: usize },

    #[error("Spectrum has no valid samples after scrubbing")]
    Empty,

    #[error("Uncertainties must be non-negative (NaN allowed for unknown)")]
    NegativeUncertainty,

    #[error("{0} is not a wavelength unit")]
    NotWavelengthUnit(Unit),

    #[error("{0} is not a flux density unit")]
    NotFluxDensityUnit(Unit),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An ordered (wavelength, flux, uncertainty) triple with units
#[derive(Debug, Clone)]
pub struct Spectrum {
    wave: Array1<f64>,
    flux: Array1<f64>,
    unc: Array1<f64>,
    wave_unit: Unit,
    flux_unit: Unit,
}

impl Spectrum {
    /// Create a new Spectrum from raw columns.
    ///
    /// Samples with NaN wavelength, NaN or non-positive flux, or a
    /// wavelength duplicating an earlier sample are scrubbed; the survivors
    /// are sorted by wavelength. NaN uncertainty means "unknown" and is
    /// preserved.
    ///
    /// # Arguments
    ///
    /// * `wave` - Wavelengths, any order
    /// * `flux` - Flux densities, same length as `wave`
    /// * `unc` - Flux density uncertainties, same length as `wave`
    /// * `wave_unit` - A length unit
    /// * `flux_unit` - A flux density (per-wavelength) unit
    ///
    /// # Errors
    ///
    /// Returns an error if the lengths disagree, the units have the wrong
    /// dimension, any uncertainty is negative, or nothing survives the
    /// scrub.
    pub fn new(
        wave: Vec<f64>,
        flux: Vec<f64>,
        unc: Vec<f64>,
        wave_unit: Unit,
        flux_unit: Unit,
    ) -> Result<Self, SpectrumError> {
        if wave.len() != flux.len() || wave.len() != unc.len() {
            return Err(SpectrumError::ShapeMismatch {
                wave: wave.len(),
                flux: flux.len(),
                unc: unc.len(),
            });
        }
        if wave_unit.dimension() != Dimension::Length {
            return Err(SpectrumError::NotWavelengthUnit(wave_unit));
        }
        if flux_unit.dimension() != Dimension::FluxDensity {
            return Err(SpectrumError::NotFluxDensityUnit(flux_unit));
        }
        if unc.iter().any(|&e| e < 0.0) {
            return Err(SpectrumError::NegativeUncertainty);
        }

        // Scrub NaN wavelengths and NaN/non-positive fluxes
        let mut samples: Vec<(f64, f64, f64)> = wave
            .into_iter()
            .zip(flux)
            .zip(unc)
            .map(|((w, f), e)| (w, f, e))
            .filter(|(w, f, _)| w.is_finite() && f.is_finite() && *f > 0.0)
            .collect();

        samples.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        samples.dedup_by(|a, b| a.0 == b.0);

        if samples.is_empty() {
            return Err(SpectrumError::Empty);
        }

        Ok(Self {
            wave: samples.iter().map(|s| s.0).collect(),
            flux: samples.iter().map(|s| s.1).collect(),
            unc: samples.iter().map(|s| s.2).collect(),
            wave_unit,
            flux_unit,
        })
    }

    /// Create a Spectrum from an F_ν column in Janskys.
    ///
    /// The F_ν → F_λ conversion depends on wavelength (F_λ = c F_ν / λ²),
    /// so it happens here at the ingestion boundary rather than through the
    /// unit table.
    pub fn from_fnu(
        wave: Vec<f64>,
        fnu_jy: Vec<f64>,
        unc_jy: Vec<f64>,
        wave_unit: Unit,
    ) -> Result<Self, SpectrumError> {
        if wave.len() != fnu_jy.len() || wave.len() != unc_jy.len() {
            return Err(SpectrumError::ShapeMismatch {
                wave: wave.len(),
                flux: fnu_jy.len(),
                unc: unc_jy.len(),
            });
        }
        // F_λ [erg/s/cm²/Å] = c[cm/s] · F_ν[erg/s/cm²/Hz] / λ[cm]² × 1e-8[cm/Å]
        let to_flam = |w: f64, v: f64| {
            let w_cm = wave_unit.convert(w, Unit::Centimeter).unwrap_or(f64::NAN);
            CGS::SPEED_OF_LIGHT * (v * CGS::JANSKY_IN_CGS) / (w_cm * w_cm) * 1e-8
        };
        let flux: Vec<f64> = wave.iter().zip(&fnu_jy).map(|(&w, &v)| to_flam(w, v)).collect();
        let unc: Vec<f64> = wave.iter().zip(&unc_jy).map(|(&w, &v)| to_flam(w, v)).collect();
        Self::new(wave, flux, unc, wave_unit, Unit::FlamCgs)
    }

    /// Load a spectrum from an ASCII table of 2 or 3 columns
    /// (wavelength, flux[, uncertainty]) with the units declared by the
    /// caller. `#` starts a comment; a missing uncertainty column is
    /// stored as NaN (unknown).
    pub fn from_file(
        path: &std::path::Path,
        wave_unit: Unit,
        flux_unit: Unit,
    ) -> Result<Self, SpectrumError> {
        let content = std::fs::read_to_string(path)?;

        let mut wave = Vec::new();
        let mut flux = Vec::new();
        let mut unc = Vec::new();
        for raw in content.lines() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<f64> = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .filter_map(|s| s.parse().ok())
                .collect();
            if fields.len() < 2 {
                continue;
            }
            wave.push(fields[0]);
            flux.push(fields[1]);
            unc.push(fields.get(2).copied().unwrap_or(f64::NAN));
        }

        Self::new(wave, flux, unc, wave_unit, flux_unit)
    }

    /// Wavelength column
    pub fn wave(&self) -> &Array1<f64> {
        &self.wave
    }

    /// Flux density column
    pub fn flux(&self) -> &Array1<f64> {
        &self.flux
    }

    /// Flux density uncertainty column (NaN = unknown)
    pub fn unc(&self) -> &Array1<f64> {
        &self.unc
    }

    pub fn wave_unit(&self) -> Unit {
        self.wave_unit
    }

    pub fn flux_unit(&self) -> Unit {
        self.flux_unit
    }

    /// Number of samples (always ≥ 1)
    pub fn len(&self) -> usize {
        self.wave.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wave.is_empty()
    }

    /// Shortest wavelength
    pub fn min_wave(&self) -> f64 {
        self.wave[0]
    }

    /// Longest wavelength
    pub fn max_wave(&self) -> f64 {
        self.wave[self.wave.len() - 1]
    }

    /// The covered wavelength interval
    pub fn range(&self) -> (f64, f64) {
        (self.min_wave(), self.max_wave())
    }

    /// True if the wavelength intervals of the two spectra intersect
    pub fn overlaps(&self, other: &Spectrum) -> bool {
        let (a0, a1) = self.range();
        let (b0, b1) = other.range();
        a0 <= b1 && b0 <= a1
    }

    /// Flux density linearly interpolated at `w` (in this spectrum's
    /// wavelength unit), clamped at the coverage edges
    pub fn flux_at(&self, w: f64) -> f64 {
        interp(w, self.wave.as_slice().unwrap(), self.flux.as_slice().unwrap())
    }

    /// Re-express the wavelength column in another length unit
    pub fn convert_wave(&self, to: Unit) -> Result<Spectrum, SpectrumError> {
        if to.dimension() != Dimension::Length {
            return Err(SpectrumError::NotWavelengthUnit(to));
        }
        let factor = self.wave_unit.convert(1.0, to)?;
        Ok(Spectrum {
            wave: self.wave.mapv(|w| w * factor),
            flux: self.flux.clone(),
            unc: self.unc.clone(),
            wave_unit: to,
            flux_unit: self.flux_unit,
        })
    }

    /// Re-express the flux and uncertainty columns in another flux density
    /// unit
    pub fn convert_flux(&self, to: Unit) -> Result<Spectrum, SpectrumError> {
        if to.dimension() != Dimension::FluxDensity {
            return Err(SpectrumError::NotFluxDensityUnit(to));
        }
        let factor = self.flux_unit.convert(1.0, to)?;
        Ok(Spectrum {
            wave: self.wave.clone(),
            flux: self.flux.mapv(|f| f * factor),
            unc: self.unc.mapv(|e| e * factor),
            wave_unit: self.wave_unit,
            flux_unit: to,
        })
    }

    /// Multiply flux and uncertainty by a scalar
    pub fn scale(&self, factor: f64) -> Spectrum {
        Spectrum {
            wave: self.wave.clone(),
            flux: self.flux.mapv(|f| f * factor),
            unc: self.unc.mapv(|e| e * factor),
            wave_unit: self.wave_unit,
            flux_unit: self.flux_unit,
        }
    }

    /// Remove all samples whose wavelength falls strictly inside any of the
    /// given `(min, max)` exclusion windows (in this spectrum's wavelength
    /// unit).
    ///
    /// Returns None if nothing survives.
    pub fn trim(&self, exclude: &[(f64, f64)]) -> Option<Spectrum> {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| {
                let w = self.wave[i];
                !exclude.iter().any(|&(lo, hi)| w > lo && w < hi)
            })
            .collect();

        if keep.is_empty() {
            return None;
        }

        Some(Spectrum {
            wave: keep.iter().map(|&i| self.wave[i]).collect(),
            flux: keep.iter().map(|&i| self.flux[i]).collect(),
            unc: keep.iter().map(|&i| self.unc[i]).collect(),
            wave_unit: self.wave_unit,
            flux_unit: self.flux_unit,
        })
    }

    /// Stitch two spectra into one.
    ///
    /// The result covers the union of the two wavelength domains. Where the
    /// domains overlap, the sparser operand is linearly interpolated onto
    /// the denser operand's grid and the fluxes are added, uncertainties in
    /// quadrature. Outside the overlap, samples pass through unchanged.
    pub fn add(&self, other: &Spectrum) -> Result<Spectrum, SpectrumError> {
        let other = other
            .convert_wave(self.wave_unit)?
            .convert_flux(self.flux_unit)?;

        let (a0, a1) = self.range();
        let (b0, b1) = other.range();
        let lo = a0.max(b0);
        let hi = a1.min(b1);

        let mut wave = Vec::with_capacity(self.len() + other.len());
        let mut flux = Vec::with_capacity(self.len() + other.len());
        let mut unc = Vec::with_capacity(self.len() + other.len());

        if lo > hi {
            // Disjoint domains: plain concatenation
            for s in [self, &other] {
                wave.extend(s.wave.iter());
                flux.extend(s.flux.iter());
                unc.extend(s.unc.iter());
            }
        } else {
            let self_in = self.count_in(lo, hi);
            let other_in = other.count_in(lo, hi);
            let (dense, sparse) = if self_in >= other_in {
                (self, &other)
            } else {
                (&other, self)
            };

            let sw = sparse.wave.as_slice().unwrap();
            let sf = sparse.flux.as_slice().unwrap();
            let se = sparse.unc.as_slice().unwrap();

            // Overlap region on the denser grid
            for i in 0..dense.len() {
                let w = dense.wave[i];
                if w < lo || w > hi {
                    continue;
                }
                let f2 = interp(w, sw, sf);
                let e2 = interp(w, sw, se);
                wave.push(w);
                flux.push(dense.flux[i] + f2);
                unc.push((dense.unc[i].powi(2) + e2.powi(2)).sqrt());
            }

            // Pass-through regions from both operands
            for s in [self, &other] {
                for i in 0..s.len() {
                    let w = s.wave[i];
                    if w < lo || w > hi {
                        wave.push(w);
                        flux.push(s.flux[i]);
                        unc.push(s.unc[i]);
                    }
                }
            }
        }

        Spectrum::new(wave, flux, unc, self.wave_unit, self.flux_unit)
    }

    fn count_in(&self, lo: f64, hi: f64) -> usize {
        self.wave.iter().filter(|&&w| w >= lo && w <= hi).count()
    }

    /// Trapezoidal integral of flux over wavelength, in erg s⁻¹ cm⁻².
    ///
    /// The wavelength column is converted to the CGS base (cm) so the
    /// result is on the scale the bolometric magnitude zero point expects.
    /// The propagated uncertainty is sqrt(Σ(E·Δλ)²) with Δλ the symmetric
    /// difference spacing; it is None when every uncertainty is unknown.
    ///
    /// A single-sample spectrum has no width and integrates to NaN.
    pub fn integral(&self) -> (f64, Option<f64>) {
        if self.len() < 2 {
            return (f64::NAN, None);
        }

        let factor = self
            .wave_unit
            .convert(1.0, Unit::Centimeter)
            .expect("wavelength unit is a length");
        let flux_factor = self
            .flux_unit
            .convert(1.0, Unit::FlamCgs)
            .expect("flux unit is a flux density");

        let w: Vec<f64> = self.wave.iter().map(|&x| x * factor).collect();
        let f: Vec<f64> = self.flux.iter().map(|&x| x * flux_factor).collect();
        let e: Vec<f64> = self.unc.iter().map(|&x| x * flux_factor).collect();

        let mut total = 0.0;
        for i in 0..w.len() - 1 {
            total += (w[i + 1] - w[i]) * (f[i] + f[i + 1]) / 2.0;
        }

        // Symmetric-difference spacing, one-sided at the edges
        let n = w.len();
        let mut var = 0.0;
        let mut any = false;
        for i in 0..n {
            if e[i].is_nan() {
                continue;
            }
            let dw = if i == 0 {
                w[1] - w[0]
            } else if i == n - 1 {
                w[n - 1] - w[n - 2]
            } else {
                (w[i + 1] - w[i - 1]) / 2.0
            };
            var += (e[i] * dw).powi(2);
            any = true;
        }

        (total, if any { Some(var.sqrt()) } else { None })
    }

    /// The integral expressed in another flux unit
    pub fn integral_in(&self, unit: Unit) -> Result<(f64, Option<f64>), UnitError> {
        let factor = Unit::ErgPerSCm2.convert(1.0, unit)?;
        let (value, unc) = self.integral();
        Ok((value * factor, unc.map(|u| u * factor)))
    }

    /// Synthetic flux density through a bandpass.
    ///
    /// Response-weighted mean of the flux over the band,
    /// ∫F·R dλ / ∫R dλ, evaluated on the bandpass wavelength grid
    /// restricted to this spectrum's coverage.
    ///
    /// # Returns
    ///
    /// `Some((flux, unc))` in this spectrum's flux unit, or None when the
    /// band does not overlap the spectrum. `unc` is NaN when the spectrum
    /// carries no uncertainties in the band.
    pub fn synthetic_flux(&self, bandpass: &Bandpass) -> Option<(f64, f64)> {
        let bp_wave = bandpass.wave();
        let bp_resp = bandpass.throughput();

        // Bandpass grids are in microns
        let spec = if self.wave_unit != Unit::Micron {
            self.convert_wave(Unit::Micron).ok()?
        } else {
            self.clone()
        };

        let (s0, s1) = spec.range();
        let idx: Vec<usize> = (0..bp_wave.len())
            .filter(|&i| bp_wave[i] >= s0 && bp_wave[i] <= s1)
            .collect();
        if idx.len() < 2 {
            return None;
        }

        let sw = spec.wave.as_slice().unwrap();
        let sf = spec.flux.as_slice().unwrap();
        let se = spec.unc.as_slice().unwrap();

        let mut weighted = 0.0;
        let mut weighted_var = 0.0;
        let mut total_resp = 0.0;
        let mut any_unc = false;
        for k in 0..idx.len() - 1 {
            let (i, j) = (idx[k], idx[k + 1]);
            let dw = bp_wave[j] - bp_wave[i];
            let r0 = bp_resp[i];
            let r1 = bp_resp[j];
            let f0 = interp(bp_wave[i], sw, sf);
            let f1 = interp(bp_wave[j], sw, sf);
            weighted += dw * (r0 * f0 + r1 * f1) / 2.0;
            total_resp += dw * (r0 + r1) / 2.0;

            let e0 = interp(bp_wave[i], sw, se);
            let e1 = interp(bp_wave[j], sw, se);
            if e0.is_finite() && e1.is_finite() {
                weighted_var += (dw * (r0 * e0 + r1 * e1) / 2.0).powi(2);
                any_unc = true;
            }
        }

        if total_resp <= 0.0 {
            return None;
        }

        let flux = weighted / total_resp;
        let unc = if any_unc {
            weighted_var.sqrt() / total_resp
        } else {
            f64::NAN
        };
        Some((flux, unc))
    }

    /// Scale this spectrum so its synthetic photometry best matches the
    /// observed photometric fluxes in the overlapping bands.
    ///
    /// The scalar is the inverse-variance weighted least-squares solution
    ///   norm = Σ(w·f_obs·f_syn/(σ_obs²+σ_syn²)) / Σ(w·f_syn²/(σ_obs²+σ_syn²))
    /// with `w` the bandpass width. Bands without observed uncertainty or
    /// without spectral coverage are skipped. With no usable band the
    /// spectrum is returned unscaled and a warning is logged.
    pub fn norm_to_photometry(&self, photometry: &PhotometryTable) -> Spectrum {
        let mut num = 0.0;
        let mut den = 0.0;
        let mut used = 0;

        for entry in photometry.iter() {
            let f_obs = entry.app_flux;
            let e_obs = entry.app_flux_unc;
            if !(f_obs.is_finite() && f_obs > 0.0 && e_obs.is_finite() && e_obs > 0.0) {
                continue;
            }
            let Some((f_syn, e_syn)) = self.synthetic_flux(entry.bandpass()) else {
                continue;
            };
            if !(f_syn.is_finite() && f_syn > 0.0) {
                continue;
            }
            let var = if e_syn.is_finite() {
                e_obs * e_obs + e_syn * e_syn
            } else {
                e_obs * e_obs
            };
            let weight = entry.bandpass().width();

            num += weight * f_obs * f_syn / var;
            den += weight * f_syn * f_syn / var;
            used += 1;
        }

        if used == 0 || den == 0.0 {
            warn!("No overlapping photometry for normalization, spectrum left unscaled");
            return self.clone();
        }

        let norm = num / den;
        log::debug!("Normalizing spectrum by {:.6e} using {} bands", norm, used);
        self.scale(norm)
    }

    /// Scale this spectrum to match another over their wavelength overlap.
    ///
    /// Least-squares scalar fit of this spectrum's flux to `other`'s flux
    /// interpolated onto this grid, skipping samples inside the `exclude`
    /// windows. Returns the spectrum unscaled (with a warning) when the
    /// overlap is empty.
    pub fn norm_to_spec(&self, other: &Spectrum, exclude: &[(f64, f64)]) -> Spectrum {
        let other = match other
            .convert_wave(self.wave_unit)
            .and_then(|s| s.convert_flux(self.flux_unit))
        {
            Ok(s) => s,
            Err(err) => {
                warn!("Cannot align spectra for normalization: {}", err);
                return self.clone();
            }
        };

        let (o0, o1) = other.range();
        let ow = other.wave.as_slice().unwrap();
        let of = other.flux.as_slice().unwrap();

        let mut num = 0.0;
        let mut den = 0.0;
        let mut used = 0;
        for i in 0..self.len() {
            let w = self.wave[i];
            if w < o0 || w > o1 {
                continue;
            }
            if exclude.iter().any(|&(lo, hi)| w > lo && w < hi) {
                continue;
            }
            let f_self = self.flux[i];
            let f_other = interp(w, ow, of);
            if f_self.is_finite() && f_other.is_finite() {
                num += f_other * f_self;
                den += f_self * f_self;
                used += 1;
            }
        }

        if used == 0 || den == 0.0 {
            warn!("No spectral overlap for normalization, spectrum left unscaled");
            return self.clone();
        }

        self.scale(num / den)
    }

    /// Shift this apparent-frame spectrum to the absolute frame (10 pc)
    /// using the inverse-square law.
    ///
    /// # Arguments
    ///
    /// * `distance_pc` - Distance and its uncertainty in parsecs
    pub fn flux_calibrate(&self, distance_pc: (f64, f64)) -> Spectrum {
        let (d, d_unc) = distance_pc;
        let scale = (d / 10.0).powi(2);

        let flux = self.flux.mapv(|f| f * scale);
        let unc = Array1::from_iter(self.flux.iter().zip(self.unc.iter()).map(|(&f, &e)| {
            let term1 = e * scale;
            let term2 = f * scale * 2.0 * d_unc / d;
            (term1 * term1 + term2 * term2).sqrt()
        }));

        Spectrum {
            wave: self.wave.clone(),
            flux,
            unc,
            wave_unit: self.wave_unit,
            flux_unit: self.flux_unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::BandpassRegistry;
    use approx::assert_relative_eq;

    fn flat(wave: Vec<f64>, flux: f64) -> Spectrum {
        let n = wave.len();
        Spectrum::new(
            wave,
            vec![flux; n],
            vec![0.0; n],
            Unit::Micron,
            Unit::FlamCgs,
        )
        .unwrap()
    }

    #[test]
    fn test_shape_mismatch() {
        let result = Spectrum::new(
            vec![1.0, 2.0],
            vec![1.0],
            vec![0.0],
            Unit::Micron,
            Unit::FlamCgs,
        );
        assert!(matches!(result, Err(SpectrumError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_scrub_and_sort() {
        let spec = Spectrum::new(
            vec![2.0, 1.0, 1.5, f64::NAN, 3.0, 1.5],
            vec![1.0, 1.0, 1.0, 1.0, -0.5, 2.0],
            vec![0.1; 6],
            Unit::Micron,
            Unit::FlamCgs,
        )
        .unwrap();

        // NaN wavelength, non-positive flux, and the duplicate 1.5 are gone
        assert_eq!(spec.len(), 3);
        let w = spec.wave().to_vec();
        assert!(w.windows(2).all(|p| p[0] < p[1]));
    }

    #[test]
    fn test_wrong_unit_dimension() {
        let result = Spectrum::new(
            vec![1.0],
            vec![1.0],
            vec![0.0],
            Unit::Kelvin,
            Unit::FlamCgs,
        );
        assert!(matches!(result, Err(SpectrumError::NotWavelengthUnit(_))));
    }

    #[test]
    fn test_unit_round_trip() {
        let spec = flat(vec![1.0, 1.5, 2.0], 2.0);
        let back = spec
            .convert_wave(Unit::Angstrom)
            .unwrap()
            .convert_wave(Unit::Micron)
            .unwrap();

        for (a, b) in spec.wave().iter().zip(back.wave().iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
        assert_eq!(back.wave_unit(), Unit::Micron);

        let back = spec
            .convert_flux(Unit::WattPerM2Micron)
            .unwrap()
            .convert_flux(Unit::FlamCgs)
            .unwrap();
        for (a, b) in spec.flux().iter().zip(back.flux().iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_trim() {
        let spec = flat(vec![1.0, 1.2, 1.4, 1.6, 1.8, 2.0], 1.0);
        let trimmed = spec.trim(&[(1.1, 1.5)]).unwrap();
        assert_eq!(trimmed.len(), 4);
        assert!(trimmed.wave().iter().all(|&w| !(w > 1.1 && w < 1.5)));

        // Window endpoints survive
        let trimmed = spec.trim(&[(1.2, 1.6)]).unwrap();
        assert!(trimmed.wave().iter().any(|&w| w == 1.2));
        assert!(trimmed.wave().iter().any(|&w| w == 1.6));

        // Everything excluded
        assert!(spec.trim(&[(0.0, 3.0)]).is_none());
    }

    #[test]
    fn test_integral_flat_spectrum() {
        // Flat 1 erg/s/cm²/Å over 1-2 um integrates to 1e-4 erg/s/cm²
        // (wavelength converted to the CGS base)
        let wave: Vec<f64> = (0..=100).map(|i| 1.0 + i as f64 * 0.01).collect();
        let spec = flat(wave, 1.0);
        let (fbol, unc) = spec.integral();
        assert_relative_eq!(fbol, 1e-4, epsilon = 1e-10);
        assert_eq!(unc, Some(0.0));

        // Same integral in SI flux units
        let (si, _) = spec.integral_in(Unit::WattPerM2).unwrap();
        assert_relative_eq!(si, 1e-7, epsilon = 1e-13);
    }

    #[test]
    fn test_integral_uncertainty_propagation() {
        let spec = Spectrum::new(
            vec![1.0, 1.5, 2.0],
            vec![1.0, 1.0, 1.0],
            vec![0.1, 0.1, 0.1],
            Unit::Micron,
            Unit::FlamCgs,
        )
        .unwrap();

        let (_, unc) = spec.integral();
        // dw = [0.5, 0.5, 0.5] um = 0.5e-4 cm each
        let expected = (3.0_f64 * (0.1_f64 * 0.5e-4).powi(2)).sqrt();
        assert_relative_eq!(unc.unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_integral_single_sample_is_nan() {
        let spec = flat(vec![1.0], 1.0);
        let (fbol, unc) = spec.integral();
        assert!(fbol.is_nan());
        assert!(unc.is_none());
    }

    #[test]
    fn test_add_disjoint() {
        let blue = flat(vec![1.0, 1.1, 1.2], 1.0);
        let red = flat(vec![2.0, 2.1, 2.2], 3.0);
        let combined = blue.add(&red).unwrap();

        assert_eq!(combined.len(), 6);
        assert_relative_eq!(combined.min_wave(), 1.0);
        assert_relative_eq!(combined.max_wave(), 2.2);
        // No addition anywhere: fluxes pass through
        assert_relative_eq!(combined.flux()[0], 1.0);
        assert_relative_eq!(combined.flux()[5], 3.0);
    }

    #[test]
    fn test_add_overlapping() {
        // Dense grid on [1.0, 2.0], sparse on [1.5, 2.5]
        let dense = flat((0..=20).map(|i| 1.0 + i as f64 * 0.05).collect(), 1.0);
        let sparse = flat(vec![1.5, 2.0, 2.5], 2.0);

        let sum = dense.add(&sparse).unwrap();

        // In the overlap [1.5, 2.0] fluxes add on the dense grid
        let mid = sum.flux_at(1.75);
        assert_relative_eq!(mid, 3.0, epsilon = 1e-10);

        // Outside the overlap each side passes through
        assert_relative_eq!(sum.flux_at(1.2), 1.0, epsilon = 1e-10);
        assert_relative_eq!(sum.flux_at(2.5), 2.0, epsilon = 1e-10);

        // Union domain, strictly increasing
        assert_relative_eq!(sum.min_wave(), 1.0);
        assert_relative_eq!(sum.max_wave(), 2.5);
        let w = sum.wave().to_vec();
        assert!(w.windows(2).all(|p| p[0] < p[1]));
    }

    #[test]
    fn test_add_uncertainties_in_quadrature() {
        let a = Spectrum::new(
            vec![1.0, 1.5, 2.0],
            vec![1.0, 1.0, 1.0],
            vec![0.3, 0.3, 0.3],
            Unit::Micron,
            Unit::FlamCgs,
        )
        .unwrap();
        let b = Spectrum::new(
            vec![1.0, 1.5, 2.0],
            vec![1.0, 1.0, 1.0],
            vec![0.4, 0.4, 0.4],
            Unit::Micron,
            Unit::FlamCgs,
        )
        .unwrap();

        let sum = a.add(&b).unwrap();
        assert_relative_eq!(sum.unc()[1], 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_add_converts_units() {
        let microns = flat(vec![1.0, 1.5, 2.0], 1.0);
        let angstroms = flat(vec![1.0, 1.5, 2.0], 1.0)
            .convert_wave(Unit::Angstrom)
            .unwrap();

        let sum = microns.add(&angstroms).unwrap();
        assert_eq!(sum.wave_unit(), Unit::Micron);
        assert_relative_eq!(sum.flux_at(1.5), 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_synthetic_flux_flat_spectrum() {
        let registry = BandpassRegistry::builtin();
        let band = registry.get("Johnson.V").unwrap();

        let wave: Vec<f64> = (0..=200).map(|i| 0.3 + i as f64 * 0.01).collect();
        let spec = flat(wave, 5.0);

        let (f_syn, _) = spec.synthetic_flux(band).unwrap();
        // Flat spectrum: response-weighted mean is the flat level
        assert_relative_eq!(f_syn, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_synthetic_flux_no_overlap() {
        let registry = BandpassRegistry::builtin();
        let band = registry.get("WISE.W4").unwrap();

        let spec = flat(vec![0.5, 0.6, 0.7], 1.0);
        assert!(spec.synthetic_flux(band).is_none());
    }

    #[test]
    fn test_norm_to_spec() {
        let grid: Vec<f64> = (0..=50).map(|i| 1.0 + i as f64 * 0.02).collect();
        let reference = flat(grid.clone(), 4.0);
        let low = flat(grid, 1.0);

        let scaled = low.norm_to_spec(&reference, &[]);
        assert_relative_eq!(scaled.flux_at(1.5), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_norm_to_spec_no_overlap_unchanged() {
        let a = flat(vec![1.0, 1.1, 1.2], 1.0);
        let b = flat(vec![5.0, 5.1, 5.2], 4.0);

        let scaled = a.norm_to_spec(&b, &[]);
        assert_relative_eq!(scaled.flux_at(1.1), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flux_calibrate_inverse_square() {
        let spec = Spectrum::new(
            vec![1.0, 2.0],
            vec![1.0, 1.0],
            vec![0.1, 0.1],
            Unit::Micron,
            Unit::FlamCgs,
        )
        .unwrap();

        // At 10 pc the apparent and absolute frames coincide
        let same = spec.flux_calibrate((10.0, 0.0));
        assert_relative_eq!(same.flux()[0], 1.0, epsilon = 1e-12);

        // At 20 pc the absolute flux is 4x the apparent
        let farther = spec.flux_calibrate((20.0, 0.0));
        assert_relative_eq!(farther.flux()[0], 4.0, epsilon = 1e-12);

        // Distance uncertainty enters the flux uncertainty
        let with_unc = spec.flux_calibrate((20.0, 2.0));
        assert!(with_unc.unc()[0] > farther.unc()[0]);
    }

    #[test]
    fn test_from_fnu() {
        // 3631 Jy at 0.55 um is the AB zero point; F_lambda should come out
        // near 3.63e-9 erg/s/cm²/Å × (5500/5500)² scaling
        let spec = Spectrum::from_fnu(
            vec![0.55],
            vec![3631.0],
            vec![f64::NAN],
            Unit::Micron,
        )
        .unwrap();

        // F_λ = c·F_ν/λ²: 3e10 * 3.631e-20 / (5.5e-5)² * 1e-8
        let expected = CGS::SPEED_OF_LIGHT * 3631.0 * CGS::JANSKY_IN_CGS / (5.5e-5_f64).powi(2)
            * 1e-8;
        assert_relative_eq!(spec.flux()[0], expected, max_relative = 1e-10);
    }
}
