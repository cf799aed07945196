//! Planck-law spectra for the SED tails
//!
//! The tails only need the blackbody *shape*; the absolute scale is set by
//! normalization against data. The uncertainty column is the flux spread
//! produced by the temperature uncertainty.

use crate::constants::CGS;
use crate::spectrum::{Spectrum, SpectrumError};
use crate::units::Unit;

/// Planck spectral radiance shaped as a flux density, erg s⁻¹ cm⁻² Å⁻¹
/// (arbitrary emitter scale).
///
/// # Arguments
///
/// * `wave_um` - Wavelength in microns
/// * `teff` - Temperature in Kelvin
pub fn planck_flam(wave_um: f64, teff: f64) -> f64 {
    if wave_um <= 0.0 || teff <= 0.0 {
        return 0.0;
    }
    let lam = wave_um * 1e-4; // cm
    let hc = CGS::PLANCK_CONSTANT * CGS::SPEED_OF_LIGHT;
    let c2 = CGS::SPEED_OF_LIGHT * CGS::SPEED_OF_LIGHT;

    let exponent = hc / (lam * CGS::BOLTZMANN_CONSTANT * teff);
    // Far Wien limit: the exponential underflows everything
    if exponent > 700.0 {
        return 0.0;
    }

    // B_λ = 2πhc²/λ⁵ / (exp(hc/λkT) − 1), per cm of wavelength,
    // then 1e-8 converts to per Å
    let b = 2.0 * std::f64::consts::PI * CGS::PLANCK_CONSTANT * c2
        / lam.powi(5)
        / (exponent.exp() - 1.0);
    b * 1e-8
}

/// A blackbody `Spectrum` over the given wavelength grid.
///
/// The uncertainty column is B(T+σ) − B(T−σ), the flux spread produced by
/// the temperature uncertainty.
///
/// # Arguments
///
/// * `wave_um` - Wavelength grid in microns
/// * `teff` - Effective temperature and its uncertainty in Kelvin
pub fn blackbody_spectrum(wave_um: &[f64], teff: (f64, f64)) -> Result<Spectrum, SpectrumError> {
    let (t, t_unc) = teff;
    let t_lo = (t - t_unc).max(1.0);
    let t_hi = t + t_unc;

    let flux: Vec<f64> = wave_um.iter().map(|&w| planck_flam(w, t)).collect();
    let unc: Vec<f64> = wave_um
        .iter()
        .map(|&w| planck_flam(w, t_hi) - planck_flam(w, t_lo))
        .collect();

    Spectrum::new(wave_um.to_vec(), flux, unc, Unit::Micron, Unit::FlamCgs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wien_displacement() {
        // Peak of a 5800 K blackbody sits near 0.5 um (Wien's law:
        // λ_max = 2898/T um)
        let grid: Vec<f64> = (1..=400).map(|i| i as f64 * 0.005).collect();
        let peak = grid
            .iter()
            .copied()
            .max_by(|a, b| {
                planck_flam(*a, 5800.0)
                    .partial_cmp(&planck_flam(*b, 5800.0))
                    .unwrap()
            })
            .unwrap();
        assert_relative_eq!(peak, 2898.0 / 5800.0, epsilon = 0.01);
    }

    #[test]
    fn test_hotter_is_brighter_everywhere() {
        for w in [0.3, 0.5, 1.0, 5.0, 50.0] {
            assert!(planck_flam(w, 4000.0) > planck_flam(w, 3000.0));
        }
    }

    #[test]
    fn test_extreme_wien_limit_underflows_to_zero() {
        // Far UV tail of a cold source: exponent overflow must not panic
        assert_eq!(planck_flam(0.0001, 300.0), 0.0);
    }

    #[test]
    fn test_blackbody_spectrum_uncertainty() {
        let grid: Vec<f64> = (1..=100).map(|i| i as f64 * 0.1).collect();
        let spec = blackbody_spectrum(&grid, (3000.0, 100.0)).unwrap();

        // Temperature spread produces a positive uncertainty band
        assert!(spec.unc().iter().all(|&e| e >= 0.0));
        assert!(spec.unc().iter().any(|&e| e > 0.0));
    }
}
