//! Blackbody tails bounding the SED integral
//!
//! Real data never reaches wavelength zero or infinity, so the integral is
//! closed with blackbody-shaped extensions: a Wien tail below the shortest
//! coverage and a Rayleigh-Jeans tail above the longest. Each tail is
//! normalized against whichever data (spectral or photometric) reaches
//! nearest its edge, then trimmed so it never overlaps real coverage.

use log::warn;

use crate::blackbody::blackbody_spectrum;
use crate::interp::linspace;
use crate::photometry::PhotometryTable;
use crate::spectrum::Spectrum;

/// Wavelength grid of the Wien tail, microns
const WIEN_GRID: (f64, f64, usize) = (0.0001, 1.1, 500);

/// Wavelength grid of the Rayleigh-Jeans tail, microns
const RJ_GRID: (f64, f64, usize) = (0.1, 1000.0, 2000);

/// Synthesize the Wien tail.
///
/// With a temperature estimate the tail is a blackbody over the short-
/// wavelength grid, normalized to the spectral SED when spectra reach
/// shorter wavelengths than the photometry (ties prefer the spectra), and
/// to the photometry otherwise, then trimmed to end where real data
/// coverage begins. Without a temperature estimate there is no tail yet:
/// a flux guess would leak into the integral through the interpolation
/// ramp, so the integral stays bounded by the data until the refinement
/// pass supplies a temperature.
///
/// Returns None without a temperature, without any data to anchor
/// against, or when the data already covers the whole tail grid.
pub fn wien_tail(
    teff: Option<(f64, f64)>,
    spec_sed: Option<&Spectrum>,
    photometry: &PhotometryTable,
) -> Option<Spectrum> {
    let min_spec = spec_sed.map(|s| s.min_wave());
    let min_phot = photometry.min_eff_wave();

    let data_min = match (min_spec, min_phot) {
        (Some(s), Some(p)) => s.min(p),
        (Some(s), None) => s,
        (None, Some(p)) => p,
        (None, None) => return None,
    };

    let teff = teff?;
    let (lo, hi, n) = WIEN_GRID;
    let bb =
        blackbody_spectrum(&linspace(lo, hi, n), teff).expect("blackbody grid is always valid");

    // Normalize against whichever data reaches nearest the short edge
    let use_spec = match (min_spec, min_phot) {
        (Some(s), Some(p)) => s <= p,
        (Some(_), None) => true,
        _ => false,
    };
    let tail = if use_spec {
        let reference = spec_sed.expect("spectral edge implies a spectral SED");
        bb.norm_to_spec(reference, &[(WIEN_GRID.1, f64::INFINITY)])
    } else if !photometry.is_empty() {
        bb.norm_to_photometry(photometry)
    } else {
        warn!("No calibration anchor for the Wien tail");
        bb
    };

    // No overlap with real data
    tail.trim(&[(data_min, f64::INFINITY)])
}

/// Synthesize the Rayleigh-Jeans tail.
///
/// Mirror of `wien_tail` at the long-wavelength end: spectra win the
/// normalization when they reach longer wavelengths than the photometry
/// (ties prefer the spectra), and the tail is trimmed to start where real
/// coverage ends. Like the Wien tail it requires a temperature estimate.
pub fn rayleigh_jeans_tail(
    teff: Option<(f64, f64)>,
    spec_sed: Option<&Spectrum>,
    photometry: &PhotometryTable,
) -> Option<Spectrum> {
    let max_spec = spec_sed.map(|s| s.max_wave());
    let max_phot = photometry.max_eff_wave();

    let data_max = match (max_spec, max_phot) {
        (Some(s), Some(p)) => s.max(p),
        (Some(s), None) => s,
        (None, Some(p)) => p,
        (None, None) => return None,
    };

    let teff = teff?;
    let (lo, hi, n) = RJ_GRID;
    let bb =
        blackbody_spectrum(&linspace(lo, hi, n), teff).expect("blackbody grid is always valid");

    let use_spec = match (max_spec, max_phot) {
        (Some(s), Some(p)) => s >= p,
        (Some(_), None) => true,
        _ => false,
    };
    let tail = if use_spec {
        let reference = spec_sed.expect("spectral edge implies a spectral SED");
        bb.norm_to_spec(reference, &[])
    } else if !photometry.is_empty() {
        bb.norm_to_photometry(photometry)
    } else {
        warn!("No calibration anchor for the Rayleigh-Jeans tail");
        bb
    };

    tail.trim(&[(0.0, data_max)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::BandpassRegistry;
    use crate::units::Unit;

    fn flat_spec(lo: f64, hi: f64, flux: f64) -> Spectrum {
        let wave = linspace(lo, hi, 100);
        Spectrum::new(
            wave,
            vec![flux; 100],
            vec![flux * 0.02; 100],
            Unit::Micron,
            Unit::FlamCgs,
        )
        .unwrap()
    }

    #[test]
    fn test_no_teff_no_tail() {
        let spec = flat_spec(0.8, 2.4, 1e-12);

        assert!(wien_tail(None, Some(&spec), &PhotometryTable::new()).is_none());
        assert!(rayleigh_jeans_tail(None, Some(&spec), &PhotometryTable::new()).is_none());
    }

    #[test]
    fn test_no_data_no_tail() {
        assert!(wien_tail(Some((3000.0, 100.0)), None, &PhotometryTable::new()).is_none());
        assert!(rayleigh_jeans_tail(None, None, &PhotometryTable::new()).is_none());
    }

    #[test]
    fn test_tails_never_overlap_data() {
        let spec = flat_spec(0.8, 2.4, 1e-12);
        let registry = BandpassRegistry::builtin();
        let mut phot = PhotometryTable::new();
        phot.add_band(registry, "WISE.W1", 10.0, Some(0.05), 0.0)
            .unwrap();

        let wien = wien_tail(Some((3000.0, 100.0)), Some(&spec), &phot).unwrap();
        let rj = rayleigh_jeans_tail(Some((3000.0, 100.0)), Some(&spec), &phot).unwrap();

        // Wien stops at the shortest data wavelength, RJ starts at the
        // longest (the W1 effective wavelength here)
        assert!(wien.max_wave() <= spec.min_wave());
        let w1_eff = phot.max_eff_wave().unwrap();
        assert!(rj.min_wave() >= w1_eff);
    }

    #[test]
    fn test_wien_normalized_to_spectrum_at_boundary() {
        // Flat spectrum: the tail's normalized flux at the join should be
        // near the spectrum's level
        let level = 2e-13;
        let spec = flat_spec(0.5, 2.0, level);

        let wien = wien_tail(Some((3000.0, 100.0)), Some(&spec), &PhotometryTable::new()).unwrap();

        // The last tail sample sits just below 0.5 um where the blackbody
        // normalization was fit against the flat level over [0.5, 1.1]
        let join_flux = wien.flux()[wien.len() - 1];
        assert!(join_flux > 0.0);
        assert!((join_flux / level) > 0.05 && (join_flux / level) < 20.0);
    }

    #[test]
    fn test_rj_normalized_to_photometry_when_no_spectra() {
        let registry = BandpassRegistry::builtin();
        let mut phot = PhotometryTable::new();
        phot.add_band(registry, "2MASS.Ks", 8.0, Some(0.03), 0.0)
            .unwrap();
        phot.add_band(registry, "WISE.W2", 7.8, Some(0.04), 0.0)
            .unwrap();

        let rj = rayleigh_jeans_tail(Some((2500.0, 100.0)), None, &phot).unwrap();

        assert!(rj.min_wave() >= phot.max_eff_wave().unwrap());
        assert!(rj.flux().iter().all(|&f| f > 0.0));
    }
}
