//! Fundamental parameter estimators
//!
//! Pure functions from the assembled SED (plus distance and radius) to the
//! derived physical parameters, with the standard quadrature combination of
//! independent relative errors. Everything here returns an `Estimate`;
//! missing uncertainties stay `None` and flow through as such.

use crate::constants::CGS;
use crate::spectrum::Spectrum;

/// A derived value with an optional 1-sigma uncertainty
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub value: f64,
    pub unc: Option<f64>,
}

impl Estimate {
    pub fn new(value: f64, unc: Option<f64>) -> Self {
        Self { value, unc }
    }

    /// Relative uncertainty, None when the uncertainty is unknown
    pub fn relative_unc(&self) -> Option<f64> {
        self.unc.map(|u| u / self.value)
    }
}

/// One row of the results table
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub param: &'static str,
    pub value: f64,
    pub unc: Option<f64>,
    pub unit: &'static str,
}

/// Apparent bolometric flux: trapezoidal integral of the full apparent
/// SED, erg s⁻¹ cm⁻²
pub fn bolometric_flux(app_sed: &Spectrum) -> Estimate {
    let (value, unc) = app_sed.integral();
    Estimate::new(value, unc)
}

/// Apparent bolometric magnitude, mbol = −2.5·log10(fbol) − 11.482
pub fn apparent_bolometric_magnitude(fbol: &Estimate) -> Estimate {
    let mbol = -2.5 * fbol.value.log10() + CGS::MBOL_ZERO_POINT;
    let unc = fbol
        .relative_unc()
        .map(|rel| (2.5 / 10f64.ln()) * rel);
    Estimate::new(mbol, unc)
}

/// Absolute bolometric magnitude, Mbol = mbol − 5·log10(d/10pc)
pub fn absolute_bolometric_magnitude(mbol: &Estimate, distance_pc: (f64, f64)) -> Estimate {
    let (d, d_unc) = distance_pc;
    let value = mbol.value - 5.0 * (d / 10.0).log10();
    let unc = mbol.unc.map(|m_unc| {
        let dist_term = (5.0 / 10f64.ln()) * (d_unc / d);
        (m_unc * m_unc + dist_term * dist_term).sqrt()
    });
    Estimate::new(value, unc)
}

/// Bolometric luminosity, Lbol = 4π·fbol·d² in erg s⁻¹.
///
/// The distance relative error enters doubled (d appears squared).
pub fn bolometric_luminosity(fbol: &Estimate, distance_pc: (f64, f64)) -> Estimate {
    let (d, d_unc) = distance_pc;
    let d_cm = d * CGS::PARSEC_CM;
    let value = 4.0 * std::f64::consts::PI * fbol.value * d_cm * d_cm;
    let unc = fbol.relative_unc().map(|f_rel| {
        let d_rel = 2.0 * d_unc / d;
        value * (f_rel * f_rel + d_rel * d_rel).sqrt()
    });
    Estimate::new(value, unc)
}

/// Bolometric luminosity in logarithmic solar units, log10(Lbol/Lsun)
pub fn luminosity_solar(lbol_erg_s: &Estimate) -> Estimate {
    let value = (lbol_erg_s.value / CGS::SOLAR_LUMINOSITY).log10();
    let unc = lbol_erg_s.relative_unc().map(|rel| (rel / 10f64.ln()).abs());
    Estimate::new(value, unc)
}

/// Effective temperature from the Stefan-Boltzmann relation,
/// Teff = (Lbol / (4π·σ_SB·R²))^(1/4) in Kelvin.
///
/// The radius error is weighted by 2 (R appears squared) and the combined
/// relative error divided by 4 for the fourth root.
pub fn effective_temperature(lbol_erg_s: &Estimate, radius_rjup: &Estimate) -> Estimate {
    let r_cm = radius_rjup.value * CGS::JUPITER_RADIUS_CM;
    let t4 = lbol_erg_s.value
        / (4.0 * std::f64::consts::PI * CGS::STEFAN_BOLTZMANN * r_cm * r_cm);
    let value = t4.sqrt().sqrt();

    let unc = match (lbol_erg_s.relative_unc(), radius_rjup.relative_unc()) {
        (Some(l_rel), Some(r_rel)) => {
            Some(value * (l_rel * l_rel + (2.0 * r_rel).powi(2)).sqrt() / 4.0)
        }
        _ => None,
    };
    Estimate::new(value, unc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;
    use approx::assert_relative_eq;

    fn flat_sed() -> Spectrum {
        // Flat 1 erg/s/cm²/Å over 1-2 um with zero uncertainty
        let wave: Vec<f64> = (0..=100).map(|i| 1.0 + i as f64 * 0.01).collect();
        let n = wave.len();
        Spectrum::new(
            wave,
            vec![1.0; n],
            vec![0.0; n],
            Unit::Micron,
            Unit::FlamCgs,
        )
        .unwrap()
    }

    #[test]
    fn test_fbol_and_mbol_flat_scenario() {
        let fbol = bolometric_flux(&flat_sed());
        assert_relative_eq!(fbol.value, 1e-4, epsilon = 1e-10);

        let mbol = apparent_bolometric_magnitude(&fbol);
        assert_relative_eq!(mbol.value, -2.5 * (1e-4_f64).log10() - 11.482, epsilon = 1e-9);
        assert_relative_eq!(mbol.value, -1.482, epsilon = 1e-9);
        assert_eq!(mbol.unc, Some(0.0));
    }

    #[test]
    fn test_mbol_uncertainty() {
        let fbol = Estimate::new(1e-10, Some(1e-11));
        let mbol = apparent_bolometric_magnitude(&fbol);
        assert_relative_eq!(mbol.unc.unwrap(), 2.5 / 10f64.ln() * 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_solar_luminosity_closure() {
        // The Sun's own fbol at 10 pc must give Lbol = 1 Lsun, Mbol = 4.74
        let d = (10.0, 0.1);
        let d_cm = 10.0 * CGS::PARSEC_CM;
        let fbol_sun = CGS::SOLAR_LUMINOSITY / (4.0 * std::f64::consts::PI * d_cm * d_cm);
        let fbol = Estimate::new(fbol_sun, Some(fbol_sun * 0.01));

        let lbol = bolometric_luminosity(&fbol, d);
        assert_relative_eq!(lbol.value, CGS::SOLAR_LUMINOSITY, max_relative = 1e-10);

        let lbol_sun = luminosity_solar(&lbol);
        assert_relative_eq!(lbol_sun.value, 0.0, epsilon = 1e-10);

        let mbol = apparent_bolometric_magnitude(&fbol);
        let mbol_abs = absolute_bolometric_magnitude(&mbol, d);
        assert_relative_eq!(mbol_abs.value, 4.74, epsilon = 0.01);
    }

    #[test]
    fn test_luminosity_distance_error_doubled() {
        let fbol = Estimate::new(1e-10, Some(0.0));
        let lbol = bolometric_luminosity(&fbol, (20.0, 1.0));
        // Pure distance term: 2·σd/d = 0.1 relative
        assert_relative_eq!(lbol.unc.unwrap() / lbol.value, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_effective_temperature() {
        // A 1 Rjup source with Lbol chosen so Teff = 1000 K exactly
        let r_cm = CGS::JUPITER_RADIUS_CM;
        let lbol_val =
            4.0 * std::f64::consts::PI * CGS::STEFAN_BOLTZMANN * r_cm * r_cm * 1000f64.powi(4);

        let lbol = Estimate::new(lbol_val, Some(lbol_val * 0.04));
        let radius = Estimate::new(1.0, Some(0.02));

        let teff = effective_temperature(&lbol, &radius);
        assert_relative_eq!(teff.value, 1000.0, max_relative = 1e-10);

        // σT/T = sqrt(0.04² + (2·0.02)²)/4
        let expected_rel = (0.04f64.powi(2) + 0.04f64.powi(2)).sqrt() / 4.0;
        assert_relative_eq!(teff.unc.unwrap() / teff.value, expected_rel, epsilon = 1e-12);
    }

    #[test]
    fn test_teff_without_radius_unc_is_undefined() {
        let lbol = Estimate::new(1e30, Some(1e28));
        let radius = Estimate::new(1.0, None);
        let teff = effective_temperature(&lbol, &radius);
        assert!(teff.unc.is_none());
        assert!(teff.value > 0.0);
    }
}
