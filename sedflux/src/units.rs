//! Runtime physical units for heterogeneous measurement data
//!
//! Inputs arrive with their units declared as data (column headers, unit
//! strings in spectrum files), so the dimension tags live in a runtime enum
//! rather than the type system. Conversion is always explicit: a value
//! never changes dimension, and converting between incompatible dimensions
//! is an error, not a coercion.

use std::fmt;

use thiserror::Error;

use crate::constants::CGS;

/// Errors that can occur with unit operations
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("Cannot convert {from} ({from_dim:?}) to {to} ({to_dim:?})")]
    IncompatibleDimensions {
        from: Unit,
        to: Unit,
        from_dim: Dimension,
        to_dim: Dimension,
    },

    #[error("Unrecognized unit string: {0:?}")]
    UnknownUnit(String),
}

/// The physical dimension a unit measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Length,
    /// Flux density per unit wavelength (F_λ)
    FluxDensity,
    /// Flux density per unit frequency (F_ν); conversion to F_λ depends on
    /// wavelength and is never done through `Unit::convert`
    FluxDensityFreq,
    /// Wavelength-integrated flux
    Flux,
    Time,
    Temperature,
    Angle,
    Mass,
    Power,
}

/// A named unit with a fixed scale to its dimension's base unit
///
/// Base units: cm, erg s⁻¹ cm⁻² Å⁻¹, erg s⁻¹ cm⁻² Hz⁻¹, erg s⁻¹ cm⁻²,
/// s, K, arcsec, g, erg s⁻¹.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    // Length
    Angstrom,
    Nanometer,
    Micron,
    Centimeter,
    Meter,
    JupiterRadius,
    SolarRadius,
    Parsec,

    // Flux density per wavelength
    FlamCgs,
    WattPerM2Micron,

    // Flux density per frequency
    Jansky,

    // Integrated flux
    ErgPerSCm2,
    WattPerM2,

    // Time
    Second,
    Year,
    Megayear,
    Gigayear,

    // Temperature
    Kelvin,

    // Angle
    Milliarcsec,
    Arcsec,
    Degree,

    // Mass
    Gram,
    JupiterMass,
    SolarMass,

    // Power
    ErgPerS,
    Watt,
    SolarLuminosity,
}

impl Unit {
    /// The dimension this unit measures
    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Angstrom
            | Unit::Nanometer
            | Unit::Micron
            | Unit::Centimeter
            | Unit::Meter
            | Unit::JupiterRadius
            | Unit::SolarRadius
            | Unit::Parsec => Dimension::Length,

            Unit::FlamCgs | Unit::WattPerM2Micron => Dimension::FluxDensity,

            Unit::Jansky => Dimension::FluxDensityFreq,

            Unit::ErgPerSCm2 | Unit::WattPerM2 => Dimension::Flux,

            Unit::Second | Unit::Year | Unit::Megayear | Unit::Gigayear => Dimension::Time,

            Unit::Kelvin => Dimension::Temperature,

            Unit::Milliarcsec | Unit::Arcsec | Unit::Degree => Dimension::Angle,

            Unit::Gram | Unit::JupiterMass | Unit::SolarMass => Dimension::Mass,

            Unit::ErgPerS | Unit::Watt | Unit::SolarLuminosity => Dimension::Power,
        }
    }

    /// Scale factor from this unit to its dimension's base unit
    pub fn to_base(&self) -> f64 {
        match self {
            Unit::Angstrom => 1e-8,
            Unit::Nanometer => 1e-7,
            Unit::Micron => 1e-4,
            Unit::Centimeter => 1.0,
            Unit::Meter => 100.0,
            Unit::JupiterRadius => CGS::JUPITER_RADIUS_CM,
            Unit::SolarRadius => CGS::SOLAR_RADIUS_CM,
            Unit::Parsec => CGS::PARSEC_CM,

            Unit::FlamCgs => 1.0,
            // 1 W m⁻² µm⁻¹ = 1e7 erg / 1e4 cm² / 1e4 Å
            Unit::WattPerM2Micron => 0.1,

            Unit::Jansky => 1.0,

            Unit::ErgPerSCm2 => 1.0,
            // 1 W m⁻² = 1e7 erg / 1e4 cm²
            Unit::WattPerM2 => 1e3,

            Unit::Second => 1.0,
            Unit::Year => 3.155_76e7,
            Unit::Megayear => 3.155_76e13,
            Unit::Gigayear => 3.155_76e16,

            Unit::Kelvin => 1.0,

            Unit::Milliarcsec => 1e-3,
            Unit::Arcsec => 1.0,
            Unit::Degree => 3600.0,

            Unit::Gram => 1.0,
            Unit::JupiterMass => CGS::JUPITER_MASS_G,
            Unit::SolarMass => CGS::SOLAR_MASS_G,

            Unit::ErgPerS => 1.0,
            Unit::Watt => 1e7,
            Unit::SolarLuminosity => CGS::SOLAR_LUMINOSITY,
        }
    }

    /// Convert a scalar from this unit to another unit of the same dimension
    pub fn convert(&self, value: f64, to: Unit) -> Result<f64, UnitError> {
        if self.dimension() != to.dimension() {
            return Err(UnitError::IncompatibleDimensions {
                from: *self,
                to,
                from_dim: self.dimension(),
                to_dim: to.dimension(),
            });
        }
        Ok(value * self.to_base() / to.to_base())
    }

    /// Parse a declared unit string as found in input files
    ///
    /// Accepts the common spellings used by the survey archives this
    /// pipeline ingests from ("um", "A", "erg/s/cm2/A", "Jy", ...).
    pub fn parse(text: &str) -> Result<Unit, UnitError> {
        let normalized = text.trim().to_lowercase();
        match normalized.as_str() {
            "a" | "aa" | "angstrom" | "angstroms" => Ok(Unit::Angstrom),
            "nm" | "nanometer" | "nanometers" => Ok(Unit::Nanometer),
            "um" | "micron" | "microns" | "micrometer" => Ok(Unit::Micron),
            "cm" => Ok(Unit::Centimeter),
            "m" | "meter" => Ok(Unit::Meter),
            "rjup" | "r_jup" => Ok(Unit::JupiterRadius),
            "rsun" | "r_sun" => Ok(Unit::SolarRadius),
            "pc" | "parsec" => Ok(Unit::Parsec),
            "erg/s/cm2/a" | "erg/s/cm^2/a" | "flam" => Ok(Unit::FlamCgs),
            "w/m2/um" => Ok(Unit::WattPerM2Micron),
            "jy" | "jansky" => Ok(Unit::Jansky),
            "erg/s/cm2" | "erg/s/cm^2" => Ok(Unit::ErgPerSCm2),
            "w/m2" => Ok(Unit::WattPerM2),
            "s" | "sec" => Ok(Unit::Second),
            "yr" => Ok(Unit::Year),
            "myr" => Ok(Unit::Megayear),
            "gyr" => Ok(Unit::Gigayear),
            "k" | "kelvin" => Ok(Unit::Kelvin),
            "mas" => Ok(Unit::Milliarcsec),
            "arcsec" => Ok(Unit::Arcsec),
            "deg" | "degree" => Ok(Unit::Degree),
            "g" | "gram" => Ok(Unit::Gram),
            "mjup" | "m_jup" => Ok(Unit::JupiterMass),
            "msun" | "m_sun" => Ok(Unit::SolarMass),
            "erg/s" => Ok(Unit::ErgPerS),
            "w" | "watt" => Ok(Unit::Watt),
            "lsun" | "l_sun" => Ok(Unit::SolarLuminosity),
            _ => Err(UnitError::UnknownUnit(text.to_string())),
        }
    }

    /// The display symbol of the unit
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Angstrom => "A",
            Unit::Nanometer => "nm",
            Unit::Micron => "um",
            Unit::Centimeter => "cm",
            Unit::Meter => "m",
            Unit::JupiterRadius => "R_Jup",
            Unit::SolarRadius => "R_Sun",
            Unit::Parsec => "pc",
            Unit::FlamCgs => "erg/s/cm2/A",
            Unit::WattPerM2Micron => "W/m2/um",
            Unit::Jansky => "Jy",
            Unit::ErgPerSCm2 => "erg/s/cm2",
            Unit::WattPerM2 => "W/m2",
            Unit::Second => "s",
            Unit::Year => "yr",
            Unit::Megayear => "Myr",
            Unit::Gigayear => "Gyr",
            Unit::Kelvin => "K",
            Unit::Milliarcsec => "mas",
            Unit::Arcsec => "arcsec",
            Unit::Degree => "deg",
            Unit::Gram => "g",
            Unit::JupiterMass => "M_Jup",
            Unit::SolarMass => "M_Sun",
            Unit::ErgPerS => "erg/s",
            Unit::Watt => "W",
            Unit::SolarLuminosity => "L_Sun",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// An immutable scalar tagged with its unit
#[derive(Debug, Clone, Copy)]
pub struct UnitValue {
    value: f64,
    unit: Unit,
}

/// Values compare equal when they represent the same physical quantity;
/// incompatible dimensions are simply unequal
impl PartialEq for UnitValue {
    fn eq(&self, other: &Self) -> bool {
        match other.value_in(self.unit) {
            Ok(v) => self.value == v,
            Err(_) => false,
        }
    }
}

impl UnitValue {
    /// Create a new tagged value
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// The numerical magnitude in this value's own unit
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The unit tag
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// The dimension of the value
    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    /// Return a new value expressed in `to`, failing on a dimension mismatch
    pub fn convert(&self, to: Unit) -> Result<UnitValue, UnitError> {
        Ok(UnitValue::new(self.unit.convert(self.value, to)?, to))
    }

    /// The magnitude expressed in `to`, failing on a dimension mismatch
    pub fn value_in(&self, to: Unit) -> Result<f64, UnitError> {
        self.unit.convert(self.value, to)
    }

    /// Dimension-checked addition; the result keeps `self`'s unit
    pub fn add(&self, other: &UnitValue) -> Result<UnitValue, UnitError> {
        let rhs = other.value_in(self.unit)?;
        Ok(UnitValue::new(self.value + rhs, self.unit))
    }

    /// Dimension-checked subtraction; the result keeps `self`'s unit
    pub fn sub(&self, other: &UnitValue) -> Result<UnitValue, UnitError> {
        let rhs = other.value_in(self.unit)?;
        Ok(UnitValue::new(self.value - rhs, self.unit))
    }

    /// Scale by a dimensionless factor
    pub fn scale(&self, factor: f64) -> UnitValue {
        UnitValue::new(self.value * factor, self.unit)
    }
}

impl fmt::Display for UnitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_length_conversions() {
        // Test micron to angstrom (wavelength scales)
        let wave = UnitValue::new(0.55, Unit::Micron);
        assert_relative_eq!(
            wave.value_in(Unit::Angstrom).unwrap(),
            5500.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            wave.value_in(Unit::Nanometer).unwrap(),
            550.0,
            epsilon = 1e-9
        );

        // Test parsec to centimeters (distance scales)
        let distance = UnitValue::new(10.0, Unit::Parsec);
        assert_relative_eq!(
            distance.value_in(Unit::Centimeter).unwrap(),
            3.0856775814913673e19,
            epsilon = 1e5
        );
    }

    #[rstest::rstest]
    #[case(Unit::Angstrom)]
    #[case(Unit::Nanometer)]
    #[case(Unit::Centimeter)]
    #[case(Unit::Meter)]
    #[case(Unit::Parsec)]
    fn test_round_trip_conversion(#[case] via: Unit) {
        let original = UnitValue::new(1.234, Unit::Micron);
        let back = original.convert(via).unwrap().convert(Unit::Micron).unwrap();
        assert_relative_eq!(back.value(), original.value(), max_relative = 1e-12);
        assert_eq!(back.unit(), Unit::Micron);
    }

    #[test]
    fn test_flux_density_conversion() {
        let flux = UnitValue::new(1.0, Unit::WattPerM2Micron);
        assert_relative_eq!(flux.value_in(Unit::FlamCgs).unwrap(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_incompatible_dimensions() {
        let wave = UnitValue::new(0.55, Unit::Micron);
        let result = wave.convert(Unit::FlamCgs);
        assert!(matches!(
            result,
            Err(UnitError::IncompatibleDimensions { .. })
        ));

        // F_nu never converts to F_lambda through the unit table
        let fnu = UnitValue::new(3631.0, Unit::Jansky);
        assert!(fnu.convert(Unit::FlamCgs).is_err());
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = UnitValue::new(1.0, Unit::Micron);
        let b = UnitValue::new(500.0, Unit::Nanometer);

        let sum = a.add(&b).unwrap();
        assert_relative_eq!(sum.value(), 1.5, epsilon = 1e-12);
        assert_eq!(sum.unit(), Unit::Micron);

        let diff = a.sub(&b).unwrap();
        assert_relative_eq!(diff.value(), 0.5, epsilon = 1e-12);

        let t = UnitValue::new(300.0, Unit::Kelvin);
        assert!(a.add(&t).is_err());
    }

    #[test]
    fn test_parse_unit_strings() {
        assert_eq!(Unit::parse("um").unwrap(), Unit::Micron);
        assert_eq!(Unit::parse(" Angstrom ").unwrap(), Unit::Angstrom);
        assert_eq!(Unit::parse("erg/s/cm2/A").unwrap(), Unit::FlamCgs);
        assert_eq!(Unit::parse("Jy").unwrap(), Unit::Jansky);
        assert_eq!(Unit::parse("Gyr").unwrap(), Unit::Gigayear);
        assert!(matches!(
            Unit::parse("furlongs"),
            Err(UnitError::UnknownUnit(_))
        ));
    }

    #[test]
    fn test_time_conversions() {
        let age = UnitValue::new(100.0, Unit::Megayear);
        assert_relative_eq!(age.value_in(Unit::Gigayear).unwrap(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_equality_across_units() {
        assert_eq!(
            UnitValue::new(1.0, Unit::Meter),
            UnitValue::new(100.0, Unit::Centimeter)
        );
        assert_ne!(
            UnitValue::new(1.0, Unit::Micron),
            UnitValue::new(1.0, Unit::Kelvin)
        );
    }
}
