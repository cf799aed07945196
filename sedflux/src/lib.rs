//! Flux-calibrated spectral energy distributions for single sources
//!
//! This crate assembles an SED from heterogeneous photometric and
//! spectroscopic measurements and derives fundamental parameters from it:
//! bolometric flux and luminosity, effective temperature, radius, mass,
//! and surface gravity.
//!
//! The pipeline, in dependency order:
//!
//! 1. [`photometry`] calibrates per-band magnitudes into flux densities,
//! 2. [`stitch`] collapses overlapping spectra into composites and
//!    renormalizes them against the photometry,
//! 3. [`tail`] closes the wavelength coverage with blackbody extensions,
//! 4. [`sed`] concatenates everything into one monotonic curve in the
//!    apparent and (with a distance) absolute frames,
//! 5. [`params`] and [`isochrone`] turn the integrated flux plus distance
//!    and age into the physical parameters.
//!
//! All of it hangs off the [`sed::Sed`] aggregate, which recomputes the
//! whole chain on demand whenever an input changes.

pub mod blackbody;
pub mod constants;
pub mod interp;
pub mod isochrone;
pub mod params;
pub mod photometry;
pub mod sed;
pub mod spectrum;
pub mod stitch;
pub mod tail;
pub mod units;

pub use constants::CGS;
pub use isochrone::{IsoParam, Isochrone, IsochroneError};
pub use params::{Estimate, ResultRow};
pub use photometry::{
    Bandpass, BandpassRegistry, PhotFrame, PhotometryEntry, PhotometryError, PhotometryTable,
};
pub use sed::{Age, Sed, SedError, SedState, SpectrumInput, SyntheticPhotometry};
pub use spectrum::{Spectrum, SpectrumError};
pub use units::{Dimension, Unit, UnitError, UnitValue};
