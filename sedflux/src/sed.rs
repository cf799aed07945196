//! The SED aggregate and its recompute-on-demand state machine
//!
//! `Sed` owns every input for one target (photometry, spectra, distance,
//! age, radius, evolutionary models, unit choices) and every derived
//! product (stitched composites, tails, assembled curves, fundamental
//! parameters). Mutating any input atomically drops all derived state back
//! to `Uncalculated`; reading any parameter runs the full pipeline again if
//! needed. There is no partial recomputation path.

use std::path::Path;

use log::{debug, info, warn};
use thiserror::Error;

use crate::isochrone::{evaluate_models, IsoParam, Isochrone};
use crate::params::{
    absolute_bolometric_magnitude, apparent_bolometric_magnitude, bolometric_flux,
    bolometric_luminosity, effective_temperature, luminosity_solar, Estimate, ResultRow,
};
use crate::photometry::{
    BandpassRegistry, PhotFrame, PhotometryError, PhotometryTable,
};
use crate::spectrum::{Spectrum, SpectrumError};
use crate::stitch::stitch_spectra;
use crate::tail::{rayleigh_jeans_tail, wien_tail};
use crate::units::{Dimension, Unit, UnitValue};

/// Errors that can occur building an SED
#[derive(Debug, Error)]
pub enum SedError {
    #[error("Cannot make the SED without spectra or photometry")]
    NoData,

    #[error("{0} is not a {1:?} unit")]
    WrongDimension(Unit, Dimension),

    #[error(transparent)]
    Spectrum(#[from] SpectrumError),

    #[error(transparent)]
    Photometry(#[from] PhotometryError),

    #[error(transparent)]
    Unit(#[from] crate::units::UnitError),
}

/// Pipeline progress for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SedState {
    Uncalculated,
    CalibratingPhotometry,
    CalibratingSpectra,
    Assembling,
    Integrating,
    Calculated,
}

/// A target age with (possibly asymmetric) uncertainty, stored in Gyr
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Age {
    value_gyr: f64,
    lower_gyr: f64,
    upper_gyr: f64,
}

impl Age {
    /// Symmetric age uncertainty
    pub fn new(value_gyr: f64, unc_gyr: f64) -> Self {
        Self {
            value_gyr,
            lower_gyr: unc_gyr,
            upper_gyr: unc_gyr,
        }
    }

    /// Asymmetric age uncertainty
    pub fn asymmetric(value_gyr: f64, lower_gyr: f64, upper_gyr: f64) -> Self {
        Self {
            value_gyr,
            lower_gyr,
            upper_gyr,
        }
    }

    /// Build from tagged values in any time unit
    pub fn from_units(value: UnitValue, unc: UnitValue) -> Result<Self, crate::units::UnitError> {
        Ok(Self::new(
            value.value_in(Unit::Gigayear)?,
            unc.value_in(Unit::Gigayear)?,
        ))
    }

    pub fn value_gyr(&self) -> f64 {
        self.value_gyr
    }

    /// The [min, max] age window in Gyr
    pub fn range_gyr(&self) -> (f64, f64) {
        (
            (self.value_gyr - self.lower_gyr).max(0.0),
            self.value_gyr + self.upper_gyr,
        )
    }
}

/// A spectrum arriving at the ingestion boundary, before normalization to
/// the canonical `Spectrum` type
pub enum SpectrumInput {
    /// Already canonical
    Spectrum(Spectrum),
    /// Raw columns with declared units
    Arrays {
        wave: Vec<f64>,
        flux: Vec<f64>,
        unc: Vec<f64>,
        wave_unit: Unit,
        flux_unit: Unit,
    },
    /// Raw F_ν columns in Janskys
    FnuArrays {
        wave: Vec<f64>,
        fnu_jy: Vec<f64>,
        unc_jy: Vec<f64>,
        wave_unit: Unit,
    },
    /// An ASCII file with declared unit strings
    File {
        path: std::path::PathBuf,
        wave_unit: String,
        flux_unit: String,
    },
}

/// Synthetic photometry of one stitched composite through one bandpass
#[derive(Debug, Clone)]
pub struct SyntheticPhotometry {
    pub band: String,
    /// Effective wavelength in microns
    pub eff_wave: f64,
    pub flux: f64,
    pub unc: f64,
}

/// The SED aggregate for a single target
pub struct Sed {
    name: String,
    registry: BandpassRegistry,

    wave_unit: Unit,
    flux_unit: Unit,
    /// V-band extinction toward the target
    reddening: f64,

    photometry: PhotometryTable,
    spectra: Vec<Spectrum>,
    /// Distance in parsecs
    distance: Option<(f64, f64)>,
    /// Parallax in milliarcseconds
    parallax: Option<(f64, f64)>,
    age: Option<Age>,
    /// Radius in Jupiter radii
    radius: Option<Estimate>,
    /// True when `radius` came from the isochrones rather than the caller
    isochrone_radius: bool,
    evo_models: Vec<Isochrone>,

    state: SedState,

    stitched: Vec<Spectrum>,
    synthetic_photometry: Vec<SyntheticPhotometry>,
    wien: Option<Spectrum>,
    rj: Option<Spectrum>,
    app_spec_sed: Option<Spectrum>,
    abs_spec_sed: Option<Spectrum>,
    app_phot_sed: Option<Spectrum>,
    abs_phot_sed: Option<Spectrum>,
    app_sed: Option<Spectrum>,
    abs_sed: Option<Spectrum>,

    fbol: Option<Estimate>,
    mbol: Option<Estimate>,
    mbol_abs: Option<Estimate>,
    lbol: Option<Estimate>,
    lbol_sun: Option<Estimate>,
    teff: Option<Estimate>,
    teff_evo: Option<Estimate>,
    logg: Option<Estimate>,
    mass: Option<Estimate>,
}

impl Sed {
    /// Create an empty SED using the built-in bandpass registry
    pub fn new(name: &str) -> Self {
        Self::with_registry(name, BandpassRegistry::builtin().clone())
    }

    /// Create an empty SED with an injected bandpass registry
    pub fn with_registry(name: &str, registry: BandpassRegistry) -> Self {
        Self {
            name: name.to_string(),
            registry,
            wave_unit: Unit::Micron,
            flux_unit: Unit::FlamCgs,
            reddening: 0.0,
            photometry: PhotometryTable::new(),
            spectra: Vec::new(),
            distance: None,
            parallax: None,
            age: None,
            radius: None,
            isochrone_radius: false,
            evo_models: Vec::new(),
            state: SedState::Uncalculated,
            stitched: Vec::new(),
            synthetic_photometry: Vec::new(),
            wien: None,
            rj: None,
            app_spec_sed: None,
            abs_spec_sed: None,
            app_phot_sed: None,
            abs_phot_sed: None,
            app_sed: None,
            abs_sed: None,
            fbol: None,
            mbol: None,
            mbol_abs: None,
            lbol: None,
            lbol_sun: None,
            teff: None,
            teff_evo: None,
            logg: None,
            mass: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SedState {
        self.state
    }

    /// Drop every derived product; all of them at once, never partially
    fn invalidate(&mut self) {
        self.state = SedState::Uncalculated;
        self.stitched.clear();
        self.synthetic_photometry.clear();
        self.wien = None;
        self.rj = None;
        self.app_spec_sed = None;
        self.abs_spec_sed = None;
        self.app_phot_sed = None;
        self.abs_phot_sed = None;
        self.app_sed = None;
        self.abs_sed = None;
        self.fbol = None;
        self.mbol = None;
        self.mbol_abs = None;
        self.lbol = None;
        self.lbol_sun = None;
        self.teff = None;
        self.teff_evo = None;
        self.logg = None;
        self.mass = None;
    }

    // ------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------

    /// Add a photometric measurement by band name.
    ///
    /// A duplicate band replaces the earlier entry. Unknown bands fail
    /// with `PhotometryError::UnknownBand`.
    pub fn add_photometry(
        &mut self,
        band: &str,
        mag: f64,
        mag_unc: Option<f64>,
    ) -> Result<(), SedError> {
        self.photometry
            .add_band(&self.registry, band, mag, mag_unc, self.reddening)?;
        self.invalidate();
        Ok(())
    }

    /// Load photometry from an ASCII table (columns
    /// `band magnitude uncertainty`); unknown bands are skipped with a
    /// warning. Returns the number of measurements added.
    pub fn add_photometry_file(&mut self, path: &Path) -> Result<usize, SedError> {
        let added = self
            .photometry
            .add_file(path, &self.registry, self.reddening)?;
        self.invalidate();
        Ok(added)
    }

    /// Remove one band; returns true if it was present
    pub fn drop_photometry(&mut self, band: &str) -> bool {
        let dropped = self.photometry.drop_band(band);
        if dropped {
            self.invalidate();
        }
        dropped
    }

    /// Add a spectrum in any accepted input form.
    ///
    /// The input is normalized to the canonical `Spectrum` type and
    /// converted to the SED's units immediately; downstream stages never
    /// see the raw form.
    pub fn add_spectrum(&mut self, input: SpectrumInput) -> Result<(), SedError> {
        let spec = match input {
            SpectrumInput::Spectrum(spec) => spec,
            SpectrumInput::Arrays {
                wave,
                flux,
                unc,
                wave_unit,
                flux_unit,
            } => Spectrum::new(wave, flux, unc, wave_unit, flux_unit)?,
            SpectrumInput::FnuArrays {
                wave,
                fnu_jy,
                unc_jy,
                wave_unit,
            } => Spectrum::from_fnu(wave, fnu_jy, unc_jy, wave_unit)?,
            SpectrumInput::File {
                path,
                wave_unit,
                flux_unit,
            } => {
                let wave_unit = Unit::parse(&wave_unit)?;
                let flux_unit = Unit::parse(&flux_unit)?;
                if flux_unit == Unit::Jansky {
                    let spec = Spectrum::from_file(&path, wave_unit, Unit::FlamCgs)?;
                    // Columns were F_ν; redo the conversion wavelength-aware
                    Spectrum::from_fnu(
                        spec.wave().to_vec(),
                        spec.flux().to_vec(),
                        spec.unc().to_vec(),
                        wave_unit,
                    )?
                } else {
                    Spectrum::from_file(&path, wave_unit, flux_unit)?
                }
            }
        };

        let spec = spec
            .convert_wave(self.wave_unit)?
            .convert_flux(self.flux_unit)?;
        self.spectra.push(spec);
        self.invalidate();
        Ok(())
    }

    /// Remove a spectrum by index; returns true if it existed
    pub fn drop_spectrum(&mut self, idx: usize) -> bool {
        if idx >= self.spectra.len() {
            return false;
        }
        self.spectra.remove(idx);
        self.invalidate();
        true
    }

    /// Set or clear the distance in parsecs; the parallax follows.
    ///
    /// Clearing it also clears a radius that came from the isochrones
    /// (a caller-supplied radius survives).
    pub fn set_distance(&mut self, distance_pc: Option<(f64, f64)>) {
        match distance_pc {
            Some((d, d_unc)) => {
                self.distance = Some((d, d_unc));
                // π [mas] = 1000 / d [pc]
                self.parallax = Some((1000.0 / d, 1000.0 * d_unc / (d * d)));
                info!("{}: distance set to {:.3} ± {:.3} pc", self.name, d, d_unc);
            }
            None => {
                self.distance = None;
                self.parallax = None;
                if self.isochrone_radius {
                    self.radius = None;
                    self.isochrone_radius = false;
                }
            }
        }
        self.invalidate();
    }

    /// Set or clear the parallax in milliarcseconds; the distance follows
    pub fn set_parallax(&mut self, parallax_mas: Option<(f64, f64)>) {
        match parallax_mas {
            Some((pi, pi_unc)) => {
                let d = 1000.0 / pi;
                let d_unc = 1000.0 * pi_unc / (pi * pi);
                self.parallax = Some((pi, pi_unc));
                self.distance = Some((d, d_unc));
                self.invalidate();
            }
            None => self.set_distance(None),
        }
    }

    pub fn distance(&self) -> Option<(f64, f64)> {
        self.distance
    }

    pub fn parallax(&self) -> Option<(f64, f64)> {
        self.parallax
    }

    pub fn set_age(&mut self, age: Option<Age>) {
        self.age = age;
        self.invalidate();
    }

    pub fn age(&self) -> Option<Age> {
        self.age
    }

    /// Supply the radius in Jupiter radii, bypassing the isochrone radius
    pub fn set_radius(&mut self, radius_rjup: Option<(f64, f64)>) {
        self.radius = radius_rjup.map(|(r, u)| Estimate::new(r, Some(u)));
        self.isochrone_radius = false;
        self.invalidate();
    }

    pub fn radius(&self) -> Option<Estimate> {
        self.radius
    }

    /// Set the V-band extinction toward the target
    pub fn set_reddening(&mut self, a_v: f64) {
        self.reddening = a_v;
        self.invalidate();
    }

    /// Attach the evolutionary model grids used for parameter inversion.
    /// Several model families may be given; their envelopes are combined.
    pub fn set_evo_models(&mut self, models: Vec<Isochrone>) {
        self.evo_models = models;
        self.invalidate();
    }

    /// Change the wavelength unit of the stored spectra and output curves
    pub fn set_wave_units(&mut self, unit: Unit) -> Result<(), SedError> {
        if unit.dimension() != Dimension::Length {
            return Err(SedError::WrongDimension(unit, Dimension::Length));
        }
        let converted: Result<Vec<Spectrum>, SpectrumError> =
            self.spectra.iter().map(|s| s.convert_wave(unit)).collect();
        self.spectra = converted?;
        self.wave_unit = unit;
        self.invalidate();
        Ok(())
    }

    /// Change the flux density unit of the stored spectra and output curves
    pub fn set_flux_units(&mut self, unit: Unit) -> Result<(), SedError> {
        if unit.dimension() != Dimension::FluxDensity {
            return Err(SedError::WrongDimension(unit, Dimension::FluxDensity));
        }
        let converted: Result<Vec<Spectrum>, SpectrumError> =
            self.spectra.iter().map(|s| s.convert_flux(unit)).collect();
        self.spectra = converted?;
        self.flux_unit = unit;
        self.invalidate();
        Ok(())
    }

    pub fn photometry(&self) -> &PhotometryTable {
        &self.photometry
    }

    pub fn spectra(&self) -> &[Spectrum] {
        &self.spectra
    }

    // ------------------------------------------------------------------
    // The pipeline
    // ------------------------------------------------------------------

    /// Run the full pipeline: calibrate photometry, stitch and calibrate
    /// spectra, synthesize tails, assemble the curves, and integrate the
    /// fundamental parameters. Re-runs the tails once if the isochrones
    /// produce a temperature estimate.
    pub fn make_sed(&mut self) -> Result<(), SedError> {
        if self.photometry.is_empty() && self.spectra.is_empty() {
            return Err(SedError::NoData);
        }
        self.invalidate();

        self.calibrate_photometry();
        self.calibrate_spectra()?;
        self.assemble(None)?;
        self.integrate();

        // One refinement pass: the isochrone temperature gives the tails a
        // real blackbody shape
        if let Some(teff_evo) = self.teff_evo {
            debug!(
                "{}: refining tails with isochrone Teff = {:.0} K",
                self.name, teff_evo.value
            );
            let teff = (teff_evo.value, teff_evo.unc.unwrap_or(100.0));
            self.assemble(Some(teff))?;
            self.integrate();
        }

        self.state = SedState::Calculated;
        Ok(())
    }

    fn calibrate_photometry(&mut self) {
        self.state = SedState::CalibratingPhotometry;

        self.photometry.calibrate(self.distance, self.reddening);
        self.app_phot_sed = self.photometry.to_spectrum(PhotFrame::Apparent);
        self.abs_phot_sed = match self.distance {
            Some(_) => self.photometry.to_spectrum(PhotFrame::Absolute),
            None => None,
        };
    }

    fn calibrate_spectra(&mut self) -> Result<(), SedError> {
        self.state = SedState::CalibratingSpectra;

        let photometry = if self.photometry.is_empty() {
            None
        } else {
            Some(&self.photometry)
        };
        self.stitched = stitch_spectra(&self.spectra, photometry)?;

        // Synthetic photometry of every composite through every band
        self.synthetic_photometry.clear();
        for composite in &self.stitched {
            for bandpass in self.registry.iter() {
                if let Some((flux, unc)) = composite.synthetic_flux(bandpass) {
                    self.synthetic_photometry.push(SyntheticPhotometry {
                        band: bandpass.name().to_string(),
                        eff_wave: bandpass.eff_wave(),
                        flux,
                        unc,
                    });
                }
            }
        }
        self.synthetic_photometry
            .sort_by(|a, b| a.eff_wave.partial_cmp(&b.eff_wave).unwrap());

        // The spectral SED is the concatenation of the (non-overlapping)
        // composites
        self.app_spec_sed = match self.stitched.len() {
            0 => None,
            _ => Some(concat_spectra(&self.stitched, self.wave_unit, self.flux_unit)?),
        };
        self.abs_spec_sed = match (&self.app_spec_sed, self.distance) {
            (Some(spec), Some(d)) => Some(spec.flux_calibrate(d)),
            _ => None,
        };
        Ok(())
    }

    /// Build the spec+phot piece, the tails, and the full curves
    fn assemble(&mut self, tail_teff: Option<(f64, f64)>) -> Result<(), SedError> {
        self.state = SedState::Assembling;

        // Photometric points strictly inside any stitched composite's span
        // are dropped: spectra take precedence where they cover
        let residual_phot = self.residual_photometry();

        let mut pieces: Vec<Spectrum> = Vec::new();
        if let Some(spec) = &self.app_spec_sed {
            pieces.push(spec.clone());
        }
        if let Some(phot) = residual_phot {
            pieces.push(phot);
        }

        if pieces.is_empty() {
            return Err(SedError::NoData);
        }

        // The tail synthesizer works in microns, like the photometry table
        let spec_for_tails = match &self.app_spec_sed {
            Some(spec) => Some(
                spec.convert_wave(Unit::Micron)?
                    .convert_flux(Unit::FlamCgs)?,
            ),
            None => None,
        };
        self.wien = wien_tail(tail_teff, spec_for_tails.as_ref(), &self.photometry);
        self.rj = rayleigh_jeans_tail(tail_teff, spec_for_tails.as_ref(), &self.photometry);

        if let Some(wien) = &self.wien {
            pieces.push(wien.clone());
        }
        if let Some(rj) = &self.rj {
            pieces.push(rj.clone());
        }

        let app_sed = concat_spectra(&pieces, self.wave_unit, self.flux_unit)?;
        self.abs_sed = self.distance.map(|d| app_sed.flux_calibrate(d));
        self.app_sed = Some(app_sed);
        Ok(())
    }

    /// The photometric points not covered by any stitched spectrum
    fn residual_photometry(&self) -> Option<Spectrum> {
        let spans: Vec<(f64, f64)> = self
            .stitched
            .iter()
            .map(|s| {
                let f = s.wave_unit().convert(1.0, Unit::Micron).unwrap_or(1.0);
                (s.min_wave() * f, s.max_wave() * f)
            })
            .collect();

        let mut wave = Vec::new();
        let mut flux = Vec::new();
        let mut unc = Vec::new();
        for entry in self.photometry.iter() {
            if !(entry.app_flux.is_finite()
                && entry.app_flux > 0.0
                && entry.app_flux_unc.is_finite()
                && entry.app_flux_unc > 0.0)
            {
                continue;
            }
            let covered = spans
                .iter()
                .any(|&(lo, hi)| entry.eff_wave > lo && entry.eff_wave < hi);
            if !covered {
                wave.push(entry.eff_wave);
                flux.push(entry.app_flux);
                unc.push(entry.app_flux_unc);
            }
        }

        Spectrum::new(wave, flux, unc, Unit::Micron, Unit::FlamCgs).ok()
    }

    /// Integrate the assembled SED and derive every parameter the inputs
    /// allow
    fn integrate(&mut self) {
        self.state = SedState::Integrating;

        let Some(app_sed) = &self.app_sed else {
            return;
        };

        let fbol = bolometric_flux(app_sed);
        let mbol = apparent_bolometric_magnitude(&fbol);
        self.fbol = Some(fbol);
        self.mbol = Some(mbol);

        if let Some(distance) = self.distance {
            let lbol = bolometric_luminosity(&fbol, distance);
            self.lbol_sun = Some(luminosity_solar(&lbol));
            self.lbol = Some(lbol);
            self.mbol_abs = Some(absolute_bolometric_magnitude(&mbol, distance));
        }

        self.params_from_isochrones();

        // Stefan-Boltzmann needs both the luminosity and a radius
        self.teff = match (&self.lbol, &self.radius) {
            (Some(lbol), Some(radius)) => Some(effective_temperature(lbol, radius)),
            _ => None,
        };
    }

    /// Interpolate radius, logg, mass, and Teff from the evolutionary
    /// models, when age and a luminosity with uncertainty are available
    fn params_from_isochrones(&mut self) {
        let (Some(age), Some(lbol_sun)) = (self.age, self.lbol_sun) else {
            return;
        };
        let Some(lbol_unc) = lbol_sun.unc else {
            warn!(
                "{}: Lbol has no uncertainty; skipping radius, logg, mass, and Teff from isochrones",
                self.name
            );
            return;
        };
        if self.evo_models.is_empty() {
            return;
        }

        let lbol = (lbol_sun.value, lbol_unc);
        let age_range = age.range_gyr();

        // A caller-supplied radius wins over the isochrone radius
        if self.radius.is_none() || self.isochrone_radius {
            if let Some((r, r_unc)) =
                evaluate_models(&self.evo_models, lbol, age_range, IsoParam::Radius)
            {
                self.radius = Some(Estimate::new(r, Some(r_unc)));
                self.isochrone_radius = true;
            }
        }

        self.logg = evaluate_models(&self.evo_models, lbol, age_range, IsoParam::Logg)
            .map(|(v, u)| Estimate::new(v, Some(u)));
        self.mass = evaluate_models(&self.evo_models, lbol, age_range, IsoParam::Mass)
            .map(|(v, u)| Estimate::new(v, Some(u)));
        self.teff_evo = evaluate_models(&self.evo_models, lbol, age_range, IsoParam::Teff)
            .map(|(v, u)| Estimate::new(v, Some(u)));
    }

    /// Run the pipeline if any input changed since the last run
    fn ensure_calculated(&mut self) -> Result<(), SedError> {
        if self.state != SedState::Calculated {
            self.make_sed()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Derived products (each triggers a recompute when needed)
    // ------------------------------------------------------------------

    /// Apparent bolometric flux, erg s⁻¹ cm⁻²
    pub fn fbol(&mut self) -> Option<Estimate> {
        self.ensure_calculated().ok()?;
        self.fbol
    }

    /// Apparent bolometric magnitude
    pub fn mbol(&mut self) -> Option<Estimate> {
        self.ensure_calculated().ok()?;
        self.mbol
    }

    /// Absolute bolometric magnitude (needs distance)
    pub fn mbol_abs(&mut self) -> Option<Estimate> {
        self.ensure_calculated().ok()?;
        self.mbol_abs
    }

    /// Bolometric luminosity, erg s⁻¹ (needs distance)
    pub fn lbol(&mut self) -> Option<Estimate> {
        self.ensure_calculated().ok()?;
        self.lbol
    }

    /// log10(Lbol / Lsun) (needs distance)
    pub fn lbol_sun(&mut self) -> Option<Estimate> {
        self.ensure_calculated().ok()?;
        self.lbol_sun
    }

    /// Effective temperature in Kelvin (needs distance and radius)
    pub fn teff(&mut self) -> Option<Estimate> {
        self.ensure_calculated().ok()?;
        self.teff
    }

    /// Isochrone effective temperature in Kelvin (needs age and models)
    pub fn teff_evo(&mut self) -> Option<Estimate> {
        self.ensure_calculated().ok()?;
        self.teff_evo
    }

    /// log10 surface gravity (needs distance, age, and models)
    pub fn logg(&mut self) -> Option<Estimate> {
        self.ensure_calculated().ok()?;
        self.logg
    }

    /// Mass in Jupiter masses (needs distance, age, and models)
    pub fn mass(&mut self) -> Option<Estimate> {
        self.ensure_calculated().ok()?;
        self.mass
    }

    /// Radius in Jupiter radii, caller-supplied or isochrone-derived
    pub fn radius_estimate(&mut self) -> Option<Estimate> {
        self.ensure_calculated().ok()?;
        self.radius
    }

    /// The full apparent SED
    pub fn app_sed(&mut self) -> Option<&Spectrum> {
        self.ensure_calculated().ok()?;
        self.app_sed.as_ref()
    }

    /// The full absolute SED (needs distance)
    pub fn abs_sed(&mut self) -> Option<&Spectrum> {
        self.ensure_calculated().ok()?;
        self.abs_sed.as_ref()
    }

    /// The stitched spectral SED in the apparent frame
    pub fn app_spec_sed(&mut self) -> Option<&Spectrum> {
        self.ensure_calculated().ok()?;
        self.app_spec_sed.as_ref()
    }

    /// The stitched spectral SED in the absolute frame (needs distance)
    pub fn abs_spec_sed(&mut self) -> Option<&Spectrum> {
        self.ensure_calculated().ok()?;
        self.abs_spec_sed.as_ref()
    }

    /// The photometric SED in the apparent frame
    pub fn app_phot_sed(&mut self) -> Option<&Spectrum> {
        self.ensure_calculated().ok()?;
        self.app_phot_sed.as_ref()
    }

    /// The photometric SED in the absolute frame (needs distance)
    pub fn abs_phot_sed(&mut self) -> Option<&Spectrum> {
        self.ensure_calculated().ok()?;
        self.abs_phot_sed.as_ref()
    }

    /// The Wien tail after trimming
    pub fn wien_tail(&mut self) -> Option<&Spectrum> {
        self.ensure_calculated().ok()?;
        self.wien.as_ref()
    }

    /// The Rayleigh-Jeans tail after trimming
    pub fn rj_tail(&mut self) -> Option<&Spectrum> {
        self.ensure_calculated().ok()?;
        self.rj.as_ref()
    }

    /// Synthetic photometry of the stitched composites
    pub fn synthetic_photometry(&mut self) -> &[SyntheticPhotometry] {
        let _ = self.ensure_calculated();
        &self.synthetic_photometry
    }

    /// All derivable parameters as a results table; parameters whose
    /// prerequisites are missing are simply absent
    pub fn results(&mut self) -> Result<Vec<ResultRow>, SedError> {
        self.ensure_calculated()?;

        let mut rows = Vec::new();
        let mut push = |param: &'static str, est: Option<Estimate>, unit: &'static str| {
            if let Some(est) = est {
                rows.push(ResultRow {
                    param,
                    value: est.value,
                    unc: est.unc,
                    unit,
                });
            }
        };

        push("fbol", self.fbol, "erg/s/cm2");
        push("mbol", self.mbol, "mag");
        push("Mbol", self.mbol_abs, "mag");
        push("Lbol", self.lbol, "erg/s");
        push("Lbol_sun", self.lbol_sun, "log(L/Lsun)");
        push(
            "distance",
            self.distance.map(|(d, u)| Estimate::new(d, Some(u))),
            "pc",
        );
        push("radius", self.radius, "R_Jup");
        push("mass", self.mass, "M_Jup");
        push("logg", self.logg, "log(cm/s2)");
        push("Teff", self.teff, "K");
        push("Teff_evo", self.teff_evo, "K");

        Ok(rows)
    }
}

/// Concatenate SED pieces into one finalized curve: collect every sample,
/// sort by wavelength, scrub NaN/non-positive fluxes, and drop duplicate
/// wavelengths. The pieces are assumed disjoint in coverage; fluxes are
/// never added here.
fn concat_spectra(
    pieces: &[Spectrum],
    wave_unit: Unit,
    flux_unit: Unit,
) -> Result<Spectrum, SpectrumError> {
    let mut wave = Vec::new();
    let mut flux = Vec::new();
    let mut unc = Vec::new();

    for piece in pieces {
        let piece = piece.convert_wave(wave_unit)?.convert_flux(flux_unit)?;
        wave.extend(piece.wave().iter());
        flux.extend(piece.flux().iter());
        unc.extend(piece.unc().iter());
    }

    Spectrum::new(wave, flux, unc, wave_unit, flux_unit)
}
