//! Grouping and stitching of overlapping spectra
//!
//! Spectra that share wavelength coverage carry redundant information about
//! the same source; each overlap group is collapsed into one composite
//! spectrum before the SED is assembled, and every composite is then
//! renormalized against the observed photometry.

use log::{debug, warn};

use crate::photometry::PhotometryTable;
use crate::spectrum::{Spectrum, SpectrumError};

/// Partition spectra into groups with transitively overlapping wavelength
/// coverage.
///
/// Two spectra belong together when their [min, max] wavelength intervals
/// intersect; overlap is chained, so A-B overlap plus B-C overlap puts all
/// three in one group even if A and C never touch. Returns index groups
/// ordered by each group's shortest wavelength.
pub fn group_spectra(spectra: &[Spectrum]) -> Vec<Vec<usize>> {
    let n = spectra.len();

    // Compare coverage in a common wavelength scale
    let ranges: Vec<(f64, f64)> = spectra
        .iter()
        .map(|s| {
            let um = crate::units::Unit::Micron;
            let factor = s.wave_unit().convert(1.0, um).unwrap_or(1.0);
            (s.min_wave() * factor, s.max_wave() * factor)
        })
        .collect();

    let overlaps =
        |a: (f64, f64), b: (f64, f64)| -> bool { a.0 <= b.1 && b.0 <= a.1 };

    let mut assigned = vec![false; n];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for seed in 0..n {
        if assigned[seed] {
            continue;
        }
        let mut group = vec![seed];
        assigned[seed] = true;

        // Breadth-first chaining so overlap is transitive
        let mut cursor = 0;
        while cursor < group.len() {
            let current = group[cursor];
            for candidate in 0..n {
                if !assigned[candidate] && overlaps(ranges[current], ranges[candidate]) {
                    assigned[candidate] = true;
                    group.push(candidate);
                }
            }
            cursor += 1;
        }

        groups.push(group);
    }

    groups.sort_by(|a, b| {
        let wa = a.iter().map(|&i| ranges[i].0).fold(f64::INFINITY, f64::min);
        let wb = b.iter().map(|&i| ranges[i].0).fold(f64::INFINITY, f64::min);
        wa.partial_cmp(&wb).unwrap()
    });
    groups
}

/// Collapse a list of spectra into non-overlapping composites and
/// renormalize each against the photometry.
///
/// Exact duplicate spectra (identical wavelength and flux columns) are
/// dropped first so repeated ingestion of the same observation cannot
/// double the flux. Each overlap group is folded left-to-right with
/// `Spectrum::add`; folding order does not change the result. With
/// photometry available every composite is independently scaled by the
/// weighted least-squares fit; with none it is left at its native scale.
pub fn stitch_spectra(
    spectra: &[Spectrum],
    photometry: Option<&PhotometryTable>,
) -> Result<Vec<Spectrum>, SpectrumError> {
    if spectra.is_empty() {
        return Ok(Vec::new());
    }

    // Deduplicate identical observations
    let mut unique: Vec<&Spectrum> = Vec::new();
    for spec in spectra {
        let duplicate = unique
            .iter()
            .any(|u| u.wave() == spec.wave() && u.flux() == spec.flux());
        if duplicate {
            warn!("Dropping duplicate spectrum covering {:?} um", spec.range());
        } else {
            unique.push(spec);
        }
    }

    let owned: Vec<Spectrum> = unique.into_iter().cloned().collect();
    let groups = group_spectra(&owned);
    debug!(
        "Stitching {} spectra into {} composite(s)",
        owned.len(),
        groups.len()
    );

    let mut composites = Vec::with_capacity(groups.len());
    for group in groups {
        let mut composite = owned[group[0]].clone();
        for &idx in &group[1..] {
            composite = composite.add(&owned[idx])?;
        }

        let composite = match photometry {
            Some(table) if !table.is_empty() => composite.norm_to_photometry(table),
            _ => composite,
        };
        composites.push(composite);
    }

    Ok(composites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::BandpassRegistry;
    use crate::units::Unit;
    use approx::assert_relative_eq;

    fn flat(lo: f64, hi: f64, flux: f64, n: usize) -> Spectrum {
        let wave = crate::interp::linspace(lo, hi, n);
        Spectrum::new(
            wave,
            vec![flux; n],
            vec![flux * 0.01; n],
            Unit::Micron,
            Unit::FlamCgs,
        )
        .unwrap()
    }

    #[test]
    fn test_grouping_transitivity() {
        // A overlaps B, B overlaps C, A and C are disjoint
        let a = flat(1.0, 1.5, 1.0, 20);
        let b = flat(1.4, 2.1, 1.0, 20);
        let c = flat(2.0, 2.5, 1.0, 20);

        let groups = group_spectra(&[a, b, c]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_grouping_disjoint() {
        let a = flat(1.0, 1.5, 1.0, 20);
        let b = flat(2.0, 2.5, 1.0, 20);
        let c = flat(3.0, 3.5, 1.0, 20);

        let groups = group_spectra(&[c, a, b]);
        assert_eq!(groups.len(), 3);
        // Groups come back ordered by wavelength
        assert_eq!(groups[0], vec![1]);
    }

    #[test]
    fn test_grouping_mixed_units() {
        let a = flat(1.0, 1.5, 1.0, 20);
        let b = flat(1.4, 2.0, 1.0, 20).convert_wave(Unit::Angstrom).unwrap();

        let groups = group_spectra(&[a, b]);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_stitch_idempotence_with_duplicate() {
        // Stitching a spectrum with its own duplicate must reproduce the
        // original, not double it
        let spec = flat(1.0, 2.0, 3.0, 50);
        let composites = stitch_spectra(&[spec.clone(), spec.clone()], None).unwrap();

        assert_eq!(composites.len(), 1);
        assert_eq!(composites[0].len(), spec.len());
        for (a, b) in composites[0].flux().iter().zip(spec.flux().iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_stitch_chain_produces_one_composite() {
        let a = flat(1.0, 1.5, 1.0, 30);
        let b = flat(1.4, 2.1, 1.0, 30);
        let c = flat(2.0, 2.5, 1.0, 30);

        let composites = stitch_spectra(&[a, b, c], None).unwrap();
        assert_eq!(composites.len(), 1);
        assert_relative_eq!(composites[0].min_wave(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(composites[0].max_wave(), 2.5, epsilon = 1e-10);
    }

    #[test]
    fn test_stitch_disjoint_spectra_stay_separate() {
        let a = flat(0.5, 0.9, 1.0, 30);
        let b = flat(2.0, 2.5, 1.0, 30);

        let composites = stitch_spectra(&[b, a], None).unwrap();
        assert_eq!(composites.len(), 2);
        assert!(composites[0].max_wave() < composites[1].min_wave());
    }

    #[test]
    fn test_stitch_renormalizes_to_photometry() {
        let registry = BandpassRegistry::builtin();
        let mut table = crate::photometry::PhotometryTable::new();
        // Magnitude whose V-band flux is the Johnson.V zero point
        table
            .add_band(registry, "Johnson.V", 0.0, Some(0.05), 0.0)
            .unwrap();

        // Spectrum covering V at the wrong scale
        let spec = flat(0.4, 0.8, 1.0, 200);
        let composites = stitch_spectra(&[spec], Some(&table)).unwrap();

        let scaled = composites[0].flux_at(0.55);
        assert_relative_eq!(scaled, 3.63e-9, max_relative = 1e-3);
    }
}
