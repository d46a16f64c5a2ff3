// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

use approx::assert_abs_diff_eq;
use rand::{rngs::StdRng, SeedableRng};
use tempfile::TempDir;

use super::*;
use crate::{
    symmetry::{LaueClass, LaueGroup},
    tests::{observe, p4_symmetry, random_truth, write_xds_ascii},
};

fn obs(hkl: Hkl, intensity: f64, sigma: f64) -> Observation {
    Observation {
        hkl,
        intensity,
        sigma,
    }
}

fn default_options() -> LoadOptions {
    LoadOptions {
        d_min: 3.0,
        min_ios: None,
        from_p1: false,
    }
}

#[test]
fn test_merge_friedel_pairs() {
    let p1 = LaueGroup::new(LaueClass::Triclinic);
    let merged = IntensityArray::merge(
        [
            obs([1, 2, 3], 10.0, 3.0),
            obs([-1, -2, -3], 20.0, 4.0),
            obs([0, 0, 1], 5.0, 1.0),
        ],
        &p1,
    );
    assert_eq!(merged.len(), 2);
    // Sorted by Miller index.
    assert_eq!(merged.hkls(), [[0, 0, 1], [1, 2, 3]]);
    assert_abs_diff_eq!(merged.intensities()[1], 15.0);
    // sqrt(3² + 4²) / 2
    assert_abs_diff_eq!(merged.sigmas()[1], 2.5);
}

#[test]
fn test_merge_uses_the_laue_group() {
    let p4 = LaueGroup::new(LaueClass::Tetragonal);
    let merged = IntensityArray::merge(
        [
            obs([1, 2, 3], 10.0, 1.0),
            obs([-2, 1, 3], 12.0, 1.0),
            obs([2, 1, -3], 100.0, 1.0),
        ],
        &p4,
    );
    // (1,2,3) and (-2,1,3) are related by the fourfold; (2,1,-3) isn't
    // related to either in 4/m.
    assert_eq!(merged.len(), 2);
    let mut intensities = merged.intensities().to_vec();
    intensities.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(intensities, [11.0, 100.0]);

    let p422 = LaueGroup::new(LaueClass::TetragonalHolohedral);
    let merged = IntensityArray::merge(merged.iter(), &p422);
    assert_eq!(merged.len(), 1);
}

#[test]
fn test_reindex() {
    let p4 = LaueGroup::new(LaueClass::Tetragonal);
    let array = IntensityArray::merge(
        [obs([1, 2, 3], 10.0, 1.0), obs([3, 0, 1], 20.0, 1.0)],
        &p4,
    );
    let op = ReindexOperator::from_str("k,h,-l").unwrap();
    let reindexed = array.reindex(&op, &p4);
    assert_eq!(reindexed.len(), 2);
    assert_ne!(reindexed.hkls(), array.hkls());
    // The operator is its own inverse (modulo the Laue group).
    assert_eq!(reindexed.reindex(&op, &p4), array);
    assert_eq!(array.reindex(&ReindexOperator::identity(), &p4), array);
}

#[test]
fn test_resolution_filter_and_range() {
    let cell = UnitCell::new([10.0, 10.0, 10.0, 90.0, 90.0, 90.0]).unwrap();
    let p1 = LaueGroup::new(LaueClass::Triclinic);
    let array = IntensityArray::merge(
        [
            obs([1, 0, 0], 1.0, 1.0),
            obs([2, 0, 0], 1.0, 1.0),
            obs([4, 0, 0], 1.0, 1.0),
        ],
        &p1,
    );
    let (d_max, d_min) = array.resolution_range(&cell).unwrap();
    assert_abs_diff_eq!(d_max, 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(d_min, 2.5, epsilon = 1e-9);

    let filtered = array.resolution_filter(&cell, 3.0);
    assert_eq!(filtered.hkls(), [[1, 0, 0], [2, 0, 0]]);
    assert!(IntensityArray::default().resolution_range(&cell).is_none());
}

#[test]
fn test_load_datasets() {
    let dir = TempDir::new().unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let sym = p4_symmetry();
    let laue = sym.laue_group().unwrap();
    let truth = random_truth(&laue, 8, &mut rng);

    let good1 = dir.path().join("good1.HKL");
    let good2 = dir.path().join("good2.HKL");
    let empty = dir.path().join("empty.HKL");
    let garbage = dir.path().join("garbage.HKL");
    let identity = ReindexOperator::identity();
    write_xds_ascii(&good1, &sym, &observe(&truth, &identity, 0.8, 0.05, &mut rng));
    write_xds_ascii(&good2, &sym, &observe(&truth, &identity, 0.8, 0.05, &mut rng));
    write_xds_ascii(&empty, &sym, &[]);
    std::fs::write(&garbage, "this isn't XDS_ASCII\n").unwrap();

    let paths = vec![good1.clone(), empty.clone(), garbage.clone(), good2.clone()];
    let loaded = load_datasets(&paths, &default_options()).unwrap();
    assert_eq!(loaded.datasets.len(), 2);
    assert_eq!(loaded.datasets[0].id, 0);
    assert_eq!(loaded.datasets[0].path, good1);
    assert_eq!(loaded.datasets[1].id, 1);
    assert_eq!(loaded.datasets[1].path, good2);
    assert_eq!(loaded.bad_files.len(), 2);
    assert_eq!(loaded.bad_files[0].path, empty);
    assert_eq!(loaded.bad_files[1].path, garbage);
    assert_eq!(loaded.symmetry.space_group, 75);
    assert!(loaded.to_p1.is_none());

    for dataset in loaded.datasets.iter() {
        assert!(dataset.data.len() > 100);
        assert!(dataset.resolution.1 >= 3.0);
    }
}

#[test]
fn test_load_filters() {
    let dir = TempDir::new().unwrap();
    let sym = p4_symmetry();
    let path = dir.path().join("data.HKL");
    write_xds_ascii(
        &path,
        &sym,
        &[
            obs([1, 0, 0], 100.0, 10.0),
            obs([0, 2, 1], 100.0, 50.0),
            // Rejected.
            obs([2, 3, 1], 100.0, -1.0),
            // Too high resolution (d = 2.5 Å).
            obs([20, 0, 0], 100.0, 10.0),
            obs([0, 0, 4], 50.0, 1.0),
        ],
    );
    let loaded = load_datasets(&[path.clone()], &default_options()).unwrap();
    assert_eq!(loaded.datasets[0].data.len(), 3);

    let options = LoadOptions {
        min_ios: Some(5.0),
        ..default_options()
    };
    let loaded = load_datasets(&[path], &options).unwrap();
    // (0,2,1) has I/σ = 2.
    assert_eq!(loaded.datasets[0].data.len(), 2);
}

#[test]
fn test_load_nothing_good() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.HKL");
    write_xds_ascii(&path, &p4_symmetry(), &[obs([1, 0, 0], 1.0, 1.0)]);
    let result = load_datasets(&[path], &default_options());
    assert!(matches!(result, Err(LoadError::NoGoodFiles { num_bad: 1 })));

    assert!(matches!(
        load_datasets(&[], &default_options()),
        Err(LoadError::NoFiles)
    ));
}

#[test]
fn test_load_from_p1() {
    let dir = TempDir::new().unwrap();
    let mut rng = StdRng::seed_from_u64(2);
    // A C-centred orthorhombic cell.
    let sym = CrystalSymmetry::new(
        UnitCell::new([40.0, 60.0, 70.0, 90.0, 90.0, 90.0]).unwrap(),
        21,
    )
    .unwrap();
    let laue = sym.laue_group().unwrap();
    // Only reflections allowed by C centring (h + k even).
    let truth = random_truth(&laue, 8, &mut rng);
    let allowed: Vec<Observation> = truth
        .iter()
        .filter(|o| (o.hkl[0] + o.hkl[1]) % 2 == 0)
        .collect();
    let path = dir.path().join("c.HKL");
    write_xds_ascii(&path, &sym, &allowed);

    let options = LoadOptions {
        from_p1: true,
        ..default_options()
    };
    let loaded = load_datasets(&[path], &options).unwrap();
    assert_eq!(loaded.symmetry.space_group, 1);
    assert_abs_diff_eq!(
        loaded.symmetry.cell.volume(),
        sym.cell.volume() / 2.0,
        epsilon = 1e-3
    );
    let to_p1 = loaded.to_p1.unwrap();
    assert_abs_diff_eq!(to_p1.determinant().abs(), 0.5, epsilon = 1e-12);

    let dataset = &loaded.datasets[0];
    assert_eq!(dataset.symmetry.space_group, 1);
    // Nothing is lost going to the primitive cell.
    let in_mmm = IntensityArray::merge(allowed.iter().copied(), &laue)
        .resolution_filter(&sym.cell, 3.0)
        .len();
    assert_eq!(dataset.data.len(), in_mmm);
}

#[test]
fn test_bad_files_are_reported_in_input_order() {
    let dir = TempDir::new().unwrap();
    let mut rng = StdRng::seed_from_u64(4);
    let sym = CrystalSymmetry::new(
        UnitCell::new([40.0, 60.0, 70.0, 90.0, 90.0, 90.0]).unwrap(),
        21,
    )
    .unwrap();
    let laue = sym.laue_group().unwrap();
    let truth = random_truth(&laue, 8, &mut rng);
    let (allowed, forbidden): (Vec<Observation>, Vec<Observation>) = truth
        .iter()
        .partition(|o| (o.hkl[0] + o.hkl[1]) % 2 == 0);

    // Reads fine as C-centred, but none of its reflections survive the
    // change to the primitive cell.
    let absent = dir.path().join("absent.HKL");
    let garbage = dir.path().join("garbage.HKL");
    let good = dir.path().join("good.HKL");
    write_xds_ascii(&absent, &sym, &forbidden);
    std::fs::write(&garbage, "this isn't XDS_ASCII\n").unwrap();
    write_xds_ascii(&good, &sym, &allowed);

    let options = LoadOptions {
        from_p1: true,
        ..default_options()
    };
    let paths = vec![absent.clone(), garbage.clone(), good.clone()];
    let loaded = load_datasets(&paths, &options).unwrap();
    assert_eq!(loaded.datasets.len(), 1);
    assert_eq!(loaded.datasets[0].path, good);
    let bad: Vec<&PathBuf> = loaded.bad_files.iter().map(|b| &b.path).collect();
    assert_eq!(bad, [&absent, &garbage]);
    assert!(loaded.bad_files[0].reason.contains("unique reflection"));
}
