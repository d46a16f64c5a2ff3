// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests: synthetic datasets and XDS_ASCII files.

use std::{fs::File, io::Write, path::Path};

use rand::{rngs::StdRng, Rng};
use rand_distr::{Exp1, StandardNormal};

use crate::{
    dataset::{IntensityArray, Observation},
    symmetry::{CrystalSymmetry, LaueGroup, ReindexOperator, UnitCell},
};

/// A tetragonal (P4) symmetry; data with this symmetry have a twofold
/// indexing ambiguity ("k,h,-l").
pub(crate) fn p4_symmetry() -> CrystalSymmetry {
    CrystalSymmetry::new(
        UnitCell::new([50.0, 50.0, 80.0, 90.0, 90.0, 90.0]).unwrap(),
        75,
    )
    .unwrap()
}

/// "True" intensities for all unique reflections with indices up to
/// `max_index` in magnitude. Intensities follow an exponential (acentric
/// Wilson) distribution.
pub(crate) fn random_truth(
    laue_group: &LaueGroup,
    max_index: i32,
    rng: &mut StdRng,
) -> IntensityArray {
    let mut obs = vec![];
    for h in -max_index..=max_index {
        for k in -max_index..=max_index {
            for l in -max_index..=max_index {
                if [h, k, l] == [0, 0, 0] {
                    continue;
                }
                obs.push([h, k, l]);
            }
        }
    }
    // Merge first so that every unique reflection gets a single value.
    let unique = IntensityArray::merge(
        obs.into_iter().map(|hkl| Observation {
            hkl,
            intensity: 0.0,
            sigma: 0.0,
        }),
        laue_group,
    );
    IntensityArray::merge(
        unique.iter().map(|o| {
            let u: f64 = rng.sample(Exp1);
            Observation {
                intensity: u * 1000.0,
                sigma: 10.0,
                ..o
            }
        }),
        laue_group,
    )
}

/// Simulate a measurement of `truth` indexed with `op`: every reflection's
/// indices are transformed with `op`, a fraction `completeness` of the
/// reflections is kept and relative Gaussian noise is added.
pub(crate) fn observe(
    truth: &IntensityArray,
    op: &ReindexOperator,
    completeness: f64,
    noise: f64,
    rng: &mut StdRng,
) -> Vec<Observation> {
    truth
        .iter()
        .filter_map(|o| {
            if rng.gen::<f64>() > completeness {
                return None;
            }
            let hkl = op.apply(o.hkl)?;
            let gaussian: f64 = rng.sample(StandardNormal);
            let intensity = o.intensity * (1.0 + noise * gaussian);
            Some(Observation {
                hkl,
                intensity,
                sigma: o.sigma,
            })
        })
        .collect()
}

/// Write a minimal (but valid) XDS_ASCII file. Each record has the items H,
/// K, L, IOBS, SIGMA(IOBS), XD and YD.
pub(crate) fn write_xds_ascii(path: &Path, symmetry: &CrystalSymmetry, obs: &[Observation]) {
    let mut f = File::create(path).unwrap();
    let p = symmetry.cell.parameters();
    writeln!(f, "!FORMAT=XDS_ASCII    MERGE=FALSE    FRIEDEL'S_LAW=TRUE").unwrap();
    writeln!(f, "!OUTPUT_FILE=XDS_ASCII.HKL        DATE=16-Oct-2026").unwrap();
    writeln!(f, "!SPACE_GROUP_NUMBER={:5}", symmetry.space_group).unwrap();
    writeln!(
        f,
        "!UNIT_CELL_CONSTANTS={:10.3}{:10.3}{:10.3}{:8.3}{:8.3}{:8.3}",
        p[0], p[1], p[2], p[3], p[4], p[5]
    )
    .unwrap();
    writeln!(f, "!NUMBER_OF_ITEMS_IN_EACH_DATA_RECORD=7").unwrap();
    for (i, item) in ["H", "K", "L", "IOBS", "SIGMA(IOBS)", "XD", "YD"]
        .iter()
        .enumerate()
    {
        writeln!(f, "!ITEM_{item}={}", i + 1).unwrap();
    }
    writeln!(f, "!END_OF_HEADER").unwrap();
    for (i, o) in obs.iter().enumerate() {
        writeln!(
            f,
            "{:6}{:6}{:6} {:10.3E} {:10.3E} {:7.1} {:7.1}",
            o.hkl[0],
            o.hkl[1],
            o.hkl[2],
            o.intensity,
            o.sigma,
            (i % 2000) as f64,
            (i / 2000) as f64
        )
        .unwrap();
    }
    writeln!(f, "!END_OF_DATA").unwrap();
}
