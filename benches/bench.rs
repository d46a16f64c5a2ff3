// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{path::PathBuf, str::FromStr};

use criterion::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

use ambiguity::{
    correlation::correlate,
    dataset::{IntensityArray, Observation, ReflectionDataset},
    resolve::{ReindexStrategy, ResolverContext, SelectiveBreeding},
    symmetry::{find_reindex_operators, CrystalSymmetry, LaueGroup, ReindexOperator, UnitCell},
};

fn p4() -> CrystalSymmetry {
    CrystalSymmetry::new(
        UnitCell::new([50.0, 50.0, 80.0, 90.0, 90.0, 90.0]).unwrap(),
        75,
    )
    .unwrap()
}

/// A dataset with random intensities for ~`completeness` of all reflections
/// with indices up to `max_index`, indexed with `op`.
fn dataset(
    laue_group: &LaueGroup,
    op: &ReindexOperator,
    max_index: i32,
    completeness: f64,
    rng: &mut StdRng,
) -> IntensityArray {
    let mut obs = vec![];
    for h in -max_index..=max_index {
        for k in -max_index..=max_index {
            for l in -max_index..=max_index {
                if [h, k, l] == [0, 0, 0] || rng.gen::<f64>() > completeness {
                    continue;
                }
                // Something that depends only on the unique reflection.
                let [a, b, c] = laue_group.map_to_asu([h, k, l]);
                let truth = ((a * 31 + b * 17 + c * 7) as f64).sin().abs() * 1000.0;
                obs.push(Observation {
                    hkl: op.apply([h, k, l]).unwrap(),
                    intensity: truth * (1.0 + 0.1 * rng.gen_range(-1.0..1.0)),
                    sigma: 10.0,
                });
            }
        }
    }
    IntensityArray::merge(obs, laue_group)
}

fn correlation(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let laue_group = p4().laue_group().unwrap();
    let identity = ReindexOperator::identity();
    let a = dataset(&laue_group, &identity, 20, 0.5, &mut rng);
    let b = dataset(&laue_group, &identity, 20, 0.5, &mut rng);

    c.bench_function("correlate", |bench| bench.iter(|| correlate(&a, &b)));
}

fn selective_breeding(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let symmetry = p4();
    let laue_group = symmetry.laue_group().unwrap();
    let twin = ReindexOperator::from_str("k,h,-l").unwrap();
    let datasets: Vec<ReflectionDataset> = (0..20)
        .map(|id| {
            let op = if id % 3 == 1 {
                twin
            } else {
                ReindexOperator::identity()
            };
            let data = dataset(&laue_group, &op, 10, 0.3, &mut rng);
            let resolution = data.resolution_range(&symmetry.cell).unwrap();
            ReflectionDataset {
                id,
                path: PathBuf::from(format!("{id}.HKL")),
                symmetry,
                data,
                resolution,
            }
        })
        .collect();
    let operators = find_reindex_operators(&symmetry, 3.0).unwrap();

    let mut group = c.benchmark_group("selective breeding");
    for nproc in [1, 4] {
        let ctx = ResolverContext::new(&datasets, laue_group.clone(), operators.clone(), nproc)
            .unwrap();
        let strategy = SelectiveBreeding::default();
        group.bench_with_input(BenchmarkId::new("20 datasets", nproc), &ctx, |b, ctx| {
            b.iter(|| strategy.assign_operators(ctx).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, correlation, selective_breeding);
criterion_main!(benches);
