// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! "Algorithm 2" of Brehm & Diederichs (2014), generalised to any number of
//! operators.
//!
//! Every (dataset, operator) pair is a point. Points are embedded in a
//! low-dimensional space such that the dot products of their vectors
//! reproduce the correlations between them. Points in the same indexing frame
//! then point in the same direction, and every dataset is given the operator
//! whose point is closest in direction to the consensus of all datasets.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, trace, warn};
use ndarray::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::{prelude::*, ThreadPool};

use super::{build_thread_pool, Assignment, ReindexStrategy, ResolveError, ResolverContext};
use crate::{
    constants::{BD_CONVERGENCE, BD_MAX_SWEEPS, DEFAULT_SEED},
    correlation::correlate,
    dataset::{IntensityArray, Observation},
    math::solve_dense,
    symmetry::{LaueGroup, OperatorList},
};

/// An observation and the id of the dataset it came from.
pub type TaggedObservation = (usize, Observation);

pub struct BrehmDiederichs {
    seed: u64,
}

impl BrehmDiederichs {
    /// `seed` seeds the random starting coordinates of the embedding.
    pub fn new(seed: u64) -> BrehmDiederichs {
        BrehmDiederichs { seed }
    }

    /// Partition a pool of reflections from many datasets, each tagged with
    /// the id of its dataset. For every non-identity operator that was given
    /// to at least one dataset, the ids of those datasets are returned;
    /// datasets that aren't mentioned keep their indexing.
    pub fn partition_pool(
        &self,
        reflections: &[TaggedObservation],
        laue_group: &LaueGroup,
        operators: &OperatorList,
        nproc: usize,
    ) -> Result<BTreeMap<usize, BTreeSet<usize>>, ResolveError> {
        let mut by_tag: BTreeMap<usize, Vec<Observation>> = BTreeMap::new();
        for &(tag, obs) in reflections {
            by_tag.entry(tag).or_default().push(obs);
        }
        if by_tag.is_empty() {
            return Err(ResolveError::NoDatasets);
        }
        let thread_pool = build_thread_pool(nproc)?;

        let (tags, observations): (Vec<usize>, Vec<Vec<Observation>>) =
            by_tag.into_iter().unzip();
        let reindexed: Vec<Vec<IntensityArray>> = thread_pool.install(|| {
            observations
                .into_par_iter()
                .map(|obs| {
                    let merged = IntensityArray::merge(obs, laue_group);
                    operators
                        .iter()
                        .map(|op| merged.reindex(op, laue_group))
                        .collect()
                })
                .collect()
        });

        let assignment = self.solve(&reindexed, operators.len(), &thread_pool);
        let mut groups: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
        for (&tag, &j) in tags.iter().zip(assignment.operator_indices.iter()) {
            if j != 0 {
                groups.entry(j).or_default().insert(tag);
            }
        }
        for &i in &assignment.undetermined {
            warn!("Dataset {} has no usable correlations; keeping its indexing", tags[i]);
        }
        Ok(groups)
    }

    /// Assign operators to datasets that have already been reindexed by
    /// every operator (indexed `[dataset][operator]`).
    fn solve(
        &self,
        reindexed: &[Vec<IntensityArray>],
        num_ops: usize,
        thread_pool: &ThreadPool,
    ) -> Assignment {
        let num_datasets = reindexed.len();
        if num_ops < 2 || num_datasets < 2 {
            debug!("Nothing to resolve");
            return Assignment::identity(num_datasets);
        }

        let (r, w) = thread_pool.install(|| correlation_matrix(reindexed, num_ops));
        debug!(
            "{} of {} correlations between {} points are defined",
            w.iter().filter(|&&v| v > 0.0).count() / 2,
            (num_datasets * num_ops) * (num_datasets - 1) * num_ops / 2,
            num_datasets * num_ops
        );

        let dim = num_ops.max(2);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let (x, sweeps, embedded) = embed(&r, &w, dim, &mut rng);
        if embedded {
            info!("Embedding converged after {sweeps} sweep(s)");
        } else {
            warn!("Embedding did not converge within {sweeps} sweeps; using the last coordinates");
        }

        let (operator_indices, undetermined, stable) = partition(&x, num_datasets, num_ops);
        Assignment {
            operator_indices,
            converged: embedded && stable,
            cycles: sweeps,
            undetermined,
        }
    }
}

impl Default for BrehmDiederichs {
    fn default() -> Self {
        BrehmDiederichs::new(DEFAULT_SEED)
    }
}

/// Pairwise correlations of all points. Point `p` is dataset `p / num_ops`
/// reindexed by operator `p % num_ops`. Correlations between points of the
/// same dataset, and undefined correlations, have a weight of 0.
fn correlation_matrix(
    reindexed: &[Vec<IntensityArray>],
    num_ops: usize,
) -> (Array2<f64>, Array2<f64>) {
    let num_points = reindexed.len() * num_ops;
    let rows: Vec<Vec<(usize, f64)>> = (0..num_points)
        .into_par_iter()
        .map(|p| {
            let (i, a) = (p / num_ops, p % num_ops);
            ((p + 1)..num_points)
                .filter(|q| q / num_ops != i)
                .filter_map(|q| {
                    let (k, b) = (q / num_ops, q % num_ops);
                    correlate(&reindexed[i][a], &reindexed[k][b]).map(|cc| (q, cc))
                })
                .collect()
        })
        .collect();

    let mut r = Array2::zeros((num_points, num_points));
    let mut w = Array2::zeros((num_points, num_points));
    for (p, row) in rows.into_iter().enumerate() {
        for (q, cc) in row {
            r[(p, q)] = cc;
            r[(q, p)] = cc;
            w[(p, q)] = 1.0;
            w[(q, p)] = 1.0;
        }
    }
    (r, w)
}

/// Find coordinates `x` (one row per point) minimising
/// `Σ w_pq (r_pq - x_p·x_q)²` with Gauss-Seidel sweeps: each point's vector is
/// in turn replaced by its least-squares solution with all others fixed.
/// Returns the coordinates, the number of sweeps and whether the largest
/// coordinate change fell below the convergence threshold.
fn embed(
    r: &Array2<f64>,
    w: &Array2<f64>,
    dim: usize,
    rng: &mut StdRng,
) -> (Array2<f64>, usize, bool) {
    let num_points = r.len_of(Axis(0));
    let mut x: Array2<f64> = Array2::from_shape_fn((num_points, dim), |_| rng.gen_range(-1.0..1.0));

    for sweep in 1..=BD_MAX_SWEEPS {
        let mut max_change: f64 = 0.0;
        for p in 0..num_points {
            let mut a = Array2::<f64>::zeros((dim, dim));
            let mut b = Array1::<f64>::zeros(dim);
            for q in 0..num_points {
                let weight = w[(p, q)];
                if weight == 0.0 {
                    continue;
                }
                let xq = x.row(q);
                b.scaled_add(weight * r[(p, q)], &xq);
                let xq = xq.insert_axis(Axis(1));
                a.scaled_add(weight, &xq.dot(&xq.t()));
            }
            // A tiny ridge keeps poorly-connected points solvable.
            let ridge = 1e-9 * a.diag().sum().max(1e-12);
            a.diag_mut().mapv_inplace(|v| v + ridge);

            if let Some(new) = solve_dense(&a, &b) {
                for (s, v) in new.into_iter().enumerate() {
                    max_change = max_change.max((v - x[(p, s)]).abs());
                    x[(p, s)] = v;
                }
            }
        }
        trace!("Embedding sweep {sweep}: largest change {max_change:e}");
        if max_change < BD_CONVERGENCE {
            return (x, sweep, true);
        }
    }
    (x, BD_MAX_SWEEPS, false)
}

fn cosine(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Option<f64> {
    let norms = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if norms > 1e-12 {
        Some(a.dot(&b) / norms)
    } else {
        None
    }
}

/// Give every dataset the operator whose point is closest in direction to the
/// consensus. The consensus starts as the sum of the identity points, and is
/// then the sum of the chosen points, until the choice stops changing.
fn partition(
    x: &Array2<f64>,
    num_datasets: usize,
    num_ops: usize,
) -> (Vec<usize>, Vec<usize>, bool) {
    let mut chosen = vec![0; num_datasets];
    let mut undetermined = vec![];

    for iteration in 1..=BD_MAX_SWEEPS {
        let mut consensus = Array1::<f64>::zeros(x.len_of(Axis(1)));
        for (i, &j) in chosen.iter().enumerate() {
            consensus += &x.row(i * num_ops + j);
        }

        undetermined.clear();
        let mut next = chosen.clone();
        for (i, new) in next.iter_mut().enumerate() {
            let scores: Vec<Option<f64>> = (0..num_ops)
                .map(|j| cosine(x.row(i * num_ops + j), consensus.view()))
                .collect();
            match super::best_index(&scores) {
                Some(j) => *new = j,
                None => undetermined.push(i),
            }
        }

        let stable = next == chosen;
        chosen = next;
        if stable {
            trace!("Partition stable after {iteration} iteration(s)");
            return (chosen, undetermined, true);
        }
    }
    (chosen, undetermined, false)
}

impl ReindexStrategy for BrehmDiederichs {
    fn name(&self) -> &'static str {
        "Brehm & Diederichs"
    }

    fn citation(&self) -> Option<&'static str> {
        Some(
            "Brehm, W. and Diederichs, K. Breaking the indexing ambiguity in serial crystallography.
 Acta Cryst. (2014). D70, 101-109
 https://doi.org/10.1107/S1399004713025431",
        )
    }

    fn assign_operators(&self, ctx: &ResolverContext) -> Result<Assignment, ResolveError> {
        let num_datasets = ctx.num_datasets();
        let num_ops = ctx.operators().len();
        if !ctx.operators().is_ambiguous() || num_datasets < 2 {
            debug!("Nothing to resolve");
            return Ok(Assignment::identity(num_datasets));
        }

        let pool = ctx.thread_pool()?;
        let reindexed = ctx.reindex_all(&pool);
        let assignment = self.solve(&reindexed, num_ops, &pool);
        for &i in &assignment.undetermined {
            warn!(
                "{} has no usable correlations; keeping its indexing",
                ctx.datasets()[i].path.display()
            );
        }
        Ok(assignment)
    }
}
