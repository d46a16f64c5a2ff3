// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Kabsch's "selective breeding": iteratively give every dataset the operator
//! that agrees best with all other datasets.
//!
//! A cycle normally scores every dataset against the assignment of the
//! previous cycle. Simultaneous updates like this can flip whole groups of
//! datasets back and forth forever, so as soon as a cycle reproduces an
//! assignment that was already seen, the remaining cycles update the datasets
//! one after the other instead, each against the latest assignment of the
//! others.

use std::collections::HashSet;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, trace, warn};
use rayon::{prelude::*, ThreadPool};

use super::{best_index, format_scores, Assignment, ReindexStrategy, ResolveError, ResolverContext};
use crate::{
    constants::DEFAULT_MAX_CYCLES, correlation::correlate, dataset::IntensityArray, PROGRESS_BARS,
};

/// How the datasets are updated within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sweep {
    /// Every dataset is scored against the previous cycle's assignment.
    Frozen,

    /// Datasets are scored in order; dataset `i` sees the new operators of
    /// datasets `0..i`.
    Sequential,
}

pub struct SelectiveBreeding {
    max_cycles: usize,
}

impl SelectiveBreeding {
    pub fn new(max_cycles: usize) -> SelectiveBreeding {
        SelectiveBreeding { max_cycles }
    }

    pub fn max_cycles(&self) -> usize {
        self.max_cycles
    }

    /// Run the iteration with an arbitrary scoring function. `score(i, j,
    /// basis)` is the score of dataset `i` under operator `j`, given the
    /// operators of all datasets in `basis`. `None` means the score is
    /// undefined.
    ///
    /// The scores of one dataset are evaluated in parallel, always against an
    /// assignment that nothing writes to in the meantime, so the result
    /// doesn't depend on the number of threads.
    pub(crate) fn breed<F>(
        &self,
        num_datasets: usize,
        num_operators: usize,
        pool: &ThreadPool,
        score: F,
    ) -> Assignment
    where
        F: Fn(usize, usize, &[usize]) -> Option<f64> + Sync,
    {
        let mut current = vec![0; num_datasets];
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut mode = Sweep::Frozen;
        let mut undetermined = vec![];

        for cycle in 1..=self.max_cycles {
            seen.insert(current.clone());

            let pb = ProgressBar::with_draw_target(
                Some(num_datasets as _),
                if PROGRESS_BARS.load() {
                    ProgressDrawTarget::stdout()
                } else {
                    ProgressDrawTarget::hidden()
                },
            )
            .with_style(
                ProgressStyle::default_bar()
                    .template("{msg}: [{wide_bar:.blue}] {pos:3}/{len:3} datasets ({elapsed_precise}<{eta_precise})")
                    .unwrap()
                    .progress_chars("=> "),
            )
            .with_position(0)
            .with_message(format!("Cycle {cycle:3}"));

            let (mut next, mut skipped) =
                sweep(mode, &current, num_operators, pool, &score, &pb, cycle);
            if mode == Sweep::Frozen && next != current && seen.contains(&next) {
                debug!(
                    "Cycle {cycle}: the assignment is oscillating; updating datasets one at a time from now on"
                );
                mode = Sweep::Sequential;
                pb.set_position(0);
                (next, skipped) = sweep(mode, &current, num_operators, pool, &score, &pb, cycle);
            }
            pb.finish_and_clear();
            undetermined = skipped;

            let num_changed = current.iter().zip(next.iter()).filter(|(a, b)| a != b).count();
            debug!("Cycle {cycle}: {num_changed} dataset(s) changed operator");
            trace!("  old: {current:?}");
            trace!("  new: {next:?}");
            current = next;

            if num_changed == 0 {
                info!("Selective breeding converged after {cycle} cycle(s)");
                return Assignment {
                    operator_indices: current,
                    converged: true,
                    cycles: cycle,
                    undetermined,
                };
            }
        }

        warn!(
            "Selective breeding did not converge within {} cycles; using the last assignment",
            self.max_cycles
        );
        Assignment {
            operator_indices: current,
            converged: false,
            cycles: self.max_cycles,
            undetermined,
        }
    }
}

/// One pass over all datasets. Returns the new assignment and the datasets
/// whose scores were all undefined; those keep their operator.
fn sweep<F>(
    mode: Sweep,
    previous: &[usize],
    num_operators: usize,
    pool: &ThreadPool,
    score: &F,
    pb: &ProgressBar,
    cycle: usize,
) -> (Vec<usize>, Vec<usize>)
where
    F: Fn(usize, usize, &[usize]) -> Option<f64> + Sync,
{
    let mut next = previous.to_vec();
    let mut undetermined = vec![];
    for i in 0..previous.len() {
        let basis = match mode {
            Sweep::Frozen => previous,
            Sweep::Sequential => next.as_slice(),
        };
        let scores: Vec<Option<f64>> = pool.install(|| {
            (0..num_operators)
                .into_par_iter()
                .map(|j| score(i, j, basis))
                .collect()
        });
        trace!("cycle {cycle} dataset {i}: {}", format_scores(&scores));

        match best_index(&scores) {
            Some(j) => next[i] = j,
            None => undetermined.push(i),
        }
        pb.inc(1);
    }
    (next, undetermined)
}

impl Default for SelectiveBreeding {
    fn default() -> Self {
        SelectiveBreeding::new(DEFAULT_MAX_CYCLES)
    }
}

/// The mean of the defined correlations of dataset `i` reindexed by operator
/// `j` with every other dataset reindexed by its operator in `basis`.
fn mean_correlation(
    reindexed: &[Vec<IntensityArray>],
    i: usize,
    j: usize,
    basis: &[usize],
) -> Option<f64> {
    let this = &reindexed[i][j];
    let ccs: Vec<f64> = (0..reindexed.len())
        .into_par_iter()
        .filter(|&k| k != i)
        .filter_map(|k| correlate(this, &reindexed[k][basis[k]]))
        .collect();
    if ccs.is_empty() {
        None
    } else {
        Some(ccs.iter().sum::<f64>() / ccs.len() as f64)
    }
}

impl ReindexStrategy for SelectiveBreeding {
    fn name(&self) -> &'static str {
        "selective breeding"
    }

    fn citation(&self) -> Option<&'static str> {
        Some(
            "Kabsch, W. Processing of X-ray snapshots from crystals in random orientations.
 Acta Cryst. (2014). D70, 2204-2216
 https://doi.org/10.1107/S1399004714013534",
        )
    }

    fn assign_operators(&self, ctx: &ResolverContext) -> Result<Assignment, ResolveError> {
        let num_datasets = ctx.num_datasets();
        if !ctx.operators().is_ambiguous() || num_datasets < 2 {
            debug!("Nothing to resolve");
            return Ok(Assignment::identity(num_datasets));
        }

        let pool = ctx.thread_pool()?;
        let reindexed = ctx.reindex_all(&pool);
        let mut assignment =
            self.breed(num_datasets, ctx.operators().len(), &pool, |i, j, basis| {
                mean_correlation(&reindexed, i, j, basis)
            });
        for &i in &assignment.undetermined {
            warn!(
                "{} can't be correlated with any other dataset; keeping its indexing",
                ctx.datasets()[i].path.display()
            );
        }

        // Only the relative indexing is determined; keep the first dataset's.
        if assignment.operator_indices[0] != 0 {
            match assignment.relative_to(0, ctx.operators(), ctx.laue_group()) {
                Some(indices) => {
                    debug!(
                        "Expressing the assignment in the indexing of {}",
                        ctx.datasets()[0].path.display()
                    );
                    assignment.operator_indices = indices;
                }
                None => warn!(
                    "The operators aren't closed under composition; {} will be reindexed",
                    ctx.datasets()[0].path.display()
                ),
            }
        }
        Ok(assignment)
    }
}
