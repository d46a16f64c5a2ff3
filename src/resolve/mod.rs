// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Strategies for choosing, for every dataset, the reindexing operator that
//! puts it into a common indexing frame.
//!
//! All strategies work with a [`ResolverContext`], which holds the datasets,
//! the candidate operators and the Laue group used to compare reindexed data.
//! A strategy returns an [`Assignment`]: one index into the operator list per
//! dataset.

mod brehm_diederichs;
mod error;
mod reference;
mod selective_breeding;

pub use brehm_diederichs::{BrehmDiederichs, TaggedObservation};
pub use error::ResolveError;
pub use reference::ReferenceBased;
pub use selective_breeding::SelectiveBreeding;

use itertools::Itertools;
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    dataset::{IntensityArray, ReflectionDataset},
    symmetry::{LaueGroup, OperatorList, ReindexOperator},
};

/// The available resolution strategies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Correlate every dataset with reference intensities.
    #[strum(serialize = "reference")]
    Reference,

    /// Kabsch's "selective breeding".
    #[default]
    #[strum(serialize = "selective-breeding")]
    SelectiveBreeding,

    /// Brehm & Diederichs' "algorithm 2".
    #[strum(serialize = "brehm-diederichs")]
    BrehmDiederichs,
}

/// Something that can choose a reindexing operator for every dataset.
pub trait ReindexStrategy {
    fn name(&self) -> &'static str;

    /// The publication to cite when using this strategy, if any.
    fn citation(&self) -> Option<&'static str> {
        None
    }

    fn assign_operators(&self, ctx: &ResolverContext) -> Result<Assignment, ResolveError>;
}

/// The result of a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// For each dataset, the index of its operator in the operator list.
    pub operator_indices: Vec<usize>,

    /// Did the strategy settle on this assignment? Single-pass strategies are
    /// always converged.
    pub converged: bool,

    /// The number of iterations (cycles, sweeps) that were run.
    pub cycles: usize,

    /// Datasets whose operator couldn't be determined because none of their
    /// correlations were defined. These keep their previous (initially
    /// identity) operator.
    pub undetermined: Vec<usize>,
}

impl Assignment {
    /// Every dataset gets the identity.
    pub(crate) fn identity(num_datasets: usize) -> Assignment {
        Assignment {
            operator_indices: vec![0; num_datasets],
            converged: true,
            cycles: 0,
            undetermined: vec![],
        }
    }

    /// The operator assigned to dataset `i`.
    pub fn operator<'a>(&self, i: usize, operators: &'a OperatorList) -> &'a ReindexOperator {
        &operators[self.operator_indices[i]]
    }

    /// The same assignment, expressed in the indexing of dataset `anchor`
    /// (whose operator becomes the identity). Every operator `op` becomes the
    /// member of `operators` equivalent to `a⁻¹ op` modulo `laue_group`, where
    /// `a` is the anchor's operator. `None` if one of these has no
    /// equivalent, which can happen for user-supplied operators.
    pub(crate) fn relative_to(
        &self,
        anchor: usize,
        operators: &OperatorList,
        laue_group: &LaueGroup,
    ) -> Option<Vec<usize>> {
        let anchor_inverse = operators[self.operator_indices[anchor]].inverse();
        self.operator_indices
            .iter()
            .map(|&j| {
                let target = anchor_inverse.compose(&operators[j]).inverse();
                operators
                    .iter()
                    .position(|op| laue_group.contains(&op.compose(&target)))
            })
            .collect()
    }

    /// How many datasets have a non-identity operator?
    pub fn num_reindexed(&self) -> usize {
        self.operator_indices.iter().filter(|&&j| j != 0).count()
    }
}

/// Everything a strategy needs to know.
pub struct ResolverContext<'a> {
    datasets: &'a [ReflectionDataset],
    laue_group: LaueGroup,
    operators: OperatorList,
    nproc: usize,
}

impl<'a> ResolverContext<'a> {
    /// `laue_group` is the Laue group of the representative symmetry; all
    /// reindexed data are put in its asymmetric unit before being compared.
    pub fn new(
        datasets: &'a [ReflectionDataset],
        laue_group: LaueGroup,
        operators: OperatorList,
        nproc: usize,
    ) -> Result<ResolverContext<'a>, ResolveError> {
        if datasets.is_empty() {
            return Err(ResolveError::NoDatasets);
        }
        if nproc == 0 {
            return Err(ResolveError::NoThreads);
        }
        Ok(ResolverContext {
            datasets,
            laue_group,
            operators,
            nproc,
        })
    }

    pub fn datasets(&self) -> &[ReflectionDataset] {
        self.datasets
    }

    pub fn num_datasets(&self) -> usize {
        self.datasets.len()
    }

    pub fn laue_group(&self) -> &LaueGroup {
        &self.laue_group
    }

    pub fn operators(&self) -> &OperatorList {
        &self.operators
    }

    pub fn nproc(&self) -> usize {
        self.nproc
    }

    /// Dataset `i` reindexed by operator `j`, mapped into the asymmetric unit
    /// and merged.
    pub fn reindexed(&self, i: usize, j: usize) -> IntensityArray {
        self.datasets[i]
            .data
            .reindex(&self.operators[j], &self.laue_group)
    }

    /// Every dataset reindexed by every operator; the result is indexed
    /// `[dataset][operator]`. The work is done on `pool`.
    pub(crate) fn reindex_all(&self, pool: &ThreadPool) -> Vec<Vec<IntensityArray>> {
        let num_ops = self.operators.len();
        let flat: Vec<IntensityArray> = pool.install(|| {
            (0..self.datasets.len() * num_ops)
                .into_par_iter()
                .map(|p| self.reindexed(p / num_ops, p % num_ops))
                .collect()
        });
        let mut flat = flat.into_iter();
        (0..self.datasets.len())
            .map(|_| flat.by_ref().take(num_ops).collect())
            .collect()
    }

    /// A thread pool with `nproc` threads. It lives only as long as the
    /// caller holds it.
    pub(crate) fn thread_pool(&self) -> Result<ThreadPool, ResolveError> {
        build_thread_pool(self.nproc)
    }
}

pub(crate) fn build_thread_pool(nproc: usize) -> Result<ThreadPool, ResolveError> {
    if nproc == 0 {
        return Err(ResolveError::NoThreads);
    }
    Ok(ThreadPoolBuilder::new().num_threads(nproc).build()?)
}

/// The index of the largest defined score. Ties go to the lowest index.
pub(crate) fn best_index(scores: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (j, score) in scores.iter().enumerate() {
        if let Some(s) = *score {
            match best {
                Some((_, b)) if s <= b => (),
                _ => best = Some((j, s)),
            }
        }
    }
    best.map(|(j, _)| j)
}

/// Format correlations for logging.
pub(crate) fn format_scores(scores: &[Option<f64>]) -> String {
    scores
        .iter()
        .map(|s| match s {
            Some(s) => format!("{s:6.3}"),
            None => "   n/a".to_string(),
        })
        .join(" ")
}
