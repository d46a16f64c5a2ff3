// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    dataset::LoadedDatasets,
    output::{write_outputs, OutputError, OutputSummary},
    resolve::{Assignment, ReindexStrategy, ResolveError, ResolverContext},
    symmetry::{LaueGroup, OperatorList},
};

pub(crate) struct ResolveParams {
    pub(crate) loaded: LoadedDatasets,
    pub(crate) operators: OperatorList,
    pub(crate) laue_group: LaueGroup,
    pub(crate) strategy: Box<dyn ReindexStrategy>,
    pub(crate) nproc: usize,

    /// Where the manifest and cell table go.
    pub(crate) outdir: PathBuf,

    /// The stem of the output lists; this is the stem of the input list.
    pub(crate) prefix: String,
}

impl ResolveParams {
    /// Assign an operator to every dataset, then (unless this is a dry run)
    /// write the reindexed files. Nothing is written on a dry run.
    pub(crate) fn run(
        &self,
        dry_run: bool,
    ) -> Result<(Assignment, Option<OutputSummary>), ResolveRunError> {
        let Self {
            loaded,
            operators,
            laue_group,
            strategy,
            nproc,
            outdir,
            prefix,
        } = self;

        let ctx = ResolverContext::new(
            loaded.datasets.as_slice(),
            laue_group.clone(),
            operators.clone(),
            *nproc,
        )?;
        info!(
            "Assigning operators to {} dataset(s) with {}",
            ctx.num_datasets(),
            strategy.name()
        );
        let assignment = strategy.assign_operators(&ctx)?;
        report(&assignment, self);

        let summary = if dry_run {
            info!("Dry run -- not writing any files.");
            None
        } else {
            std::fs::create_dir_all(outdir).map_err(|source| OutputError::IO {
                file: outdir.display().to_string(),
                source,
            })?;
            let summary = write_outputs(
                &loaded.datasets,
                &assignment,
                operators,
                &loaded.symmetry,
                loaded.to_p1.as_ref(),
                outdir,
                prefix,
            )?;
            info!(
                "Wrote {} reindexed file(s) and the cell table {}",
                summary.num_reindexed,
                summary.cells.display()
            );
            info!(
                "Reindexing done. For merging, use {} instead!",
                summary.manifest.display()
            );
            Some(summary)
        };

        if let Some(citation) = strategy.citation() {
            info!("If you use these results, please cite:");
            info!("    {citation}");
        }

        Ok((assignment, summary))
    }
}

fn report(assignment: &Assignment, params: &ResolveParams) {
    if assignment.converged {
        info!(
            "{} converged after {} cycle(s)",
            params.strategy.name(),
            assignment.cycles
        );
    } else {
        warn!(
            "{} did not converge after {} cycle(s); using the last assignment",
            params.strategy.name(),
            assignment.cycles
        );
    }

    for (i, dataset) in params.loaded.datasets.iter().enumerate() {
        debug!(
            "{i:4} {} {}",
            assignment.operator(i, &params.operators),
            dataset.path.display()
        );
    }
    for (j, op) in params.operators.iter().enumerate() {
        let n = assignment
            .operator_indices
            .iter()
            .filter(|&&k| k == j)
            .count();
        info!("{n:5} dataset(s) with {op}");
    }
    if !assignment.undetermined.is_empty() {
        warn!(
            "{} dataset(s) couldn't be assigned an operator and keep their indexing",
            assignment.undetermined.len()
        );
    }
}

#[derive(Error, Debug)]
pub(crate) enum ResolveRunError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Output(#[from] OutputError),
}
