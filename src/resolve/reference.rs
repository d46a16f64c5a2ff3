// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Resolve the ambiguity against reference intensities.

use log::{debug, warn};

use super::{best_index, format_scores, Assignment, ReindexStrategy, ResolveError, ResolverContext};
use crate::{correlation::correlate, dataset::IntensityArray};

/// Each dataset gets the operator that makes it correlate best with the
/// reference. The reference must already be in the asymmetric unit of the
/// context's Laue group (see [`crate::io::read_reference`]).
pub struct ReferenceBased {
    reference: IntensityArray,
}

impl ReferenceBased {
    pub fn new(reference: IntensityArray) -> ReferenceBased {
        ReferenceBased { reference }
    }
}

impl ReindexStrategy for ReferenceBased {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn assign_operators(&self, ctx: &ResolverContext) -> Result<Assignment, ResolveError> {
        let num_datasets = ctx.num_datasets();
        if !ctx.operators().is_ambiguous() {
            debug!("Only the identity operator is possible; nothing to resolve");
            return Ok(Assignment::identity(num_datasets));
        }

        let mut assignment = Assignment {
            cycles: 1,
            ..Assignment::identity(num_datasets)
        };
        for (i, dataset) in ctx.datasets().iter().enumerate() {
            let scores: Vec<Option<f64>> = (0..ctx.operators().len())
                .map(|j| correlate(&ctx.reindexed(i, j), &self.reference))
                .collect();
            debug!(
                "{i:4} {}: {}",
                dataset.path.display(),
                format_scores(&scores)
            );

            match best_index(&scores) {
                Some(j) => assignment.operator_indices[i] = j,
                None => {
                    warn!(
                        "{} can't be correlated with the reference under any operator; keeping its indexing",
                        dataset.path.display()
                    );
                    assignment.undetermined.push(i);
                }
            }
        }

        Ok(assignment)
    }
}
