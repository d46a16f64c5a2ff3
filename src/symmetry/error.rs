// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with unit cells, space groups and reindexing operators.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SymmetryError {
    #[error("Invalid unit cell {params:?}: {reason}")]
    InvalidCell {
        params: [f64; 6],
        reason: &'static str,
    },

    #[error("Space group number {0} is not between 1 and 230")]
    InvalidSpaceGroup(u16),

    #[error("Couldn't parse reindexing operator '{op}': {reason}")]
    ParseOperator { op: String, reason: String },

    #[error("Reindexing operator '{0}' is singular")]
    SingularOperator(String),

    #[error("Niggli reduction of the cell {0:?} did not converge")]
    NiggliNotConverged([f64; 6]),

    #[error("Couldn't get a representative symmetry; no unit cells were supplied")]
    NoCells,
}
