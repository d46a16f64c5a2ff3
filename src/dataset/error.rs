// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from loading reflection datasets.

use thiserror::Error;

use crate::symmetry::SymmetryError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("No reflection files were supplied")]
    NoFiles,

    #[error("None of the reflection files could be used ({num_bad} were bad)")]
    NoGoodFiles { num_bad: usize },

    #[error("Couldn't determine the representative symmetry: {0}")]
    Symmetry(#[from] SymmetryError),
}
