// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from resolving indexing ambiguities.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("There are no datasets to resolve")]
    NoDatasets,

    #[error("The number of threads must be at least 1")]
    NoThreads,

    #[error("Couldn't build a thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
