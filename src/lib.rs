// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Resolve the indexing ambiguity of many serial crystallography datasets.

When the lattice of a crystal has more symmetry than its space group, each
dataset can be indexed in several equally valid ways. Before the datasets can
be merged, every one of them must be put into the same indexing frame; this
crate finds a reindexing operator for each dataset that does that.
 */

mod cli;
pub mod constants;
pub mod correlation;
pub mod dataset;
pub mod io;
pub(crate) mod math;
pub mod output;
mod params;
pub mod resolve;
pub mod symmetry;

#[cfg(test)]
mod tests;

use crossbeam_utils::atomic::AtomicCell;

// Re-exports.
pub use cli::{Ambiguity, AmbiguityError};

/// Should progress bars be drawn? Set once by the CLI.
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
