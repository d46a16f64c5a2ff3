// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All floating-point constants *must* be double precision.
 */

/// The default high-resolution cutoff used when reading datasets [Å].
pub const DEFAULT_D_MIN: f64 = 3.0;

/// The default maximum obliquity used when searching for lattice symmetry
/// [degrees].
pub const DEFAULT_MAX_DELTA: f64 = 3.0;

/// The default maximum number of selective-breeding cycles.
pub const DEFAULT_MAX_CYCLES: usize = 100;

/// The default number of worker threads.
pub const DEFAULT_NPROC: usize = 1;

/// The default seed for the random starting coordinates of the
/// Brehm-Diederichs embedding.
pub const DEFAULT_SEED: u64 = 1234;

/// The default intensity item of XDS_ASCII reference files.
pub const DEFAULT_REFERENCE_LABEL: &str = "IOBS";

/// Appended to the stem of a reflection file when it is reindexed.
pub const REINDEXED_SUFFIX: &str = "_reidx";

/// Datasets with fewer merged reflections than this are not used.
pub const MIN_REFLECTIONS: usize = 2;

/// The largest proper-rotation group a lattice can have (the cubic
/// holohedry).
pub(crate) const MAX_LATTICE_ROTATIONS: usize = 24;

/// Direct- and reciprocal-lattice vectors considered in the twofold-axis
/// search have components in `-LE_PAGE_INDEX_LIMIT..=LE_PAGE_INDEX_LIMIT`.
pub(crate) const LE_PAGE_INDEX_LIMIT: i64 = 2;

/// Give up on Niggli reduction after this many steps.
pub(crate) const NIGGLI_MAX_ITERATIONS: usize = 1000;

/// Relative tolerance used for equality tests during Niggli reduction.
pub(crate) const NIGGLI_EPSILON: f64 = 1e-5;

/// Convergence threshold on the embedding coordinates for Brehm-Diederichs.
pub(crate) const BD_CONVERGENCE: f64 = 1e-6;

/// The maximum number of least-squares sweeps for Brehm-Diederichs.
pub(crate) const BD_MAX_SWEEPS: usize = 200;

/// Variances smaller than this are considered zero when correlating.
pub(crate) const VARIANCE_EPSILON: f64 = 1e-12;
