// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all ambiguity-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use super::resolve::ResolveArgsError;
use crate::{
    dataset::LoadError,
    io::{xds_ascii::XdsAsciiError, ManifestError, ReferenceError},
    output::OutputError,
    params::ResolveRunError,
    resolve::ResolveError,
    symmetry::SymmetryError,
};

/// The *only* publicly visible error from ambiguity. Where it helps, messages
/// carry a hint on what to try next.
#[derive(Error, Debug)]
pub enum AmbiguityError {
    /// An error with the command-line arguments.
    #[error("{0}\n\nSee 'ambiguity resolve --help' for the available options.")]
    Args(String),

    /// An error related to argument files.
    #[error("{0}\n\nArgument files must be toml or json, with the same field names as the long command-line options (using underscores).")]
    ArgFile(String),

    /// An error related to reading XDS_ASCII files or file lists.
    #[error("{0}")]
    Input(String),

    /// An error related to reference data.
    #[error("{0}\n\nThe reference must be an XDS_ASCII file with the item given by --reference-label and its SIGMA() item.")]
    Reference(String),

    /// An error related to unit cells, space groups or reindexing operators.
    #[error("{0}\n\nIf the lattice symmetry couldn't be determined, try changing --max-delta or supply the operators with --operators.")]
    Symmetry(String),

    /// An error from a resolution strategy.
    #[error("{0}")]
    Resolve(String),

    /// An error from writing reindexed files.
    #[error("{0}\n\nFiles written before this error have been left in place.")]
    Output(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<ResolveArgsError> for AmbiguityError {
    fn from(e: ResolveArgsError) -> Self {
        let s = e.to_string();
        match e {
            ResolveArgsError::NoList
            | ResolveArgsError::ListDoesntExist(_)
            | ResolveArgsError::UnknownStrategy { .. }
            | ResolveArgsError::NoReferenceFile
            | ResolveArgsError::ReferenceWithOtherStrategy(_)
            | ResolveArgsError::LabelWithoutFile
            | ResolveArgsError::ReferenceDoesntExist(_)
            | ResolveArgsError::ZeroMaxCycles
            | ResolveArgsError::ZeroNproc
            | ResolveArgsError::BadDMin(_)
            | ResolveArgsError::BadMaxDelta(_)
            | ResolveArgsError::BadMinIos(_)
            | ResolveArgsError::ParseOperators(_)
            | ResolveArgsError::OutdirNotADirectory(_) => Self::Args(s),
        }
    }
}

impl From<ResolveRunError> for AmbiguityError {
    fn from(e: ResolveRunError) -> Self {
        match e {
            ResolveRunError::Resolve(e) => Self::from(e),
            ResolveRunError::Output(e) => Self::from(e),
        }
    }
}

// Library code errors.

impl From<ManifestError> for AmbiguityError {
    fn from(e: ManifestError) -> Self {
        Self::Input(e.to_string())
    }
}

impl From<XdsAsciiError> for AmbiguityError {
    fn from(e: XdsAsciiError) -> Self {
        let s = e.to_string();
        match e {
            XdsAsciiError::Symmetry { .. } => Self::Symmetry(s),
            XdsAsciiError::IO(_) => Self::Generic(s),
            XdsAsciiError::NotXdsAscii { .. }
            | XdsAsciiError::MissingHeaderKey { .. }
            | XdsAsciiError::BadHeaderValue { .. }
            | XdsAsciiError::UnknownItem { .. }
            | XdsAsciiError::BadRecord { .. }
            | XdsAsciiError::SameFile(_)
            | XdsAsciiError::Shape(_) => Self::Input(s),
        }
    }
}

impl From<LoadError> for AmbiguityError {
    fn from(e: LoadError) -> Self {
        let s = e.to_string();
        match e {
            LoadError::NoFiles | LoadError::NoGoodFiles { .. } => Self::Input(s),
            LoadError::Symmetry(_) => Self::Symmetry(s),
        }
    }
}

impl From<ReferenceError> for AmbiguityError {
    fn from(e: ReferenceError) -> Self {
        Self::Reference(e.to_string())
    }
}

impl From<SymmetryError> for AmbiguityError {
    fn from(e: SymmetryError) -> Self {
        Self::Symmetry(e.to_string())
    }
}

impl From<ResolveError> for AmbiguityError {
    fn from(e: ResolveError) -> Self {
        let s = e.to_string();
        match e {
            ResolveError::NoThreads => Self::Args(s),
            ResolveError::NoDatasets | ResolveError::ThreadPool(_) => Self::Resolve(s),
        }
    }
}

impl From<OutputError> for AmbiguityError {
    fn from(e: OutputError) -> Self {
        let s = e.to_string();
        match e {
            OutputError::Symmetry(_) => Self::Symmetry(s),
            OutputError::XdsAscii { .. } | OutputError::IO { .. } => Self::Output(s),
        }
    }
}

impl From<std::io::Error> for AmbiguityError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
