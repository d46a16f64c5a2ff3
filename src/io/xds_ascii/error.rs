// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading and writing XDS_ASCII files.

use thiserror::Error;

use crate::symmetry::SymmetryError;

#[derive(Error, Debug)]
pub enum XdsAsciiError {
    #[error("{file}: Not an XDS_ASCII file (the first header line is not '!FORMAT=XDS_ASCII')")]
    NotXdsAscii { file: String },

    #[error("{file}: Header keyword '{key}' is missing")]
    MissingHeaderKey { file: String, key: &'static str },

    #[error("{file}: Couldn't parse the value(s) of header keyword '{key}': '{value}'")]
    BadHeaderValue {
        file: String,
        key: &'static str,
        value: String,
    },

    #[error("{file}: Item '{item}' is not in the file; available items: {available}")]
    UnknownItem {
        file: String,
        item: String,
        available: String,
    },

    #[error("{file}: Bad data record on line {line_num}: {reason}")]
    BadRecord {
        file: String,
        line_num: usize,
        reason: String,
    },

    #[error("{file}: {source}")]
    Symmetry {
        file: String,
        source: SymmetryError,
    },

    #[error("Refusing to overwrite '{0}' with its own reindexed data")]
    SameFile(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
