// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading lists of file paths.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use log::warn;
use thiserror::Error;

/// Read a newline-delimited list of paths. Anything after a '#' on a line is
/// a comment, and surrounding whitespace is ignored, as are empty lines.
/// Paths are used as they are written (i.e. relative paths are relative to
/// the current directory).
///
/// Paths that don't exist are reported with a warning and skipped.
pub fn read_path_list<P: AsRef<Path>>(list: P) -> Result<Vec<PathBuf>, ManifestError> {
    let list = list.as_ref();
    let reader = BufReader::new(File::open(list).map_err(|e| ManifestError::IO {
        file: list.display().to_string(),
        source: e,
    })?);

    let mut paths = vec![];
    for line in reader.lines() {
        let line = line.map_err(|e| ManifestError::IO {
            file: list.display().to_string(),
            source: e,
        })?;
        let entry = match line.split_once('#') {
            Some((before, _)) => before,
            None => line.as_str(),
        }
        .trim();
        if entry.is_empty() {
            continue;
        }

        let path = PathBuf::from(entry);
        if !path.exists() {
            warn!("File not found: {}; skipping it", path.display());
            continue;
        }
        paths.push(path);
    }

    Ok(paths)
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Couldn't read the file list '{file}': {source}")]
    IO {
        file: String,
        source: std::io::Error,
    },
}
