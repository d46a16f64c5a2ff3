// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Things shared between the command-line interfaces of `ambiguity`
//! subcommands: argument files and pretty printers.

mod printers;

pub(super) use printers::InfoPrinter;
pub(crate) use printers::{display_warnings, Warn};

use std::{path::Path, str::FromStr};

use itertools::Itertools;
use log::debug;
use serde::de::DeserializeOwned;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{resolve::StrategyKind, AmbiguityError};

lazy_static::lazy_static! {
    pub(super) static ref ARG_FILE_HELP: String = format!(
        "A file with any of the arguments below; those given on the command line take precedence. Formats: {}",
        ArgFileType::iter().join(", ")
    );

    pub(super) static ref STRATEGIES_COMMA_SEPARATED: String = StrategyKind::iter().join(", ");
}

/// The formats of arguments files, named by their file extensions.
#[derive(Debug, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub(super) enum ArgFileType {
    Toml,
    Json,
}

/// Read arguments from a toml or json file. The extension (in any case)
/// decides which.
pub(super) fn read_arg_file<T: DeserializeOwned>(path: &Path) -> Result<T, AmbiguityError> {
    let file_type = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(|e| ArgFileType::from_str(&e.to_lowercase()).ok());
    let file_type = match file_type {
        Some(t) => t,
        None => {
            return Err(AmbiguityError::ArgFile(format!(
                "Can't tell the format of {} from its extension; use one of: {}",
                path.display(),
                ArgFileType::iter().join(", ")
            )))
        }
    };
    debug!("Reading {file_type} arguments from {}", path.display());

    let contents = std::fs::read_to_string(path)?;
    let parsed = match file_type {
        ArgFileType::Toml => toml::from_str(&contents).map_err(|e| e.to_string()),
        ArgFileType::Json => serde_json::from_str(&contents).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| {
        AmbiguityError::ArgFile(format!("Couldn't read arguments from {}:\n{e}", path.display()))
    })
}
