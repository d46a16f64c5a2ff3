// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading and writing of XDS_ASCII reflection files.
//!
//! The header is made of lines starting with '!'. A header line holds one or
//! more "KEY=value(s)" entries, e.g.
//!
//! ```text
//! !FORMAT=XDS_ASCII    MERGE=FALSE    FRIEDEL'S_LAW=TRUE
//! !SPACE_GROUP_NUMBER=   75
//! !UNIT_CELL_CONSTANTS=    57.840    57.840   150.225  90.000  90.000  90.000
//! !NUMBER_OF_ITEMS_IN_EACH_DATA_RECORD=5
//! !ITEM_H=1
//! ...
//! !END_OF_HEADER
//! ```
//!
//! followed by whitespace-separated data records and `!END_OF_DATA`.

mod error;
mod read;
mod write;
#[cfg(test)]
mod tests;

pub use error::XdsAsciiError;
pub use read::XdsAscii;
pub use write::{write_reindexed, WriteSummary};

/// One "KEY=value(s)" entry of a header line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HeaderEntry {
    pub(crate) key: String,
    pub(crate) values: Vec<String>,
}

/// Split a header line (with or without its leading '!') into its entries.
/// A token containing '=' starts a new entry; the tokens that follow are its
/// values. A leading token without '=' (e.g. "END_OF_HEADER") is an entry
/// with no values.
pub(crate) fn parse_header_line(line: &str) -> Vec<HeaderEntry> {
    let line = line.trim().trim_start_matches('!');
    let mut entries: Vec<HeaderEntry> = vec![];
    for token in line.split_whitespace() {
        match token.split_once('=') {
            Some((key, value)) => {
                let mut values = vec![];
                if !value.is_empty() {
                    values.push(value.to_string());
                }
                entries.push(HeaderEntry {
                    key: key.to_string(),
                    values,
                });
            }
            None => match entries.last_mut() {
                Some(entry) => entry.values.push(token.to_string()),
                None => entries.push(HeaderEntry {
                    key: token.to_string(),
                    values: vec![],
                }),
            },
        }
    }
    entries
}

/// The inverse of [`parse_header_line`]; values are separated by single
/// spaces and entries by four.
pub(crate) fn format_header_line(entries: &[HeaderEntry]) -> String {
    let mut s = String::from("!");
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            s.push_str("    ");
        }
        s.push_str(&entry.key);
        s.push('=');
        for value in &entry.values {
            s.push(' ');
            s.push_str(value);
        }
    }
    s
}
