// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use log::trace;
use ndarray::prelude::*;

use super::{parse_header_line, XdsAsciiError};
use crate::{
    dataset::Observation,
    symmetry::{CrystalSymmetry, UnitCell},
};

/// The contents of an XDS_ASCII file. All data records are kept as floats,
/// one row per record and one column per item.
#[derive(Debug, Clone)]
pub struct XdsAscii {
    path: PathBuf,
    symmetry: CrystalSymmetry,
    friedels_law: Option<bool>,
    /// Item names (without the "ITEM_" prefix) in column order.
    items: Vec<String>,
    records: Array2<f64>,
}

impl XdsAscii {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<XdsAscii, XdsAsciiError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        XdsAscii::from_reader(reader, path)
    }

    /// Parse XDS_ASCII text. `path` is only used for error messages and
    /// bookkeeping.
    pub fn from_reader<R: BufRead, P: AsRef<Path>>(
        reader: R,
        path: P,
    ) -> Result<XdsAscii, XdsAsciiError> {
        let path = path.as_ref();
        let file = path.display().to_string();

        let mut space_group: Option<u16> = None;
        let mut cell_params: Option<[f64; 6]> = None;
        let mut num_items: Option<usize> = None;
        let mut item_positions: Vec<(String, usize)> = vec![];
        let mut friedels_law = None;
        let mut seen_format = false;
        let mut in_header = true;
        let mut values: Vec<f64> = vec![];
        let mut num_records = 0;

        for (i_line, line) in reader.lines().enumerate() {
            let line = line?;
            let line_num = i_line + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if !seen_format {
                let entries = parse_header_line(trimmed);
                let is_xds_ascii = trimmed.starts_with('!')
                    && entries.iter().any(|e| {
                        e.key == "FORMAT" && e.values.first().map(|v| v.as_str()) == Some("XDS_ASCII")
                    });
                if !is_xds_ascii {
                    return Err(XdsAsciiError::NotXdsAscii { file });
                }
                seen_format = true;
            }

            if in_header {
                if !trimmed.starts_with('!') {
                    return Err(XdsAsciiError::MissingHeaderKey {
                        file,
                        key: "END_OF_HEADER",
                    });
                }
                for entry in parse_header_line(trimmed) {
                    let joined = || entry.values.join(" ");
                    let bad_value = |key: &'static str| XdsAsciiError::BadHeaderValue {
                        file: file.clone(),
                        key,
                        value: joined(),
                    };
                    match entry.key.as_str() {
                        "END_OF_HEADER" => in_header = false,
                        "SPACE_GROUP_NUMBER" => {
                            let sg = entry
                                .values
                                .first()
                                .and_then(|v| v.parse().ok())
                                .ok_or_else(|| bad_value("SPACE_GROUP_NUMBER"))?;
                            space_group = Some(sg);
                        }
                        "UNIT_CELL_CONSTANTS" => {
                            let params = entry
                                .values
                                .iter()
                                .map(|v| v.parse::<f64>())
                                .collect::<Result<Vec<_>, _>>()
                                .ok()
                                .and_then(|v| <[f64; 6]>::try_from(v).ok())
                                .ok_or_else(|| bad_value("UNIT_CELL_CONSTANTS"))?;
                            cell_params = Some(params);
                        }
                        "NUMBER_OF_ITEMS_IN_EACH_DATA_RECORD" => {
                            let n = entry
                                .values
                                .first()
                                .and_then(|v| v.parse().ok())
                                .filter(|&n: &usize| n > 0)
                                .ok_or_else(|| bad_value("NUMBER_OF_ITEMS_IN_EACH_DATA_RECORD"))?;
                            num_items = Some(n);
                        }
                        "FRIEDEL'S_LAW" => {
                            friedels_law = entry.values.first().map(|v| v == "TRUE");
                        }
                        key => {
                            if let Some(item) = key.strip_prefix("ITEM_") {
                                let position = entry
                                    .values
                                    .first()
                                    .and_then(|v| v.parse::<usize>().ok())
                                    .filter(|&p| p > 0)
                                    .ok_or_else(|| XdsAsciiError::BadHeaderValue {
                                        file: file.clone(),
                                        key: "ITEM_*",
                                        value: format!("{key}={}", joined()),
                                    })?;
                                item_positions.push((item.to_string(), position));
                            }
                        }
                    }
                }
                continue;
            }

            // Data section.
            if trimmed.starts_with('!') {
                if trimmed.contains("END_OF_DATA") {
                    break;
                }
                continue;
            }
            let num_items = num_items.ok_or_else(|| XdsAsciiError::MissingHeaderKey {
                file: file.clone(),
                key: "NUMBER_OF_ITEMS_IN_EACH_DATA_RECORD",
            })?;
            let before = values.len();
            for token in trimmed.split_whitespace() {
                let v = token.parse::<f64>().map_err(|_| XdsAsciiError::BadRecord {
                    file: file.clone(),
                    line_num,
                    reason: format!("'{token}' is not a number"),
                })?;
                values.push(v);
            }
            let n = values.len() - before;
            if n != num_items {
                return Err(XdsAsciiError::BadRecord {
                    file,
                    line_num,
                    reason: format!("expected {num_items} items, got {n}"),
                });
            }
            num_records += 1;
        }

        if !seen_format {
            return Err(XdsAsciiError::NotXdsAscii { file });
        }
        if in_header {
            return Err(XdsAsciiError::MissingHeaderKey {
                file,
                key: "END_OF_HEADER",
            });
        }
        let space_group = space_group.ok_or_else(|| XdsAsciiError::MissingHeaderKey {
            file: file.clone(),
            key: "SPACE_GROUP_NUMBER",
        })?;
        let cell_params = cell_params.ok_or_else(|| XdsAsciiError::MissingHeaderKey {
            file: file.clone(),
            key: "UNIT_CELL_CONSTANTS",
        })?;
        let num_items = num_items.ok_or_else(|| XdsAsciiError::MissingHeaderKey {
            file: file.clone(),
            key: "NUMBER_OF_ITEMS_IN_EACH_DATA_RECORD",
        })?;

        let symmetry = UnitCell::new(cell_params)
            .and_then(|cell| CrystalSymmetry::new(cell, space_group))
            .map_err(|source| XdsAsciiError::Symmetry {
                file: file.clone(),
                source,
            })?;

        let mut items = vec![String::new(); num_items];
        for (item, position) in item_positions {
            match items.get_mut(position - 1) {
                Some(slot) => *slot = item,
                None => {
                    return Err(XdsAsciiError::BadHeaderValue {
                        file,
                        key: "ITEM_*",
                        value: format!("ITEM_{item}={position} (only {num_items} items per record)"),
                    })
                }
            }
        }

        let records = Array2::from_shape_vec((num_records, num_items), values)?;
        trace!("{file}: {num_records} records with items {items:?}");

        Ok(XdsAscii {
            path: path.to_path_buf(),
            symmetry,
            friedels_law,
            items,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn symmetry(&self) -> &CrystalSymmetry {
        &self.symmetry
    }

    /// The value of the FRIEDEL'S_LAW keyword, if it was present.
    pub fn friedels_law(&self) -> Option<bool> {
        self.friedels_law
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn num_records(&self) -> usize {
        self.records.len_of(Axis(0))
    }

    /// The values of an item (e.g. "IOBS") across all records.
    pub fn column(&self, item: &str) -> Result<ArrayView1<f64>, XdsAsciiError> {
        match self.items.iter().position(|i| i == item) {
            Some(i) => Ok(self.records.column(i)),
            None => Err(XdsAsciiError::UnknownItem {
                file: self.path.display().to_string(),
                item: item.to_string(),
                available: self
                    .items
                    .iter()
                    .filter(|i| !i.is_empty())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// The Miller indices, intensities and sigmas of all records. The
    /// intensities come from the item `label` (e.g. "IOBS") and the sigmas
    /// from "SIGMA(label)". Nothing is filtered; rejected reflections (with
    /// negative sigmas) are included.
    pub fn observations(&self, label: &str) -> Result<Vec<Observation>, XdsAsciiError> {
        let h = self.column("H")?;
        let k = self.column("K")?;
        let l = self.column("L")?;
        let intensity = self.column(label)?;
        let sigma = self.column(&format!("SIGMA({label})"))?;

        let obs = h
            .iter()
            .zip(k.iter())
            .zip(l.iter())
            .zip(intensity.iter())
            .zip(sigma.iter())
            .map(|((((&h, &k), &l), &intensity), &sigma)| Observation {
                hkl: [h.round() as i32, k.round() as i32, l.round() as i32],
                intensity,
                sigma,
            })
            .collect();
        Ok(obs)
    }
}
