// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use log::debug;

use super::{format_header_line, parse_header_line, XdsAsciiError};
use crate::{
    math::Mat3,
    symmetry::{CrystalSymmetry, ReindexOperator},
};

/// What happened when a reindexed XDS_ASCII file was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    /// The number of data records written.
    pub num_written: usize,
    /// The number of data records whose reindexed Miller indices weren't
    /// integral; these are not written.
    pub num_dropped: usize,
}

/// Read the XDS_ASCII file `src`, reindex its data records with `op` and write
/// the result to `dst`. The unit cell constants, the unit cell axes (if
/// present) and the space group number are replaced to describe `symmetry`;
/// every other line is kept as it is.
pub fn write_reindexed(
    src: &Path,
    dst: &Path,
    op: &ReindexOperator,
    symmetry: &CrystalSymmetry,
) -> Result<WriteSummary, XdsAsciiError> {
    if src == dst {
        return Err(XdsAsciiError::SameFile(src.display().to_string()));
    }
    let file = src.display().to_string();

    let reader = BufReader::new(File::open(src)?);
    let mut writer = BufWriter::new(File::create(dst)?);

    let mut hkl_columns: [Option<usize>; 3] = [None; 3];
    let mut in_header = true;
    let mut summary = WriteSummary {
        num_written: 0,
        num_dropped: 0,
    };
    // The cell axes are written in the order they appear, but each needs the
    // other two, so they're collected first.
    let mut axes: [Option<[f64; 3]>; 3] = [None; 3];
    let mut pending_lines: Vec<String> = vec![];

    for (i_line, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if in_header {
            if !trimmed.starts_with('!') {
                // Pass through blank lines etc.
                pending_lines.push(line);
                continue;
            }
            let mut entries = parse_header_line(trimmed);
            let mut modified = false;
            for entry in entries.iter_mut() {
                match entry.key.as_str() {
                    "END_OF_HEADER" => in_header = false,
                    "ITEM_H" | "ITEM_K" | "ITEM_L" => {
                        let index = match entry.key.as_str() {
                            "ITEM_H" => 0,
                            "ITEM_K" => 1,
                            _ => 2,
                        };
                        hkl_columns[index] = entry
                            .values
                            .first()
                            .and_then(|v| v.parse::<usize>().ok())
                            .and_then(|p| p.checked_sub(1));
                    }
                    "SPACE_GROUP_NUMBER" => {
                        entry.values = vec![format!("{:5}", symmetry.space_group)];
                        modified = true;
                    }
                    "UNIT_CELL_CONSTANTS" => {
                        let p = symmetry.cell.parameters();
                        entry.values = p.iter().map(|v| format!("{v:9.3}")).collect();
                        modified = true;
                    }
                    "UNIT_CELL_A-AXIS" | "UNIT_CELL_B-AXIS" | "UNIT_CELL_C-AXIS" => {
                        let index = match entry.key.as_str() {
                            "UNIT_CELL_A-AXIS" => 0,
                            "UNIT_CELL_B-AXIS" => 1,
                            _ => 2,
                        };
                        let v = entry
                            .values
                            .iter()
                            .map(|v| v.parse::<f64>())
                            .collect::<Result<Vec<_>, _>>()
                            .ok()
                            .and_then(|v| <[f64; 3]>::try_from(v).ok())
                            .ok_or_else(|| XdsAsciiError::BadHeaderValue {
                                file: file.clone(),
                                key: "UNIT_CELL_*-AXIS",
                                value: entry.values.join(" "),
                            })?;
                        axes[index] = Some(v);
                    }
                    _ => (),
                }
            }

            let is_axis = entries
                .iter()
                .any(|e| e.key.starts_with("UNIT_CELL_") && e.key.ends_with("-AXIS"));
            if is_axis {
                // Keep a placeholder; it's filled in once all axes are known.
                pending_lines.push(line);
            } else if modified {
                pending_lines.push(format_header_line(&entries));
            } else {
                pending_lines.push(line);
            }

            if !in_header {
                flush_header(&mut writer, &mut pending_lines, &axes, op)?;
                if hkl_columns.iter().any(|c| c.is_none()) {
                    return Err(XdsAsciiError::MissingHeaderKey {
                        file,
                        key: "ITEM_H/ITEM_K/ITEM_L",
                    });
                }
            }
            continue;
        }

        if trimmed.is_empty() || trimmed.starts_with('!') {
            writeln!(writer, "{line}")?;
            continue;
        }

        let mut tokens: Vec<String> = trimmed.split_whitespace().map(|t| t.to_string()).collect();
        let mut hkl = [0; 3];
        for (h, col) in hkl.iter_mut().zip(hkl_columns.iter()) {
            // `hkl_columns` were all checked at the end of the header.
            let col = col.unwrap_or(0);
            *h = tokens
                .get(col)
                .and_then(|t| t.parse::<f64>().ok())
                .map(|v| v.round() as i32)
                .ok_or_else(|| XdsAsciiError::BadRecord {
                    file: file.clone(),
                    line_num: i_line + 1,
                    reason: "couldn't read the Miller indices".to_string(),
                })?;
        }
        match op.apply(hkl) {
            Some(new_hkl) => {
                for (&v, col) in new_hkl.iter().zip(hkl_columns.iter()) {
                    tokens[col.unwrap_or(0)] = format!("{v:6}");
                }
                writeln!(writer, "{}", tokens.join(" "))?;
                summary.num_written += 1;
            }
            None => summary.num_dropped += 1,
        }
    }

    if in_header {
        return Err(XdsAsciiError::MissingHeaderKey {
            file,
            key: "END_OF_HEADER",
        });
    }
    writer.flush()?;

    if summary.num_dropped > 0 {
        debug!(
            "{}: dropped {} reflections whose reindexed indices aren't integral",
            dst.display(),
            summary.num_dropped
        );
    }
    Ok(summary)
}

/// Write out the buffered header lines, replacing the unit cell axes with
/// transformed ones.
fn flush_header<W: Write>(
    writer: &mut W,
    lines: &mut Vec<String>,
    axes: &[Option<[f64; 3]>; 3],
    op: &ReindexOperator,
) -> Result<(), std::io::Error> {
    let new_axes = match axes {
        [Some(a), Some(b), Some(c)] => {
            let basis: Mat3 = [*a, *b, *c];
            Some(op.transform_basis(&basis))
        }
        _ => None,
    };

    for line in lines.drain(..) {
        let mut entries = parse_header_line(&line);
        let mut modified = false;
        if let Some(new_axes) = new_axes {
            for entry in entries.iter_mut() {
                let index = match entry.key.as_str() {
                    "UNIT_CELL_A-AXIS" => 0,
                    "UNIT_CELL_B-AXIS" => 1,
                    "UNIT_CELL_C-AXIS" => 2,
                    _ => continue,
                };
                entry.values = new_axes[index].iter().map(|v| format!("{v:9.3}")).collect();
                modified = true;
            }
        }
        if modified {
            writeln!(writer, "{}", format_header_line(&entries))?;
        } else {
            writeln!(writer, "{line}")?;
        }
    }
    Ok(())
}
