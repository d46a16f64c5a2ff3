// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Write reindexed XDS_ASCII files, and the lists that describe them.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use itertools::Itertools;
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    constants::REINDEXED_SUFFIX,
    dataset::ReflectionDataset,
    io::xds_ascii::{write_reindexed, XdsAsciiError},
    resolve::Assignment,
    symmetry::{CrystalSymmetry, OperatorList, ReindexOperator, SymmetryError, UnitCell},
};

/// Where the reindexed version of `path` goes: "X.HKL" becomes
/// "X_reidx.HKL", anything else gets "_reidx.HKL" in place of its extension.
pub fn reindexed_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let new_name = if name.contains(".HKL") {
        name.replace(".HKL", &format!("{REINDEXED_SUFFIX}.HKL"))
    } else {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        format!("{stem}{REINDEXED_SUFFIX}.HKL")
    };
    path.with_file_name(new_name)
}

/// The files made by [`write_outputs`].
#[derive(Debug, Clone)]
pub struct OutputSummary {
    /// The file to use for each dataset, in dataset order. Datasets that
    /// didn't need reindexing keep their original path.
    pub files: Vec<PathBuf>,
    /// The list of `files`.
    pub manifest: PathBuf,
    /// The unit cell of each of `files`.
    pub cells: PathBuf,
    /// The number of reindexed files written.
    pub num_reindexed: usize,
}

/// Write reindexed copies of every dataset that was assigned something other
/// than the identity, then write the manifest "<prefix>_reindexed.lst" and
/// the cell table "<prefix>_reindexed_cells.dat" into `outdir`.
///
/// `symmetry` is the representative symmetry; its space group is written to
/// all reindexed files. If the datasets were loaded in P1 mode, `to_p1` must
/// be the operator that took the input files into the reduced cell; it is
/// applied to the files before the assigned operator.
///
/// A failure part way through is fatal; files that were already written are
/// left alone.
pub fn write_outputs(
    datasets: &[ReflectionDataset],
    assignment: &Assignment,
    operators: &OperatorList,
    symmetry: &CrystalSymmetry,
    to_p1: Option<&ReindexOperator>,
    outdir: &Path,
    prefix: &str,
) -> Result<OutputSummary, OutputError> {
    let mut files = Vec::with_capacity(datasets.len());
    let mut cells: Vec<UnitCell> = Vec::with_capacity(datasets.len());
    let mut num_reindexed = 0;

    info!("Writing reindexed files");
    for (i, dataset) in datasets.iter().enumerate() {
        let op = assignment.operator(i, operators);
        // The operator to apply to the file as it is on disk.
        let file_op = match to_p1 {
            Some(to_p1) => op.compose(to_p1),
            None => *op,
        };
        // The dataset's cell is already in the reduced setting in P1 mode.
        let cell = dataset.symmetry.cell.change_basis(op)?;

        if file_op.is_identity() {
            debug!("{i:4} {} is unchanged", dataset.path.display());
            files.push(dataset.path.clone());
            cells.push(cell);
            continue;
        }

        let new_path = reindexed_path(&dataset.path);
        let summary = write_reindexed(
            &dataset.path,
            &new_path,
            &file_op,
            &CrystalSymmetry {
                cell,
                space_group: symmetry.space_group,
            },
        )
        .map_err(|source| OutputError::XdsAscii {
            file: new_path.display().to_string(),
            source,
        })?;
        info!("{i:4} {} ({file_op})", new_path.display());
        if summary.num_dropped > 0 {
            warn!(
                "{}: {} record(s) didn't have integral indices after reindexing and were dropped",
                new_path.display(),
                summary.num_dropped
            );
        }

        files.push(new_path);
        cells.push(cell);
        num_reindexed += 1;
    }

    let manifest = outdir.join(format!("{prefix}_reindexed.lst"));
    write_manifest(&manifest, &files)?;
    let cells_path = outdir.join(format!("{prefix}_reindexed_cells.dat"));
    write_cells(&cells_path, &files, &cells)?;

    Ok(OutputSummary {
        files,
        manifest,
        cells: cells_path,
        num_reindexed,
    })
}

fn write_manifest(path: &Path, files: &[PathBuf]) -> Result<(), OutputError> {
    let io_err = |source| OutputError::IO {
        file: path.display().to_string(),
        source,
    };
    let mut f = BufWriter::new(File::create(path).map_err(io_err)?);
    for file in files {
        writeln!(f, "{}", file.display()).map_err(io_err)?;
    }
    f.flush().map_err(io_err)?;
    Ok(())
}

fn write_cells(path: &Path, files: &[PathBuf], cells: &[UnitCell]) -> Result<(), OutputError> {
    let io_err = |source| OutputError::IO {
        file: path.display().to_string(),
        source,
    };
    let mut f = BufWriter::new(File::create(path).map_err(io_err)?);
    writeln!(f, "file a b c al be ga").map_err(io_err)?;
    for (file, cell) in files.iter().zip(cells.iter()) {
        writeln!(
            f,
            "{} {}",
            file.display(),
            cell.parameters().iter().map(|p| format!("{p:7.3}")).join(" ")
        )
        .map_err(io_err)?;
    }
    f.flush().map_err(io_err)?;
    Ok(())
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Couldn't write {file}: {source}")]
    XdsAscii { file: String, source: XdsAsciiError },

    #[error("Couldn't write {file}: {source}")]
    IO { file: String, source: std::io::Error },

    #[error(transparent)]
    Symmetry(#[from] SymmetryError),
}
