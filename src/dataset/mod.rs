// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reflection datasets: loading them from XDS_ASCII files, merging
//! symmetry-equivalent observations and reindexing.

mod error;
#[cfg(test)]
mod tests;

pub use error::LoadError;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use vec1::Vec1;

use crate::{
    constants::MIN_REFLECTIONS,
    io::xds_ascii::XdsAscii,
    symmetry::{CrystalSymmetry, Hkl, LaueGroup, ReindexOperator, UnitCell},
};

/// A single (unmerged or merged) intensity measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub hkl: Hkl,
    pub intensity: f64,
    pub sigma: f64,
}

/// Merged intensities. The Miller indices are unique and sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntensityArray {
    hkls: Vec<Hkl>,
    intensities: Vec<f64>,
    sigmas: Vec<f64>,
}

impl IntensityArray {
    /// Merge observations that are equivalent under `laue_group` (Friedel
    /// mates included). Intensities are averaged without weights, and the
    /// merged sigma is sqrt(Σσ²) / n.
    pub fn merge<I: IntoIterator<Item = Observation>>(
        observations: I,
        laue_group: &LaueGroup,
    ) -> IntensityArray {
        let mut sums: BTreeMap<Hkl, (f64, f64, usize)> = BTreeMap::new();
        for obs in observations {
            let hkl = laue_group.map_to_asu(obs.hkl);
            let (sum, sum_sigma_sq, n) = sums.entry(hkl).or_insert((0.0, 0.0, 0));
            *sum += obs.intensity;
            *sum_sigma_sq += obs.sigma * obs.sigma;
            *n += 1;
        }

        let mut array = IntensityArray {
            hkls: Vec::with_capacity(sums.len()),
            intensities: Vec::with_capacity(sums.len()),
            sigmas: Vec::with_capacity(sums.len()),
        };
        for (hkl, (sum, sum_sigma_sq, n)) in sums {
            let n = n as f64;
            array.hkls.push(hkl);
            array.intensities.push(sum / n);
            array.sigmas.push(sum_sigma_sq.sqrt() / n);
        }
        array
    }

    pub fn len(&self) -> usize {
        self.hkls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hkls.is_empty()
    }

    pub fn hkls(&self) -> &[Hkl] {
        &self.hkls
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn sigmas(&self) -> &[f64] {
        &self.sigmas
    }

    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        self.hkls
            .iter()
            .zip(self.intensities.iter())
            .zip(self.sigmas.iter())
            .map(|((&hkl, &intensity), &sigma)| Observation {
                hkl,
                intensity,
                sigma,
            })
    }

    /// Apply a reindexing operator to every reflection, then map the new
    /// indices into the asymmetric unit of `laue_group` and merge again.
    /// Reflections whose new indices aren't integral are dropped.
    pub fn reindex(&self, op: &ReindexOperator, laue_group: &LaueGroup) -> IntensityArray {
        let reindexed = self.iter().filter_map(|obs| {
            op.apply(obs.hkl).map(|hkl| Observation { hkl, ..obs })
        });
        IntensityArray::merge(reindexed, laue_group)
    }

    /// Keep only the reflections with a resolution of at least `d_min` [Å].
    pub fn resolution_filter(&self, cell: &UnitCell, d_min: f64) -> IntensityArray {
        let gs = cell.reciprocal_metric_tensor();
        let mut out = IntensityArray::default();
        for obs in self.iter() {
            if obs.hkl != [0, 0, 0] && cell.d_spacing_with(&gs, obs.hkl) >= d_min {
                out.hkls.push(obs.hkl);
                out.intensities.push(obs.intensity);
                out.sigmas.push(obs.sigma);
            }
        }
        out
    }

    /// The lowest and highest resolution (d_max, d_min) of the reflections
    /// [Å].
    pub fn resolution_range(&self, cell: &UnitCell) -> Option<(f64, f64)> {
        let gs = cell.reciprocal_metric_tensor();
        self.hkls
            .iter()
            .map(|&hkl| cell.d_spacing_with(&gs, hkl))
            .fold(None, |acc, d| match acc {
                None => Some((d, d)),
                Some((d_max, d_min)) => Some((f64::max(d_max, d), f64::min(d_min, d))),
            })
    }
}

/// A good dataset, ready for correlation.
#[derive(Debug, Clone)]
pub struct ReflectionDataset {
    /// The index of this dataset amongst all good datasets.
    pub id: usize,
    pub path: PathBuf,
    pub symmetry: CrystalSymmetry,
    pub data: IntensityArray,
    /// (d_max, d_min) [Å]
    pub resolution: (f64, f64),
}

/// A file that couldn't be used, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct BadFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Options for [`load_datasets`].
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Reflections beyond this resolution are discarded [Å].
    pub d_min: f64,
    /// If set, reflections with I/σ below this are discarded.
    pub min_ios: Option<f64>,
    /// Put all datasets into the Niggli-reduced primitive cell of the
    /// representative symmetry (and space group P1).
    pub from_p1: bool,
}

#[derive(Debug)]
pub struct LoadedDatasets {
    pub datasets: Vec1<ReflectionDataset>,
    pub bad_files: Vec<BadFile>,
    /// The median cell of the good datasets with the space group of the first
    /// good dataset; in P1 mode, the reduced median cell and P1.
    pub symmetry: CrystalSymmetry,
    /// In P1 mode, the operator taking indices of the input files to indices
    /// of the reduced cell.
    pub to_p1: Option<ReindexOperator>,
}

/// A file that has been read and filtered, but not yet merged.
struct RawDataset {
    path: PathBuf,
    symmetry: CrystalSymmetry,
    observations: Vec<Observation>,
}

fn read_raw(path: &Path, options: &LoadOptions) -> Result<RawDataset, String> {
    let xds = XdsAscii::read(path).map_err(|e| e.to_string())?;
    let symmetry = *xds.symmetry();
    let cell = symmetry.cell;
    let gs = cell.reciprocal_metric_tensor();
    let total = xds.num_records();
    let observations: Vec<Observation> = xds
        .observations("IOBS")
        .map_err(|e| e.to_string())?
        .into_iter()
        // Rejected reflections have negative sigmas.
        .filter(|obs| obs.sigma >= 0.0)
        .filter(|obs| obs.hkl != [0, 0, 0] && cell.d_spacing_with(&gs, obs.hkl) >= options.d_min)
        .filter(|obs| match options.min_ios {
            Some(min_ios) => obs.sigma > 0.0 && obs.intensity / obs.sigma >= min_ios,
            None => true,
        })
        .collect();
    debug!(
        "{}: {} of {total} observations kept ({symmetry})",
        path.display(),
        observations.len()
    );

    Ok(RawDataset {
        path: path.to_path_buf(),
        symmetry,
        observations,
    })
}

fn merge_raw(raw: &RawDataset) -> Result<IntensityArray, String> {
    let laue_group = raw.symmetry.laue_group().map_err(|e| e.to_string())?;
    let merged = IntensityArray::merge(raw.observations.iter().copied(), &laue_group);
    if merged.len() < MIN_REFLECTIONS {
        return Err(format!(
            "only {} unique reflection(s) remain after filtering (need at least {MIN_REFLECTIONS})",
            merged.len()
        ));
    }
    Ok(merged)
}

/// Read, filter and merge the reflections of all files. Files that can't be
/// read or that have too few reflections are reported as bad and otherwise
/// ignored; the good datasets keep the order of `paths`.
pub fn load_datasets(
    paths: &[PathBuf],
    options: &LoadOptions,
) -> Result<LoadedDatasets, LoadError> {
    if paths.is_empty() {
        return Err(LoadError::NoFiles);
    }

    // Bad files are kept with their position in `paths`, so they can be
    // reported in input order.
    let mut bad_files: Vec<(usize, BadFile)> = vec![];
    let mut good: Vec<(usize, RawDataset, IntensityArray)> = vec![];
    for (index, path) in paths.iter().enumerate() {
        match read_raw(path, options).and_then(|raw| merge_raw(&raw).map(|merged| (raw, merged))) {
            Ok((raw, merged)) => good.push((index, raw, merged)),
            Err(reason) => {
                warn!("Ignoring {}: {reason}", path.display());
                bad_files.push((
                    index,
                    BadFile {
                        path: path.clone(),
                        reason,
                    },
                ));
            }
        }
    }
    if good.is_empty() {
        return Err(LoadError::NoGoodFiles {
            num_bad: bad_files.len(),
        });
    }

    let cells: Vec<UnitCell> = good.iter().map(|(_, raw, _)| raw.symmetry.cell).collect();
    let representative =
        CrystalSymmetry::new(UnitCell::median(&cells)?, good[0].1.symmetry.space_group)?;
    debug!("Representative symmetry: {representative}");

    let (symmetry, to_p1, good) = if options.from_p1 {
        let (reduced, to_p1) = representative.reduced_p1()?;
        debug!("Reindexing all data into the reduced cell with {to_p1}");
        let mut in_p1 = vec![];
        for (index, raw, _) in good {
            let converted = raw
                .symmetry
                .cell
                .change_basis(&to_p1)
                .map_err(|e| e.to_string())
                .and_then(|cell| {
                    let raw = RawDataset {
                        symmetry: CrystalSymmetry {
                            cell,
                            space_group: 1,
                        },
                        observations: raw
                            .observations
                            .iter()
                            .filter_map(|obs| {
                                to_p1.apply(obs.hkl).map(|hkl| Observation { hkl, ..*obs })
                            })
                            .collect(),
                        path: raw.path.clone(),
                    };
                    merge_raw(&raw).map(|merged| (raw, merged))
                });
            match converted {
                Ok((raw, merged)) => in_p1.push((index, raw, merged)),
                Err(reason) => {
                    warn!("Ignoring {}: {reason}", raw.path.display());
                    bad_files.push((
                        index,
                        BadFile {
                            path: raw.path,
                            reason,
                        },
                    ));
                }
            }
        }
        (reduced, Some(to_p1), in_p1)
    } else {
        (representative, None, good)
    };

    let datasets = good
        .into_iter()
        .enumerate()
        .map(|(id, (_, raw, data))| {
            let resolution = data.resolution_range(&raw.symmetry.cell).unwrap_or((0.0, 0.0));
            ReflectionDataset {
                id,
                path: raw.path,
                symmetry: raw.symmetry,
                data,
                resolution,
            }
        })
        .collect::<Vec<_>>();
    bad_files.sort_by_key(|(index, _)| *index);
    let bad_files: Vec<BadFile> = bad_files.into_iter().map(|(_, bad)| bad).collect();
    let datasets = Vec1::try_from_vec(datasets).map_err(|_| LoadError::NoGoodFiles {
        num_bad: bad_files.len(),
    })?;

    Ok(LoadedDatasets {
        datasets,
        bad_files,
        symmetry,
        to_p1,
    })
}
