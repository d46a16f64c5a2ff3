// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading reference intensities.

use std::path::Path;

use log::{debug, info};
use thiserror::Error;

use super::xds_ascii::{XdsAscii, XdsAsciiError};
use crate::{
    constants::MIN_REFLECTIONS,
    dataset::{IntensityArray, Observation},
    symmetry::{LaueGroup, ReindexOperator},
};

/// Read reference intensities from an XDS_ASCII file. The intensities are
/// taken from the item `label` and the sigmas from "SIGMA(label)".
/// Rejected reflections (negative sigmas) and reflections beyond `d_min` are
/// discarded, then the remaining reflections are merged in `laue_group`.
///
/// If `to_p1` is given, the reference indices are transformed with it before
/// merging, so that the reference is in the same cell as datasets that were
/// loaded in P1 mode.
pub fn read_reference<P: AsRef<Path>>(
    path: P,
    label: &str,
    d_min: f64,
    laue_group: &LaueGroup,
    to_p1: Option<&ReindexOperator>,
) -> Result<IntensityArray, ReferenceError> {
    let path = path.as_ref();
    let xds = XdsAscii::read(path)?;
    let cell = xds.symmetry().cell;
    let gs = cell.reciprocal_metric_tensor();
    let observations = xds
        .observations(label)?
        .into_iter()
        .filter(|obs| obs.sigma >= 0.0)
        .filter(|obs| obs.hkl != [0, 0, 0] && cell.d_spacing_with(&gs, obs.hkl) >= d_min);

    let reference = match to_p1 {
        Some(op) => IntensityArray::merge(
            observations.filter_map(|obs| op.apply(obs.hkl).map(|hkl| Observation { hkl, ..obs })),
            laue_group,
        ),
        None => IntensityArray::merge(observations, laue_group),
    };
    debug!(
        "Reference {}: {} records, {} unique reflections to {d_min} Å",
        path.display(),
        xds.num_records(),
        reference.len()
    );

    if reference.len() < MIN_REFLECTIONS {
        return Err(ReferenceError::TooFewReflections {
            file: path.display().to_string(),
            num: reference.len(),
        });
    }
    info!(
        "Using {label} of {} ({}) as the reference",
        path.display(),
        xds.symmetry()
    );
    Ok(reference)
}

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Reference file {file} has only {num} usable reflection(s)")]
    TooFewReflections { file: String, num: usize },

    #[error("Couldn't read the reference: {0}")]
    XdsAscii(#[from] XdsAsciiError),
}
