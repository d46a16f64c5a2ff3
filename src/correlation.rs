// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Correlation of the intensities of two datasets.

use std::cmp::Ordering;

use crate::{
    constants::{MIN_REFLECTIONS, VARIANCE_EPSILON},
    dataset::IntensityArray,
};

/// The Pearson correlation coefficient of the intensities of reflections
/// common to both arrays. Reflections are matched by their Miller indices
/// alone, so both arrays should be in the same asymmetric unit.
///
/// `None` is returned if fewer than two reflections are in common, or if the
/// intensities of either side don't vary.
pub fn correlate(a: &IntensityArray, b: &IntensityArray) -> Option<f64> {
    // Both arrays are sorted by Miller index; walk them together.
    let (a_hkls, b_hkls) = (a.hkls(), b.hkls());
    let (a_int, b_int) = (a.intensities(), b.intensities());
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(a_hkls.len().min(b_hkls.len()));
    let (mut i, mut j) = (0, 0);
    while i < a_hkls.len() && j < b_hkls.len() {
        match a_hkls[i].cmp(&b_hkls[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                pairs.push((a_int[i], b_int[j]));
                i += 1;
                j += 1;
            }
        }
    }

    pearson(&pairs)
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < MIN_REFLECTIONS {
        return None;
    }

    let n = pairs.len() as f64;
    let (sum_x, sum_y) = pairs
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    let (mean_x, mean_y) = (sum_x / n, sum_y / n);

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx / n < VARIANCE_EPSILON || syy / n < VARIANCE_EPSILON {
        return None;
    }

    let cc = sxy / (sxx * syy).sqrt();
    if cc.is_finite() {
        Some(cc.clamp(-1.0, 1.0))
    } else {
        None
    }
}
