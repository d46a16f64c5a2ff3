// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Unit cells.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Hkl, ReindexOperator, SymmetryError};
use crate::math::{mat3_inverse, mat3_mul, mat3_transpose, median, Mat3};

/// A unit cell described by its parameters (a, b, c [Å], alpha, beta, gamma
/// [degrees]).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitCell {
    params: [f64; 6],
}

impl UnitCell {
    pub fn new(params: [f64; 6]) -> Result<UnitCell, SymmetryError> {
        let invalid = |reason| Err(SymmetryError::InvalidCell { params, reason });

        if params.iter().any(|p| !p.is_finite()) {
            return invalid("parameters must be finite");
        }
        if params[..3].iter().any(|&l| l <= 0.0) {
            return invalid("cell lengths must be positive");
        }
        if params[3..].iter().any(|&a| a <= 0.0 || a >= 180.0) {
            return invalid("cell angles must be between 0 and 180 degrees");
        }

        let cell = UnitCell { params };
        let v = cell.volume_squared_factor();
        if !(v > 1e-10) {
            return invalid("cell volume is not positive");
        }
        Ok(cell)
    }

    /// Make a unit cell from its metric tensor (G_ij = a_i . a_j).
    pub fn from_metric_tensor(g: &Mat3) -> Result<UnitCell, SymmetryError> {
        let a = g[0][0].sqrt();
        let b = g[1][1].sqrt();
        let c = g[2][2].sqrt();
        let angle =
            |dot: f64, l1: f64, l2: f64| (dot / (l1 * l2)).clamp(-1.0, 1.0).acos().to_degrees();
        UnitCell::new([
            a,
            b,
            c,
            angle(g[1][2], b, c),
            angle(g[0][2], a, c),
            angle(g[0][1], a, b),
        ])
    }

    pub fn parameters(&self) -> [f64; 6] {
        self.params
    }

    /// 1 - cos²α - cos²β - cos²γ + 2 cosα cosβ cosγ; the squared volume of a
    /// cell with unit lengths.
    fn volume_squared_factor(&self) -> f64 {
        let [ca, cb, cg] = self.cosines();
        1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg
    }

    fn cosines(&self) -> [f64; 3] {
        [
            self.params[3].to_radians().cos(),
            self.params[4].to_radians().cos(),
            self.params[5].to_radians().cos(),
        ]
    }

    pub fn volume(&self) -> f64 {
        self.params[0] * self.params[1] * self.params[2] * self.volume_squared_factor().sqrt()
    }

    /// The metric tensor G, with G_ij = a_i . a_j.
    pub fn metric_tensor(&self) -> Mat3 {
        let [a, b, c, ..] = self.params;
        let [ca, cb, cg] = self.cosines();
        [
            [a * a, a * b * cg, a * c * cb],
            [a * b * cg, b * b, b * c * ca],
            [a * c * cb, b * c * ca, c * c],
        ]
    }

    /// The reciprocal metric tensor G* = G⁻¹.
    pub fn reciprocal_metric_tensor(&self) -> Mat3 {
        // `new` ensures the volume is positive, so G is invertible.
        mat3_inverse(&self.metric_tensor()).unwrap_or([[0.0; 3]; 3])
    }

    /// The resolution (d-spacing) of a reflection [Å]. The reflection (0,0,0)
    /// has infinite d-spacing.
    pub fn d_spacing(&self, hkl: Hkl) -> f64 {
        let gs = self.reciprocal_metric_tensor();
        self.d_spacing_with(&gs, hkl)
    }

    /// As [`UnitCell::d_spacing`], but with a precomputed reciprocal metric
    /// tensor; useful when many reflections are checked.
    pub(crate) fn d_spacing_with(&self, gs: &Mat3, hkl: Hkl) -> f64 {
        let h = [hkl[0] as f64, hkl[1] as f64, hkl[2] as f64];
        let mut s = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                s += h[i] * gs[i][j] * h[j];
            }
        }
        1.0 / s.sqrt()
    }

    /// Cartesian coordinates of the basis vectors (rows). `a` is along x and
    /// `b` is in the xy plane.
    pub fn orthogonalisation(&self) -> Mat3 {
        let [a, b, c, ..] = self.params;
        let [ca, cb, cg] = self.cosines();
        let sg = self.params[5].to_radians().sin();
        let cy = (ca - cb * cg) / sg;
        let cz = (1.0 - cb * cb - cy * cy).max(0.0).sqrt();
        [
            [a, 0.0, 0.0],
            [b * cg, b * sg, 0.0],
            [c * cb, c * cy, c * cz],
        ]
    }

    /// Cartesian coordinates of the reciprocal basis vectors (rows), such that
    /// a_i . a*_j = δ_ij.
    pub fn reciprocal_orthogonalisation(&self) -> Mat3 {
        let o = self.orthogonalisation();
        mat3_transpose(&mat3_inverse(&o).unwrap_or([[0.0; 3]; 3]))
    }

    /// The cell after reindexing with `op`. The metric tensor transforms as
    /// G' = M G Mᵀ.
    pub fn change_basis(&self, op: &ReindexOperator) -> Result<UnitCell, SymmetryError> {
        let m = op.as_matrix();
        let g = mat3_mul(&mat3_mul(&m, &self.metric_tensor()), &mat3_transpose(&m));
        UnitCell::from_metric_tensor(&g)
    }

    /// The per-parameter median of many cells.
    pub fn median(cells: &[UnitCell]) -> Result<UnitCell, SymmetryError> {
        let mut params = [0.0; 6];
        for (i, p) in params.iter_mut().enumerate() {
            let values: Vec<f64> = cells.iter().map(|c| c.params[i]).collect();
            *p = median(&values).ok_or(SymmetryError::NoCells)?;
        }
        UnitCell::new(params)
    }
}

impl fmt::Display for UnitCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.params;
        write!(
            f,
            "({:.3}, {:.3}, {:.3}, {:.3}, {:.3}, {:.3})",
            p[0], p[1], p[2], p[3], p[4], p[5]
        )
    }
}
