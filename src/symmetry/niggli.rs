// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Niggli reduction of primitive cells, following the algorithm of Křivý and
//! Gruber (1976) with the epsilon comparisons of Grosse-Kunstleve et al.
//! (2004).

use log::trace;

use super::{ReindexOperator, SymmetryError, UnitCell};
use crate::{
    constants::{NIGGLI_EPSILON, NIGGLI_MAX_ITERATIONS},
    math::{imat3_mul, imat3_transpose, IMat3, Mat3, IDENTITY},
};

/// The six scalars (A, B, C, ξ, η, ζ) of a metric tensor, where ξ = 2 b.c,
/// η = 2 a.c and ζ = 2 a.b.
struct Scalars {
    a: f64,
    b: f64,
    c: f64,
    xi: f64,
    eta: f64,
    zeta: f64,
}

impl Scalars {
    fn new(g: &Mat3) -> Scalars {
        Scalars {
            a: g[0][0],
            b: g[1][1],
            c: g[2][2],
            xi: 2.0 * g[1][2],
            eta: 2.0 * g[0][2],
            zeta: 2.0 * g[0][1],
        }
    }
}

/// Sign of a value, treating anything within `eps` of 0 as 0.
fn sign_eps(v: f64, eps: f64) -> i32 {
    if v > eps {
        1
    } else if v < -eps {
        -1
    } else {
        0
    }
}

fn sign(v: f64) -> i64 {
    if v > 0.0 {
        1
    } else {
        -1
    }
}

/// The column transformation `S` as a step of the reduction: G <- Sᵀ G S.
fn transform_metric(g: &Mat3, s: &IMat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            let mut v = 0.0;
            for k in 0..3 {
                for l in 0..3 {
                    v += s[k][i] as f64 * g[k][l] * s[l][j] as f64;
                }
            }
            out[i][j] = v;
        }
    }
    out
}

/// Which step of the reduction applies to these scalars, if any. The returned
/// matrix is a column transformation of the basis.
fn next_step(s: &Scalars, eps: f64) -> Option<(&'static str, IMat3)> {
    // A1
    if s.a > s.b + eps || ((s.a - s.b).abs() < eps && s.xi.abs() > s.eta.abs() + eps) {
        return Some(("A1", [[0, -1, 0], [-1, 0, 0], [0, 0, -1]]));
    }
    // A2
    if s.b > s.c + eps || ((s.b - s.c).abs() < eps && s.eta.abs() > s.zeta.abs() + eps) {
        return Some(("A2", [[-1, 0, 0], [0, 0, -1], [0, -1, 0]]));
    }

    // A3 and A4 make ξ, η and ζ either all positive or all non-positive.
    let signs = [
        sign_eps(s.xi, eps),
        sign_eps(s.eta, eps),
        sign_eps(s.zeta, eps),
    ];
    let num_positive = signs.iter().filter(|&&l| l == 1).count();
    let num_zero = signs.iter().filter(|&&l| l == 0).count();
    if num_positive == 3 || (num_zero == 0 && num_positive == 1) {
        // A3
        let d: Vec<i64> = signs.iter().map(|&l| if l == -1 { -1 } else { 1 }).collect();
        let m = [[d[0], 0, 0], [0, d[1], 0], [0, 0, d[2]]];
        if m != IDENTITY {
            return Some(("A3", m));
        }
    } else {
        // A4
        let mut d = [1, 1, 1];
        let mut zero_index = None;
        for (i, &l) in signs.iter().enumerate() {
            match l {
                1 => d[i] = -1,
                0 => zero_index = Some(i),
                _ => (),
            }
        }
        if d.iter().product::<i64>() < 0 {
            if let Some(i) = zero_index {
                d[i] = -1;
            }
        }
        let m = [[d[0], 0, 0], [0, d[1], 0], [0, 0, d[2]]];
        if m != IDENTITY {
            return Some(("A4", m));
        }
    }

    // A5
    if s.xi.abs() > s.b + eps
        || ((s.xi - s.b).abs() < eps && 2.0 * s.eta < s.zeta - eps)
        || ((s.xi + s.b).abs() < eps && s.zeta < -eps)
    {
        return Some(("A5", [[1, 0, 0], [0, 1, -sign(s.xi)], [0, 0, 1]]));
    }
    // A6
    if s.eta.abs() > s.a + eps
        || ((s.eta - s.a).abs() < eps && 2.0 * s.xi < s.zeta - eps)
        || ((s.eta + s.a).abs() < eps && s.zeta < -eps)
    {
        return Some(("A6", [[1, 0, -sign(s.eta)], [0, 1, 0], [0, 0, 1]]));
    }
    // A7
    if s.zeta.abs() > s.a + eps
        || ((s.zeta - s.a).abs() < eps && 2.0 * s.xi < s.eta - eps)
        || ((s.zeta + s.a).abs() < eps && s.eta < -eps)
    {
        return Some(("A7", [[1, -sign(s.zeta), 0], [0, 1, 0], [0, 0, 1]]));
    }
    // A8
    let sum = s.xi + s.eta + s.zeta + s.a + s.b;
    if sum < -eps || (sum.abs() < eps && 2.0 * (s.a + s.eta) + s.zeta > eps) {
        return Some(("A8", [[1, 0, 1], [0, 1, 1], [0, 0, 1]]));
    }

    None
}

/// Reduce a primitive cell to its Niggli cell. Also returned is the
/// reindexing operator taking indices of the input cell to indices of the
/// reduced cell.
pub fn niggli_reduce(cell: &UnitCell) -> Result<(UnitCell, ReindexOperator), SymmetryError> {
    let eps = NIGGLI_EPSILON * cell.volume().powf(2.0 / 3.0);
    let mut g = cell.metric_tensor();
    // Columns of `t` are the reduced basis vectors in terms of the input ones.
    let mut t = IDENTITY;

    for _ in 0..NIGGLI_MAX_ITERATIONS {
        match next_step(&Scalars::new(&g), eps) {
            Some((name, s)) => {
                trace!("Niggli step {name}");
                g = transform_metric(&g, &s);
                t = imat3_mul(&t, &s);
            }
            None => {
                let reduced = UnitCell::from_metric_tensor(&g)?;
                let op = ReindexOperator::from_integer_matrix(imat3_transpose(&t))?;
                return Ok((reduced, op));
            }
        }
    }

    Err(SymmetryError::NiggliNotConverged(cell.parameters()))
}
