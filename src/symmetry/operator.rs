// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reindexing (change-of-basis) operators acting on Miller indices.
//!
//! An operator is a 3x3 rational matrix `M`; reindexed indices are
//! `h' = M h` with `h` a column vector. The new direct basis vectors are
//! `a'_i = sum_j M_ij a_j`. Rational entries are needed when centred cells are
//! involved (e.g. going from a C-centred cell to its primitive cell), but for
//! reflections allowed by the lattice the result is always integral.

use std::{fmt, str::FromStr};

use super::{Hkl, SymmetryError};
use crate::math::{gcd, imat3_adjugate, imat3_det, imat3_mul, IMat3, Mat3, IDENTITY};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReindexOperator {
    /// Numerators of the matrix.
    num: IMat3,
    /// The common (positive) denominator.
    den: i64,
}

impl ReindexOperator {
    pub fn identity() -> ReindexOperator {
        ReindexOperator {
            num: IDENTITY,
            den: 1,
        }
    }

    /// Create a new operator from an integer matrix. The matrix must be
    /// invertible.
    pub fn from_integer_matrix(m: IMat3) -> Result<ReindexOperator, SymmetryError> {
        ReindexOperator::new(m, 1)
    }

    /// Create a new operator `num / den`. The matrix must be invertible and
    /// `den` must not be zero.
    pub fn new(num: IMat3, den: i64) -> Result<ReindexOperator, SymmetryError> {
        if den == 0 {
            return Err(SymmetryError::SingularOperator(format!("{num:?}/0")));
        }
        let op = ReindexOperator::normalised(num, den);
        if imat3_det(&op.num) == 0 {
            return Err(SymmetryError::SingularOperator(op.as_hkl()));
        }
        Ok(op)
    }

    /// Make the denominator positive and remove common factors.
    fn normalised(mut num: IMat3, mut den: i64) -> ReindexOperator {
        if den < 0 {
            den = -den;
            num.iter_mut().flatten().for_each(|n| *n = -*n);
        }
        let g = num.iter().flatten().fold(den, |acc, &n| gcd(acc, n));
        if g > 1 {
            den /= g;
            num.iter_mut().flatten().for_each(|n| *n /= g);
        }
        ReindexOperator { num, den }
    }

    pub fn is_identity(&self) -> bool {
        self.den == 1 && self.num == IDENTITY
    }

    /// Does this operator only have integer entries?
    pub fn is_integral(&self) -> bool {
        self.den == 1
    }

    pub(crate) fn numerators(&self) -> &IMat3 {
        &self.num
    }

    pub(crate) fn denominator(&self) -> i64 {
        self.den
    }

    pub fn determinant(&self) -> f64 {
        imat3_det(&self.num) as f64 / (self.den as f64).powi(3)
    }

    /// The matrix as floats.
    pub fn as_matrix(&self) -> Mat3 {
        let mut m = [[0.0; 3]; 3];
        for (i, row) in self.num.iter().enumerate() {
            for (j, &n) in row.iter().enumerate() {
                m[i][j] = n as f64 / self.den as f64;
            }
        }
        m
    }

    /// The inverse operator.
    pub fn inverse(&self) -> ReindexOperator {
        // inv(num / den) = den * adj(num) / det(num). `new` guarantees that
        // det(num) isn't 0.
        let det = imat3_det(&self.num);
        let mut adj = imat3_adjugate(&self.num);
        adj.iter_mut().flatten().for_each(|n| *n *= self.den);
        ReindexOperator::normalised(adj, det)
    }

    /// The operator that applies `other` first, then `self` (i.e. the matrix
    /// product `self * other`).
    pub fn compose(&self, other: &ReindexOperator) -> ReindexOperator {
        ReindexOperator::normalised(imat3_mul(&self.num, &other.num), self.den * other.den)
    }

    /// Apply this operator to Miller indices. Returns `None` if the result
    /// isn't integral, which only happens for reflections that the lattice
    /// doesn't allow.
    pub fn apply(&self, hkl: Hkl) -> Option<Hkl> {
        let mut out = [0; 3];
        for (o, row) in out.iter_mut().zip(self.num.iter()) {
            let v = row[0] * hkl[0] as i64 + row[1] * hkl[1] as i64 + row[2] * hkl[2] as i64;
            if v % self.den != 0 {
                return None;
            }
            *o = (v / self.den) as i32;
        }
        Some(out)
    }

    /// Transform direct-space basis vectors (rows of `basis`) the same way the
    /// unit cell is transformed.
    pub fn transform_basis(&self, basis: &Mat3) -> Mat3 {
        crate::math::mat3_mul(&self.as_matrix(), basis)
    }

    /// A key used to pick the "simplest" of several equivalent operators;
    /// integral operators with small, mostly-positive entries sort first.
    pub(crate) fn simplicity_key(&self) -> (i64, i64, usize, [i64; 9]) {
        let flat: Vec<i64> = self.num.iter().flatten().copied().collect();
        let sum_abs = flat.iter().map(|n| n.abs()).sum();
        let num_negative = flat.iter().filter(|&&n| n < 0).count();
        let mut reversed = [0; 9];
        for (r, n) in reversed.iter_mut().zip(flat.iter()) {
            *r = -n;
        }
        (self.den, sum_abs, num_negative, reversed)
    }

    /// The operator in "h,k,l" notation, e.g. "k,h,-l".
    pub fn as_hkl(&self) -> String {
        self.num
            .iter()
            .map(|row| format_row(row, self.den))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for ReindexOperator {
    fn default() -> Self {
        ReindexOperator::identity()
    }
}

impl fmt::Display for ReindexOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hkl())
    }
}

fn format_row(row: &[i64; 3], den: i64) -> String {
    let mut s = String::new();
    for (&c, symbol) in row.iter().zip(['h', 'k', 'l']) {
        if c == 0 {
            continue;
        }
        let g = gcd(c, den);
        let (n, d) = (c / g, den / g);
        if n < 0 {
            s.push('-');
        } else if !s.is_empty() {
            s.push('+');
        }
        match (n.abs(), d) {
            (1, 1) => (),
            (a, 1) => s.push_str(&a.to_string()),
            (a, d) => s.push_str(&format!("{a}/{d}*")),
        }
        s.push(symbol);
    }
    if s.is_empty() {
        s.push('0');
    }
    s
}

impl FromStr for ReindexOperator {
    type Err = SymmetryError;

    /// Parse "h,k,l"-style notation. Each of the three comma-separated rows is
    /// a sum of terms like `h`, `-k`, `2l`, `1/2*h` or `h/2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: String| SymmetryError::ParseOperator {
            op: s.to_string(),
            reason,
        };

        let rows: Vec<&str> = s.split(',').map(|r| r.trim()).collect();
        if rows.len() != 3 {
            return Err(err(format!("expected 3 rows, got {}", rows.len())));
        }

        // Parse each row into (numerator, denominator) pairs.
        let mut rational_rows = [[(0, 1); 3]; 3];
        for (row_str, rational_row) in rows.iter().zip(rational_rows.iter_mut()) {
            *rational_row = parse_row(row_str).map_err(err)?;
        }

        // Bring everything to a common denominator.
        let den = rational_rows
            .iter()
            .flatten()
            .fold(1, |acc, &(_, d)| acc / gcd(acc, d) * d);
        let mut num = [[0; 3]; 3];
        for (num_row, rational_row) in num.iter_mut().zip(rational_rows.iter()) {
            for (n, &(rn, rd)) in num_row.iter_mut().zip(rational_row.iter()) {
                *n = rn * (den / rd);
            }
        }

        ReindexOperator::new(num, den)
    }
}

/// Parse a single row like "-h+1/2*k" into rational coefficients of h, k and
/// l.
fn parse_row(row: &str) -> Result<[(i64, i64); 3], String> {
    let chars: Vec<char> = row.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return Err("empty row".to_string());
    }

    let mut coeffs = [(0, 1); 3];
    let mut pos = 0;
    while pos < chars.len() {
        let mut sign = 1;
        match chars[pos] {
            '+' => pos += 1,
            '-' => {
                sign = -1;
                pos += 1
            }
            _ if pos > 0 => return Err(format!("expected '+' or '-' at '{}'", chars[pos])),
            _ => (),
        }

        let read_int = |pos: &mut usize| -> Option<i64> {
            let start = *pos;
            while *pos < chars.len() && chars[*pos].is_ascii_digit() {
                *pos += 1;
            }
            if *pos == start {
                None
            } else {
                chars[start..*pos].iter().collect::<String>().parse().ok()
            }
        };

        let mut n = read_int(&mut pos).unwrap_or(1);
        let mut d = 1;
        if pos < chars.len() && chars[pos] == '/' {
            pos += 1;
            d = read_int(&mut pos).ok_or_else(|| "expected a denominator".to_string())?;
        }
        if pos < chars.len() && chars[pos] == '*' {
            pos += 1;
        }

        let index = match chars.get(pos) {
            Some('h') | Some('H') => 0,
            Some('k') | Some('K') => 1,
            Some('l') | Some('L') => 2,
            Some(c) => return Err(format!("unexpected character '{c}'")),
            None => return Err("expected one of h, k or l".to_string()),
        };
        pos += 1;

        // "h/2" style.
        if pos < chars.len() && chars[pos] == '/' {
            pos += 1;
            let d2 = read_int(&mut pos).ok_or_else(|| "expected a denominator".to_string())?;
            d *= d2;
        }
        if d == 0 {
            return Err("zero denominator".to_string());
        }

        n *= sign;
        let (cn, cd) = coeffs[index];
        let new_d = cd / gcd(cd, d) * d;
        let new_n = cn * (new_d / cd) + n * (new_d / d);
        let g = gcd(new_n, new_d).max(1);
        coeffs[index] = (new_n / g, new_d / g);
    }

    Ok(coeffs)
}
