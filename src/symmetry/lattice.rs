// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Enumerate the reindexing operators that give distinct but equally valid
//! indexings of a lattice.
//!
//! The lattice symmetry is found with the method of Le Page (1982): twofold
//! axes are direct lattice vectors `u` that are (nearly) parallel to a
//! reciprocal lattice vector `h` with `|u.h|` of 1 or 2. The angle between
//! them (the obliquity) says how far the lattice is from having that twofold
//! exactly. The rotations of the lattice are then split into cosets of the
//! Laue group; one operator per coset is an indexing choice.

use std::{collections::HashMap, fmt, ops::Deref, str::FromStr};

use itertools::Itertools;
use log::{debug, trace};
use vec1::Vec1;

use super::{CrystalSymmetry, ReindexOperator, SymmetryError};
use crate::{
    constants::{LE_PAGE_INDEX_LIMIT, MAX_LATTICE_ROTATIONS},
    math::{angle_between, imat3_mul, imat3_transpose, vec_mat_mul, IMat3, IDENTITY},
};

/// An ordered list of distinct reindexing operators. The identity operator is
/// always present, and always first.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorList(Vec1<ReindexOperator>);

impl OperatorList {
    /// Make a list from some operators. Duplicates are removed (keeping the
    /// first occurrence) and the identity is moved to (or inserted at) the
    /// front.
    pub fn new<I: IntoIterator<Item = ReindexOperator>>(ops: I) -> OperatorList {
        let mut list = Vec1::new(ReindexOperator::identity());
        for op in ops {
            if !list.contains(&op) {
                list.push(op);
            }
        }
        OperatorList(list)
    }

    /// A list with only the identity operator.
    pub fn identity_only() -> OperatorList {
        OperatorList(Vec1::new(ReindexOperator::identity()))
    }

    /// Are there any operators besides the identity?
    pub fn is_ambiguous(&self) -> bool {
        self.0.len() > 1
    }

    pub fn as_slice(&self) -> &[ReindexOperator] {
        self.0.as_slice()
    }
}

impl Deref for OperatorList {
    type Target = [ReindexOperator];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl fmt::Display for OperatorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("; "))
    }
}

impl FromStr for OperatorList {
    type Err = SymmetryError;

    /// Parse operators separated by semicolons, e.g. "h,k,l; k,h,-l". Empty
    /// entries are skipped, but at least one operator must be given.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ops = s
            .split(';')
            .map(str::trim)
            .filter(|op| !op.is_empty())
            .map(ReindexOperator::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        if ops.is_empty() {
            return Err(SymmetryError::ParseOperator {
                op: s.to_string(),
                reason: "no operators were given".to_string(),
            });
        }
        Ok(OperatorList::new(ops))
    }
}

/// A twofold axis found by the Le Page search.
#[derive(Debug, Clone, Copy)]
struct Twofold {
    /// The rotation acting on fractional coordinates of the reduced cell.
    rotation: IMat3,
    /// [degrees]
    obliquity: f64,
}

/// All vectors with components in `-limit..=limit` whose components have no
/// common factor and whose first non-zero component is positive.
fn primitive_directions(limit: i64) -> Vec<[i64; 3]> {
    let range = || -limit..=limit;
    let mut out = vec![];
    for (a, b, c) in itertools::iproduct!(range(), range(), range()) {
        let v = [a, b, c];
        let first_nonzero = v.iter().copied().find(|&x| x != 0);
        match first_nonzero {
            Some(x) if x > 0 => (),
            _ => continue,
        }
        if crate::math::gcd(crate::math::gcd(a, b), c) == 1 {
            out.push(v);
        }
    }
    out
}

/// Find the twofold axes of the lattice of a (reduced) cell with obliquities
/// of at most `max_delta` degrees. The result is sorted by obliquity.
fn le_page_twofolds(symmetry: &CrystalSymmetry, max_delta: f64) -> Vec<Twofold> {
    let orth = symmetry.cell.orthogonalisation();
    let recip = symmetry.cell.reciprocal_orthogonalisation();
    let directions = primitive_directions(LE_PAGE_INDEX_LIMIT);

    let mut twofolds: HashMap<IMat3, f64> = HashMap::new();
    for u in &directions {
        let u_cart = vec_mat_mul([u[0] as f64, u[1] as f64, u[2] as f64], &orth);
        for h in &directions {
            let uh = u[0] * h[0] + u[1] * h[1] + u[2] * h[2];
            if !(uh.abs() == 1 || uh.abs() == 2) {
                continue;
            }
            let h_cart = vec_mat_mul([h[0] as f64, h[1] as f64, h[2] as f64], &recip);
            let angle = angle_between(u_cart, h_cart).to_degrees();
            let delta = angle.min(180.0 - angle);
            if delta > max_delta {
                continue;
            }

            // W = 2 u hᵀ / (u.h) - I must be integral to map the lattice onto
            // itself.
            let mut w = [[0; 3]; 3];
            let mut integral = true;
            for i in 0..3 {
                for j in 0..3 {
                    let n = 2 * u[i] * h[j];
                    if n % uh != 0 {
                        integral = false;
                    }
                    w[i][j] = n / uh - if i == j { 1 } else { 0 };
                }
            }
            if !integral {
                continue;
            }

            let entry = twofolds.entry(w).or_insert(delta);
            if delta < *entry {
                *entry = delta;
            }
        }
    }

    let mut twofolds = twofolds
        .into_iter()
        .map(|(rotation, obliquity)| Twofold {
            rotation,
            obliquity,
        })
        .collect::<Vec<_>>();
    // Sort by obliquity, then by the matrix so that the order is
    // deterministic.
    twofolds.sort_by(|a, b| {
        a.obliquity
            .total_cmp(&b.obliquity)
            .then_with(|| a.rotation.cmp(&b.rotation))
    });
    twofolds
}

/// The closure of a set of rotations under multiplication. Returns `None` if
/// the group would have more than `limit` elements.
fn group_closure(generators: &[IMat3], limit: usize) -> Option<Vec<IMat3>> {
    let mut group = vec![IDENTITY];
    let mut i = 0;
    while i < group.len() {
        for g in generators {
            let product = imat3_mul(g, &group[i]);
            if !group.contains(&product) {
                if group.len() == limit {
                    return None;
                }
                group.push(product);
            }
        }
        i += 1;
    }
    Some(group)
}

/// The rotations of the lattice (as fractional-coordinate matrices of the
/// reduced cell). Twofolds are added in order of increasing obliquity; one
/// that would generate an impossibly large group is not compatible with the
/// twofolds already accepted and is skipped.
fn lattice_rotations(twofolds: &[Twofold]) -> Vec<IMat3> {
    let mut generators: Vec<IMat3> = vec![];
    let mut group = vec![IDENTITY];
    for twofold in twofolds {
        if group.contains(&twofold.rotation) {
            continue;
        }
        generators.push(twofold.rotation);
        match group_closure(&generators, MAX_LATTICE_ROTATIONS) {
            Some(g) => {
                trace!(
                    "Accepted twofold {:?} (obliquity {:.3}°); group order is now {}",
                    twofold.rotation,
                    twofold.obliquity,
                    g.len()
                );
                group = g;
            }
            None => {
                debug!(
                    "Skipping twofold {:?} (obliquity {:.3}°); it is inconsistent with the other twofolds",
                    twofold.rotation, twofold.obliquity
                );
                generators.pop();
            }
        }
    }
    group
}

/// Find the reindexing operators that relate the possible indexings of data
/// with this symmetry. Candidate twofolds have obliquities of at most
/// `max_delta` degrees.
///
/// The operators act on the indices of the given symmetry's cell. One operator
/// is given per coset of the Laue group, represented by its simplest member;
/// the identity is always first.
pub fn find_reindex_operators(
    symmetry: &CrystalSymmetry,
    max_delta: f64,
) -> Result<OperatorList, SymmetryError> {
    let laue_group = symmetry.laue_group()?;
    let (reduced, to_reduced) = symmetry.reduced_p1()?;
    debug!(
        "Reduced cell {} (from {} with {})",
        reduced.cell, symmetry.cell, to_reduced
    );

    let twofolds = le_page_twofolds(&reduced, max_delta);
    debug!("Found {} lattice twofold(s) within {max_delta}°", twofolds.len());
    let rotations = lattice_rotations(&twofolds);

    // The reduced-cell rotation W acts on fractional coordinates; the
    // corresponding change of basis on Miller indices is Wᵀ. Conjugate that
    // back into the input cell's setting.
    let from_reduced = to_reduced.inverse();
    let mut ops = rotations
        .iter()
        .map(|w| {
            let m = ReindexOperator::from_integer_matrix(imat3_transpose(w))?;
            Ok(from_reduced.compose(&m).compose(&to_reduced))
        })
        .collect::<Result<Vec<_>, SymmetryError>>()?;
    ops.sort_by_key(|op| (!op.is_identity(), op.simplicity_key()));

    // Right cosets: op2 is equivalent to op1 if op2 = g op1 for some g in
    // the Laue group.
    let mut representatives: Vec<ReindexOperator> = vec![];
    for op in ops {
        let equivalent = representatives
            .iter()
            .any(|r| laue_group.contains(&op.compose(&r.inverse())));
        if !equivalent {
            representatives.push(op);
        }
    }

    debug!(
        "{} lattice rotation(s), Laue group {} of order {}, {} coset(s)",
        rotations.len(),
        laue_group.class(),
        laue_group.order(),
        representatives.len()
    );
    Ok(OperatorList::new(representatives))
}
