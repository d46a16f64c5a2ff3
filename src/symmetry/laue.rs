// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Laue classes and lattice centrings of space groups. Intensities are only
//! ever compared after Friedel pairs are merged, so the Laue group (the point
//! group plus inversion) is all the symmetry we need. Translations and
//! systematic absences are ignored.
//!
//! Standard settings are assumed: unique axis b for monoclinic groups and
//! hexagonal axes for rhombohedral groups.

use strum_macros::{Display, EnumIter};

use super::{Hkl, ReindexOperator, SymmetryError};
use crate::math::{imat3_mul, IMat3, IDENTITY};

const INVERSION: IMat3 = [[-1, 0, 0], [0, -1, 0], [0, 0, -1]];
const TWOFOLD_A: IMat3 = [[1, 0, 0], [0, -1, 0], [0, 0, -1]];
const TWOFOLD_B: IMat3 = [[-1, 0, 0], [0, 1, 0], [0, 0, -1]];
const TWOFOLD_C: IMat3 = [[-1, 0, 0], [0, -1, 0], [0, 0, 1]];
const FOURFOLD_C: IMat3 = [[0, -1, 0], [1, 0, 0], [0, 0, 1]];
/// (h,k,l) -> (k,-h-k,l)
const THREEFOLD_C_HEX: IMat3 = [[0, 1, 0], [-1, -1, 0], [0, 0, 1]];
/// (h,k,l) -> (h+k,-h,l)
const SIXFOLD_C: IMat3 = [[1, 1, 0], [-1, 0, 0], [0, 0, 1]];
/// (h,k,l) -> (k,h,-l); the twofold of 321-type groups.
const TWOFOLD_321: IMat3 = [[0, 1, 0], [1, 0, 0], [0, 0, -1]];
/// (h,k,l) -> (-k,-h,-l); the twofold of 312-type groups.
const TWOFOLD_312: IMat3 = [[0, -1, 0], [-1, 0, 0], [0, 0, -1]];
/// (h,k,l) -> (l,h,k); the cubic threefold along [111].
const THREEFOLD_111: IMat3 = [[0, 0, 1], [1, 0, 0], [0, 1, 0]];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum LaueClass {
    #[strum(serialize = "-1")]
    Triclinic,

    #[strum(serialize = "2/m")]
    Monoclinic,

    #[strum(serialize = "mmm")]
    Orthorhombic,

    #[strum(serialize = "4/m")]
    Tetragonal,

    #[strum(serialize = "4/mmm")]
    TetragonalHolohedral,

    #[strum(serialize = "-3")]
    Trigonal,

    #[strum(serialize = "-3m1")]
    Trigonal3m1,

    #[strum(serialize = "-31m")]
    Trigonal31m,

    #[strum(serialize = "6/m")]
    Hexagonal,

    #[strum(serialize = "6/mmm")]
    HexagonalHolohedral,

    #[strum(serialize = "m-3")]
    Cubic,

    #[strum(serialize = "m-3m")]
    CubicHolohedral,
}

impl LaueClass {
    pub fn from_space_group(number: u16) -> Result<LaueClass, SymmetryError> {
        use LaueClass::*;

        let class = match number {
            1..=2 => Triclinic,
            3..=15 => Monoclinic,
            16..=74 => Orthorhombic,
            75..=88 => Tetragonal,
            89..=142 => TetragonalHolohedral,
            143..=148 => Trigonal,
            149 | 151 | 153 | 157 | 159 | 162 | 163 => Trigonal31m,
            150 | 152 | 154..=156 | 158 | 160 | 161 | 164..=167 => Trigonal3m1,
            168..=176 => Hexagonal,
            177..=194 => HexagonalHolohedral,
            195..=206 => Cubic,
            207..=230 => CubicHolohedral,
            _ => return Err(SymmetryError::InvalidSpaceGroup(number)),
        };
        Ok(class)
    }

    /// Rotations generating the proper part of this Laue class.
    fn generators(self) -> Vec<IMat3> {
        use LaueClass::*;

        match self {
            Triclinic => vec![],
            Monoclinic => vec![TWOFOLD_B],
            Orthorhombic => vec![TWOFOLD_C, TWOFOLD_B],
            Tetragonal => vec![FOURFOLD_C],
            TetragonalHolohedral => vec![FOURFOLD_C, TWOFOLD_A],
            Trigonal => vec![THREEFOLD_C_HEX],
            Trigonal3m1 => vec![THREEFOLD_C_HEX, TWOFOLD_321],
            Trigonal31m => vec![THREEFOLD_C_HEX, TWOFOLD_312],
            Hexagonal => vec![SIXFOLD_C],
            HexagonalHolohedral => vec![SIXFOLD_C, TWOFOLD_321],
            Cubic => vec![TWOFOLD_C, TWOFOLD_A, THREEFOLD_111],
            CubicHolohedral => vec![FOURFOLD_C, THREEFOLD_111],
        }
    }
}

/// The lattice centring of a space group (in its standard setting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Centring {
    P,
    A,
    C,
    I,
    F,
    /// Rhombohedral centring on hexagonal axes (obverse).
    R,
}

impl Centring {
    pub fn from_space_group(number: u16) -> Result<Centring, SymmetryError> {
        use Centring::*;

        let centring = match number {
            5 | 8 | 9 | 12 | 15 | 20 | 21 | 35..=37 | 63..=68 => C,
            38..=41 => A,
            23 | 24 | 44..=46 | 71..=74 | 79 | 80 | 82 | 87 | 88 | 97 | 98 | 107..=110
            | 119..=122 | 139..=142 | 197 | 199 | 204 | 206 | 211 | 214 | 217 | 220 | 229
            | 230 => I,
            22 | 42 | 43 | 69 | 70 | 196 | 202 | 203 | 209 | 210 | 216 | 219 | 225..=228 => F,
            146 | 148 | 155 | 160 | 161 | 166 | 167 => R,
            1..=230 => P,
            _ => return Err(SymmetryError::InvalidSpaceGroup(number)),
        };
        Ok(centring)
    }

    /// The operator taking indices of the centred cell to indices of a
    /// primitive cell of the same lattice. Rows are the primitive basis
    /// vectors in terms of the centred ones.
    pub fn to_primitive(self) -> ReindexOperator {
        use Centring::*;

        let (num, den) = match self {
            P => return ReindexOperator::identity(),
            A => ([[2, 0, 0], [0, 1, 1], [0, -1, 1]], 2),
            C => ([[1, 1, 0], [-1, 1, 0], [0, 0, 2]], 2),
            I => ([[-1, 1, 1], [1, -1, 1], [1, 1, -1]], 2),
            F => ([[0, 1, 1], [1, 0, 1], [1, 1, 0]], 2),
            R => ([[2, 1, 1], [-1, 1, 1], [-1, -2, 1]], 3),
        };
        // None of these matrices are singular.
        ReindexOperator::new(num, den).unwrap_or_default()
    }
}

/// The rotation matrices of a Laue group, including the inversion, acting on
/// Miller indices.
#[derive(Debug, Clone)]
pub struct LaueGroup {
    class: LaueClass,
    ops: Vec<IMat3>,
}

impl LaueGroup {
    pub fn new(class: LaueClass) -> LaueGroup {
        let mut generators = class.generators();
        generators.push(INVERSION);

        // Closure under multiplication. These groups have at most 48 elements.
        let mut ops = vec![IDENTITY];
        let mut i = 0;
        while i < ops.len() {
            for g in &generators {
                let product = imat3_mul(g, &ops[i]);
                if !ops.contains(&product) {
                    ops.push(product);
                }
            }
            i += 1;
        }

        LaueGroup { class, ops }
    }

    pub fn from_space_group(number: u16) -> Result<LaueGroup, SymmetryError> {
        Ok(LaueGroup::new(LaueClass::from_space_group(number)?))
    }

    pub fn class(&self) -> LaueClass {
        self.class
    }

    /// The number of symmetry operations (including the inversion).
    pub fn order(&self) -> usize {
        self.ops.len()
    }

    pub(crate) fn ops(&self) -> &[IMat3] {
        &self.ops
    }

    /// Is this operator one of the group's operations?
    pub fn contains(&self, op: &ReindexOperator) -> bool {
        op.is_integral() && self.ops.contains(op.numerators())
    }

    /// Map Miller indices to a canonical representative of their equivalence
    /// class. The representative is the lexicographically largest of all
    /// symmetry-equivalent indices (Friedel mates included).
    pub fn map_to_asu(&self, hkl: Hkl) -> Hkl {
        self.ops
            .iter()
            .map(|m| {
                let mut out = [0; 3];
                for (o, row) in out.iter_mut().zip(m.iter()) {
                    *o = (row[0] * hkl[0] as i64 + row[1] * hkl[1] as i64 + row[2] * hkl[2] as i64)
                        as i32;
                }
                out
            })
            .max()
            .unwrap_or(hkl)
    }
}
