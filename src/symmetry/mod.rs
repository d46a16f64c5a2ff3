// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Crystallographic symmetry: unit cells, reindexing operators, Laue groups
//! and the lattice symmetry that causes indexing ambiguities.

mod error;
mod lattice;
mod laue;
mod niggli;
mod operator;
mod unit_cell;

pub use error::SymmetryError;
pub use lattice::{find_reindex_operators, OperatorList};
pub use laue::{Centring, LaueClass, LaueGroup};
pub use niggli::niggli_reduce;
pub use operator::ReindexOperator;
pub use unit_cell::UnitCell;

use std::fmt;

/// Miller indices.
pub type Hkl = [i32; 3];

/// A unit cell and a space group (by its number in the International Tables).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrystalSymmetry {
    pub cell: UnitCell,
    pub space_group: u16,
}

impl CrystalSymmetry {
    pub fn new(cell: UnitCell, space_group: u16) -> Result<CrystalSymmetry, SymmetryError> {
        if !(1..=230).contains(&space_group) {
            return Err(SymmetryError::InvalidSpaceGroup(space_group));
        }
        Ok(CrystalSymmetry { cell, space_group })
    }

    pub fn laue_group(&self) -> Result<LaueGroup, SymmetryError> {
        LaueGroup::from_space_group(self.space_group)
    }

    pub fn centring(&self) -> Result<Centring, SymmetryError> {
        Centring::from_space_group(self.space_group)
    }

    /// The symmetry of the Niggli-reduced primitive cell (in P1), as well as
    /// the operator taking indices of this cell to indices of the reduced
    /// cell.
    pub fn reduced_p1(&self) -> Result<(CrystalSymmetry, ReindexOperator), SymmetryError> {
        let to_primitive = self.centring()?.to_primitive();
        let primitive = self.cell.change_basis(&to_primitive)?;
        let (reduced, to_reduced) = niggli_reduce(&primitive)?;
        Ok((
            CrystalSymmetry {
                cell: reduced,
                space_group: 1,
            },
            to_reduced.compose(&to_primitive),
        ))
    }
}

impl fmt::Display for CrystalSymmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (space group {})", self.cell, self.space_group)
    }
}
