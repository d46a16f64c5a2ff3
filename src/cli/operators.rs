// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Print the reindexing operators that relate the possible indexings of a
//! single file.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use super::common::InfoPrinter;
use crate::{
    constants::DEFAULT_MAX_DELTA,
    io::xds_ascii::XdsAscii,
    symmetry::{find_reindex_operators, CrystalSymmetry, OperatorList, ReindexOperator},
    AmbiguityError,
};

#[derive(Parser, Debug)]
pub(super) struct OperatorsArgs {
    /// The XDS_ASCII file whose symmetry is used.
    #[clap(name = "XDS_ASCII", parse(from_os_str))]
    file: PathBuf,

    /// The maximum obliquity of lattice twofold axes [degrees].
    #[clap(long, default_value_t = DEFAULT_MAX_DELTA)]
    max_delta: f64,

    /// Print the operators for the Niggli-reduced primitive cell (in P1)
    /// instead.
    #[clap(long)]
    from_p1: bool,
}

impl OperatorsArgs {
    pub(super) fn run(self) -> Result<(), AmbiguityError> {
        let (symmetry, to_p1, operators) = self.operators()?;

        let mut printer = InfoPrinter::new(format!("Operators for {}", self.file.display()).into());
        let mut block = vec![format!("Symmetry: {symmetry}").into()];
        if let Some(to_p1) = to_p1 {
            block.push(format!("Reduced from the file's cell with {to_p1}").into());
        }
        printer.push_block(block);
        printer.push_line(format!("Maximum obliquity: {}°", self.max_delta).into());
        printer.display();

        if !operators.is_ambiguous() {
            info!("No indexing ambiguity");
        }
        for (i, op) in operators.iter().enumerate() {
            info!("{i:3}: {op}");
        }
        Ok(())
    }

    fn operators(
        &self,
    ) -> Result<(CrystalSymmetry, Option<ReindexOperator>, OperatorList), AmbiguityError> {
        if !self.max_delta.is_finite() || self.max_delta < 0.0 {
            return Err(AmbiguityError::Args(format!(
                "The maximum obliquity must be a non-negative number of degrees, but got {}",
                self.max_delta
            )));
        }
        let xds = XdsAscii::read(&self.file)?;
        let (symmetry, to_p1) = if self.from_p1 {
            let (reduced, to_p1) = xds.symmetry().reduced_p1()?;
            (reduced, Some(to_p1))
        } else {
            (*xds.symmetry(), None)
        };
        let operators = find_reindex_operators(&symmetry, self.max_delta)?;
        Ok((symmetry, to_p1, operators))
    }
}
