// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod operators;
mod resolve;

use std::{
    collections::BTreeMap,
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Exp1;

use ambiguity::symmetry::{Hkl, LaueGroup};

fn ambiguity() -> Command {
    Command::cargo_bin("ambiguity").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// All files in a directory (not recursive), sorted.
fn list_dir(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}

/// Datasets of a P4 crystal (a = b = 50 Å, c = 80 Å). Datasets can be indexed
/// either as "h,k,l" or as "k,h,-l".
struct Crystal {
    truth: BTreeMap<Hkl, f64>,
    laue_group: LaueGroup,
    rng: StdRng,
}

impl Crystal {
    fn new(seed: u64) -> Crystal {
        Crystal {
            truth: BTreeMap::new(),
            laue_group: LaueGroup::from_space_group(75).unwrap(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Write an XDS_ASCII file with ~80% of the reflections up to index 8.
    fn write_dataset(&mut self, path: &Path, twinned: bool) {
        let mut f = File::create(path).unwrap();
        writeln!(f, "!FORMAT=XDS_ASCII    MERGE=FALSE    FRIEDEL'S_LAW=TRUE").unwrap();
        writeln!(f, "!SPACE_GROUP_NUMBER=   75").unwrap();
        writeln!(
            f,
            "!UNIT_CELL_CONSTANTS=    50.000    50.000    80.000  90.000  90.000  90.000"
        )
        .unwrap();
        writeln!(f, "!NUMBER_OF_ITEMS_IN_EACH_DATA_RECORD=5").unwrap();
        writeln!(f, "!ITEM_H=1").unwrap();
        writeln!(f, "!ITEM_K=2").unwrap();
        writeln!(f, "!ITEM_L=3").unwrap();
        writeln!(f, "!ITEM_IOBS=4").unwrap();
        writeln!(f, "!ITEM_SIGMA(IOBS)=5").unwrap();
        writeln!(f, "!END_OF_HEADER").unwrap();
        for h in -8..=8 {
            for k in -8..=8 {
                for l in -8..=8 {
                    if [h, k, l] == [0, 0, 0] || self.rng.gen::<f64>() > 0.8 {
                        continue;
                    }
                    let asu = self.laue_group.map_to_asu([h, k, l]);
                    let rng = &mut self.rng;
                    let truth = *self
                        .truth
                        .entry(asu)
                        .or_insert_with(|| rng.sample::<f64, _>(Exp1) * 1000.0);
                    let intensity = truth * (1.0 + 0.05 * self.rng.gen_range(-1.0..1.0));
                    let [h, k, l] = if twinned { [k, h, -l] } else { [h, k, l] };
                    writeln!(f, "{h:6}{k:6}{l:6} {intensity:12.3} {:10.3}", 10.0).unwrap();
                }
            }
        }
        writeln!(f, "!END_OF_DATA").unwrap();
    }

    /// Write datasets named "XDS_ASCII_<i>.HKL" into `dir`, as well as a
    /// list of them, "files.lst".
    fn write_datasets(&mut self, dir: &Path, twinned: &[bool]) -> (PathBuf, Vec<PathBuf>) {
        let mut paths = vec![];
        for (i, &twinned) in twinned.iter().enumerate() {
            let path = dir.join(format!("XDS_ASCII_{i}.HKL"));
            self.write_dataset(&path, twinned);
            paths.push(path);
        }
        let lstin = dir.join("files.lst");
        let mut f = File::create(&lstin).unwrap();
        writeln!(f, "# Made for a test").unwrap();
        for path in &paths {
            writeln!(f, "{}", path.display()).unwrap();
        }
        (lstin, paths)
    }
}
