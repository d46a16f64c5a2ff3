// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::{ambiguity, get_cmd_output, Crystal};

#[test]
fn test_operators_subcommand() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let file = tmp_dir.path().join("p4.HKL");
    Crystal::new(10).write_dataset(&file, false);

    let cmd = ambiguity()
        .args(["operators", &file.display().to_string()])
        .ok();
    assert!(cmd.is_ok(), "operators failed: {:?}", get_cmd_output(cmd));
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.contains("h,k,l"), "{stdout}");
    assert!(stdout.contains("k,h,-l"), "{stdout}");

    // A tiny obliquity still finds the exact tetragonal twofolds.
    let cmd = ambiguity()
        .args(["operators", &file.display().to_string(), "--max-delta", "0.1"])
        .ok();
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("k,h,-l"), "{stdout}");

    let cmd = ambiguity()
        .args(["operators", &tmp_dir.path().join("missing.HKL").display().to_string()])
        .ok();
    assert!(cmd.is_err());
}
