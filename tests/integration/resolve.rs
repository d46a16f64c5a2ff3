// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;

use tempfile::TempDir;

use ambiguity::io::xds_ascii::XdsAscii;

use crate::{ambiguity, get_cmd_output, list_dir, Crystal};

fn path_str(p: &Path) -> String {
    p.display().to_string()
}

#[test]
fn test_dry_run_creates_no_files() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let (lstin, _) = Crystal::new(1).write_datasets(tmp_dir.path(), &[false, true, false]);
    let outdir = tmp_dir.path().join("out");
    let before = list_dir(tmp_dir.path());

    #[rustfmt::skip]
    let cmd = ambiguity()
        .args([
            "resolve",
            "--lstin", &path_str(&lstin),
            "--outdir", &path_str(&outdir),
            "--dry-run",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "resolve --dry-run failed: {:?}", get_cmd_output(cmd));
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.contains("Dry run"), "{stdout}");
    assert!(stdout.contains("k,h,-l"), "{stdout}");

    assert_eq!(list_dir(tmp_dir.path()), before);
    assert!(!outdir.exists());
}

#[test]
fn test_resolve_writes_reindexed_files() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let (lstin, paths) =
        Crystal::new(2).write_datasets(tmp_dir.path(), &[false, true, false, true]);
    let outdir = tmp_dir.path().join("out");

    #[rustfmt::skip]
    let cmd = ambiguity()
        .args([
            "resolve",
            "--lstin", &path_str(&lstin),
            "--outdir", &path_str(&outdir),
            "--nproc", "2",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "resolve failed: {:?}", get_cmd_output(cmd));
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.contains("Reindexing done"), "{stdout}");
    assert!(stdout.contains("Kabsch"), "{stdout}");

    // The manifest lists originals for unchanged datasets and the reindexed
    // files for the others, in input order.
    let manifest = std::fs::read_to_string(outdir.join("files_reindexed.lst")).unwrap();
    let listed: Vec<&str> = manifest.lines().collect();
    let expected = [
        path_str(&paths[0]),
        path_str(&tmp_dir.path().join("XDS_ASCII_1_reidx.HKL")),
        path_str(&paths[2]),
        path_str(&tmp_dir.path().join("XDS_ASCII_3_reidx.HKL")),
    ];
    assert_eq!(listed, expected);

    let cells = std::fs::read_to_string(outdir.join("files_reindexed_cells.dat")).unwrap();
    let mut lines = cells.lines();
    assert_eq!(lines.next(), Some("file a b c al be ga"));
    assert_eq!(lines.count(), 4);

    // The reindexed files have the indices of the first dataset's frame.
    let original = XdsAscii::read(&paths[1]).unwrap();
    let reindexed = XdsAscii::read(tmp_dir.path().join("XDS_ASCII_1_reidx.HKL")).unwrap();
    let original = original.observations("IOBS").unwrap();
    let reindexed = reindexed.observations("IOBS").unwrap();
    assert_eq!(original.len(), reindexed.len());
    for (o, r) in original.iter().zip(reindexed.iter()) {
        assert_eq!(r.hkl, [o.hkl[1], o.hkl[0], -o.hkl[2]]);
    }

    // The originals are untouched.
    assert!(paths.iter().all(|p| p.exists()));
    assert!(!tmp_dir.path().join("XDS_ASCII_0_reidx.HKL").exists());
}

#[test]
fn test_configuration_errors_exit_before_output() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let (lstin, _) = Crystal::new(3).write_datasets(tmp_dir.path(), &[false, true]);
    let lstin = path_str(&lstin);
    let outdir = tmp_dir.path().join("out");
    let outdir_str = path_str(&outdir);

    let bad_args: &[(&[&str], &str)] = &[
        (&["resolve", "--outdir", &outdir_str], "No file list"),
        (
            &["resolve", "--lstin", "/does/not/exist.lst", "--outdir", &outdir_str],
            "doesn't exist",
        ),
        (
            &["resolve", "--lstin", &lstin, "--strategy", "magic", "--outdir", &outdir_str],
            "Unknown strategy",
        ),
        (
            &["resolve", "--lstin", &lstin, "--strategy", "reference", "--outdir", &outdir_str],
            "needs a reference file",
        ),
        (
            &["resolve", "--lstin", &lstin, "--nproc", "0", "--outdir", &outdir_str],
            "number of threads",
        ),
        (
            &["resolve", "--lstin", &lstin, "--max-cycles", "0", "--outdir", &outdir_str],
            "number of cycles",
        ),
        (
            &["resolve", "--lstin", &lstin, "--d-min", "0", "--outdir", &outdir_str],
            "resolution limit",
        ),
        (
            &["resolve", "--lstin", &lstin, "--operators", "h,k", "--outdir", &outdir_str],
            "--operators",
        ),
    ];
    for (args, message) in bad_args {
        let cmd = ambiguity().args(*args).arg("--no-progress-bars").ok();
        assert!(cmd.is_err(), "{args:?} should have failed");
        let (_, stderr) = get_cmd_output(cmd);
        assert!(
            stderr.contains(message),
            "{args:?}: expected '{message}' in stderr: {stderr}"
        );
        assert!(!outdir.exists());
    }
    assert!(!tmp_dir.path().join("XDS_ASCII_1_reidx.HKL").exists());
}

#[test]
fn test_arguments_file_and_save_toml() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let (lstin, _) = Crystal::new(4).write_datasets(tmp_dir.path(), &[false, true, true]);
    let args_file = tmp_dir.path().join("args.toml");
    std::fs::write(
        &args_file,
        format!(
            "lstin = \"{}\"\nstrategy = \"brehm-diederichs\"\nseed = 42\n",
            lstin.display()
        ),
    )
    .unwrap();
    let saved = tmp_dir.path().join("saved.toml");

    #[rustfmt::skip]
    let cmd = ambiguity()
        .args([
            "resolve", &path_str(&args_file),
            "--save-toml", &path_str(&saved),
            "--dry-run",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "resolve failed: {:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Brehm & Diederichs"), "{stdout}");

    let saved = std::fs::read_to_string(saved).unwrap();
    assert!(saved.contains("brehm-diederichs"), "{saved}");
    assert!(saved.contains("seed = 42"), "{saved}");
}

#[test]
fn test_logfile_gets_a_copy_of_the_log() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let (lstin, _) = Crystal::new(5).write_datasets(tmp_dir.path(), &[false, false]);
    let logfile = tmp_dir.path().join("ambiguity.log");

    #[rustfmt::skip]
    let cmd = ambiguity()
        .args([
            "resolve",
            "--lstin", &path_str(&lstin),
            "--outdir", &path_str(&tmp_dir.path().join("out")),
            "--logfile", &path_str(&logfile),
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "resolve failed: {:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);

    let log = std::fs::read_to_string(logfile).unwrap();
    assert!(log.contains("ambiguity resolve complete."), "{log}");
    assert!(stdout.contains("ambiguity resolve complete."), "{stdout}");
}

#[test]
fn test_dry_run_doesnt_write_a_logfile() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let (lstin, _) = Crystal::new(6).write_datasets(tmp_dir.path(), &[false, true]);
    let logfile = tmp_dir.path().join("ambiguity.log");

    #[rustfmt::skip]
    let cmd = ambiguity()
        .args([
            "resolve",
            "--lstin", &path_str(&lstin),
            "--dry-run",
            "--logfile", &path_str(&logfile),
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "resolve failed: {:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Not writing a log file"), "{stdout}");
    assert!(!logfile.exists());
}
