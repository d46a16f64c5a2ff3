// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{io::Cursor, str::FromStr};

use approx::assert_abs_diff_eq;
use indoc::indoc;
use tempfile::TempDir;

use super::*;
use crate::symmetry::{CrystalSymmetry, ReindexOperator, UnitCell};

const SMALL_FILE: &str = indoc! {"
    !FORMAT=XDS_ASCII    MERGE=FALSE    FRIEDEL'S_LAW=TRUE
    !Generated by CORRECT
    !SPACE_GROUP_NUMBER=   75
    !UNIT_CELL_CONSTANTS=    50.000    50.000    80.000  90.000  90.000  90.000
    !UNIT_CELL_A-AXIS=    50.000     0.000     0.000
    !UNIT_CELL_B-AXIS=     0.000    50.000     0.000
    !UNIT_CELL_C-AXIS=     0.000     0.000    80.000
    !NUMBER_OF_ITEMS_IN_EACH_DATA_RECORD=6
    !ITEM_H=1
    !ITEM_K=2
    !ITEM_L=3
    !ITEM_IOBS=4
    !ITEM_SIGMA(IOBS)=5
    !ITEM_ZD=6
    !END_OF_HEADER
         1     2     3  1.000E+02  1.000E+01    10.5
        -2     1     4  2.500E+02  2.000E+01    11.5
         3     0     1  5.000E+01 -1.000E+00    12.5
    !END_OF_DATA
"};

fn parse(s: &str) -> Result<XdsAscii, XdsAsciiError> {
    XdsAscii::from_reader(Cursor::new(s), "test.HKL")
}

#[test]
fn test_parse_header_line() {
    let entries = parse_header_line("!FORMAT=XDS_ASCII    MERGE=FALSE    FRIEDEL'S_LAW=TRUE");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].key, "FORMAT");
    assert_eq!(entries[0].values, ["XDS_ASCII"]);
    assert_eq!(entries[2].key, "FRIEDEL'S_LAW");

    let entries = parse_header_line("!UNIT_CELL_CONSTANTS=    50.0  60.0");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].values, ["50.0", "60.0"]);

    let entries = parse_header_line("!END_OF_HEADER");
    assert_eq!(entries[0].key, "END_OF_HEADER");
    assert!(entries[0].values.is_empty());

    // Formatting and re-parsing gives the same entries.
    let entries = parse_header_line("!A=1 2    B=3");
    assert_eq!(parse_header_line(&format_header_line(&entries)), entries);
}

#[test]
fn test_read_small_file() {
    let xds = parse(SMALL_FILE).unwrap();
    assert_eq!(xds.symmetry().space_group, 75);
    assert_abs_diff_eq!(xds.symmetry().cell.parameters()[2], 80.0);
    assert_eq!(xds.friedels_law(), Some(true));
    assert_eq!(xds.items(), ["H", "K", "L", "IOBS", "SIGMA(IOBS)", "ZD"]);
    assert_eq!(xds.num_records(), 3);

    let zd = xds.column("ZD").unwrap();
    assert_abs_diff_eq!(zd[2], 12.5);

    let obs = xds.observations("IOBS").unwrap();
    assert_eq!(obs.len(), 3);
    assert_eq!(obs[1].hkl, [-2, 1, 4]);
    assert_abs_diff_eq!(obs[1].intensity, 250.0);
    assert_abs_diff_eq!(obs[1].sigma, 20.0);
    // Rejected reflections are still there, with their negative sigma.
    assert!(obs[2].sigma < 0.0);
}

#[test]
fn test_unknown_item() {
    let xds = parse(SMALL_FILE).unwrap();
    let result = xds.observations("IMEAN");
    assert!(matches!(result, Err(XdsAsciiError::UnknownItem { .. })));
    let msg = result.unwrap_err().to_string();
    assert!(msg.contains("IMEAN"));
    assert!(msg.contains("SIGMA(IOBS)"));
}

#[test]
fn test_not_xds_ascii() {
    let result = parse("!FORMAT=SOMETHING_ELSE\n!END_OF_HEADER\n");
    assert!(matches!(result, Err(XdsAsciiError::NotXdsAscii { .. })));
    let result = parse("    1 2 3\n");
    assert!(matches!(result, Err(XdsAsciiError::NotXdsAscii { .. })));
    let result = parse("");
    assert!(matches!(result, Err(XdsAsciiError::NotXdsAscii { .. })));
}

#[test]
fn test_malformed_files() {
    // No cell.
    let s = SMALL_FILE.replace(
        "!UNIT_CELL_CONSTANTS=    50.000    50.000    80.000  90.000  90.000  90.000\n",
        "",
    );
    assert!(matches!(
        parse(&s),
        Err(XdsAsciiError::MissingHeaderKey {
            key: "UNIT_CELL_CONSTANTS",
            ..
        })
    ));

    // A cell with too few numbers.
    let s = SMALL_FILE.replace(
        "50.000    50.000    80.000  90.000  90.000  90.000",
        "50.000    50.000    80.000",
    );
    assert!(matches!(
        parse(&s),
        Err(XdsAsciiError::BadHeaderValue {
            key: "UNIT_CELL_CONSTANTS",
            ..
        })
    ));

    // A nonsense space group.
    let s = SMALL_FILE.replace("!SPACE_GROUP_NUMBER=   75", "!SPACE_GROUP_NUMBER=  999");
    assert!(matches!(parse(&s), Err(XdsAsciiError::Symmetry { .. })));

    // A short record.
    let s = SMALL_FILE.replace("10.5", "");
    assert!(matches!(
        parse(&s),
        Err(XdsAsciiError::BadRecord { line_num: 16, .. })
    ));

    // A record that isn't numbers.
    let s = SMALL_FILE.replace("11.5", "abc");
    assert!(matches!(parse(&s), Err(XdsAsciiError::BadRecord { .. })));

    // The header never ends.
    let s = SMALL_FILE.replace("!END_OF_HEADER\n", "");
    assert!(matches!(
        parse(&s),
        Err(XdsAsciiError::MissingHeaderKey {
            key: "END_OF_HEADER",
            ..
        })
    ));
}

#[test]
fn test_write_reindexed() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("in.HKL");
    let dst = dir.path().join("in_reidx.HKL");
    std::fs::write(&src, SMALL_FILE).unwrap();

    let op = ReindexOperator::from_str("k,h,-l").unwrap();
    let symmetry = CrystalSymmetry::new(
        UnitCell::new([50.0, 50.0, 80.0, 90.0, 90.0, 90.0]).unwrap(),
        75,
    )
    .unwrap();
    let summary = write_reindexed(&src, &dst, &op, &symmetry).unwrap();
    assert_eq!(summary.num_written, 3);
    assert_eq!(summary.num_dropped, 0);

    let xds = XdsAscii::read(&dst).unwrap();
    assert_eq!(xds.num_records(), 3);
    let obs = xds.observations("IOBS").unwrap();
    assert_eq!(obs[0].hkl, [2, 1, -3]);
    assert_eq!(obs[1].hkl, [1, -2, -4]);
    assert_abs_diff_eq!(obs[1].intensity, 250.0);
    // Other items are untouched.
    assert_abs_diff_eq!(xds.column("ZD").unwrap()[1], 11.5);

    let text = std::fs::read_to_string(&dst).unwrap();
    assert!(text.contains("!Generated by CORRECT"));
    // The a and b axes swap, and c flips.
    let c_axis = text
        .lines()
        .find(|l| l.starts_with("!UNIT_CELL_C-AXIS="))
        .unwrap();
    let c: Vec<f64> = parse_header_line(c_axis)[0]
        .values
        .iter()
        .map(|v| v.parse().unwrap())
        .collect();
    assert_abs_diff_eq!(c[2], -80.0);
    let a_axis = text
        .lines()
        .find(|l| l.starts_with("!UNIT_CELL_A-AXIS="))
        .unwrap();
    let a: Vec<f64> = parse_header_line(a_axis)[0]
        .values
        .iter()
        .map(|v| v.parse().unwrap())
        .collect();
    assert_abs_diff_eq!(a[1], 50.0);
}

#[test]
fn test_write_reindexed_to_p1() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("in.HKL");
    let dst = dir.path().join("out.HKL");
    std::fs::write(&src, SMALL_FILE).unwrap();

    // A centring-style operator; (-2,1,4) doesn't give integral indices.
    let op = ReindexOperator::from_str("1/2*h+1/2*k+1/2*l,k,l").unwrap();
    let symmetry = CrystalSymmetry::new(
        UnitCell::new([35.355, 35.355, 80.0, 90.0, 90.0, 90.0]).unwrap(),
        1,
    )
    .unwrap();
    let summary = write_reindexed(&src, &dst, &op, &symmetry).unwrap();
    assert_eq!(summary.num_written, 2);
    assert_eq!(summary.num_dropped, 1);

    let xds = XdsAscii::read(&dst).unwrap();
    assert_eq!(xds.symmetry().space_group, 1);
    assert_abs_diff_eq!(xds.symmetry().cell.parameters()[0], 35.355);
    let obs = xds.observations("IOBS").unwrap();
    assert_eq!(obs[0].hkl, [3, 2, 3]);
    assert_eq!(obs[1].hkl, [2, 0, 1]);
}

#[test]
fn test_write_reindexed_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("in.HKL");
    std::fs::write(&src, SMALL_FILE).unwrap();
    let symmetry = CrystalSymmetry::new(
        UnitCell::new([50.0, 50.0, 80.0, 90.0, 90.0, 90.0]).unwrap(),
        75,
    )
    .unwrap();
    let result = write_reindexed(&src, &src, &ReindexOperator::identity(), &symmetry);
    assert!(matches!(result, Err(XdsAsciiError::SameFile(_))));
    // The file is intact.
    assert_eq!(std::fs::read_to_string(&src).unwrap(), SMALL_FILE);
}
