use std::fs;
use std::path::Path;

use assert_cmd::Command;
use dxfmerge_core::document::Entity;
use dxfmerge_io::{DocumentLoader, DxfFacade};
use predicates::prelude::*;

fn line_dxf(x1: f64, y1: f64, x2: f64, y2: f64) -> String {
    format!(
        "0\nSECTION\n2\nENTITIES\n0\nLINE\n8\nPART\n10\n{x1}\n20\n{y1}\n11\n{x2}\n21\n{y2}\n0\nENDSEC\n0\nEOF\n"
    )
}

const EMPTY_DXF: &str = "0\nSECTION\n2\nENTITIES\n0\nENDSEC\n0\nEOF\n";

fn dxfmerge(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dxfmerge").expect("binary");
    cmd.current_dir(dir).env_remove("DXFMERGE_CONFIG");
    cmd
}

#[test]
fn merges_two_drawings_with_border_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.dxf"), line_dxf(0.0, 0.0, 40.0, 30.0)).expect("write a");
    fs::write(dir.path().join("b.dxf"), line_dxf(5.0, 5.0, 35.0, 45.0)).expect("write b");

    dxfmerge(dir.path())
        .args(["a.dxf", "b.dxf", "merged.dxf", "--gap", "0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("图形 1: a.dxf"))
        .stdout(predicate::str::contains("位置: (30.00, 14.75)"))
        .stdout(predicate::str::contains("merged.dxf"));

    let merged = DxfFacade::new()
        .load(&dir.path().join("merged.dxf"))
        .expect("load merged");
    assert_eq!(merged.entity_count(), 3);
    match merged.entities().next().map(|(_, entity)| entity) {
        Some(Entity::Polyline(border)) => assert_eq!(border.layer, "BORDER"),
        other => panic!("首个实体应为边框，实际 {other:?}"),
    }
}

#[test]
fn json_report_is_printed_on_stdout() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.dxf"), line_dxf(0.0, 0.0, 10.0, 10.0)).expect("write a");

    let output = dxfmerge(dir.path())
        .args(["--json", "--no-border", "--width", "50", "a.dxf", "out.dxf"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["container"]["width"], 50.0);
    assert_eq!(report["container"]["border"], false);
    assert_eq!(report["merged_entities"], 1);
}

#[test]
fn empty_drawing_fails_without_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.dxf"), line_dxf(0.0, 0.0, 10.0, 10.0)).expect("write a");
    fs::write(dir.path().join("blank.dxf"), EMPTY_DXF).expect("write blank");

    dxfmerge(dir.path())
        .args(["a.dxf", "blank.dxf", "merged.dxf"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("blank.dxf"));

    assert!(!dir.path().join("merged.dxf").exists());
}

#[test]
fn single_argument_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    dxfmerge(dir.path()).arg("only.dxf").assert().failure().code(1);
}

#[test]
fn invalid_container_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.dxf"), line_dxf(0.0, 0.0, 10.0, 10.0)).expect("write a");
    dxfmerge(dir.path())
        .args(["--width", "0", "a.dxf", "out.dxf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nesting.container_width"));
    assert!(!dir.path().join("out.dxf").exists());
}
