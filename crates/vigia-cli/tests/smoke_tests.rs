//! Smoke tests for the vigia binary
//!
//! None of these launch a browser.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const WIDGET: &str = r#"
name: Widget reclamo
base_url: http://localhost:5173
steps:
  - action: navigate
    url: /
  - action: click
    locator:
      frames: [{ url_contains: /iframe }]
      role: button
      name: Hacer un Reclamo
  - action: wait_for_text
    locator: { frames: [{ url_contains: /iframe }], css: body }
    text: Tipos de Reclamo
    timeout_ms: 2000
"#;

fn vigia() -> Command {
    let mut cmd = Command::cargo_bin("vigia").expect("vigia binary should exist");
    cmd.env_remove("RUST_LOG").env_remove("VIGIA_BASE_URL");
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    vigia()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    vigia()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_no_args_fails() {
    vigia().assert().failure();
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn test_validate_good_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("widget.yaml");
    fs::write(&path, WIDGET).unwrap();

    vigia()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Widget reclamo (3 steps)"));
}

#[test]
fn test_validate_directory_with_bad_file_exits_2() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.yaml"), WIDGET).unwrap();
    fs::write(
        dir.path().join("b.yaml"),
        "name: roto\nsteps:\n  - action: teleport\n",
    )
    .unwrap();

    vigia()
        .arg("validate")
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("b.yaml"))
        .stderr(predicate::str::contains("1 of 2 scenario file(s) invalid"));
}

#[test]
fn test_validate_missing_path_exits_2() {
    vigia()
        .args(["validate", "no/such/scenario.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

// ============================================================================
// run (argument and config errors only)
// ============================================================================

#[test]
fn test_run_rejects_bad_config_before_launch() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("widget.yaml");
    fs::write(&path, WIDGET).unwrap();
    fs::write(dir.path().join("vigia.yaml"), "jobs: 0\n").unwrap();

    vigia()
        .current_dir(dir.path())
        .arg("run")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("jobs must be at least 1"));
}

#[test]
fn test_run_rejects_invalid_scenario_before_launch() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(&path, "name: vacio\nsteps: []\n").unwrap();

    vigia()
        .current_dir(dir.path())
        .arg("run")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("bad.yaml"));
}
