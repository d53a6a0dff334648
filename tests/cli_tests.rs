//! CLI tests for bmc-actor
//!
//! This test suite covers:
//! - Argument parsing for `exec` and `serve`
//! - JSON results on stdout
//! - Exit codes for compile errors and failed actions

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile, TempDir};

// Helper to get a command for testing
fn actor_cmd() -> Command {
    let mut cmd = Command::cargo_bin("bmc-actor").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

// Helper to create a config file pointing screenshots into a temp dir
fn create_test_config(dir: &TempDir) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"[logging]
level = "warn"

[screenshot]
storage = "{}"
"#,
        dir.path().display()
    )
    .unwrap();
    file
}

#[test]
fn test_help() {
    actor_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("exec"));
}

#[test]
fn test_version() {
    actor_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_exec_requires_actions() {
    actor_cmd()
        .args(["exec", "host", "10.0.0.1"])
        .assert()
        .failure();
}

#[test]
fn test_exec_sleep_prints_results() {
    let dir = tempdir().unwrap();
    let config = create_test_config(&dir);

    let output = actor_cmd()
        .arg("-c")
        .arg(config.path())
        .args(["exec", "host", "10.0.0.1", "sleep 0s", "sleep 1ms"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let results: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["action"], "sleep 0s");
    assert_eq!(results[0]["status"], true);
    assert_eq!(results[0]["message"], "ok");
    assert!(results[0].get("error").is_none());
}

#[test]
fn test_exec_unknown_action_exits_4() {
    let dir = tempdir().unwrap();
    let config = create_test_config(&dir);

    actor_cmd()
        .arg("-c")
        .arg(config.path())
        .args(["exec", "host", "10.0.0.1", "poweron", "bogus"])
        .assert()
        .code(4)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("action 'bogus' is unknown"));
}

#[test]
fn test_exec_unsupported_action_exits_4() {
    let dir = tempdir().unwrap();
    let config = create_test_config(&dir);

    actor_cmd()
        .arg("-c")
        .arg(config.path())
        .args(["exec", "chassis", "c1", "pxeonce"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("not supported by the chassis executor"));
}

#[test]
fn test_exec_invalid_blade_position_exits_4() {
    let dir = tempdir().unwrap();
    let config = create_test_config(&dir);

    actor_cmd()
        .arg("-c")
        .arg(config.path())
        .args(["exec", "blade-pos", "c1", "left", "ison"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("bladePos"));
}

#[test]
fn test_exec_chassis_without_driver_exits_2() {
    let dir = tempdir().unwrap();
    let config = create_test_config(&dir);

    let output = actor_cmd()
        .arg("-c")
        .arg(config.path())
        .args(["exec", "chassis", "c1", "ison", "powercycle"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();

    let results: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["status"], false);
    assert!(results[0]["error"]
        .as_str()
        .unwrap()
        .contains("hardware not supported"));
}

#[test]
fn test_missing_config_file_fails() {
    actor_cmd()
        .args(["-c", "/nonexistent/actor.toml", "exec", "host", "h", "sleep 0s"])
        .assert()
        .failure();
}

#[test]
fn test_serve_rejects_bad_bind_address() {
    let dir = tempdir().unwrap();
    let config = create_test_config(&dir);

    actor_cmd()
        .arg("-c")
        .arg(config.path())
        .args(["serve", "--bind", "not-an-address"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid bind address"));
}
