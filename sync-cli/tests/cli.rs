//! Command-line behaviour of the zwsync binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn zwsync() -> Command {
    Command::cargo_bin("zwsync").unwrap()
}

#[test]
fn validate_prints_effective_settings() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[session]\ncontroller_path = \"/dev/ttyUSB3\"\n\n[broadcast]\nvalue_changes = true"
    )
    .unwrap();

    zwsync()
        .args(["--config"])
        .arg(file.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("/dev/ttyUSB3"))
        .stdout(predicate::str::contains("Value changes:   on"))
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn validate_rejects_unusable_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[broadcast]\ncapacity = 0").unwrap();

    zwsync()
        .arg("--config")
        .arg(file.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broadcast.capacity"));
}

#[test]
fn missing_config_file_fails() {
    zwsync()
        .args(["--config", "/nonexistent/zwsync.toml", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn serve_rejects_bad_replay_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("events.jsonl");
    std::fs::write(&script, "{\"type\":\"node_added\",\"node\":\"oops\"}\n").unwrap();

    zwsync()
        .current_dir(dir.path())
        .args(["serve", "--no-http", "--replay"])
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1"));
}
