//! Surface-level CLI checks: argument parsing, completion, and config
//! generation.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_command_groups() {
    let mut cmd = Command::cargo_bin("midora").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("session"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("follow"));
}

#[test]
fn chat_send_requires_text() {
    let mut cmd = Command::cargo_bin("midora").unwrap();
    cmd.args(["chat", "send"]).assert().failure();
}

#[test]
fn completion_emits_a_script() {
    let mut cmd = Command::cargo_bin("midora").unwrap();
    cmd.args(["completion", "--shell", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("midora"));
}

#[test]
fn config_writes_the_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("midora.toml");

    let mut cmd = Command::cargo_bin("midora").unwrap();
    cmd.args(["config", "--path"])
        .arg(&path)
        .assert()
        .success();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("base_url"));
    assert!(contents.contains("stream_flush_interval_ms"));
}
