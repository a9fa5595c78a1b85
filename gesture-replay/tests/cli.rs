//! CLI integration tests.
//! Each test writes its config and session into a temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"{
    "rules": [
        {"name": "delete", "type": "circle", "priority": 8, "cooldown_ms": 500},
        {"name": "next", "type": "swipeRight", "priority": 2}
    ],
    "commands": [
        {"name": "save", "pattern": "zapisz( projekt)?", "speak": "Zapisano"}
    ]
}"#;

const SESSION: &str = r#"{
    "steps": [
        {"input": {"type": "Pointer", "data": {"phase": "start", "x": 0.0, "y": 0.0, "timestamp_ms": 0}}},
        {"input": {"type": "Pointer", "data": {"phase": "move", "x": 75.0, "y": 0.0, "timestamp_ms": 100}}},
        {"advance": 200},
        {"input": {"type": "Pointer", "data": {"phase": "end", "x": 150.0, "y": 0.0, "timestamp_ms": 200}}},
        {"advance": 1000},
        {"say": "zapisz projekt"}
    ]
}"#;

fn replay_cmd(dir: &TempDir) -> Command {
    let config = dir.path().join("config.json");
    std::fs::write(&config, CONFIG).unwrap();
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("gesture-replay").unwrap();
    cmd.env("GESTURE_CONFIG", &config).env("RUST_LOG", "off");
    cmd
}

#[test]
fn list_rules_and_commands() {
    let dir = TempDir::new().unwrap();
    replay_cmd(&dir)
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name":"delete","type":"circle","priority":8"#))
        .stdout(predicate::str::contains(r#""name":"next","type":"swipe""#))
        .stdout(predicate::str::contains(r#"{"command":"save"}"#));
}

#[test]
fn replay_prints_one_line_per_record() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");
    std::fs::write(&session, SESSION).unwrap();

    let output = replay_cmd(&dir)
        .arg("--session")
        .arg(&session)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let records: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["kind"], "gesture");
    assert_eq!(records[0]["event"]["name"], "next");
    assert_eq!(records[0]["event"]["result"]["metrics"]["direction"], "right");
    assert_eq!(records[1]["kind"], "command");
    assert_eq!(records[1]["event"]["matched"], "zapisz projekt");
    assert_eq!(records[2]["kind"], "speech");
    assert_eq!(records[2]["event"]["text"], "Zapisano");
}

#[test]
fn start_ms_sets_event_timestamps() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");
    std::fs::write(&session, r#"{"steps": [{"inject": {"rule": "delete"}}]}"#).unwrap();

    replay_cmd(&dir)
        .args(["--start-ms", "5000", "--session"])
        .arg(&session)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""timestampMs":5000"#));
}

#[test]
fn unknown_injected_rule_fails() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");
    std::fs::write(&session, r#"{"steps": [{"inject": {"rule": "ghost"}}]}"#).unwrap();

    replay_cmd(&dir)
        .arg("--session")
        .arg(&session)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn malformed_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("broken.json");
    std::fs::write(&config, "{ not json").unwrap();

    #[allow(deprecated)]
    Command::cargo_bin("gesture-replay")
        .unwrap()
        .env("GESTURE_CONFIG", &config)
        .arg("--list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn nothing_to_replay_fails() {
    let dir = TempDir::new().unwrap();
    replay_cmd(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to replay"));
}
