//! Smoke tests for command wiring and the parse round trip

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn chronicle(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("chronicle").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("RUST_LOG")
        .env_remove("GOOGLE_DRIVE_ACCESS_TOKEN");
    cmd
}

const EXPORT: &str = r#"[
  {
    "id": "conv-1",
    "title": "Greeting",
    "create_time": 1700000000.5,
    "mapping": {
      "r": {"id": "r", "parent": null, "children": ["c1"],
            "message": {"author": {"role": "user"}, "content": {"parts": ["Hi"]}}},
      "c1": {"id": "c1", "parent": "r", "children": [],
             "message": {"author": {"role": "assistant"}, "content": {"parts": ["Hello!"]}}}
    }
  },
  "not a conversation",
  {"id": "conv-2", "title": "Untitled", "mapping": {}}
]"#;

// === Help ===

#[test]
fn test_parse_help() {
    let home = TempDir::new().unwrap();
    chronicle(&home)
        .arg("parse")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unzipped export folder"));
}

#[test]
fn test_drive_list_help() {
    let home = TempDir::new().unwrap();
    chronicle(&home)
        .args(["drive", "list", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Number of files to list"))
        .stdout(predicate::str::contains("--token"));
}

#[test]
fn test_drive_export_help() {
    let home = TempDir::new().unwrap();
    chronicle(&home)
        .args(["drive", "export", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Drive file ID"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    chronicle(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chronicle"));
}

// === Parse ===

#[test]
fn test_parse_export_folder() {
    let home = TempDir::new().unwrap();
    let export_dir = home.path().join("export");
    std::fs::create_dir(&export_dir).unwrap();
    std::fs::write(export_dir.join("conversations.json"), EXPORT).unwrap();
    let out = home.path().join("flat.json");

    chronicle(&home)
        .arg("parse")
        .arg(&export_dir)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(
        written,
        serde_json::json!([{
            "id": "conv-1",
            "title": "Greeting",
            "create_time": 1700000000.5,
            "messages": "User: Hi\nAssistant: Hello!"
        }])
    );
}

#[test]
fn test_parse_default_output_in_working_dir() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("conversations.json"), EXPORT).unwrap();

    chronicle(&home)
        .args(["-q", "parse", "conversations.json"])
        .assert()
        .success();

    assert!(home.path().join("chatgpt_conversations.json").is_file());
}

#[test]
fn test_parse_missing_input_fails_without_output() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("flat.json");

    chronicle(&home)
        .arg("parse")
        .arg(home.path().join("nowhere"))
        .arg("--out")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Export not found"));

    assert!(!out.exists());
}

#[test]
fn test_parse_malformed_input_fails_without_output() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("conversations.json"), "[{\"id\": ").unwrap();
    let out = home.path().join("flat.json");

    chronicle(&home)
        .arg("parse")
        .arg(home.path())
        .arg("--out")
        .arg(&out)
        .assert()
        .failure();

    assert!(!out.exists());
}

// === Drive ===

#[test]
fn test_drive_list_without_token_file_fails() {
    let home = TempDir::new().unwrap();

    chronicle(&home)
        .args(["drive", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("token"));

    assert!(!home.path().join("google_drive_activity.json").exists());
}
