//! Integration tests for `stoke check`.
//!
//! Run the real binary against scratch projects.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const VALID_CONFIG: &str = r#"{
    "builds": [
        {
            "name": "app",
            "entry": ["src/index.js"],
            "output": { "path": "dist" }
        },
        {
            "entry": { "admin": ["src/admin.js"], "vendor": ["src/vendor.js"] },
            "output": { "path": "dist/admin", "publicPath": "/admin/" }
        }
    ],
    "devServer": { "port": 9000 },
    "engine": { "command": "npx", "args": ["webpack"] }
}"#;

fn stoke() -> Command {
    let mut cmd = Command::cargo_bin("stoke").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("STOKE_DEVSERVER_PORT")
        .env_remove("STOKE_ENGINE_COMMAND");
    cmd
}

fn project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("stoke.config.json"), config).unwrap();
    temp
}

#[test]
fn test_check_valid_config() {
    let temp = project(VALID_CONFIG);

    stoke()
        .current_dir(temp.path())
        .arg("check")
        .assert()
        .success()
        .stderr(predicate::str::contains("Configuration is valid"))
        .stderr(predicate::str::contains("app: 1 entry module(s)"))
        .stderr(predicate::str::contains("#1: 2 entry module(s)"))
        .stderr(predicate::str::contains("npx webpack"));
}

#[test]
fn test_check_explicit_config_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("custom.json");
    fs::write(&path, VALID_CONFIG).unwrap();

    stoke()
        .arg("check")
        .arg("--config")
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_check_missing_config() {
    let temp = TempDir::new().unwrap();

    stoke()
        .current_dir(temp.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_check_rejects_empty_builds() {
    let temp = project(r#"{ "builds": [], "engine": { "command": "npx" } }"#);

    stoke()
        .current_dir(temp.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No build configuration supplied"));
}

#[test]
fn test_check_rejects_missing_command() {
    let temp = project(
        r#"{ "builds": [{ "entry": ["src/index.js"], "output": { "path": "dist" } }] }"#,
    );

    stoke()
        .current_dir(temp.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("engine.command"));
}

#[test]
fn test_check_rejects_unknown_fields() {
    let temp = project(r#"{ "bulids": [] }"#);

    stoke()
        .current_dir(temp.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bulids"));
}

#[test]
fn test_check_env_override_is_validated() {
    let temp = project(VALID_CONFIG);

    stoke()
        .current_dir(temp.path())
        .env("STOKE_DEVSERVER_PORT", "not-a-port")
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("devServer.port"));
}

#[test]
fn test_check_schema_goes_to_stdout() {
    let temp = TempDir::new().unwrap();

    let output = stoke()
        .current_dir(temp.path())
        .args(["check", "--schema"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let schema: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let properties = schema["properties"].as_object().unwrap();
    assert!(properties.contains_key("builds"));
    assert!(properties.contains_key("devServer"));
    assert!(properties.contains_key("engine"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    stoke()
        .args(["--verbose", "--quiet", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
