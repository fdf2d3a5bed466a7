//! Tests for the `tablekit` command-line tool

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Writes a config pointing at a fresh SQLite file inside a temp dir
fn setup() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("cli.db");
    let config_path = dir.path().join("tablekit.toml");
    fs::write(
        &config_path,
        format!(
            "[database]\ndriver = \"sqlite\"\npath = {:?}\n\n[logging]\nfilter = \"warn\"\n",
            db_path.to_string_lossy()
        ),
    )
    .unwrap();
    (dir, config_path)
}

fn tablekit(config: &PathBuf, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("tablekit").unwrap();
    cmd.env_remove("RUST_LOG").arg(config).args(args);
    cmd
}

#[test]
fn test_usage_without_arguments() {
    let output = Command::cargo_bin("tablekit").unwrap().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Usage"));
}

#[test]
fn test_write_then_read_as_json_lines() {
    let (_dir, config) = setup();

    tablekit(&config, &["CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, score REAL)"])
        .assert()
        .success();
    tablekit(&config, &["INSERT INTO users (name, score) VALUES (?, ?)", "Ann", "1.5"])
        .assert()
        .success()
        .stdout("1 row(s) affected\n");
    tablekit(&config, &["INSERT INTO users (name, score) VALUES (?, ?)", "Bo", "NULL"])
        .assert()
        .success();

    tablekit(&config, &["SELECT id, name, score FROM users WHERE id >= ? ORDER BY id", "1"])
        .assert()
        .success()
        .stdout("{\"id\":1,\"name\":\"Ann\",\"score\":1.5}\n{\"id\":2,\"name\":\"Bo\",\"score\":null}\n");
}

#[test]
fn test_driver_error_fails() {
    let (_dir, config) = setup();

    let output = tablekit(&config, &["SELECT * FROM nonexistent_table"])
        .env("RUST_LOG", "trace")
        .output()
        .unwrap();
    assert!(!output.status.success());
    // Reported exactly once, even when the log filter lets errors through
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("no such table").count(), 1, "stderr: {}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.toml");

    let output = tablekit(&missing, &["SELECT 1"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load configuration"));
}
