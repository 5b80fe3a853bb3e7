//! End-to-end tests for the `rq` binary

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `rq` isolated from the user's config and log directories
fn rq(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rq").expect("rq binary not built");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"));
    cmd
}

#[test]
fn test_help_mentions_log_path() {
    let home = TempDir::new().unwrap();
    rq(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logs are written to"));
}

#[test]
fn test_config_defaults_as_yaml() {
    let home = TempDir::new().unwrap();
    rq(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("concurrency-limit: 5"))
        .stdout(predicate::str::contains("subscribers-per-key: 3"));
}

#[test]
fn test_config_from_explicit_file_as_json() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("custom.yml");
    fs::write(&path, "queue:\n  concurrency-limit: 7\ncache:\n  max-item-count: 50\n").unwrap();

    rq(&home)
        .arg("--config")
        .arg(&path)
        .args(["config", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"concurrency-limit\": 7"))
        .stdout(predicate::str::contains("\"max-item-count\": 50"));
}

#[test]
fn test_project_local_config_is_picked_up() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join(".requestqueue.yml"), "queue:\n  max-retry-times: 4\n").unwrap();

    rq(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max-retry-times: 4"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();
    rq(&home)
        .args(["--config", "does-not-exist.yml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_simulate_json_report() {
    let home = TempDir::new().unwrap();
    rq(&home)
        .args([
            "simulate",
            "--keys",
            "4",
            "--subscribers",
            "2",
            "--failure-rate",
            "0",
            "--latency-ms",
            "1",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"succeeded\": 8"))
        .stdout(predicate::str::contains("\"failed\": 0"));
}

#[test]
fn test_simulate_text_report() {
    let home = TempDir::new().unwrap();
    rq(&home)
        .args(["simulate", "--keys", "3", "--latency-ms", "0", "--no-cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Simulation"))
        .stdout(predicate::str::contains("peak running"));
}

#[test]
fn test_simulate_rejects_bad_failure_rate() {
    let home = TempDir::new().unwrap();
    rq(&home)
        .args(["simulate", "--failure-rate", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failure-rate"));
}
