#![allow(deprecated)]

// End-to-end checks of the binary. Nothing here talks to the network: every
// command either works purely on the config file or must fail a local
// precondition before a request is built. The API URL points at a closed
// local port so an accidental request would fail loudly instead of leaving
// the machine.

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const UNREACHABLE: &str = "http://127.0.0.1:9";

fn cli(config: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("0x45"));
    cmd.env_remove("OX45_API_KEY")
        .env_remove("OX45_API_URL")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(config)
        .arg("--api-url")
        .arg(UNREACHABLE);
    cmd
}

#[test]
fn config_set_get_unset_round_trip() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("0x45").join("config.yaml");

    cli(&config)
        .args(["config", "set", "default_expiry", "7d"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_expiry"));
    assert!(config.exists());

    cli(&config)
        .args(["config", "get", "default_expiry"])
        .assert()
        .success()
        .stdout("7d\n");

    cli(&config)
        .args(["config", "unset", "default_expiry"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed config key"));

    cli(&config)
        .args(["config", "get", "default_expiry"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn unset_of_missing_key_is_not_a_failure() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");

    cli(&config)
        .args(["config", "unset", "api_key"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config key 'api_key' not found"));
    assert!(!config.exists());
}

#[test]
fn config_set_rejects_unknown_key() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");

    cli(&config)
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn config_list_shows_file_values() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");
    fs::write(&config, "api_key: file-key\ndefault_expiry: 24h\n").unwrap();

    cli(&config)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("api_key: file-key"))
        .stdout(predicate::str::contains("default_expiry: 24h"))
        .stdout(predicate::str::contains(format!("api_url: {}", UNREACHABLE)));
}

#[test]
fn environment_key_overrides_file_but_not_flag() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");
    fs::write(&config, "api_key: file-key\n").unwrap();

    cli(&config)
        .env("OX45_API_KEY", "env-key")
        .args(["config", "get", "api_key"])
        .assert()
        .success()
        .stdout("env-key\n");

    cli(&config)
        .env("OX45_API_KEY", "env-key")
        .args(["--api-key", "flag-key", "config", "get", "api_key"])
        .assert()
        .success()
        .stdout("flag-key\n");
}

#[test]
fn key_status_without_and_with_key() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");

    cli(&config)
        .args(["key", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No API key configured"))
        .stdout(predicate::str::contains("128 days"));

    cli(&config)
        .args(["--api-key", "abc", "key", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("API Key: abc"))
        .stdout(predicate::str::contains("730 days"));
}

#[test]
fn shorten_without_key_fails_before_any_request() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");

    cli(&config)
        .args(["shorten", "https://example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key required"))
        .stderr(predicate::str::contains("sending request").not());
}

#[test]
fn private_upload_without_key_fails_before_any_request() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");

    cli(&config)
        .args(["upload", "--private"])
        .write_stdin("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("private uploads require an API key"));
}

#[test]
fn private_upload_checks_key_before_reading_input() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");
    let missing = temp.path().join("nope.txt");

    cli(&config)
        .args(["upload", "--private"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("private uploads require an API key"))
        .stderr(predicate::str::contains("nope.txt").not());
}

#[test]
fn delete_without_key_fails_before_any_request() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");

    cli(&config)
        .args(["delete", "d1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key required"))
        .stderr(predicate::str::contains("sending request").not());
}

#[test]
fn anonymous_expiry_is_capped() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");

    cli(&config)
        .args(["upload", "--expires", "129d"])
        .write_stdin("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("128 days"));
}

#[test]
fn configured_default_expiry_is_applied() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");
    fs::write(&config, "default_expiry: 200d\n").unwrap();

    cli(&config)
        .args(["upload"])
        .write_stdin("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("128 days"));
}

#[test]
fn list_rejects_unknown_kind_and_zero_page() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");

    cli(&config)
        .args(["--api-key", "abc", "list", "links"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid list type"));

    cli(&config)
        .args(["--api-key", "abc", "list", "pastes", "--page", "0"])
        .assert()
        .failure();
}

#[test]
fn missing_upload_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");
    let missing = temp.path().join("nope.txt");

    cli(&config)
        .arg("upload")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.txt"));
}

#[test]
fn key_request_without_details_fails_when_not_interactive() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");

    cli(&config)
        .args(["key", "request", "--email", "me@example.com"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("email and name are required"));
}

#[test]
fn malformed_config_file_fails() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");
    fs::write(&config, "api_key: [oops\n").unwrap();

    cli(&config)
        .args(["key", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading configuration"));
}
