/// CLI binary integration tests using assert_cmd
///
/// These tests invoke the actual binary without touching the network
/// (except for a refused loopback connection).
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

fn cli(home: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_clickup-chat-backup"));
    cmd.env("HOME", home)
        .env_remove("CLICKUP_API_TOKEN")
        .env_remove("RUST_LOG")
        .current_dir(home);
    cmd
}

#[test]
fn test_cli_help_flag() {
    let home = tempfile::TempDir::new().unwrap();
    cli(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("workspaces"))
        .stdout(predicate::str::contains("init-config"));
}

#[test]
fn test_cli_backup_help_lists_flags() {
    let home = tempfile::TempDir::new().unwrap();
    cli(home.path())
        .args(["backup", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-replies"))
        .stdout(predicate::str::contains("--skip-legacy"))
        .stdout(predicate::str::contains("--workspace-id"));
}

#[test]
fn test_cli_version_flag() {
    let home = tempfile::TempDir::new().unwrap();
    cli(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_cli_backup_without_token_fails() {
    let home = tempfile::TempDir::new().unwrap();
    cli(home.path())
        .arg("backup")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("API token is required"));
}

#[test]
fn test_cli_token_from_dotenv_is_used() {
    // Token from .env gets past resolution; the unreachable API then fails the run.
    let home = tempfile::TempDir::new().unwrap();
    std::fs::write(home.path().join(".env"), "CLICKUP_API_TOKEN=pk_test\n").unwrap();
    let config = home.path().join("config.toml");
    std::fs::write(
        &config,
        "[api]\nbase_url_v2 = \"http://127.0.0.1:1/api/v2\"\nrequest_delay_ms = 0\nmax_retries = 0\n",
    )
    .unwrap();

    cli(home.path())
        .arg("workspaces")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("API token is required").not());
}

#[test]
fn test_cli_init_config_creates_file() {
    let home = tempfile::TempDir::new().unwrap();
    cli(home.path())
        .arg("init-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration at"));

    let path = home.path().join(".clickup-chat-backup").join("config.toml");
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("[api]"));
    assert!(content.contains("include_replies = true"));
}

#[test]
fn test_cli_invalid_config_fails() {
    let home = tempfile::TempDir::new().unwrap();
    let config = home.path().join("broken.toml");
    std::fs::write(&config, "[api\nnot toml").unwrap();

    cli(home.path())
        .args(["backup", "--token", "pk_test", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}
