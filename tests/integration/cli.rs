use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `burrow` with HOME and the config path pointed into `temp`.
fn burrow(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("burrow").unwrap();
    cmd.env("HOME", temp.path())
        .env("USERPROFILE", temp.path())
        .env("BURROW_CONFIG_PATH", temp.path().join("config.toml"))
        .env("BURROW_NO_PROGRESS", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    burrow(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    let temp = TempDir::new().unwrap();
    burrow(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_config_path_honours_env() {
    let temp = TempDir::new().unwrap();
    burrow(&temp)
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_shows_defaults_when_missing() {
    let temp = TempDir::new().unwrap();
    burrow(&temp)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("api_base_url = \"https://api.github.com\""));
}

#[test]
fn test_invalid_config_is_reported() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("config.toml"), "[update\nowner = ").unwrap();

    burrow(&temp)
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_untrusted_api_host_is_refused() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("config.toml"),
        "[update]\napi_base_url = \"http://127.0.0.1:1\"\n",
    )
    .unwrap();

    burrow(&temp)
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("URL validation failed"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    let temp = TempDir::new().unwrap();
    burrow(&temp)
        .args(["-v", "-q", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
