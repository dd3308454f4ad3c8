//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

fn songbook() -> Command {
    let mut cmd = Command::cargo_bin("songbook").unwrap();
    // Keep the developer's env files and DB_* settings out of the way
    let home = tempfile::tempdir().unwrap();
    cmd.env("HOME", home.path())
        .current_dir(home.path())
        .env_remove("DB_USER")
        .env_remove("DB_NAME")
        .env_remove("RUST_LOG");
    // The directory only has to outlive spawning; leak it for simplicity
    std::mem::forget(home);
    cmd
}

// === Top-level ===

#[test]
fn test_help_lists_commands() {
    songbook()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version() {
    songbook()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// === Serve Command Tests ===

#[test]
fn test_serve_help() {
    songbook()
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Address to bind to"))
        .stdout(predicate::str::contains("--db-host"));
}

#[test]
fn test_serve_without_db_user_fails() {
    songbook()
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DB_USER"));
}

// === Migrate Command Tests ===

#[test]
fn test_migrate_help() {
    songbook()
        .arg("migrate")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--db-name"));
}

// === Config Command Tests ===

#[test]
fn test_config_show_redacts_password() {
    songbook()
        .args(["config", "show", "--db-user", "music", "--db-name", "songs"])
        .args(["--db-password", "hunter2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("music:***@localhost"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_config_path() {
    songbook()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".songbook"));
}
