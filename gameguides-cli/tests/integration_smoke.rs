//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

/// Command isolated from the developer's .env files and MongoDB settings
fn gameguides(home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gameguides").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("MONGODB_URI")
        .env_remove("MONGODB_DATABASE")
        .env_remove("MONGODB_MAX_POOL_SIZE");
    cmd
}

#[test]
fn test_serve_help() {
    let home = tempfile::tempdir().unwrap();
    gameguides(&home)
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("MongoDB connection string"))
        .stdout(predicate::str::contains("Request timeout in seconds"));
}

#[test]
fn test_ping_help() {
    let home = tempfile::tempdir().unwrap();
    gameguides(&home)
        .arg("ping")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database holding the guides collection"));
}

#[test]
fn test_serve_without_uri_fails_fast() {
    let home = tempfile::tempdir().unwrap();
    gameguides(&home)
        .arg("serve")
        .arg("--bind")
        .arg("127.0.0.1:0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("MONGODB_URI must be set"));
}

#[test]
fn test_ping_rejects_non_mongodb_uri() {
    let home = tempfile::tempdir().unwrap();
    gameguides(&home)
        .arg("ping")
        .arg("--mongodb-uri")
        .arg("postgres://localhost/guides")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid MONGODB_URI"));
}
