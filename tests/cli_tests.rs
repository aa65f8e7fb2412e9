//! Integration tests for the perfkpi command line

use predicates::prelude::*;
use std::fs;

fn write_config(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("perfkpi.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_help_lists_device_option() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("perfkpi");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--dsn"))
        .stdout(predicate::str::contains("--kpi"));
}

#[test]
fn test_dsn_is_required() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("perfkpi");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--dsn"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("perfkpi");
    cmd.arg("--dsn")
        .arg("G0K0H1")
        .arg("--config")
        .arg(dir.path().join("absent.toml"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_config_without_package_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "latency_iterations = 3\n");
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("perfkpi");
    cmd.arg("--dsn").arg("G0K0H1").arg("--config").arg(&config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("app_package must be set"));
}

#[test]
fn test_extra_iterations_bound_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "app_package = \"com.example.app\"\nextra_iterations = 1\n",
    );
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("perfkpi");
    cmd.arg("--dsn").arg("G0K0H1").arg("--config").arg(&config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("extra_iterations must be at least 2"));
}

/// `echo` answers every command with its own arguments, which is not a device type
#[cfg(unix)]
#[test]
fn test_unsupported_device_fails_run_but_keeps_csv_header() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("kpi_values.csv");
    let config = write_config(dir.path(), "app_package = \"com.example.app\"\n");
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("perfkpi");
    cmd.arg("--dsn")
        .arg("G0K0H1")
        .arg("--config")
        .arg(&config)
        .arg("--csv")
        .arg(&csv)
        .arg("--adb")
        .arg("echo");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("G0K0H1: device validation failed"));

    let content = fs::read_to_string(&csv).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.starts_with("KPI_ID,APP_PACKAGE,"));
}
