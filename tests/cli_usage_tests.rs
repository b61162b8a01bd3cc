// CLI surface: positional arguments, usage failures, startup failures

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_no_arguments_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("syncmeter").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_partial_arguments_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("syncmeter").unwrap();
    cmd.args(["/tmp/kubeconfig", "wds1", "its1"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_invalid_exp_type_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("syncmeter").unwrap();
    cmd.args([
        "/tmp/kubeconfig",
        "wds1",
        "its1",
        "cluster1",
        "1",
        tmp.path().to_str().unwrap(),
        "x",
    ]);
    cmd.assert().failure();
}

#[test]
fn test_unreadable_kubeconfig_fails_before_collecting() {
    let tmp = TempDir::new().unwrap();
    let kubeconfig = tmp.path().join("missing-kubeconfig");
    let output_dir = tmp.path().join("results");

    let mut cmd = Command::cargo_bin("syncmeter").unwrap();
    cmd.args([
        kubeconfig.to_str().unwrap(),
        "wds1",
        "its1",
        "cluster1",
        "1",
        output_dir.to_str().unwrap(),
    ]);
    cmd.assert().failure();

    // Startup failed before any collection, so nothing was written.
    assert!(!output_dir.exists());
}
