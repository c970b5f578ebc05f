//! CLI binary smoke tests using assert_cmd.
//!
//! These tests exercise the compiled `loanrisk` binary to verify that
//! argument parsing, help text, error handling and a small end-to-end run
//! work.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("loanrisk").unwrap()
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("default-config"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("loanrisk"));
}

#[test]
fn default_config_prints_json() {
    cmd()
        .arg("default-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"train_fraction\": 0.75"))
        .stdout(predicate::str::contains("\"cutoff_date\": \"2011-02-01\""))
        .stdout(predicate::str::contains("\"method\": \"logistic_regression\""));
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

#[test]
fn analyze_without_data_errors() {
    cmd().arg("analyze").assert().failure();
}

#[test]
fn analyze_nonexistent_data_errors() {
    cmd()
        .args(["analyze", "/nonexistent/loans.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File does not exist"));
}

#[test]
fn analyze_unknown_model_errors() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::write_loan_export(dir.path(), 40);
    cmd()
        .args(["analyze", data.to_str().unwrap(), "--models", "xgboost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown model type"));
}

#[test]
fn analyze_unknown_grade_errors() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::write_loan_export(dir.path(), 40);
    cmd()
        .args(["analyze", data.to_str().unwrap(), "--grades", "Z"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No feature list configured for grade 'Z'"));
}

#[test]
fn analyze_writes_text_and_html_report() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::write_loan_export(dir.path(), 400);
    let report = dir.path().join("out").join("report.html");

    cmd()
        .args([
            "analyze",
            data.to_str().unwrap(),
            "--grades",
            "B,C",
            "--models",
            "logistic",
            "--seed",
            "7",
            "--importance-plots",
            "-o",
            report.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaning Summary"))
        .stdout(predicate::str::contains("===== Grade B: Logistic Regression ====="))
        .stdout(predicate::str::contains("===== Grade C: Logistic Regression ====="))
        .stdout(predicate::str::contains("5-fold CV AUC"))
        .stdout(predicate::str::contains("'Positive' Class : bad"));

    let html = std::fs::read_to_string(&report).unwrap();
    assert!(html.contains("Grade B"));
    assert!(html.contains("Grade C"));
    assert!(html.contains("variable importance"));
}

#[test]
fn analyze_no_report_skips_html() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::write_loan_export(dir.path(), 200);
    let report = dir.path().join("report.html");

    cmd()
        .args([
            "analyze",
            data.to_str().unwrap(),
            "--grades",
            "C",
            "--models",
            "logistic",
            "--no-report",
            "-o",
            report.to_str().unwrap(),
        ])
        .assert()
        .success();
    assert!(!report.exists());
}
