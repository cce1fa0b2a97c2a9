//! Integration tests for the dietctl binary.
//!
//! These tests verify end-to-end behavior including:
//! - Onboarding and user switching
//! - Food and meal logging workflows
//! - The one-weight-log-per-day invariant
//! - Backup export/import and full reset

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("dietctl"))
}

/// Create a user and make it active
fn onboard(data_dir: &Path, name: &str) {
    cli()
        .args(["user", "add", name])
        .args(["--height", "165"])
        .args(["--target-weight", "58"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Personal diet and weight tracking"));
}

#[test]
fn test_onboarding_creates_active_user() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    onboard(data_dir, "Alice");

    cli()
        .args(["user", "list"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice"))
        .stdout(predicate::str::contains("*"));

    // Session state lives outside the main database file
    assert!(data_dir.join("session.json").exists());
    assert!(data_dir.join("diet.json").exists());
}

#[test]
fn test_commands_require_active_user() {
    let temp_dir = setup_test_dir();

    cli()
        .args(["weight", "log", "65.0"])
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .failure();
}

#[test]
fn test_meal_logging_flows_into_summary() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    onboard(data_dir, "Alice");

    cli()
        .args(["food", "add", "Rice"])
        .args(["--calories", "156"])
        .args(["--unit", "100g"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rice"));

    cli()
        .args(["meal", "add", "lunch", "Rice"])
        .args(["--quantity", "1.5"])
        .args(["--date", "2024-03-10"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("234 kcal"));

    cli()
        .args(["summary"])
        .args(["--date", "2024-03-10"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("234 kcal / 2000 kcal"));
}

#[test]
fn test_meal_list_groups_by_slot() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    onboard(data_dir, "Alice");

    cli()
        .args(["food", "add", "Toast"])
        .args(["--calories", "120"])
        .args(["--unit", "1 slice"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .args(["meal", "add", "breakfast", "Toast"])
        .args(["--date", "2024-03-10"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .args(["meal", "list"])
        .args(["--date", "2024-03-10"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("breakfast"))
        .stdout(predicate::str::contains("Toast"))
        .stdout(predicate::str::contains("Total: 120 kcal"));
}

#[test]
fn test_weight_log_upserts_per_day() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    onboard(data_dir, "Alice");

    cli()
        .args(["weight", "log", "66.0"])
        .args(["--date", "2024-03-10"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .args(["weight", "log", "65.4"])
        .args(["--date", "2024-03-10"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    // Exactly one record for the day, holding the second value
    cli()
        .args(["weight", "list"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("65.4"))
        .stdout(predicate::str::contains("66.0").not())
        .stdout(predicate::str::contains("2024-03-10").count(1));
}

#[test]
fn test_chart_monthly_means() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    onboard(data_dir, "Alice");

    for (date, weight) in [("2024-01-05", "70.0"), ("2024-01-20", "72.0")] {
        cli()
            .args(["weight", "log", weight])
            .args(["--date", date])
            .arg("--data-dir")
            .arg(data_dir)
            .assert()
            .success();
    }

    cli()
        .args(["chart", "--mode", "monthly"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("2024/01"))
        .stdout(predicate::str::contains("71.0 kg"));
}

#[test]
fn test_export_import_round_trip() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    onboard(data_dir, "Alice");

    cli()
        .args(["weight", "log", "65.4"])
        .args(["--date", "2024-03-10"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    let out_dir = temp_dir.path().join("backups");
    cli()
        .args(["export"])
        .arg("--out")
        .arg(&out_dir)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    let backup_path = fs::read_dir(&out_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("diet_tracker_backup_") && n.ends_with(".json"))
                .unwrap_or(false)
        })
        .expect("backup file not written");

    cli()
        .args(["reset", "--yes"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .arg("import")
        .arg(&backup_path)
        .arg("--yes")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 1 users"));

    // The imported user is active again and the data is back
    cli()
        .args(["weight", "list"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03-10"))
        .stdout(predicate::str::contains("65.4"));
}

#[test]
fn test_import_rejects_incomplete_document() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    onboard(data_dir, "Alice");

    // No `foods` field
    let bad = temp_dir.path().join("bad_backup.json");
    fs::write(
        &bad,
        r#"{"users": [], "mealLogs": [], "weightLogs": [], "timestamp": "2024-03-10T00:00:00Z", "version": 1}"#,
    )
    .unwrap();

    cli()
        .arg("import")
        .arg(&bad)
        .arg("--yes")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure();

    // Existing data is untouched
    cli()
        .args(["user", "list"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice"));
}

#[test]
fn test_reset_clears_store_and_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    onboard(data_dir, "Alice");

    cli()
        .args(["reset", "--yes"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .args(["user", "list"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No users"));

    // No active user anymore
    cli()
        .args(["summary"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure();
}

#[test]
fn test_deleting_food_keeps_meal_history() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    onboard(data_dir, "Alice");

    cli()
        .args(["food", "add", "Rice"])
        .args(["--calories", "156"])
        .args(["--unit", "100g"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .args(["meal", "add", "dinner", "Rice"])
        .args(["--date", "2024-03-10"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .args(["food", "delete", "Rice", "--yes"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    // The orphaned entry is still listed but contributes nothing
    cli()
        .args(["meal", "list"])
        .args(["--date", "2024-03-10"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted food"))
        .stdout(predicate::str::contains("Total: 0 kcal"));
}
