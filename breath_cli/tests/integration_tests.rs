//! Integration tests for the breathe binary.
//!
//! These tests verify end-to-end behavior including:
//! - Plan generation (table and JSON)
//! - Config file loading and validation
//! - Running sessions to completion, skipping and quitting

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a temp dir for config files
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to write an all-defaults config so runs never read the user's own
fn default_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, "").expect("Failed to write config");
    path
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("breathe"))
}

/// CLI binary pointed at `config`
fn cli_with(config: &Path) -> Command {
    let mut cmd = cli();
    cmd.arg("--config").arg(config);
    cmd
}

fn plan_json(config: &Path, args: &[&str]) -> serde_json::Value {
    let output = cli_with(config)
        .arg("plan")
        .arg("--json")
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("plan output is JSON")
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Guided breathing session timer"));
}

#[test]
fn test_plan_table() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    cli_with(&config)
        .arg("plan")
        .arg("--minutes")
        .arg("2")
        .arg("--seed")
        .arg("7")
        .assert()
        .success()
        .stdout(predicate::str::contains("BREATHING PLAN · 2 min"))
        .stdout(predicate::str::contains("of 120s budget"));
}

#[test]
fn test_plan_json_fits_budget() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    let plan = plan_json(&config, &["--minutes", "5", "--seed", "11"]);

    assert_eq!(plan["budget_seconds"], 300);
    let total = plan["total_seconds"].as_u64().unwrap();
    assert!(total <= 300);

    let exercises = plan["exercises"].as_array().unwrap();
    assert!(!exercises.is_empty());
    let summed: u64 = exercises
        .iter()
        .map(|e| {
            e["inhale_seconds"].as_u64().unwrap()
                + e["hold_seconds"].as_u64().unwrap()
                + e["exhale_seconds"].as_u64().unwrap()
        })
        .sum();
    assert_eq!(summed, total);
}

#[test]
fn test_plan_seed_is_reproducible() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    let first = plan_json(&config, &["--minutes", "3", "--seed", "42"]);
    let second = plan_json(&config, &["--minutes", "3", "--seed", "42"]);
    assert_eq!(first, second);
}

#[test]
fn test_plan_non_positive_minutes_is_empty() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    let plan = plan_json(&config, &["--minutes", "-2"]);
    assert_eq!(plan["total_seconds"], 0);
    assert!(plan["exercises"].as_array().unwrap().is_empty());

    cli_with(&config)
        .arg("plan")
        .arg("--minutes=0")
        .assert()
        .success()
        .stdout(predicate::str::contains("No exercises fit"));
}

#[test]
fn test_plan_uses_config_ranges() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[session]
default_duration_minutes = 1

[generator]
inhale = { min = 3, max = 3 }
hold = { min = 2, max = 2 }
exhale = { min = 4, max = 4 }
"#,
    )
    .unwrap();

    let plan = plan_json(&config_path, &[]);
    assert_eq!(plan["minutes"], 1);
    assert_eq!(plan["exercises"].as_array().unwrap().len(), 6);
    assert_eq!(plan["total_seconds"], 54);
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[generator]\nhold = { min = 5, max = 1 }\n").unwrap();

    cli_with(&config_path)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("hold range is empty"));
}

#[test]
fn test_run_empty_session_completes() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    cli_with(&config)
        .arg("run")
        .arg("--minutes=0")
        .arg("--no-input")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session complete"));
}

#[test]
fn test_run_to_completion() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    cli_with(&config)
        .arg("run")
        .arg("--minutes")
        .arg("1")
        .arg("--seed")
        .arg("5")
        .arg("--tick-ms")
        .arg("1")
        .arg("--no-input")
        .assert()
        .success()
        .stdout(predicate::str::contains("Inhale"))
        .stdout(predicate::str::contains("Session complete"));
}

#[test]
fn test_run_quit_abandons_session() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    cli_with(&config)
        .arg("run")
        .arg("--minutes")
        .arg("5")
        .arg("--seed")
        .arg("5")
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session abandoned"))
        .stdout(predicate::str::contains("Session complete").not());
}

#[test]
fn test_run_skip_then_quit() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    cli_with(&config)
        .arg("run")
        .arg("--minutes")
        .arg("5")
        .arg("--seed")
        .arg("5")
        .write_stdin("s\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped to exercise 2"))
        .stdout(predicate::str::contains("Session abandoned"));
}

#[test]
fn test_run_unknown_command_is_reported() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    cli_with(&config)
        .arg("run")
        .arg("--minutes")
        .arg("5")
        .write_stdin("x\nq\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Unknown command"));
}

#[test]
fn test_minutes_above_one_day_rejected() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    for command in ["plan", "run"] {
        cli_with(&config)
            .arg(command)
            .arg("--minutes")
            .arg("9000000000000")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--minutes"));
    }
}

#[test]
fn test_minutes_at_one_day_accepted() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    let plan = plan_json(&config, &["--minutes", "1440", "--seed", "1"]);
    assert_eq!(plan["budget_seconds"], 86_400);
    assert!(plan["total_seconds"].as_u64().unwrap() <= 86_400);

    cli_with(&config)
        .arg("plan")
        .arg("--minutes=1441")
        .assert()
        .failure();
}

#[test]
fn test_oversized_default_duration_rejected() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[session]\ndefault_duration_minutes = 100000\n").unwrap();

    cli_with(&config_path)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("default_duration_minutes"));
}

#[test]
fn test_oversized_phase_range_rejected() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        "[generator]\ninhale = { min = 4294967295, max = 4294967295 }\n",
    )
    .unwrap();

    cli_with(&config_path)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("inhale range max"));
}

#[test]
fn test_verbose_flag_enables_debug_logs() {
    let temp_dir = setup_test_dir();
    let config = default_config(&temp_dir);

    cli_with(&config)
        .env_remove("RUST_LOG")
        .arg("-v")
        .arg("plan")
        .arg("--minutes=1")
        .assert()
        .success()
        .stderr(predicate::str::contains("Generated"));

    cli_with(&config)
        .env_remove("RUST_LOG")
        .arg("plan")
        .arg("--minutes=1")
        .assert()
        .success()
        .stderr(predicate::str::contains("Generated").not());
}
