//! CLI integration tests for idra-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for various error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;

/// Get a command for the idra-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("idra-migrate").unwrap()
}

/// Write a valid configuration using the local object store under `dir`.
fn local_config(dir: &Path) -> std::path::PathBuf {
    let root = dir.display();
    let path = dir.join("config.yaml");
    std::fs::write(
        &path,
        format!(
            r#"
target:
  host: 127.0.0.1
  database: idra
  user: migrator
object_store:
  backend: local
  bucket: idra-commercial
  root: '{root}/store'
paths:
  images_dir: '{root}/images'
  snapshot_dir: '{root}/snapshots'
  mappings_dir: '{root}/mappings'
  field_map: '{root}/field-map.json'
  default_values: '{root}/default-values.json'
migration:
  user_id: 333
"#
        ),
    )
    .unwrap();
    path
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_migrate_subcommand_help() {
    cmd()
        .args(["migrate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--run-id"))
        .stdout(predicate::str::contains("--bucket-name"))
        .stdout(predicate::str::contains("--user-id"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_export_subcommand_help() {
    cmd()
        .args(["export", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--run-id"))
        .stdout(predicate::str::contains("--database"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("idra-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_output_json_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_migrate_requires_run_id() {
    cmd()
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--run-id"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(7); // EXIT_IO_ERROR - file not found
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1); // EXIT_CONFIG_ERROR
}

#[test]
fn test_empty_config_exits_with_code_1() {
    let file = tempfile::NamedTempFile::new().unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1); // EXIT_CONFIG_ERROR
}

#[test]
fn test_missing_required_fields_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    // Valid YAML but no object_store section
    writeln!(file, "target:").unwrap();
    writeln!(file, "  host: localhost").unwrap();
    writeln!(file, "  database: idra").unwrap();
    writeln!(file, "  user: migrator").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1); // EXIT_CONFIG_ERROR
}

#[test]
fn test_dry_run_without_mapping_files_exits_with_code_7() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path());

    cmd()
        .args(["--config", config.to_str().unwrap()])
        .args(["migrate", "--run-id", "7", "--dry-run"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("transform"));
}

/// Mapping files and snapshots for run 7 under `dir`.
fn seed_run_7(dir: &Path) {
    std::fs::write(dir.join("field-map.json"), r#"{"clr": "color"}"#).unwrap();
    std::fs::write(dir.join("default-values.json"), "{}").unwrap();
    std::fs::create_dir_all(dir.join("snapshots")).unwrap();
    std::fs::write(
        dir.join("snapshots/runsIdra_run_7.json"),
        r#"[{"ID": "7", "startTime": "2024-03-05 08:00:00", "endTime": "2024-03-05 09:00:00",
             "unit": "alpha", "reportType": "daily", "nbreOfOfficers": "2", "snco": "1",
             "enlisted": "3", "fodCount": "1"}]"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("snapshots/fodDataIdra_run_7.json"),
        r#"[{"ID": "101", "runID": "7", "imageName": "a.jpg", "clr": "red",
             "finalSize": "1.7 in", "createdTime": "2024-03-05 08:10:00"}]"#,
    )
    .unwrap();
}

#[test]
fn test_dry_run_prints_transformed_records() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path());
    seed_run_7(dir.path());

    cmd()
        .args(["--config", config.to_str().unwrap(), "--output-json"])
        .args(["migrate", "--run-id", "7", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reportType\": \"Daily\""))
        .stdout(predicate::str::contains("\"color\": \"red\""))
        .stdout(predicate::str::contains("\"finalSize\": 1.7"));

    // Nothing was uploaded
    assert!(!dir.path().join("store").exists());
}

#[test]
fn test_dry_run_needs_no_object_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path());
    let yaml = std::fs::read_to_string(&config)
        .unwrap()
        .replace("backend: local", "backend: s3");
    std::fs::write(&config, yaml).unwrap();
    seed_run_7(dir.path());

    cmd()
        .env("AWS_EC2_METADATA_DISABLED", "true")
        .args(["--config", config.to_str().unwrap()])
        .args(["migrate", "--run-id", "7", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Detections: 1"));
}

#[test]
fn test_export_missing_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path());

    cmd()
        .args(["--config", config.to_str().unwrap()])
        .args(["export", "--run-id", "7", "--database"])
        .arg(dir.path().join("missing.sqlite"))
        .assert()
        .failure();
}

// =============================================================================
// Subcommand Existence Tests
// =============================================================================

#[test]
fn test_health_check_command_exists() {
    cmd()
        .args(["health-check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test database and object store connections"));
}

// =============================================================================
// Config Path Tests
// =============================================================================

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_short_config_flag() {
    // -c should work as short for --config
    cmd()
        .args(["-c", "some_config.yaml", "--help"])
        .assert()
        .success();
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
