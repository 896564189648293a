/// End-to-end tests for config file discovery, validation and the settings it
/// feeds into the pipeline.
///
/// These tests exercise the full flow from config file on disk through CLI invocation
/// to correct output, using `assert_cmd` and `tempfile` for isolated test environments.
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

/// Write a replay with one workload annotated with `annotation`.
fn write_replay(dir: &Path, annotation: &str) {
    let replay = format!(
        r#"{{"kind":"deployment","action":"CREATE","deployment":{{"id":"d1","name":"web","annotations":{{"{annotation}":"ticket-7"}},"containers":[{{"name":"app","image":{{"full_name":"nginx:latest"}}}}],"state_timestamp":1}}}}"#
    );
    fs::write(dir.join("replay.jsonl"), replay).unwrap();
}

/// Write a policy that scales down anything running a floating tag.
fn write_policies(dir: &Path) {
    let policies = r#"
- id: no-latest
  name: No latest tag
  lifecycle_stages: [DEPLOY]
  enforcement_action: SCALE_TO_ZERO
  criteria:
    image_name_patterns: ["*:latest"]
"#;
    fs::write(dir.join("policies.yml"), policies).unwrap();
}

/// Write a config file at the specified path.
fn write_config(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
}

fn enforcement_lines(stdout: &[u8]) -> usize {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| line.contains(r#""stream":"enforcement""#))
        .count()
}

// ============================================================================
// Discovery and validation
// ============================================================================

#[test]
fn test_auto_discovered_config_is_validated() {
    let temp_dir = TempDir::new().unwrap();
    write_replay(temp_dir.path(), "team");
    write_config(
        &temp_dir.path().join("kube-sensor.config.yml"),
        "scan_concurrency: 0\n",
    );

    cargo_bin_cmd!("kube-sensor")
        .current_dir(temp_dir.path())
        .args(["--events", "replay.jsonl"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("scan_concurrency must be greater than 0"));
}

#[test]
fn test_explicit_config_missing() {
    let temp_dir = TempDir::new().unwrap();
    write_replay(temp_dir.path(), "team");

    cargo_bin_cmd!("kube-sensor")
        .current_dir(temp_dir.path())
        .args(["--events", "replay.jsonl", "--config", "missing.yml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_invalid_scanner_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    write_replay(temp_dir.path(), "team");
    let config_path = temp_dir.path().join("sensor.yml");
    write_config(&config_path, "scanner:\n  endpoint: scanner.local:8080\n");

    cargo_bin_cmd!("kube-sensor")
        .current_dir(temp_dir.path())
        .args(["--events", "replay.jsonl", "--config"])
        .arg(&config_path)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("scanner.endpoint"));
}

#[test]
fn test_unknown_fields_warned() {
    let temp_dir = TempDir::new().unwrap();
    write_replay(temp_dir.path(), "team");
    write_config(
        &temp_dir.path().join("kube-sensor.config.yml"),
        "dedupe: none\nfancy_mode: true\n",
    );

    cargo_bin_cmd!("kube-sensor")
        .current_dir(temp_dir.path())
        .args(["--events", "replay.jsonl", "--settle-ms", "50"])
        .assert()
        .code(0)
        .stderr(predicate::str::contains("Unknown config field"))
        .stderr(predicate::str::contains("fancy_mode"));
}

// ============================================================================
// Settings reaching the pipeline
// ============================================================================

#[test]
fn test_custom_bypass_annotation_skips_enforcement() {
    let temp_dir = TempDir::new().unwrap();
    write_replay(temp_dir.path(), "example.com/emergency");
    write_policies(temp_dir.path());
    write_config(
        &temp_dir.path().join("kube-sensor.config.yml"),
        "bypass_annotation: example.com/emergency\n",
    );

    let output = cargo_bin_cmd!("kube-sensor")
        .current_dir(temp_dir.path())
        .args([
            "--events",
            "replay.jsonl",
            "--policies",
            "policies.yml",
            "--settle-ms",
            "300",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(enforcement_lines(&output.stdout), 0);
}

#[test]
fn test_default_bypass_annotation_no_longer_honored() {
    let temp_dir = TempDir::new().unwrap();
    write_replay(temp_dir.path(), "sensor.security.io/break-glass");
    write_policies(temp_dir.path());
    write_config(
        &temp_dir.path().join("kube-sensor.config.yml"),
        "bypass_annotation: example.com/emergency\n",
    );

    let output = cargo_bin_cmd!("kube-sensor")
        .current_dir(temp_dir.path())
        .args([
            "--events",
            "replay.jsonl",
            "--policies",
            "policies.yml",
            "--settle-ms",
            "300",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(enforcement_lines(&output.stdout), 1);
}
