//! CLI integration tests

use std::process::{Command, Output};
use tempfile::TempDir;

/// Run `lrn` with an isolated home so no user config leaks in
fn lrn(home: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lrn"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("LRN_API_URL")
        .env_remove("LRN_API_KEY")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = lrn(&home, &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Learner ML Service"), "Should show app name");
    for command in ["persona", "insights", "labels", "levels", "models", "health"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = lrn(&home, &["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("lrn"), "Should show binary name");
}

#[test]
fn test_insights_help() {
    let home = TempDir::new().unwrap();
    let output = lrn(&home, &["insights", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--file"));
    assert!(stdout.contains("--persona"));
    assert!(stdout.contains("--previous"));
}

#[test]
fn test_persona_requires_file() {
    let home = TempDir::new().unwrap();
    let output = lrn(&home, &["persona"]);
    assert!(!output.status.success(), "Missing --file should fail");
}

#[test]
fn test_persona_missing_file_fails() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.json");
    let output = lrn(
        &home,
        &["--api-url", "http://127.0.0.1:9", "persona", "--file", missing.to_str().unwrap()],
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("nope.json"), "Should name the file: {}", stderr);
}

#[test]
fn test_labels_against_mock_server() {
    let home = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/v1/predict/persona/labels")
        .match_header("X-API-Key", "secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"personas": [{"label": "night_owl", "description": "Studies late"}]}"#)
        .create();

    let url = server.url();
    let output = lrn(
        &home,
        &["--api-url", &url, "--api-key", "secret", "--format", "json", "labels"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    mock.assert();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["personas"][0]["label"], "night_owl");
}

#[test]
fn test_forbidden_reports_detail() {
    let home = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/api/v1/insights/performance-levels")
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "Invalid API Key"}"#)
        .create();

    let url = server.url();
    let output = lrn(&home, &["--api-url", &url, "levels"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("Invalid API Key"), "stderr: {}", stderr);
}
