//! CLI integration tests

use std::process::{Command, Output};

fn wxp(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "wxp-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = wxp(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("seasonal weather forecast"),
        "Should show app description"
    );
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("range"), "Should show range command");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("config"), "Should show config command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = wxp(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("wxp"), "Should show binary name");
}

#[test]
fn test_predict_help() {
    let output = wxp(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--city"), "Should show city option");
    assert!(stdout.contains("--state"), "Should show state option");
    assert!(stdout.contains("--country"), "Should show country option");
    assert!(stdout.contains("--date"), "Should show date option");
}

#[test]
fn test_config_set_help() {
    let output = wxp(&["config", "set", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--api-url"));
    assert!(stdout.contains("--format"));
}

/// Test global options in help
#[test]
fn test_global_options() {
    let output = wxp(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("WXP_API_URL"), "Should show env var");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = wxp(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test missing required argument error handling
#[test]
fn test_predict_requires_date() {
    let output = wxp(&["predict", "--city", "Delhi"]);
    assert!(!output.status.success(), "Missing date should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}

#[test]
fn test_invalid_format_value() {
    let output = wxp(&["--format", "yaml", "range"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("yaml"));
}
