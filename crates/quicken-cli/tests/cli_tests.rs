//! End-to-end tests for the `quicken` binary
//!
//! A shell one-liner stands in for the test runner so no Ruby is needed.

#![cfg(unix)]

use quicken_test_utils::{TargetFixture, SAMPLE_TEST_SOURCE};
use std::path::Path;
use std::process::{Command, Output};

fn quicken(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_quicken"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

/// Config whose runner executes `script` with the test file as `$0`
fn write_script_config(dir: &Path, script: &str) -> String {
    let path = dir.join("quicken.toml");
    let escaped = script.replace('\\', "\\\\").replace('"', "\\\"");
    let toml = format!(
        "seed = 3\nmax_generations = 1\ncommand = [\"sh\", \"-c\", \"{escaped}\", \"{{path}}\"]\n"
    );
    std::fs::write(&path, toml).unwrap();
    path.to_string_lossy().into_owned()
}

/// Config whose runner prints `report` instead of running tests
fn write_config(dir: &Path, report: &str) -> String {
    write_script_config(dir, &format!("printf '{report}'"))
}

#[test]
fn missing_argument_prints_usage() {
    let output = quicken(&[]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "{stderr}");
}

#[test]
fn missing_file_aborts() {
    let output = quicken(&["/nonexistent/user_test.rb"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("doesn't exist"), "{stderr}");
}

#[test]
fn failing_baseline_leaves_file_untouched() {
    let fixture = TargetFixture::sample();
    let config = write_config(&fixture.scratch_dir(), "Run      PASS      FAIL");

    let output = quicken(&[fixture.path().to_str().unwrap(), "--config", &config]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not all tests are passing"), "{stderr}");
    assert_eq!(fixture.read(), SAMPLE_TEST_SOURCE);
}

#[test]
fn invalid_config_exits_with_config_code() {
    let fixture = TargetFixture::sample();
    let config = fixture.scratch_dir().join("bad.toml");
    std::fs::write(&config, "acceptance_factor = 4.0\n").unwrap();

    let output = quicken(&[
        fixture.path().to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(fixture.read(), SAMPLE_TEST_SOURCE);
}

#[test]
fn passing_run_reports_times() {
    let fixture = TargetFixture::sample();
    let config = write_config(&fixture.scratch_dir(), "Run      PASS      PASS      PASS");

    let output = quicken(&[fixture.path().to_str().unwrap(), "--config", &config]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Improved test execution time from"), "{stdout}");
}

#[test]
fn faster_rewrite_is_written_in_place() {
    let fixture = TargetFixture::sample();
    // Slow until the file under test uses `build :user`
    let config = write_script_config(
        &fixture.scratch_dir(),
        r#"grep -q 'build :user' "$0" || sleep 0.4; printf 'Run      PASS      PASS'"#,
    );

    let output = quicken(&[
        fixture.path().to_str().unwrap(),
        "--config",
        &config,
        "--max-generations",
        "30",
    ]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("New source code has been written to"), "{stdout}");
    assert!(stdout.contains("see git diff for changes"), "{stdout}");
    let rewritten = fixture.read();
    assert!(rewritten.contains("build :user"), "{rewritten}");
    assert!(!rewritten.contains("create :user"), "{rewritten}");
}

#[test]
fn json_report() {
    let fixture = TargetFixture::sample();
    let config = write_config(&fixture.scratch_dir(), "Run      PASS      PASS");

    let output = quicken(&[
        fixture.path().to_str().unwrap(),
        "--config",
        &config,
        "--max-generations",
        "0",
        "--json",
    ]);

    assert!(output.status.success(), "{output:?}");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["baseline"]["outcomes"].as_array().unwrap().len(), 2);
    assert!(report["generations"].as_u64().unwrap() >= 1);
    assert!(report["history"].is_array());
}
