use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_traffic_flow"))
        .args(args)
        .env("RUST_LOG", "warn,traffic_flow=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Test that the demo scenario runs to completion
#[test]
fn test_demo_simulation_runs() {
    let output = run_cli(&["--steps", "20", "--seed", "7", "--no-export"]);

    assert!(
        output.status.success(),
        "Simulation failed to run. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION START"),
        "Simulation did not start properly. stderr: {}",
        stderr
    );
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );
}

/// Test that summary statistics are logged
#[test]
fn test_simulation_statistics_logged() {
    let output = run_cli(&["--steps", "10", "--seed", "3", "--no-export"]);

    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    for expected in ["Mean speed:", "Mean congestion:", "Peak vehicles:", "Congested routes:"] {
        assert!(stderr.contains(expected), "Missing '{}' statistic", expected);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("efficiency"), "Missing summary line: {}", stdout);
}

/// Test that progress lines are suppressed with --quiet
#[test]
fn test_quiet_hides_progress() {
    let output = run_cli(&["--steps", "10", "--seed", "3", "--no-export", "--quiet"]);

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("[Tick"), "Progress should be hidden: {}", stderr);
}

/// Test that results are exported to the requested directory
#[test]
fn test_results_exported() {
    let dir = TempDir::new().unwrap();
    let output_dir = dir.path().join("results");

    let output = run_cli(&[
        "--steps",
        "5",
        "--seed",
        "1",
        "--output-dir",
        output_dir.to_str().unwrap(),
    ]);

    assert!(
        output.status.success(),
        "Export run failed. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    for file in [
        "simulation_history.json",
        "simulation_global.csv",
        "simulation_routes.csv",
        "analysis_report.txt",
        "scenario.json",
    ] {
        assert!(output_dir.join(file).is_file(), "{} was not written", file);
    }

    let scenario = fs::read_to_string(output_dir.join("scenario.json")).unwrap();
    assert!(scenario.contains("Ring North"));
}

/// Test that a missing scenario file fails with a readable error
#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");

    let output = run_cli(&["--config", missing.to_str().unwrap(), "--no-export"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.json"), "stderr: {}", stderr);
}
