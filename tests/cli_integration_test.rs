//! CLI integration tests: run the fakecall binary against recordings on disk.
//! Uses CARGO_BIN_EXE_fakecall when set (e.g. by `cargo test`).

use fakecall::Value;
use fakecall::adapters::storage::json_file::JsonFileCallStorage;
use fakecall::domain::call::RecordedCall;
use fakecall::domain::ports::CallStorage;
use fakecall::domain::types::MethodId;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn bin() -> Option<PathBuf> {
    std::env::var_os("CARGO_BIN_EXE_fakecall").map(PathBuf::from)
}

fn recorded(signature: &str, output_arguments: Vec<Value>, return_value: Value) -> RecordedCall {
    RecordedCall {
        method: MethodId {
            declaring_type: "ICache".to_string(),
            signature: signature.to_string(),
        },
        output_arguments,
        return_value,
    }
}

fn write_recording(dir: &Path) -> PathBuf {
    let path = dir.join("cache.json");
    JsonFileCallStorage::new(&path)
        .save(&[
            recorded("TryGet(string, out int)", vec![Value::Int(42)], Value::Bool(true)),
            recorded("Clear()", vec![], Value::Unit),
            recorded("TryGet(string, out int)", vec![Value::Int(7)], Value::Bool(false)),
        ])
        .unwrap();
    path
}

#[test]
fn test_cli_help_succeeds() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let out = Command::new(bin).arg("--help").output().expect("run --help");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("inspect"));
    assert!(stdout.contains("summary"));
}

#[test]
fn test_cli_inspect_lists_calls() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let dir = TempDir::new().unwrap();
    let path = write_recording(dir.path());

    let out = Command::new(bin)
        .arg("inspect")
        .arg(&path)
        .output()
        .expect("run inspect");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("1. ICache.TryGet(string, out int)"));
    assert!(stdout.contains("2. ICache.Clear()"));
    assert!(stdout.contains("Showing 3 of 3 recorded call(s)"));
}

#[test]
fn test_cli_inspect_json_with_method_filter() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let dir = TempDir::new().unwrap();
    let path = write_recording(dir.path());

    let out = Command::new(bin)
        .args(["inspect", "--json", "--method", "Clear"])
        .arg(&path)
        .output()
        .expect("run inspect --json");
    assert!(out.status.success());
    let listing: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(listing["total_calls"], 3);
    let calls = listing["calls"].as_array().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["position"], 2);
}

#[test]
fn test_cli_summary_counts_methods() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let dir = TempDir::new().unwrap();
    let path = write_recording(dir.path());

    let out = Command::new(bin)
        .args(["summary", "--json"])
        .arg(&path)
        .output()
        .expect("run summary");
    assert!(out.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(summary["total_calls"], 3);
    assert_eq!(summary["methods"][0]["method"], "ICache.TryGet(string, out int)");
    assert_eq!(summary["methods"][0]["calls"], 2);
}

#[test]
fn test_cli_missing_recording_fails() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let dir = TempDir::new().unwrap();
    let out = Command::new(bin)
        .arg("summary")
        .arg(dir.path().join("absent.json"))
        .output()
        .expect("run summary");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("No call recording found"));
}
