//! End-to-end tests for the `widerow` CLI.
//!
//! Each test:
//! 1. Writes a schema description into a temp directory
//! 2. Runs `put` against a fresh RocksDB directory
//! 3. Runs `get`, `scan` and `families` and checks their stdout

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const SCHEMA: &str = r#"{
    "name": "profile",
    "fields": [
        { "name": "x", "type": "int32" },
        { "name": "y", "type": { "record": [
            { "name": "z", "type": "text", "default": "none" } ] } },
        { "name": "opt", "type": { "optional": { "record": [
            { "name": "a", "type": "int32" } ] } } }
    ]
}"#;

/// Run the widerow binary; returns (success, stdout, stderr).
fn run_widerow(db_dir: &Path, args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_widerow"))
        .arg("--db-dir")
        .arg(db_dir)
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .expect("Failed to execute widerow");

    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

struct Fixture {
    temp_dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join("schema.json"), SCHEMA).unwrap();
        Fixture { temp_dir }
    }

    fn db(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("db")
    }

    fn schema(&self) -> String {
        self.temp_dir.path().join("schema.json").display().to_string()
    }

    fn write_record(&self, name: &str, json: &str) -> String {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, json).unwrap();
        path.display().to_string()
    }

    fn put(&self, row: &str, record: &str) -> (bool, String, String) {
        let schema = self.schema();
        run_widerow(
            &self.db(),
            &[
                "put", "--schema", &schema, "--family", "profile", "--row", row, "--record",
                record, "--timestamp", "1000",
            ],
        )
    }
}

#[test]
fn test_put_then_get_found() {
    let fx = Fixture::new();
    let record = fx.write_record("r.json", r#"{ "x": 7, "y": { "z": "hi" }, "opt": { "a": 5 } }"#);

    let (ok, stdout, stderr) = fx.put("user1", &record);
    assert!(ok, "put failed: {stderr}");
    assert!(stdout.contains("wrote 3 cells to profile/user1 at 1000"), "{stdout}");

    let schema = fx.schema();
    let (ok, stdout, stderr) = run_widerow(
        &fx.db(),
        &["get", "--schema", &schema, "--family", "profile", "--row", "user1"],
    );
    assert!(ok, "get failed: {stderr}");
    let output: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(output["resolution"], "found");
    assert_eq!(
        output["record"],
        serde_json::json!({ "x": 7, "y": { "z": "hi" }, "opt": { "a": 5 } })
    );
}

#[test]
fn test_get_fills_defaults() {
    let fx = Fixture::new();
    let record = fx.write_record("r.json", r#"{ "x": 1 }"#);
    let (ok, _, stderr) = fx.put("user2", &record);
    assert!(ok, "put failed: {stderr}");

    let schema = fx.schema();
    let (ok, stdout, _) = run_widerow(
        &fx.db(),
        &["get", "--schema", &schema, "--family", "profile", "--row", "user2"],
    );
    assert!(ok);
    let output: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        output["record"],
        serde_json::json!({ "x": 1, "y": { "z": "none" }, "opt": null })
    );
}

#[test]
fn test_get_missing_required_fails() {
    let fx = Fixture::new();
    let record = fx.write_record("r.json", r#"{ "x": 1, "y": {} }"#);
    assert!(fx.put("user3", &record).0);

    let schema = fx.schema();
    let (ok, _, _) = run_widerow(
        &fx.db(),
        &["get", "--schema", &schema, "--family", "profile", "--row", "nobody"],
    );
    assert!(!ok, "decode of an empty row must fail on required x");
}

#[test]
fn test_scan_and_families() {
    let fx = Fixture::new();
    let record = fx.write_record("r.json", r#"{ "x": 7, "y": { "z": "hi" } }"#);
    assert!(fx.put("user4", &record).0);

    let (ok, stdout, stderr) = run_widerow(
        &fx.db(),
        &["scan", "--row", "user4", "--format", "tsv"],
    );
    assert!(ok, "scan failed: {stderr}");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec!["profile\tx\t1000\t00000007", "profile\ty.z\t1000\t6869"]
    );

    let (ok, stdout, _) = run_widerow(&fx.db(), &["families"]);
    assert!(ok);
    assert!(stdout.lines().any(|line| line.trim() == "profile"));
}

#[test]
fn test_put_rejects_ill_typed_record() {
    let fx = Fixture::new();
    let record = fx.write_record("bad.json", r#"{ "x": "seven", "y": {} }"#);
    let (ok, stdout, _) = fx.put("user5", &record);
    assert!(!ok);
    assert!(stdout.is_empty());
}
