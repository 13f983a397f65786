use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

macro_rules! loctree {
    () => {
        assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("loctree"))
    };
}

fn sample_tree() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    fs::write(dir.path().join("a.go"), "package p\n// comment\nfunc f() {}\n").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/b.py"), "\"\"\"doc\"\"\"\nx = 1\n").unwrap();
    dir
}

#[test]
fn yaml_summary_by_default() {
    let dir = sample_tree();
    loctree!()
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Go: 2"))
        .stdout(predicate::str::contains("Python: 1"));
}

#[test]
fn json_tree_with_all() {
    let dir = sample_tree();
    let output = loctree!()
        .args(["-a", "-o", "json"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["name"], "TOTAL");
    assert_eq!(value["summary"]["Go"], 2);
    assert_eq!(value["subdirs"][0]["summary"]["Python"], 1);
}

#[test]
fn text_output_and_timing() {
    let dir = sample_tree();
    loctree!()
        .args(["-o", "text", "-t"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Total"))
        .stdout(predicate::str::contains("Counting completed in"));
}

#[test]
fn missing_path_is_not_fatal() {
    let dir = sample_tree();
    loctree!()
        .args(["-o", "json"])
        .arg(dir.path().join("does-not-exist"))
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Go\": 2"));
}

#[test]
fn debug_logs_to_stderr() {
    let dir = sample_tree();
    loctree!()
        .arg("-d")
        .arg(dir.path().join("does-not-exist"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Cannot stat"));
}

#[test]
fn no_paths_is_a_usage_error() {
    loctree!().assert().failure();
}

#[test]
fn bad_config_fails() {
    let dir = sample_tree();
    let cfg = dir.path().join("loctree.toml");
    fs::write(&cfg, "[[languages]]\nname = \"Dup\"\nextensions = [\"go\"]\n[languages.comments]\n").unwrap();
    loctree!()
        .arg("-c")
        .arg(&cfg)
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already claimed"));
}
