//! End-to-end tests for the skinbuild binary.

#![allow(deprecated)] // Command::cargo_bin

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn skinbuild() -> Command {
    Command::cargo_bin("skinbuild").expect("binary is built")
}

fn write_pair(lib: &Path, stem: &str) {
    let source = lib.join(format!("{stem}.cpp"));
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(&source, "").unwrap();
    fs::write(source.with_extension("hpp"), "").unwrap();
}

const FOO_MODULE: &str =
    r#"{ "source": "foo.py", "system_modules": ["os", "os.path"], "application_modules": ["bar"] }"#;

/// A project whose manifest needs no external tool to be planned.
fn project(translator: &str) -> TempDir {
    project_with(translator, FOO_MODULE)
}

fn project_with(translator: &str, modules: &str) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let lib = dir.path().join("lib");
    for stem in ["builtin", "os/__init__", "os/path"] {
        write_pair(&lib, stem);
    }
    fs::write(dir.path().join("foo.py"), "def test_all(): pass\n").unwrap();
    fs::write(dir.path().join("bar.py"), "").unwrap();
    fs::write(
        dir.path().join("skinbuild.json"),
        format!(
            r#"{{
                "library_root": "lib",
                "host_include": "/usr/include/python3",
                "platform": "linux",
                "translator": {{ "program": "{translator}" }},
                "modules": [ {modules} ]
            }}"#
        ),
    )
    .unwrap();
    dir
}

#[test]
fn test_resolve_namespace_module() {
    let dir = TempDir::new().unwrap();
    write_pair(dir.path(), "os/path");

    skinbuild()
        .args(["resolve", "os.path", "--library-root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            dir.path().join("os/path.cpp").display().to_string(),
        ))
        .stdout(predicate::str::contains(
            dir.path().join("os/path.hpp").display().to_string(),
        ));
}

#[test]
fn test_resolve_missing_module_shows_hint() {
    let dir = TempDir::new().unwrap();

    skinbuild()
        .args(["resolve", "math", "--library-root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot resolve system module 'math'"))
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn test_resolve_rejects_bad_name() {
    skinbuild()
        .args(["resolve", "os..path", "--library-root", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid module name"));
}

#[test]
fn test_plan_prints_json() {
    let dir = project("shedskin");

    let output = skinbuild()
        .arg("plan")
        .arg("--manifest")
        .arg(dir.path().join("skinbuild.json"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let plans: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let plan = &plans[0];
    assert_eq!(plan["module"], "foo");
    assert_eq!(plan["target"]["artifact_file_name"], "foo.so");
    assert_eq!(
        plan["target"]["translation_units"].as_array().unwrap().len(),
        5
    );
    assert_eq!(plan["test"]["verify_call"], "foo.test_all()");
    assert_eq!(plan["translation"]["command"]["program"], "shedskin");
}

#[test]
fn test_plan_unknown_module_fails() {
    let dir = project("shedskin");

    skinbuild()
        .arg("plan")
        .arg("--manifest")
        .arg(dir.path().join("skinbuild.json"))
        .arg("nope")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown module 'nope'"));
}

#[test]
fn test_plan_missing_manifest_fails() {
    let dir = TempDir::new().unwrap();

    skinbuild()
        .current_dir(dir.path())
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("skinbuild.json"));
}

#[test]
fn test_build_without_translator_fails() {
    let dir = project("skinbuild-test-no-such-translator");

    skinbuild()
        .arg("build")
        .arg("--manifest")
        .arg(dir.path().join("skinbuild.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "failed to run 'skinbuild-test-no-such-translator'",
        ));
}

#[test]
fn test_plan_reports_bad_module_and_prints_the_rest() {
    let dir = project_with(
        "shedskin",
        &format!(r#"{FOO_MODULE}, {{ "source": "other.py", "system_modules": ["os..path"] }}"#),
    );
    fs::write(dir.path().join("other.py"), "").unwrap();
    let manifest = dir.path().join("skinbuild.json");

    skinbuild()
        .arg("plan")
        .arg("--manifest")
        .arg(&manifest)
        .arg("foo")
        .assert()
        .success();

    let output = skinbuild()
        .arg("plan")
        .arg("--manifest")
        .arg(&manifest)
        .output()
        .unwrap();
    assert!(!output.status.success());

    let plans: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plans.as_array().unwrap().len(), 1);
    assert_eq!(plans[0]["module"], "foo");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("other"));
    assert!(stderr.contains("invalid module name 'os..path'"));
}

#[test]
fn test_debug_module_reports_resolved_lists() {
    let dir = project_with(
        "shedskin",
        r#"{ "source": "foo.py", "system_modules": ["os.path"], "application_modules": ["bar"], "debug": true }"#,
    );

    skinbuild()
        .env_remove("RUST_LOG")
        .arg("plan")
        .arg("--manifest")
        .arg(dir.path().join("skinbuild.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("resolved modules"))
        .stderr(predicate::str::contains("builtin, os.path"))
        .stderr(predicate::str::contains("bar"));
}

#[test]
fn test_quiet_module_reports_nothing() {
    let dir = project("shedskin");

    skinbuild()
        .env_remove("RUST_LOG")
        .arg("plan")
        .arg("--manifest")
        .arg(dir.path().join("skinbuild.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("resolved modules").not());
}
