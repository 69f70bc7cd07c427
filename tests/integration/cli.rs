//! The `autowire` binary.

use anyhow::Result;
use assert_cmd::Command;
use autowire::test_utils::TestProject;
use predicates::prelude::*;
use serde_json::{Value, json};

fn autowire() -> Command {
    let mut cmd = Command::cargo_bin("autowire").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG").env_remove("AUTOWIRE_CONFIG");
    cmd
}

fn project() -> Result<TestProject> {
    let project = TestProject::new()?;
    project.write("src/settings.json", r#"{ "debug": true }"#)?;
    project.write("src/lib/node-uuid.json", r#"{ "v4": "uuid" }"#)?;
    project.write("src/orphan.rs", "pub fn orphan() {}")?;
    Ok(project)
}

#[test]
fn test_signature_as_json() -> Result<()> {
    let output = autowire().args(["signature", "fn connect(host, port = 5432)", "--format", "json"]).assert().success();

    let parsed: Value = serde_json::from_slice(&output.get_output().stdout)?;
    assert_eq!(parsed["name"], json!("connect"));
    assert_eq!(parsed["kind"], json!("function"));
    assert_eq!(parsed["parameters"][0]["name"], json!("host"));
    assert_eq!(parsed["parameters"][0]["default"], Value::Null);
    assert_eq!(parsed["parameters"][1]["default"], json!(5432));
    Ok(())
}

#[test]
fn test_signature_table() {
    autowire()
        .args(["signature", "impl Widget { fn new(title = \"untitled\") }"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Widget"))
        .stdout(predicate::str::contains("0: title = \"untitled\""));
}

#[test]
fn test_unparseable_signature_fails() {
    autowire()
        .args(["signature", "struct Nope;"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot parse declaration"));
}

#[test]
fn test_index_lists_logical_names() -> Result<()> {
    let project = project()?;
    let output = autowire()
        .arg("--path")
        .arg(project.path())
        .args(["index", "--format", "json"])
        .assert()
        .success();

    let entries: Vec<Value> = serde_json::from_slice(&output.get_output().stdout)?;
    let names: Vec<&str> = entries.iter().filter_map(|e| e["name"].as_str()).collect();
    assert!(names.contains(&"settings"));
    assert!(names.contains(&"nodeUuid"));
    assert!(names.contains(&"orphan"));
    assert!(!names.contains(&"package"));

    let uuid = entries.iter().find(|e| e["name"] == json!("nodeUuid")).expect("nodeUuid listed");
    assert_eq!(uuid["path"], json!("src/lib/node-uuid.json"));
    Ok(())
}

#[test]
fn test_index_prefix_filter() -> Result<()> {
    let project = project()?;
    autowire()
        .arg("--path")
        .arg(project.path())
        .args(["index", "--prefix", "node"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nodeUuid"))
        .stdout(predicate::str::contains("settings").not());
    Ok(())
}

#[test]
fn test_resolve_reports_source_and_value() -> Result<()> {
    let project = project()?;
    let output = autowire()
        .arg("--path")
        .arg(project.path())
        .args(["resolve", "settings", "--format", "json"])
        .assert()
        .success();

    let report: Value = serde_json::from_slice(&output.get_output().stdout)?;
    assert_eq!(report["source"], json!("index"));
    assert_eq!(report["kind"], json!("value"));
    assert_eq!(report["path"], json!("src/settings.json"));
    assert_eq!(report["value"], json!({ "debug": true }));
    Ok(())
}

#[test]
fn test_resolve_missing_name_fails_with_suggestion() -> Result<()> {
    let project = project()?;
    autowire()
        .arg("--path")
        .arg(project.path())
        .args(["resolve", "setings"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot resolve dependency 'setings'"))
        .stderr(predicate::str::contains("Did you mean 'settings'?"));
    Ok(())
}

#[test]
fn test_resolve_indexed_file_without_module() -> Result<()> {
    let project = project()?;
    autowire()
        .arg("--path")
        .arg(project.path())
        .args(["resolve", "orphan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no module is registered"));
    Ok(())
}

#[test]
fn test_resolve_follows_configured_alias() -> Result<()> {
    let project = project()?;
    project.write("autowire.toml", "[aliases]\nuuid = \"nodeUuid\"\n")?;
    autowire()
        .arg("--path")
        .arg(project.path())
        .args(["resolve", "uuid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alias of: nodeUuid"))
        .stdout(predicate::str::contains("resolved via: index"));
    Ok(())
}

#[test]
fn test_quiet_silences_warnings_but_not_failures() -> Result<()> {
    let project = project()?;
    project.write("src/config/settings.json", r#"{ "debug": false }"#)?;

    autowire()
        .arg("--path")
        .arg(project.path())
        .arg("index")
        .assert()
        .success()
        .stderr(predicate::str::contains("maps to both"));

    autowire()
        .arg("--path")
        .arg(project.path())
        .args(["-q", "index"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    autowire()
        .arg("--path")
        .arg(project.path())
        .args(["-q", "resolve", "setings"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot resolve dependency 'setings'"));
    Ok(())
}

#[test]
fn test_unknown_format_is_rejected() -> Result<()> {
    let project = project()?;
    autowire()
        .arg("--path")
        .arg(project.path())
        .args(["index", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown output format"));
    Ok(())
}

#[test]
fn test_missing_project_directory() {
    autowire()
        .args(["--path", "/definitely/not/a/project", "index"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
