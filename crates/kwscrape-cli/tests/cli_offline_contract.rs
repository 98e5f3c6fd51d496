use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn kwscrape(state_dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kwscrape"));
    cmd.env_remove("KWSCRAPE_ENV_FILE")
        .env("KWSCRAPE_STATE_DIR", state_dir);
    cmd
}

#[test]
fn kwscrape_version_json_contract() {
    let tmp = tempfile::tempdir().unwrap();
    let out = kwscrape(tmp.path())
        .arg("version")
        .output()
        .expect("run kwscrape version");
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("version json");
    assert_eq!(v["schema_version"], 1);
    assert_eq!(v["kind"], "version");
    assert_eq!(v["name"], "kwscrape");
}

#[test]
fn kwscrape_version_text_contract() {
    let tmp = tempfile::tempdir().unwrap();
    kwscrape(tmp.path())
        .args(["version", "--output", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("kwscrape "));
}

#[test]
fn kwscrape_theme_toggle_persists() {
    let tmp = tempfile::tempdir().unwrap();
    kwscrape(tmp.path())
        .arg("theme")
        .assert()
        .success()
        .stdout("light\n");
    kwscrape(tmp.path())
        .args(["theme", "--toggle"])
        .assert()
        .success()
        .stdout("dark\n");
    kwscrape(tmp.path())
        .arg("theme")
        .assert()
        .success()
        .stdout("dark\n");

    let raw = std::fs::read_to_string(tmp.path().join("prefs.json")).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["darkMode"], "true");
}

#[test]
fn kwscrape_history_filters_and_removes() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("prefs.json"),
        serde_json::json!({ "searchHistory": r#"["pet","Food","petal"]"# }).to_string(),
    )
    .unwrap();

    kwscrape(tmp.path())
        .args(["history", "--prefix", "PE"])
        .assert()
        .success()
        .stdout("pet\npetal\n");

    kwscrape(tmp.path())
        .args(["history", "--remove", "pet", "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"petal\"").and(predicate::str::contains("\"pet\"").not()));

    kwscrape(tmp.path())
        .arg("history")
        .assert()
        .success()
        .stdout("Food\npetal\n");
}

#[test]
fn kwscrape_blank_endpoint_override_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    kwscrape(tmp.path())
        .args(["list", "--worker-save-url", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured: worker save URL"));
}
