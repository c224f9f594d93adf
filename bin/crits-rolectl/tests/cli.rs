//! ---
//! crits_section: "15-testing-qa-runbook"
//! crits_subsection: "integration-tests"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "End-to-end tests driving the role administration CLI."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{tempdir, TempDir};

fn write_config(dir: &Path) -> PathBuf {
    let store = dir.join("roles");
    let logs = dir.join("logs");
    let metrics = dir.join("crits.prom");
    let config = format!(
        r#"
[logging]
directory = "{logs}"

[store]
directory = "{store}"

[metrics]
enabled = true
textfile = "{metrics}"

[sources.feed1]
description = "Primary intel feed"

[sources.feed2]
active = false
"#,
        logs = logs.display(),
        store = store.display(),
        metrics = metrics.display(),
    );
    let path = dir.join("crits-acl.toml");
    fs::write(&path, config).unwrap();
    path
}

fn rolectl(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("crits-rolectl").unwrap();
    cmd.env_remove("CRITS_ACL_CONFIG").arg("--config").arg(config);
    cmd
}

fn setup() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());
    (dir, config)
}

fn stdout(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn create_add_source_and_show() {
    let (_dir, config) = setup();

    let created = stdout(rolectl(&config).args(["role", "create", "Analyst"]));
    assert!(created.contains("created role Analyst"));

    let added = stdout(rolectl(&config).args(["role", "add-source", "Analyst", "feed1"]));
    assert!(added.contains("feed1: attached"));

    let again = stdout(rolectl(&config).args(["role", "add-source", "Analyst", "feed1"]));
    assert!(again.contains("already attached"));

    let skipped = stdout(rolectl(&config).args(["role", "add-source", "Analyst", "nope"]));
    assert!(skipped.contains("not registered"));

    let shown = stdout(rolectl(&config).args(["role", "show", "Analyst"]));
    let role: serde_json::Value = serde_json::from_str(&shown).unwrap();
    assert_eq!(role["name"], "Analyst");
    let sources = role["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["name"], "feed1");
    assert_eq!(sources[0]["read"], false);
    assert_eq!(sources[0]["write"], false);
}

#[test]
fn strict_add_source_rejects_unknown_names() {
    let (_dir, config) = setup();
    rolectl(&config)
        .args(["role", "create", "Analyst"])
        .assert()
        .success();

    rolectl(&config)
        .args(["role", "add-source", "Analyst", "nope", "--strict"])
        .assert()
        .failure();

    let shown = stdout(rolectl(&config).args(["role", "show", "Analyst"]));
    let role: serde_json::Value = serde_json::from_str(&shown).unwrap();
    assert!(role["sources"].as_array().unwrap().is_empty());
}

#[test]
fn grant_all_after_attaching_every_source() {
    let (dir, config) = setup();
    rolectl(&config)
        .args(["role", "create", "Analyst"])
        .assert()
        .success();

    let attached = stdout(rolectl(&config).args(["role", "add-all-sources", "Analyst"]));
    assert!(attached.contains("attached 2 sources"));

    rolectl(&config)
        .args(["role", "grant-all", "Analyst"])
        .assert()
        .success();

    let permissions = stdout(rolectl(&config).args(["role", "permissions", "Analyst"]));
    assert!(permissions.contains("sources.feed2.write\ttrue"));
    assert!(permissions.contains("control_panel_read\ttrue"));
    assert!(!permissions.contains("\tfalse"));

    let exported = fs::read_to_string(dir.path().join("crits.prom")).unwrap();
    assert!(exported.contains("crits_role_grant_all_total 1"));
    assert!(exported.contains("crits_role_source_acl_total{outcome=\"added\"} 2"));

    rolectl(&config)
        .args(["role", "grant-all", "Analyst"])
        .assert()
        .success();
    let exported = fs::read_to_string(dir.path().join("crits.prom")).unwrap();
    assert!(exported.contains("crits_role_grant_all_total 2"));
    assert!(exported.contains("crits_role_source_acl_total{outcome=\"added\"} 2"));
}

#[test]
fn set_single_permission_and_reject_protected_paths() {
    let (_dir, config) = setup();
    rolectl(&config)
        .args(["role", "create", "Analyst"])
        .assert()
        .success();

    rolectl(&config)
        .args(["role", "set", "Analyst", "Actor.comments_add", "true"])
        .assert()
        .success();
    let permissions = stdout(rolectl(&config).args(["role", "permissions", "Analyst"]));
    assert!(permissions.contains("Actor.comments_add\ttrue"));
    assert!(permissions.contains("Actor.read\tfalse"));

    rolectl(&config)
        .args(["role", "set", "Analyst", "name", "true"])
        .assert()
        .failure();
}

#[test]
fn templates_list_and_delete() {
    let (_dir, config) = setup();
    for (name, template) in [("Administrator", "administrator"), ("Read Only", "read-only")] {
        rolectl(&config)
            .args(["role", "create", name, "--template", template])
            .assert()
            .success();
    }

    let listed = stdout(rolectl(&config).args(["role", "list"]));
    let lines: Vec<_> = listed.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Administrator\tactive\t2 sources"));
    assert!(lines[1].starts_with("Read Only\tactive\t2 sources"));

    rolectl(&config)
        .args(["role", "delete", "Read Only"])
        .assert()
        .success();
    let listed = stdout(rolectl(&config).args(["role", "list"]));
    assert_eq!(listed.lines().count(), 1);

    rolectl(&config)
        .args(["role", "create", "Administrator"])
        .assert()
        .failure();
}

#[test]
fn source_list_prints_registry() {
    let (_dir, config) = setup();
    let listed = stdout(rolectl(&config).args(["source", "list"]));
    assert!(listed.contains("feed1\tactive\tPrimary intel feed"));
    assert!(listed.contains("feed2\tinactive"));
}
