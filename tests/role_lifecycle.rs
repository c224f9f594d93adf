//! ---
//! crits_section: "15-testing-qa-runbook"
//! crits_subsection: "integration-tests"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Integration and validation tests for the role tooling stack."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use std::sync::Arc;

use crits_common::AppConfig;
use crits_persistence::{RoleRepository, RoleStore, StoreMetrics};
use crits_security::{
    AddSourceOutcome, AddSourcePolicy, Permission, Role, RoleError, RoleMetrics, SourceRegistry,
    TloField, TloType,
};
use prometheus::Registry;
use tempfile::tempdir;

fn config(store: &std::path::Path) -> AppConfig {
    format!(
        r#"
[store]
directory = "{}"

[roles]
add_source_policy = "strict"

[sources.feed1]
description = "Primary intel feed"

[sources.feed2]

[sources.feed3]
active = false
"#,
        store.display()
    )
    .parse()
    .unwrap()
}

#[test]
fn end_to_end_role_administration_flow() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    let sources = config.source_registry();
    assert_eq!(sources.list_all().len(), 3);

    let metrics_registry = Arc::new(Registry::new());
    let role_metrics = RoleMetrics::new(metrics_registry.clone()).unwrap();
    let store_metrics = StoreMetrics::new(metrics_registry.clone()).unwrap();
    let repo = RoleRepository::new(RoleStore::open(&config.store).unwrap())
        .with_metrics(store_metrics);

    // Templates
    let admin = repo
        .create(Role::administrator("Administrator", &sources))
        .unwrap();
    assert!(admin.all_granted());
    assert_eq!(admin.sources().len(), 3);

    let read_only = repo.create(Role::read_only("Read Only", &sources)).unwrap();
    assert!(read_only.sources().iter().all(|acl| acl.read && !acl.write));
    assert!(read_only.flag(Permission::ControlPanelRead));
    assert!(!read_only.flag(Permission::AddNewSource));
    assert!(read_only.tlo(TloType::Actor).get(TloField::Read).unwrap());
    assert!(!read_only.tlo(TloType::Actor).get(TloField::Write).unwrap());

    // Analyst built up one source at a time under the configured strict policy
    repo.create(Role::new("Analyst")).unwrap();
    let policy = config.roles.add_source_policy;
    assert_eq!(policy, AddSourcePolicy::Strict);

    let outcome = repo
        .update("Analyst", |role| role.add_source_with(&sources, "feed1", policy))
        .unwrap();
    role_metrics.record_add_source(outcome);
    assert_eq!(outcome, AddSourceOutcome::Added);

    let err = repo
        .update("Analyst", |role| {
            role.add_source_with(&sources, "unknown-feed", policy)
        })
        .unwrap_err();
    role_metrics.record_add_source_rejected();
    assert!(matches!(
        err,
        crits_persistence::PersistenceError::Role(RoleError::SourceNotFound(_))
    ));

    repo.update("Analyst", |role| {
        role.set_permission("sources.feed1.read", true)?;
        role.set_permission("Actor.comments_read", true)
    })
    .unwrap();

    let analyst = repo.get("Analyst").unwrap();
    assert_eq!(analyst.sources().len(), 1);
    assert!(analyst.permission("sources.feed1.read").unwrap());
    assert!(!analyst.permission("sources.feed1.write").unwrap());
    assert!(analyst.permission("Actor.comments_read").unwrap());
    assert!(!analyst.all_granted());

    // Promotion to full access
    repo.update("Analyst", |role| {
        role.add_all_sources(&sources);
        role.make_all_true();
        Ok(())
    })
    .unwrap();
    role_metrics.inc_grant_all();
    let analyst = repo.get("Analyst").unwrap();
    assert!(analyst.all_granted());
    let names: Vec<_> = analyst.sources().iter().map(|acl| acl.name.as_str()).collect();
    assert_eq!(names, vec!["feed1", "feed2", "feed3"]);

    let listed: Vec<_> = repo.list().unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(listed, vec!["Administrator", "Analyst", "Read Only"]);

    assert_eq!(role_metrics.source_acl_count("added"), 1);
    assert_eq!(role_metrics.source_acl_count("rejected"), 1);
    assert_eq!(metrics_registry.gather().len(), 5);
}

#[test]
fn distinct_roles_update_in_parallel() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    let sources = config.source_registry();
    let repo = RoleRepository::new(RoleStore::open(&config.store).unwrap());
    let names = ["Alpha", "Bravo", "Charlie", "Delta"];
    for name in names {
        repo.create(Role::new(name)).unwrap();
    }

    std::thread::scope(|scope| {
        for name in names {
            let repo = &repo;
            let sources = &sources;
            scope.spawn(move || {
                for source in ["feed1", "feed2", "feed3"] {
                    repo.update(name, |role| {
                        role.add_source_with(sources, source, AddSourcePolicy::Strict)
                    })
                    .unwrap();
                }
                repo.update(name, |role| {
                    role.make_all_true();
                    Ok(())
                })
                .unwrap();
            });
        }
    });

    for role in repo.list().unwrap() {
        assert_eq!(role.sources().len(), 3, "{}", role.name);
        assert!(role.all_granted(), "{}", role.name);
    }
}

#[test]
fn stored_json_carries_expected_shape() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    let sources = config.source_registry();
    let repo = RoleRepository::new(RoleStore::open(&config.store).unwrap());
    let role = repo.create(Role::read_only("Read Only", &sources)).unwrap();

    let value = serde_json::to_value(&role).unwrap();
    assert_eq!(value["name"], "Read Only");
    assert_eq!(value["active"], "on");
    assert_eq!(value["schema_version"], 1);
    assert_eq!(value["sources"][0]["name"], "feed1");
    assert_eq!(value["sources"][0]["read"], true);
    assert_eq!(value["sources"][0]["write"], false);
    assert_eq!(value["permissions"]["control_panel_read"], true);
    assert_eq!(value["tlos"]["Actor"]["read"], true);
}
