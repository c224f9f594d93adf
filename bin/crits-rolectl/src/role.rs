//! ---
//! crits_section: "05-networking-external-interfaces"
//! crits_subsection: "binary"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Role subcommands for the control CLI."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use clap::{ArgAction, Subcommand, ValueEnum};
use crits_logging::{log_role_event, LogContext, RoleEventOutcome};
use crits_persistence::PersistenceError;
use crits_security::{AddSourceOutcome, AddSourcePolicy, Role, RoleError};
use tracing::warn;

use crate::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Template {
    /// Every permission denied, no sources.
    Empty,
    /// Every registry source attached and every permission granted.
    Administrator,
    /// Every registry source readable, every read permission granted.
    ReadOnly,
}

#[derive(Debug, Subcommand)]
pub enum RoleCommand {
    #[command(about = "Create a new role")]
    Create {
        name: String,
        #[arg(long, value_enum, default_value_t = Template::Empty)]
        template: Template,
    },
    #[command(about = "Print a role as JSON")]
    Show { name: String },
    #[command(about = "List stored roles")]
    List,
    #[command(about = "List every permission of a role with its current value")]
    Permissions { name: String },
    #[command(about = "Delete a role")]
    Delete { name: String },
    #[command(about = "Grant every permission and source ACL a role holds")]
    GrantAll { name: String },
    #[command(about = "Attach a data source ACL to a role")]
    AddSource {
        name: String,
        source: String,
        #[arg(long, help = "Fail when the source is not registered")]
        strict: bool,
    },
    #[command(about = "Attach every registered data source to a role")]
    AddAllSources { name: String },
    #[command(about = "Detach a data source ACL from a role")]
    RemoveSource { name: String, source: String },
    #[command(about = "Set one permission, e.g. `Actor.comments_add true`")]
    Set {
        name: String,
        path: String,
        #[arg(action = ArgAction::Set)]
        value: bool,
    },
    #[command(about = "Upgrade every stored role to the latest schema")]
    Migrate,
}

pub fn run(app: &App, command: RoleCommand) -> Result<()> {
    match command {
        RoleCommand::Create { name, template } => {
            let role = match template {
                Template::Empty => Role::new(name),
                Template::Administrator => Role::administrator(name, &app.registry),
                Template::ReadOnly => Role::read_only(name, &app.registry),
            };
            let role = app.repository.create(role)?;
            log_role_event(
                Some(&LogContext::new().with_role(&role.name).with_operation("create")),
                "role.create",
                "role stored",
                RoleEventOutcome::Applied,
            );
            println!("created role {} ({})", role.name, role.id);
        }
        RoleCommand::Show { name } => {
            let role = app.repository.get(&name)?;
            let json = serde_json::to_string_pretty(&role)
                .with_context(|| format!("unable to render role {name}"))?;
            println!("{json}");
        }
        RoleCommand::List => {
            for (path, err) in app.repository.store().damaged()? {
                warn!(path = %path.display(), error = %err, "role document cannot be loaded");
            }
            for role in app.repository.list()? {
                println!(
                    "{}\t{}\t{} sources",
                    role.name,
                    if role.is_active() { "active" } else { "inactive" },
                    role.sources().len()
                );
            }
        }
        RoleCommand::Permissions { name } => {
            let role = app.repository.get(&name)?;
            for entry in role.permission_entries() {
                println!("{}\t{}\t{}", entry.group, entry.path, entry.value);
            }
        }
        RoleCommand::Delete { name } => {
            let role = app.repository.delete(&name)?;
            println!("deleted role {} ({})", role.name, role.id);
        }
        RoleCommand::GrantAll { name } => {
            app.repository.update(&name, |role| {
                role.make_all_true();
                Ok(())
            })?;
            app.role_metrics.inc_grant_all();
            println!("granted every permission on {name}");
        }
        RoleCommand::AddSource {
            name,
            source,
            strict,
        } => add_source(app, &name, &source, strict)?,
        RoleCommand::AddAllSources { name } => {
            let added = app
                .repository
                .update(&name, |role| Ok(role.add_all_sources(&app.registry)))?;
            for _ in 0..added {
                app.role_metrics.record_add_source(AddSourceOutcome::Added);
            }
            println!("attached {added} sources to {name}");
        }
        RoleCommand::RemoveSource { name, source } => {
            let removed = app
                .repository
                .update(&name, |role| Ok(role.remove_source(&source)))?;
            if removed {
                println!("removed {source} from {name}");
            } else {
                println!("{name} has no ACL for {source}");
            }
        }
        RoleCommand::Set { name, path, value } => {
            app.repository
                .update(&name, |role| role.set_permission(&path, value))?;
            println!("{name}: {path} = {value}");
        }
        RoleCommand::Migrate => {
            let mut migrated = 0;
            for role in app.repository.list()? {
                // Listing migrates in memory; the no-op update persists it.
                let changed = app
                    .repository
                    .update(&role.name, |role| Ok(role.is_changed()))?;
                if changed {
                    migrated += 1;
                }
            }
            println!("migrated {migrated} roles");
        }
    }
    Ok(())
}

fn add_source(app: &App, name: &str, source: &str, strict: bool) -> Result<()> {
    let policy = if strict {
        AddSourcePolicy::Strict
    } else {
        app.config.roles.add_source_policy
    };
    let ctx = LogContext::new()
        .with_role(name)
        .with_source(source)
        .with_operation("add_source");

    let outcome = app
        .repository
        .update(name, |role| role.add_source_with(&app.registry, source, policy));
    match outcome {
        Ok(outcome) => {
            app.role_metrics.record_add_source(outcome);
            let (event_outcome, message) = match outcome {
                AddSourceOutcome::Added => (RoleEventOutcome::Applied, "attached"),
                AddSourceOutcome::AlreadyPresent => {
                    (RoleEventOutcome::Unchanged, "already attached")
                }
                AddSourceOutcome::Skipped => (RoleEventOutcome::Unchanged, "not registered"),
            };
            log_role_event(Some(&ctx), "role.add_source", message, event_outcome);
            println!("{source}: {message}");
            Ok(())
        }
        Err(PersistenceError::Role(RoleError::SourceNotFound(missing))) => {
            app.role_metrics.record_add_source_rejected();
            log_role_event(
                Some(&ctx),
                "role.add_source",
                "source not registered",
                RoleEventOutcome::Rejected,
            );
            Err(RoleError::SourceNotFound(missing).into())
        }
        Err(err) => Err(err.into()),
    }
}
