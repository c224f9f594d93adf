//! ---
//! crits_section: "05-networking-external-interfaces"
//! crits_subsection: "binary"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Source subcommands for the control CLI."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use anyhow::Result;
use clap::Subcommand;
use crits_security::SourceRegistry;

use crate::App;

#[derive(Debug, Subcommand)]
pub enum SourceCommand {
    #[command(about = "List data sources known to the registry")]
    List,
}

pub fn run(app: &App, command: SourceCommand) -> Result<()> {
    match command {
        SourceCommand::List => {
            for record in app.registry.list_all() {
                println!(
                    "{}\t{}\t{}",
                    record.name,
                    if record.active { "active" } else { "inactive" },
                    record.description.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}
