//! ---
//! crits_section: "05-networking-external-interfaces"
//! crits_subsection: "binary"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Control CLI for administrators managing roles and source ACLs."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crits_common::{init_tracing, write_textfile, AppConfig, LoadedAppConfig};
use crits_logging as logging;
use crits_persistence::{RoleRepository, RoleStore, StoreMetrics};
use crits_security::{InMemorySourceRegistry, RoleMetrics};
use prometheus::Registry;
use tracing::{debug, warn};

mod role;
mod source;

const SERVICE_NAME: &str = "crits-rolectl";
const CONFIG_CANDIDATES: &[&str] = &["crits-acl.toml", "/etc/crits/crits-acl.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "CRITs role and source ACL administration utility",
    long_about = None
)]
struct Cli {
    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file (defaults to $CRITS_ACL_CONFIG, then ./crits-acl.toml)"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(subcommand, about = "Create, inspect, and edit roles")]
    Role(role::RoleCommand),
    #[command(subcommand, about = "Inspect the configured data sources")]
    Source(source::SourceCommand),
}

/// Everything a command needs, built once from configuration.
pub struct App {
    pub config: AppConfig,
    pub registry: InMemorySourceRegistry,
    pub repository: RoleRepository,
    pub role_metrics: RoleMetrics,
    metrics_registry: Arc<Registry>,
}

impl App {
    fn build(config: AppConfig) -> Result<Self> {
        let metrics_registry = Arc::new(Registry::new());
        let role_metrics = RoleMetrics::new(metrics_registry.clone())?;
        let store_metrics = StoreMetrics::new(metrics_registry.clone())?;
        let store = RoleStore::open(&config.store).with_context(|| {
            format!(
                "unable to open role store {}",
                config.store.directory.display()
            )
        })?;
        Ok(Self {
            registry: config.source_registry(),
            repository: RoleRepository::new(store).with_metrics(store_metrics),
            role_metrics,
            metrics_registry,
            config,
        })
    }

    fn flush_metrics(&self) -> Result<()> {
        if !self.config.metrics.enabled {
            return Ok(());
        }
        match &self.config.metrics.textfile {
            Some(path) => write_textfile(&self.metrics_registry, path),
            None => {
                debug!("metrics enabled without a textfile path; nothing to export");
                Ok(())
            }
        }
    }
}

fn load_config(explicit: Option<PathBuf>) -> Result<Option<LoadedAppConfig>> {
    if let Some(path) = explicit {
        let config = AppConfig::from_path(&path)?;
        return Ok(Some(LoadedAppConfig {
            config,
            source: path,
        }));
    }
    match AppConfig::load_with_source(CONFIG_CANDIDATES) {
        Ok(loaded) => Ok(Some(loaded)),
        Err(err) if std::env::var_os(AppConfig::ENV_CONFIG_PATH).is_some() => Err(err),
        Err(_) => Ok(None),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match load_config(cli.config)? {
        Some(loaded) => {
            init_tracing(SERVICE_NAME, &loaded.config.logging)?;
            debug!(config = %loaded.source.display(), "configuration loaded");
            loaded.config
        }
        None => {
            logging::init();
            warn!("no configuration file found; using built-in defaults");
            AppConfig::default()
        }
    };

    let app = App::build(config)?;
    match cli.command {
        Commands::Role(cmd) => role::run(&app, cmd)?,
        Commands::Source(cmd) => source::run(&app, cmd)?,
    }
    app.flush_metrics()
}
