//! ---
//! crits_section: "01-core-functionality"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Shared primitives and utilities for role tooling."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use crits_security::{AddSourcePolicy, InMemorySourceRegistry, SourceRecord};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_store_directory() -> PathBuf {
    PathBuf::from("target/roles")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_source_active() -> bool {
    true
}

/// Primary configuration object for role tooling.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub roles: RolesConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Data sources known to the platform, keyed by name in declaration order.
    #[serde(default)]
    pub sources: IndexMap<String, SourceConfig>,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "CRITS_ACL_CONFIG";

    /// Load configuration from disk, respecting the `CRITS_ACL_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Read and validate a single configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        for name in self.sources.keys() {
            if name.trim().is_empty() {
                return Err(anyhow!("source names must not be empty"));
            }
            if name.trim() != name {
                return Err(anyhow!(
                    "source name '{}' has leading or trailing whitespace",
                    name
                ));
            }
        }
        self.store.validate()?;
        Ok(())
    }

    /// Build the source registry described by the `[sources]` table.
    pub fn source_registry(&self) -> InMemorySourceRegistry {
        InMemorySourceRegistry::from_records(self.sources.iter().map(|(name, source)| {
            let mut record = SourceRecord::new(name.clone());
            record.description = source.description.clone();
            record.active = source.active;
            record
        }))
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// On-disk encoding of role documents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreFormat {
    #[default]
    Json,
    Cbor,
}

impl StoreFormat {
    /// File extension used for documents in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            StoreFormat::Json => "json",
            StoreFormat::Cbor => "cbor",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_directory")]
    pub directory: PathBuf,
    #[serde(default)]
    pub format: StoreFormat,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: default_store_directory(),
            format: StoreFormat::default(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(anyhow!("store directory must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RolesConfig {
    /// Reaction to unknown source names when attaching ACLs.
    #[serde(default)]
    pub add_source_policy: AddSourcePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Prometheus textfile-collector output written when a command finishes.
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_source_active")]
    pub active: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            description: None,
            active: default_source_active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crits_security::SourceRegistry;

    const SAMPLE: &str = r#"
        [store]
        directory = "/var/lib/crits/roles"
        format = "cbor"

        [roles]
        add_source_policy = "strict"

        [sources.feed1]
        description = "Primary partner feed"

        [sources.archive]
        active = false

        [sources.honeypot]
    "#;

    #[test]
    fn parses_full_configuration() {
        let config: AppConfig = SAMPLE.parse().unwrap();
        assert_eq!(config.store.format, StoreFormat::Cbor);
        assert_eq!(config.roles.add_source_policy, AddSourcePolicy::Strict);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(!config.metrics.enabled);

        let names: Vec<_> = config.sources.keys().cloned().collect();
        assert_eq!(names, vec!["feed1", "archive", "honeypot"]);
        assert!(!config.sources["archive"].active);
    }

    #[test]
    fn empty_configuration_uses_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.store.directory, PathBuf::from("target/roles"));
        assert_eq!(config.roles.add_source_policy, AddSourcePolicy::Lenient);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn registry_mirrors_source_table() {
        let config: AppConfig = SAMPLE.parse().unwrap();
        let registry = config.source_registry();
        let feed = registry.lookup("feed1").unwrap();
        assert_eq!(feed.description.as_deref(), Some("Primary partner feed"));
        assert!(!registry.lookup("archive").unwrap().active);
        assert_eq!(registry.list_all().len(), 3);
    }

    #[test]
    fn rejects_padded_source_names() {
        let err = r#"[sources." feed1"]"#.parse::<AppConfig>().unwrap_err();
        assert!(err.to_string().contains("whitespace"));
    }

    #[test]
    fn rejects_empty_store_directory() {
        let err = "[store]\ndirectory = \"\"".parse::<AppConfig>().unwrap_err();
        assert!(err.to_string().contains("store directory"));
    }

    #[test]
    fn loads_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crits-acl.toml");
        fs::write(&path, SAMPLE).unwrap();
        let missing = dir.path().join("missing.toml");

        let loaded = AppConfig::load_with_source(&[missing, path.clone()]).unwrap();
        assert_eq!(loaded.source, path);
        assert_eq!(loaded.config.sources.len(), 3);
    }
}
