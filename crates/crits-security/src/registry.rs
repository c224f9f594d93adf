//! ---
//! crits_section: "06-security-access-control"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Role records, permission bundles, and source ACLs."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Data source known to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Unique, case-sensitive source name.
    pub name: String,
    /// Free-form description shown to operators.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the source currently accepts new data.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Timestamp the source was registered.
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl SourceRecord {
    /// Active source registered now.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Lookup capability over the platform's data sources.
///
/// Roles receive the registry as an argument rather than reaching for a
/// global, so tests and tools can hand in whatever catalogue they hold.
pub trait SourceRegistry: Send + Sync {
    /// Find a source by exact name.
    fn lookup(&self, name: &str) -> Option<SourceRecord>;

    /// Every known source, in registration order.
    fn list_all(&self) -> Vec<SourceRecord>;
}

/// Thread-safe in-memory registry, cheap to clone and share.
#[derive(Debug, Default, Clone)]
pub struct InMemorySourceRegistry {
    sources: Arc<RwLock<IndexMap<String, SourceRecord>>>,
}

impl InMemorySourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `records`; later duplicates replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = SourceRecord>) -> Self {
        let registry = Self::new();
        for record in records {
            registry.insert(record);
        }
        registry
    }

    /// Insert or replace a source. Returns `true` when the name was new.
    pub fn insert(&self, record: SourceRecord) -> bool {
        self.sources
            .write()
            .insert(record.name.clone(), record)
            .is_none()
    }

    /// Remove a source. Role ACLs referencing it are left in place.
    pub fn remove(&self, name: &str) -> Option<SourceRecord> {
        self.sources.write().shift_remove(name)
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.read().len()
    }

    /// Whether no sources are registered.
    pub fn is_empty(&self) -> bool {
        self.sources.read().is_empty()
    }
}

impl SourceRegistry for InMemorySourceRegistry {
    fn lookup(&self, name: &str) -> Option<SourceRecord> {
        self.sources.read().get(name).cloned()
    }

    fn list_all(&self) -> Vec<SourceRecord> {
        self.sources.read().values().cloned().collect()
    }
}
