//! ---
//! crits_section: "03-persistence-logging"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Persistence abstractions and storage bindings."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
//! Role document storage.
//!
//! [`RoleStore`] keeps one hashed document per role on disk and
//! [`RoleRepository`] layers per-role write serialization on top of it.
#![warn(missing_docs)]

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing role documents.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper for CBOR serialization issues.
    #[error("cbor serialization error: {0}")]
    Cbor(#[from] serde_cbor::Error),
    /// Reported when a role document fails integrity verification.
    #[error("role document hash mismatch: {0}")]
    HashMismatch(String),
    /// Wrapper for Prometheus metrics registration failures.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    /// A different role already uses the name.
    #[error("role already exists: {0}")]
    RoleExists(String),
    /// No stored role carries the name.
    #[error("role not found: {0}")]
    RoleNotFound(String),
    /// A role mutation was refused.
    #[error(transparent)]
    Role(#[from] crits_security::RoleError),
}

pub mod document;
pub mod metrics;
pub mod repository;
pub mod store;

pub use document::{load_document, save_document, verify_document, DOCUMENT_VERSION};
pub use metrics::StoreMetrics;
pub use repository::RoleRepository;
pub use store::RoleStore;
