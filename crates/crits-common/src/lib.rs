//! ---
//! crits_section: "01-core-functionality"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Shared primitives and utilities for role tooling."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
//! Shared primitives for the CRITs role workspace.
//! This crate exposes configuration loading, tracing setup, and metrics
//! export utilities consumed by the binaries and integration tests.

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{
    AppConfig, LoadedAppConfig, LoggingConfig, MetricsConfig, RolesConfig, SourceConfig,
    StoreConfig, StoreFormat,
};
pub use logging::{init_tracing, LogFormat};
pub use metrics::write_textfile;
