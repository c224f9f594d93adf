//! ---
//! crits_section: "03-persistence-logging"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Persistence abstractions and storage bindings."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{self, Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

use crate::Result;

/// Metrics published by the role store.
#[derive(Clone)]
pub struct StoreMetrics {
    roles_saved: IntCounterVec,
    roles_failed: IntCounterVec,
    load_duration: Histogram,
    #[allow(dead_code)]
    registry: Arc<Registry>,
}

impl StoreMetrics {
    /// Register all store metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let roles_saved = IntCounterVec::new(
            Opts::new(
                "crits_roles_saved_total",
                "Total number of role documents successfully written",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(roles_saved.clone()))?;

        let roles_failed = IntCounterVec::new(
            Opts::new(
                "crits_roles_failed_total",
                "Total number of role repository operations that failed",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(roles_failed.clone()))?;

        let histogram_opts = HistogramOpts::new(
            "crits_role_load_duration_seconds",
            "Duration spent loading a role document",
        )
        .buckets(prometheus::exponential_buckets(0.0005, 2.0, 12)?);
        let load_duration = Histogram::with_opts(histogram_opts)?;
        registry.register(Box::new(load_duration.clone()))?;

        Ok(Self {
            roles_saved,
            roles_failed,
            load_duration,
            registry,
        })
    }

    /// Record a successful write by a repository operation (`create`, `update`).
    pub fn record_saved(&self, operation: &str) {
        self.roles_saved.with_label_values(&[operation]).inc();
    }

    /// Record a failed repository operation.
    pub fn record_failed(&self, operation: &str) {
        self.roles_failed.with_label_values(&[operation]).inc();
    }

    /// Observe the time spent loading a role.
    pub fn observe_load(&self, seconds: f64) {
        self.load_duration.observe(seconds);
    }

    /// Successful writes recorded for an operation.
    pub fn saved_count(&self, operation: &str) -> u64 {
        self.roles_saved.with_label_values(&[operation]).get()
    }

    /// Failures recorded for an operation.
    pub fn failed_count(&self, operation: &str) -> u64 {
        self.roles_failed.with_label_values(&[operation]).get()
    }
}

impl std::fmt::Debug for StoreMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreMetrics").finish_non_exhaustive()
    }
}
