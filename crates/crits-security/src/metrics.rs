//! ---
//! crits_section: "06-security-access-control"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Role records, permission bundles, and source ACLs."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

use crate::role::AddSourceOutcome;

/// Role mutation metrics exported via Prometheus.
#[derive(Clone)]
pub struct RoleMetrics {
    registry: Arc<Registry>,
    grant_all_total: IntCounter,
    source_acl_total: IntCounterVec,
}

impl RoleMetrics {
    /// Register metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> anyhow::Result<Self> {
        let grant_all_total = IntCounter::new(
            "crits_role_grant_all_total",
            "Blanket grants applied to roles",
        )?;
        let source_acl_total = IntCounterVec::new(
            Opts::new(
                "crits_role_source_acl_total",
                "Source ACL attach attempts by outcome",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(grant_all_total.clone()))?;
        registry.register(Box::new(source_acl_total.clone()))?;

        Ok(Self {
            registry,
            grant_all_total,
            source_acl_total,
        })
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Count a `make_all_true` application.
    pub fn inc_grant_all(&self) {
        self.grant_all_total.inc();
    }

    /// Count an `add_source` result.
    pub fn record_add_source(&self, outcome: AddSourceOutcome) {
        let label = match outcome {
            AddSourceOutcome::Added => "added",
            AddSourceOutcome::AlreadyPresent => "already_present",
            AddSourceOutcome::Skipped => "skipped",
        };
        self.source_acl_total.with_label_values(&[label]).inc();
    }

    /// Count a strict `add_source` that failed because the source is unknown.
    pub fn record_add_source_rejected(&self) {
        self.source_acl_total.with_label_values(&["rejected"]).inc();
    }

    /// Current count for an outcome label.
    pub fn source_acl_count(&self, outcome: &str) -> u64 {
        self.source_acl_total.with_label_values(&[outcome]).get()
    }
}

impl std::fmt::Debug for RoleMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleMetrics").finish_non_exhaustive()
    }
}
