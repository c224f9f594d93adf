//! ---
//! crits_section: "03-persistence-logging"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Structured logging adapters and sinks."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for development and CLI use.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Role the event concerns.
    pub role: Option<&'a str>,
    /// Data source the event concerns.
    pub source: Option<&'a str>,
    /// Mutation or lifecycle operation name (e.g. `add_source`).
    pub operation: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a role name.
    pub fn with_role(mut self, role: &'a str) -> Self {
        self.role = Some(role);
        self
    }

    /// Attach a data source name.
    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach the operation being performed.
    pub fn with_operation(mut self, operation: &'a str) -> Self {
        self.operation = Some(operation);
        self
    }
}

/// High-level outcome used when emitting role lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleEventOutcome {
    /// The operation changed the role.
    Applied,
    /// The operation left the role untouched.
    Unchanged,
    /// The operation was refused.
    Rejected,
}

impl RoleEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            RoleEventOutcome::Applied => "applied",
            RoleEventOutcome::Unchanged => "unchanged",
            RoleEventOutcome::Rejected => "rejected",
        }
    }
}

/// Emit a standardized role event. Rejections are logged at `WARN`, everything else at `INFO`.
pub fn log_role_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: RoleEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    match outcome {
        RoleEventOutcome::Rejected => tracing::warn!(
            event,
            outcome = outcome.as_str(),
            role = ctx.role.unwrap_or(""),
            source = ctx.source.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %message
        ),
        _ => tracing::info!(
            event,
            outcome = outcome.as_str(),
            role = ctx.role.unwrap_or(""),
            source = ctx.source.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %message
        ),
    }
}
