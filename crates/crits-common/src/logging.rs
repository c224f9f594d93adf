//! ---
//! crits_section: "01-core-functionality"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Shared primitives and utilities for role tooling."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "CRITS_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

static GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

/// Console rendering for operator-facing log output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Multi-field human readable lines with targets.
    #[default]
    Pretty,
    /// Single-line human readable output.
    Compact,
    /// One JSON object per event, for log shippers.
    StructuredJson,
}

/// Filter from `CRITS_LOG`, then `RUST_LOG`, then `info`.
fn env_filter(custom: Option<&str>) -> EnvFilter {
    if let Some(directive) = custom {
        match EnvFilter::try_new(directive) {
            Ok(filter) => return filter,
            Err(err) => eprintln!("ignoring invalid {LOG_ENV} directive ({err})"),
        }
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn console_layer<S>(format: LogFormat, writer: NonBlocking) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer().with_timer(fmt::time::UtcTime::rfc_3339());
    match format {
        LogFormat::Pretty => layer.with_writer(writer).boxed(),
        LogFormat::Compact => layer.compact().with_target(false).with_writer(writer).boxed(),
        LogFormat::StructuredJson => layer.json().with_target(false).with_writer(writer).boxed(),
    }
}

fn file_layer<S>(writer: NonBlocking) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer)
        .boxed()
}

/// Install the global subscriber for a binary.
///
/// Console output goes to stderr so command output on stdout stays machine
/// readable. Every event is also appended as JSON to a daily rolling file
/// `<prefix>.log` under the configured directory, where the prefix defaults to
/// the service name. Calling it again after a subscriber is installed is a
/// no-op apart from creating the directory.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());

    let custom = std::env::var(LOG_ENV).ok();
    let installed = tracing_subscriber::registry()
        .with(env_filter(custom.as_deref()))
        .with(console_layer(config.format, console_writer))
        .with(file_layer(file_writer))
        .try_init()
        .is_ok();

    if installed {
        // Writers flush on drop, so the guards live as long as the process.
        let _ = GUARDS.set([file_guard, console_guard]);
        info!(
            service = %service_name,
            log_dir = %config.directory.display(),
            format = ?config.format,
            "tracing initialised"
        );
    }
    Ok(())
}
