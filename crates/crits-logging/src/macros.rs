//! ---
//! crits_section: "03-persistence-logging"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Structured logging adapters and sinks."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
/// Emit an informational log enriched with role context.
#[macro_export]
macro_rules! crits_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            role = ctx.role.unwrap_or(""),
            source = ctx.source.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::crits_info!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a debug log enriched with role context.
#[macro_export]
macro_rules! crits_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            role = ctx.role.unwrap_or(""),
            source = ctx.source.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::crits_debug!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a warning enriched with role context.
#[macro_export]
macro_rules! crits_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            role = ctx.role.unwrap_or(""),
            source = ctx.source.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::crits_warn!(context = $crate::LogContext::default(), $($arg)+)
    }};
}
