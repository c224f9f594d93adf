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
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::{debug, warn};

/// Write every metric in `registry` to `path` in the Prometheus text format.
///
/// Short-lived commands cannot be scraped, so they leave their metrics for a
/// node exporter textfile collector. Each command starts from a fresh
/// registry, so counters already in the file are added to this run's values;
/// other families keep the most recent run that reported them. The file is
/// replaced atomically.
pub fn write_textfile(registry: &Registry, path: &Path) -> Result<()> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("failed to encode metrics")?;
    let current = String::from_utf8(buffer).context("metrics encoder produced invalid UTF-8")?;

    let previous = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(err).with_context(|| format!("unable to read metrics {}", path.display()))
        }
    };
    let merged = render(&merge(parse(&previous), parse(&current)));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let staging = path.with_extension("prom.tmp");
    fs::write(&staging, &merged)
        .with_context(|| format!("unable to write metrics to {}", staging.display()))?;
    fs::rename(&staging, path)
        .with_context(|| format!("unable to move metrics into {}", path.display()))?;
    debug!(path = %path.display(), bytes = merged.len(), "metrics textfile written");
    Ok(())
}

/// One metric family of a text exposition.
#[derive(Debug, Default)]
struct Family {
    header: Vec<String>,
    counter: bool,
    samples: IndexMap<String, f64>,
}

type Exposition = IndexMap<String, Family>;

fn parse(text: &str) -> Exposition {
    let mut families = Exposition::new();
    let mut current: Option<String> = None;
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(rest) = line
            .strip_prefix("# HELP ")
            .or_else(|| line.strip_prefix("# TYPE "))
        {
            let mut parts = rest.split_whitespace();
            let Some(name) = parts.next() else { continue };
            let family = families.entry(name.to_owned()).or_default();
            family.header.push(line.to_owned());
            if line.starts_with("# TYPE ") && parts.next() == Some("counter") {
                family.counter = true;
            }
            current = Some(name.to_owned());
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        let parsed = line
            .rsplit_once(' ')
            .and_then(|(series, value)| Some((series, value.parse::<f64>().ok()?)));
        match (parsed, current.as_ref()) {
            (Some((series, value)), Some(name)) => {
                if let Some(family) = families.get_mut(name) {
                    family.samples.insert(series.to_owned(), value);
                }
            }
            _ => warn!(line, "ignoring malformed metrics line"),
        }
    }
    families
}

fn merge(previous: Exposition, mut current: Exposition) -> Exposition {
    for (name, earlier) in previous {
        match current.get_mut(&name) {
            Some(family) if family.counter && earlier.counter => {
                for (series, value) in earlier.samples {
                    *family.samples.entry(series).or_insert(0.0) += value;
                }
            }
            Some(_) => {}
            None => {
                current.insert(name, earlier);
            }
        }
    }
    current
}

fn render(families: &Exposition) -> String {
    let mut out = String::new();
    for family in families.values() {
        for line in &family.header {
            out.push_str(line);
            out.push('\n');
        }
        for (series, value) in &family.samples {
            out.push_str(&format!("{series} {value}\n"));
        }
    }
    out
}
