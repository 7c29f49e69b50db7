//! Subcommand implementations

use std::time::Instant;

use anyhow::{Context as _, bail};
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL};
use kvpool_connection::Registry;
use kvpool_core::{KvError, Reply};
use serde::Serialize;

/// Outcome of pinging one source
#[derive(Debug, Clone, Serialize)]
pub struct PingOutcome {
    pub source: String,
    pub endpoint: String,
    pub latency_ms: Option<u128>,
    pub error: Option<String>,
}

impl PingOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header.iter().copied());
    table
}

/// Table of configured sources
pub fn sources_table(registry: &Registry) -> Table {
    let mut table = new_table(&[
        "Source",
        "Endpoint",
        "Auth",
        "Max total",
        "Max idle",
        "Max wait (s)",
        "Validate",
    ]);

    for name in registry.source_names() {
        let Ok(source) = registry.source(name) else {
            continue;
        };
        let config = source.config();
        table.add_row(vec![
            Cell::new(name),
            Cell::new(config.endpoint()),
            Cell::new(if config.password().is_some() { "yes" } else { "no" }),
            Cell::new(config.pool().max_total()),
            Cell::new(config.pool().max_idle()),
            Cell::new(config.pool().max_wait().as_secs()),
            Cell::new(config.pool().validate_on_borrow()),
        ]);
    }
    table
}

/// Table of pool statistics
pub fn stats_table(registry: &Registry) -> Table {
    let mut table = new_table(&[
        "Source", "Max", "Total", "Idle", "Active", "Waiting", "Util %",
    ]);

    for (name, stats) in registry.all_stats() {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(stats.max_size()),
            Cell::new(stats.total()),
            Cell::new(stats.idle()),
            Cell::new(stats.active()),
            Cell::new(stats.waiting()),
            Cell::new(format!("{:.1}", stats.utilization() * 100.0)),
        ]);
    }
    table
}

/// Table of ping outcomes
pub fn ping_table(outcomes: &[PingOutcome]) -> Table {
    let mut table = new_table(&["Source", "Endpoint", "Status", "Latency (ms)"]);

    for outcome in outcomes {
        let status = match &outcome.error {
            None => Cell::new("ok").fg(Color::Green),
            Some(error) => Cell::new(error).fg(Color::Red),
        };
        let latency = outcome
            .latency_ms
            .map(|ms| ms.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&outcome.source),
            Cell::new(&outcome.endpoint),
            status,
            Cell::new(latency),
        ]);
    }
    table
}

/// Acquire, PING and release one connection per source
pub async fn ping(registry: &Registry, names: &[String]) -> anyhow::Result<Vec<PingOutcome>> {
    let names: Vec<String> = if names.is_empty() {
        registry.source_names().into_iter().map(str::to_string).collect()
    } else {
        names.to_vec()
    };

    let mut outcomes = Vec::with_capacity(names.len());
    for name in names {
        let endpoint = registry
            .source(&name)
            .map(|source| source.config().endpoint().to_string())
            .unwrap_or_else(|_| "-".to_string());

        let started = Instant::now();
        let result = ping_one(registry, &name).await;
        let latency = started.elapsed().as_millis();

        outcomes.push(match result {
            Ok(()) => PingOutcome {
                source: name,
                endpoint,
                latency_ms: Some(latency),
                error: None,
            },
            Err(e) => {
                tracing::warn!(source = %name, error = %e, "ping failed");
                PingOutcome {
                    source: name,
                    endpoint,
                    latency_ms: None,
                    error: Some(e.to_string()),
                }
            }
        });
    }
    Ok(outcomes)
}

async fn ping_one(registry: &Registry, name: &str) -> Result<(), KvError> {
    let mut conn = registry.acquire(name).await?;
    let result = conn.ping().await;
    if matches!(&result, Err(e) if e.is_connection_fault()) {
        conn.mark_broken();
    }
    registry.release(name, Some(conn)).await?;
    result
}

/// Run one command on a source and return its reply
pub async fn exec(
    registry: &Registry,
    name: &str,
    command: &str,
    args: &[String],
) -> anyhow::Result<Reply> {
    let mut conn = registry
        .acquire(name)
        .await
        .with_context(|| format!("failed to acquire a connection from '{}'", name))?;

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let result = conn.command(command, &args).await;
    if matches!(&result, Err(e) if e.is_connection_fault()) {
        conn.mark_broken();
    }
    registry.release(name, Some(conn)).await?;

    result.with_context(|| format!("{} failed on '{}'", command, name))
}

/// Fail if any ping failed
pub fn check_outcomes(outcomes: &[PingOutcome]) -> anyhow::Result<()> {
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        bail!("{} of {} source(s) failed to respond", failed, outcomes.len());
    }
    Ok(())
}
