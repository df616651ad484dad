//! Replays a route scenario against the Haulage service and prints the custody events.
//!
//! Usage: `haulage-cli <scenario.json>` (or set `HAULAGE_SCENARIO`). Every published event
//! is written to stdout as one JSON line, followed by a summary line. Logs go to stderr and
//! honour `RUST_LOG`.

mod scenario;

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use haulage_core::{events::RouteEvent, route::RouteProcess};
use haulage_store_memory::MemoryBackend;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

const SCENARIO_ENV: &str = "HAULAGE_SCENARIO";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let path = scenario_path()?;
    let scenario = Scenario::load(&path)?;
    info!(
        path = %path.display(),
        stops = scenario.stops.len(),
        steps = scenario.steps.len(),
        "scenario loaded"
    );

    let backend = MemoryBackend::new();
    let service = backend.service();
    let outcome = scenario.run(&service).await;

    // Events published before a failing step are still reported.
    let events = backend.outbox.drain().await;
    let mut stdout = io::stdout().lock();
    write_events(&mut stdout, &events)?;

    match outcome {
        Ok(route) => {
            write_summary(&mut stdout, &route)?;
            info!(route_id = %route.id(), status = %route.status(), "scenario finished");
            Ok(())
        }
        Err(err) => {
            warn!(error = %err, "scenario aborted");
            Err(err)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn scenario_path() -> Result<PathBuf> {
    if let Some(arg) = env::args_os().nth(1) {
        return Ok(PathBuf::from(arg));
    }
    match env::var_os(SCENARIO_ENV) {
        Some(path) => Ok(PathBuf::from(path)),
        None => bail!("usage: haulage-cli <scenario.json> (or set {SCENARIO_ENV})"),
    }
}

fn write_events(out: &mut impl Write, events: &[RouteEvent]) -> Result<()> {
    for event in events {
        let line = serde_json::to_string(event).context("encoding event")?;
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn write_summary(out: &mut impl Write, route: &RouteProcess) -> Result<()> {
    let (completed, total) = route.progress();
    let summary = json!({
        "type": "Summary",
        "route_id": route.id(),
        "status": route.status(),
        "completed_stops": completed,
        "total_stops": total,
        "started_at": route.started_at(),
        "completed_at": route.completed_at(),
        "cancelled_at": route.cancelled_at(),
        "cancellation_reason": route.cancellation_reason(),
    });
    writeln!(out, "{summary}")?;
    Ok(())
}
