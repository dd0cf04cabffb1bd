use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use fieldkit_core::sync::{
    ConnectivityConfig, ConnectivityMonitor, HttpReachabilityProbe, ReachabilityProbe,
};

use crate::commands::common::{format_relative_time, AppContext};
use crate::error::CliError;

pub async fn run_drain(ctx: &AppContext) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let engine = ctx.sync_engine(store)?;

    let synced = engine.process_queue().await?;
    let status = engine.sync_status().await?;
    println!(
        "Synced {synced} entries ({} pending, {} failed, {} conflicts)",
        status.pending, status.failed, status.conflicts
    );
    if let Some(error) = &status.last_error {
        println!("Last error: {error}");
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncStatusItem {
    pending: usize,
    failed: usize,
    conflicts: usize,
    last_sync_at: Option<i64>,
    last_error: Option<String>,
}

pub async fn run_status(ctx: &AppContext, as_json: bool) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    // status is a read-only snapshot; no remote configuration is needed
    let status = {
        let counts = store.queue_counts().await?;
        SyncStatusItem {
            pending: counts.pending,
            failed: counts.failed,
            conflicts: store.conflict_count().await?,
            last_sync_at: store.last_sync_at().await?,
            last_error: store.most_recent_error().await?,
        }
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let now_ms = Utc::now().timestamp_millis();
    println!("Pending:    {}", status.pending);
    println!("Failed:     {}", status.failed);
    println!("Conflicts:  {}", status.conflicts);
    match status.last_sync_at {
        Some(timestamp) => println!("Last sync:  {}", format_relative_time(timestamp, now_ms)),
        None => println!("Last sync:  never"),
    }
    if let Some(error) = &status.last_error {
        println!("Last error: {error}");
    }
    Ok(())
}

pub async fn run_retry(ctx: &AppContext) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let engine = ctx.sync_engine(store)?;
    let reset = engine.retry_failed().await?;
    println!("Requeued {reset} failed entries");
    Ok(())
}

pub async fn run_gc(ctx: &AppContext) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let engine = ctx.sync_engine(store)?;
    let purged = engine.clear_completed().await?;
    println!("Purged {purged} stale queue entries");
    Ok(())
}

/// Keep draining for as long as the process runs: drain whenever the
/// backend is reachable, and arm a reconnect drain whenever it is not.
pub async fn run_watch(ctx: &AppContext, interval_secs: u64) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let engine = Arc::new(ctx.sync_engine(store)?);

    let probe_url = ctx.config.resolve_probe_url()?;
    let probe: Arc<dyn ReachabilityProbe> =
        Arc::new(HttpReachabilityProbe::new(probe_url).map_err(CliError::NotConfigured)?);
    let initial_online = probe.is_reachable().await;

    let interval = Duration::from_secs(interval_secs.max(1));
    let monitor = ConnectivityMonitor::new(
        initial_online,
        probe,
        ConnectivityConfig {
            poll_interval: interval,
        },
    );
    monitor.on_change(|online| {
        if online {
            println!("Connection restored");
        } else {
            println!("Connection lost; capturing locally until it returns");
        }
    });
    println!(
        "Watching connectivity every {interval_secs}s (currently {})",
        if initial_online { "online" } else { "offline" }
    );

    let mut reconnect_armed = false;
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if monitor.is_online() {
            reconnect_armed = false;
            let synced = engine.process_queue().await?;
            if synced > 0 {
                println!("Synced {synced} entries");
            }
        } else if !reconnect_armed {
            reconnect_armed = engine.attach_reconnect(&monitor);
        }
    }
}
