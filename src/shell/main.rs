// Composition root for the offline draft sync engine.
//
// Responsibilities
// - Read config from the environment.
// - Instantiate the durable store and the HTTP adapters.
// - Wire them into the connectivity monitor and the sync orchestrator.
// - Spawn background workers (reachability probe, auto-sync) and report
//   queue status until shutdown.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use brew_drafts::adapters::http::http_submit_brew::{HttpReachabilityProbe, HttpSubmitBrew};
use brew_drafts::adapters::json_file::json_file_key_value_store::JsonFileKeyValueStore;
use brew_drafts::application::connectivity::{ConnectivityMonitor, spawn_probe_loop};
use brew_drafts::application::draft_store::DraftStore;
use brew_drafts::application::orchestrator::SyncOrchestrator;
use brew_drafts::core::ports::ReachabilityProbe;
use brew_drafts::core::sync::SyncEvent;
use brew_drafts::shell::config::ShellConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = ShellConfig::from_env()?;
    tracing::info!(backend = %config.backend_url, drafts = %config.drafts_path.display(), "starting");

    let kv = Arc::new(JsonFileKeyValueStore::open(&config.drafts_path)?);
    let store = Arc::new(DraftStore::new(kv));
    let remote = Arc::new(HttpSubmitBrew::new(&config.backend_url, config.http_timeout)?);
    let probe = Arc::new(HttpReachabilityProbe::new(
        &config.backend_url,
        config.http_timeout,
    )?);

    // Start from what the probe says right now rather than assuming online.
    let monitor = Arc::new(ConnectivityMonitor::new(probe.check().await));
    let orchestrator = Arc::new(SyncOrchestrator::new(store, remote, monitor.clone()));

    orchestrator
        .add_sync_listener(|event| match event {
            SyncEvent::Started { drafts_count } => {
                tracing::info!(drafts_count, "sync started");
            }
            SyncEvent::Completed { synced_count } => {
                tracing::info!(synced_count, "sync completed");
            }
            SyncEvent::Error { report } => {
                tracing::warn!(
                    retryable = report.retryable,
                    rejected = report.terminal_drafts.len(),
                    "sync error: {}",
                    report.message
                );
            }
        })
        .forget();
    orchestrator.start_auto_sync().forget();
    let probe_loop = spawn_probe_loop(monitor.clone(), probe, config.probe_interval);

    let info = orchestrator.storage_info().await?;
    tracing::info!(
        pending = info.pending_drafts,
        failed = info.failed_drafts,
        last_sync = ?info.last_sync,
        online = monitor.is_online(),
        "draft queue status"
    );

    // Drain anything left over from a previous session if we are reachable.
    if monitor.is_online() && orchestrator.pending_sync_count().await? > 0 {
        orchestrator.sync_pending_drafts().await;
    }

    tokio::signal::ctrl_c().await?;
    probe_loop.abort();
    tracing::info!("shutting down");
    Ok(())
}
