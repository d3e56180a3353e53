//! signal-daemon: WebSocket signaling tracker for WebRTC swarms.

use anyhow::Result;
use clap::Parser;
use signal_core::{EventBus, TrackerEvent};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use signal_daemon::{AnnounceStats, Args, Daemon, WebSocketServer};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Respects RUST_LOG, defaults to info (or debug with --verbose)
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting signal-daemon");
    info!("Announce interval: {}s", args.interval);

    let events = Arc::new(EventBus::new());
    let stats = Arc::new(AnnounceStats::default());
    let _stats_sub = stats.attach(&events);
    let _log_sub = events.subscribe(|event| match event {
        TrackerEvent::Listening { address } => info!("Tracker ready on {}", address),
        other => debug!(?other, "tracker event"),
    });

    let listener = WebSocketServer::bind(&args.listen).await?;
    let daemon = Daemon::new(args.tracker_config(), Arc::clone(&events));

    info!("Daemon running. Press Ctrl+C to stop.");
    let daemon = daemon
        .run(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!(
        "Shutting down with {} swarm(s); counters: {:?}",
        daemon.tracker().registry().len(),
        stats.snapshot()
    );
    Ok(())
}
