//! Command-line configuration.

use clap::Parser;
use signal_core::TrackerConfig;
use signal_core::config::DEFAULT_INTERVAL_SECS;

#[derive(Parser, Debug, Clone)]
#[command(name = "signal-daemon")]
#[command(about = "WebRTC signaling tracker")]
pub struct Args {
    /// Address to listen on for WebSocket connections
    #[arg(short, long, env = "SIGNAL_LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// Seconds clients should wait between announces
    #[arg(short, long, env = "SIGNAL_INTERVAL", default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval: u64,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,
}

impl Args {
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig::with_interval(self.interval)
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug,signal_daemon=debug,signal_core=debug"
        } else {
            "info,signal_daemon=info,signal_core=info"
        }
    }
}
