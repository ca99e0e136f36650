//! radiocast-listen - headless listener
//!
//! Follows the server schedule with a wall-clock audio output and logs what
//! would be playing. Useful for soak-testing the push channel.

use anyhow::{Context, Result};
use clap::Parser;
use radiocast_listener::config::Args;
use radiocast_listener::{ClockOutput, RadioClient};
use std::time::Duration;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    info!("Starting radiocast-listen v{}", env!("CARGO_PKG_VERSION"));

    let client = RadioClient::start(args.client_config(), ClockOutput::new())
        .context("Failed to start listener")?;
    if args.autoplay {
        client.play().await;
    }

    let mut report = tokio::time::interval(Duration::from_secs(15));
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C, shutting down");
                break;
            }
            _ = report.tick() => {
                let state = client.snapshot().await;
                let title = state
                    .current_track
                    .as_ref()
                    .and_then(|t| t.title.as_deref())
                    .unwrap_or("-");
                info!(
                    "{} | {} | {:.0}/{:.0}s | listeners {} | push {}",
                    if state.is_live { "LIVE" } else { "SCHEDULED" },
                    title,
                    state.progress,
                    state.duration,
                    state.listener_count,
                    if client.is_push_connected() { "up" } else { "down" }
                );
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
