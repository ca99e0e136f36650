//! radiocast-listen command line
//!
//! Every flag has an environment fallback so the listener can run unattended.

use clap::Parser;
use std::time::Duration;

use crate::client::ClientConfig;

/// Command-line arguments for radiocast-listen
#[derive(Parser, Debug)]
#[command(name = "radiocast-listen")]
#[command(about = "Headless radiocast listener that follows the server's schedule")]
#[command(version)]
pub struct Args {
    /// Server base URL
    #[arg(short, long, env = "RADIOCAST_SERVER", default_value = "http://127.0.0.1:5730")]
    pub server: String,

    /// Stream played whenever nothing is scheduled
    #[arg(
        long,
        env = "RADIOCAST_DEFAULT_STREAM_URL",
        default_value = "https://stream.radiocast.example/live"
    )]
    pub default_stream_url: String,

    /// Seconds between metadata polls while the push channel is down
    #[arg(long, env = "RADIOCAST_POLL_INTERVAL_SECS", default_value_t = 10)]
    pub poll_interval_secs: u64,

    /// Seconds to wait before reconnecting the push channel
    #[arg(long, env = "RADIOCAST_RETRY_DELAY_SECS", default_value_t = 5)]
    pub retry_delay_secs: u64,

    /// Start playback immediately
    #[arg(long)]
    pub autoplay: bool,

    /// Log level
    #[arg(long, env = "RADIOCAST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.server, &self.default_stream_url);
        // Zero would spin the poll loop
        config.poll_interval = Duration::from_secs(self.poll_interval_secs.max(1));
        config.retry_delay = Duration::from_secs(self.retry_delay_secs.max(1));
        config
    }
}
