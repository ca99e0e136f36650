//! radiocast-server configuration
//!
//! Two tiers:
//! 1. **Command line / environment**: root folder, config file path, port
//!    and log level overrides
//! 2. **TOML file**: everything else, with built-in defaults for every key
//!
//! A missing TOML file is not an error; the server starts on defaults.

use clap::Parser;
use radiocast_common::config::LoggingConfig;
use radiocast_common::DemoTrack;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::resolver::LiveSettings;

/// Command-line arguments for radiocast-server
#[derive(Parser, Debug)]
#[command(name = "radiocast-server")]
#[command(about = "Radio schedule, metadata and push-update server")]
#[command(version)]
pub struct Args {
    /// Root folder holding radiocast.db
    #[arg(short, long, env = "RADIOCAST_ROOT_FOLDER")]
    pub root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "RADIOCAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "RADIOCAST_PORT")]
    pub port: Option<u16>,

    /// Log level (overrides the config file)
    #[arg(long, env = "RADIOCAST_LOG")]
    pub log_level: Option<String>,
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_address: String,

    /// Always-available fallback stream
    pub live_stream_url: String,
    pub live_show_name: String,
    pub live_host_name: String,
    pub demo_tracks: Vec<DemoTrack>,

    /// Hex SHA-256 of the admin password; absent disables admin auth
    pub admin_password_sha256: Option<String>,
    /// Minimum time between login attempts
    pub login_min_interval_ms: u64,

    /// Per-listener message buffer before the listener is evicted
    pub channel_capacity: usize,
    pub keepalive_secs: u64,

    pub listener_estimate_min: u32,
    pub listener_estimate_max: u32,

    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5730,
            bind_address: "127.0.0.1".to_string(),
            live_stream_url: "https://stream.radiocast.example/live".to_string(),
            live_show_name: "Live Radio".to_string(),
            live_host_name: "Resident DJ".to_string(),
            demo_tracks: default_demo_tracks(),
            admin_password_sha256: None,
            login_min_interval_ms: 1000,
            channel_capacity: 32,
            keepalive_secs: 30,
            listener_estimate_min: 20,
            listener_estimate_max: 120,
            logging: LoggingConfig::default(),
        }
    }
}

fn default_demo_tracks() -> Vec<DemoTrack> {
    vec![
        DemoTrack::new("Midnight Transmission", "The Night Shift"),
        DemoTrack::new("Low Tide", "Harbour Sound System"),
        DemoTrack::new("Neon Rain", "Kessler"),
        DemoTrack::new("Slow Signal", "Orla"),
        DemoTrack::new("Afterhours", "Mara & The Static"),
    ]
}

impl ServerConfig {
    /// Apply command-line overrides
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        self
    }

    pub fn live_settings(&self) -> LiveSettings {
        LiveSettings {
            stream_url: self.live_stream_url.clone(),
            show_name: self.live_show_name.clone(),
            host_name: self.live_host_name.clone(),
            demo_tracks: self.demo_tracks.clone(),
        }
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs.max(1))
    }

    pub fn login_min_interval(&self) -> Duration {
        Duration::from_millis(self.login_min_interval_ms)
    }
}
