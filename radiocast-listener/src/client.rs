//! Listener runtime
//!
//! [`RadioClient::start`] wires one [`Reconciler`] to three tasks:
//!
//! - push: the SSE subscription, reconnecting per the retry policy
//! - poll: `GET /radio/metadata` on a fixed interval, skipped while push is connected
//! - heartbeat: 1s local position prediction
//!
//! All three share one cancellation token; [`RadioClient::shutdown`] stops them together.

use radiocast_common::{time, BroadcastState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audio::AudioOutput;
use crate::error::{Error, Result};
use crate::push::{FixedDelay, PushChannel, RetryPolicy, Subscription};
use crate::reconciler::{PlaybackState, Reconciler};

/// Listener runtime settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL, e.g. `http://localhost:5730`
    pub server_url: String,
    /// Stream played whenever nothing is scheduled
    pub default_stream_url: String,
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    pub heartbeat_interval: Duration,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, default_stream_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            default_stream_url: default_stream_url.into(),
            poll_interval: Duration::from_secs(10),
            retry_delay: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(1),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }

    pub fn metadata_url(&self) -> String {
        self.endpoint("/radio/metadata")
    }

    pub fn stream_state_url(&self) -> String {
        self.endpoint("/radio/stream-state")
    }
}

/// Fetch the current broadcast state once
pub async fn fetch_metadata(http: &reqwest::Client, url: &str) -> Result<BroadcastState> {
    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(Error::Status(response.status().as_u16()));
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// A running listener
pub struct RadioClient<O: AudioOutput + 'static> {
    reconciler: Arc<Mutex<Reconciler<O>>>,
    cancel: CancellationToken,
    subscription: Subscription,
    tasks: Vec<JoinHandle<()>>,
}

impl<O: AudioOutput + 'static> RadioClient<O> {
    /// Start the push, poll and heartbeat tasks
    pub fn start(config: ClientConfig, output: O) -> Result<Self> {
        if config.server_url.trim().is_empty() {
            return Err(Error::Config("server URL must not be empty".to_string()));
        }
        if config.default_stream_url.trim().is_empty() {
            return Err(Error::Config("default stream URL must not be empty".to_string()));
        }

        // No overall request timeout: the push response never completes
        let http = reqwest::Client::builder()
            .user_agent(concat!("radiocast-listener/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let reconciler = Arc::new(Mutex::new(Reconciler::new(
            output,
            config.default_stream_url.clone(),
        )));
        let cancel = CancellationToken::new();

        let retry: Arc<dyn RetryPolicy> = Arc::new(FixedDelay(config.retry_delay));
        let push = PushChannel::new(http.clone(), config.stream_state_url(), retry);
        let push_reconciler = Arc::clone(&reconciler);
        let subscription = push.subscribe_scoped(
            &cancel,
            move |message| {
                let reconciler = Arc::clone(&push_reconciler);
                async move {
                    reconciler.lock().await.apply_message(&message);
                }
            },
            |err| warn!("Push channel error: {}", err),
        );

        let tasks = vec![
            tokio::spawn(poll_loop(
                http,
                config.metadata_url(),
                config.poll_interval,
                subscription.connected_flag(),
                Arc::clone(&reconciler),
                cancel.clone(),
            )),
            tokio::spawn(heartbeat_loop(
                config.heartbeat_interval,
                Arc::clone(&reconciler),
                cancel.clone(),
            )),
        ];

        info!(
            "Listener started against {} (poll every {:?}, retry after {:?})",
            config.server_url, config.poll_interval, config.retry_delay
        );

        Ok(Self {
            reconciler,
            cancel,
            subscription,
            tasks,
        })
    }

    /// Copy of the current playback state
    pub async fn snapshot(&self) -> PlaybackState {
        self.reconciler.lock().await.state().clone()
    }

    pub fn is_push_connected(&self) -> bool {
        self.subscription.is_connected()
    }

    pub async fn play(&self) {
        self.reconciler.lock().await.play();
    }

    pub async fn pause(&self) {
        self.reconciler.lock().await.pause();
    }

    pub async fn seek(&self, position: f64) -> bool {
        self.reconciler.lock().await.seek(position)
    }

    pub async fn set_volume(&self, volume: f32) {
        self.reconciler.lock().await.set_volume(volume);
    }

    /// Cancel every task and wait for them to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.subscription.unsubscribe().await;
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Listener task ended abnormally: {}", e);
            }
        }
        info!("Listener stopped");
    }
}

async fn poll_loop<O: AudioOutput>(
    http: reqwest::Client,
    url: String,
    period: Duration,
    push_connected: Arc<AtomicBool>,
    reconciler: Arc<Mutex<Reconciler<O>>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        if push_connected.load(Ordering::Acquire) {
            continue;
        }

        let fetched = tokio::select! {
            _ = cancel.cancelled() => break,
            fetched = fetch_metadata(&http, &url) => fetched,
        };
        match fetched {
            Ok(state) => {
                debug!("Poll: scheduled={}", state.is_scheduled);
                reconciler.lock().await.apply_state(&state);
            }
            Err(e) => warn!("Metadata poll failed: {}", e),
        }
    }
    debug!("Poll task stopped");
}

async fn heartbeat_loop<O: AudioOutput>(
    period: Duration,
    reconciler: Arc<Mutex<Reconciler<O>>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                reconciler.lock().await.tick(time::now());
            }
        }
    }
    debug!("Heartbeat task stopped");
}
