//! Push channel subscription
//!
//! [`PushChannel::subscribe`] runs a task that holds the SSE connection to
//! `GET /radio/stream-state` open and hands every decoded message to the
//! caller. When the connection fails or ends, the error goes to `on_error`
//! and the [`RetryPolicy`] decides when to reconnect.

use futures::StreamExt;
use radiocast_common::RadioMessage;
use reqwest::header::ACCEPT;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::sse::{decode_event, SseParser};

/// Reconnect schedule for the push channel
pub trait RetryPolicy: Send + Sync {
    /// Delay before reconnect attempt `attempt` (1-based); `None` gives up
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Same delay before every attempt, forever
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl RetryPolicy for FixedDelay {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        Some(self.0)
    }
}

/// Handle to a running push subscription
///
/// Dropping the handle also stops the task.
pub struct Subscription {
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Whether the push channel is currently connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Shared connected flag, for tasks that outlive this borrow
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    /// Stop the subscription and wait for its task to finish
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Push task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Connection settings for the push channel
pub struct PushChannel {
    http: reqwest::Client,
    url: String,
    retry: Arc<dyn RetryPolicy>,
}

impl PushChannel {
    pub fn new(http: reqwest::Client, url: impl Into<String>, retry: Arc<dyn RetryPolicy>) -> Self {
        Self {
            http,
            url: url.into(),
            retry,
        }
    }

    /// Subscribe with a fresh cancellation scope
    pub fn subscribe<M, Fut, E>(&self, on_message: M, on_error: E) -> Subscription
    where
        M: FnMut(RadioMessage) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
        E: FnMut(&Error) + Send + 'static,
    {
        self.subscribe_scoped(&CancellationToken::new(), on_message, on_error)
    }

    /// Subscribe under `parent`; cancelling it also ends the subscription
    pub fn subscribe_scoped<M, Fut, E>(
        &self,
        parent: &CancellationToken,
        mut on_message: M,
        mut on_error: E,
    ) -> Subscription
    where
        M: FnMut(RadioMessage) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
        E: FnMut(&Error) + Send + 'static,
    {
        let cancel = parent.child_token();
        let connected = Arc::new(AtomicBool::new(false));

        let http = self.http.clone();
        let url = self.url.clone();
        let retry = Arc::clone(&self.retry);
        let task_cancel = cancel.clone();
        let task_connected = Arc::clone(&connected);

        let task = tokio::spawn(async move {
            let mut attempt: u32 = 0;
            loop {
                let outcome = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    outcome = run_connection(&http, &url, &task_connected, &mut attempt, &mut on_message) => outcome,
                };
                task_connected.store(false, Ordering::Release);

                let err = match outcome {
                    Ok(()) => Error::Stream("closed by server".to_string()),
                    Err(e) => e,
                };
                on_error(&err);

                attempt = attempt.saturating_add(1);
                let Some(delay) = retry.next_delay(attempt) else {
                    warn!("Push channel giving up after {} attempts", attempt);
                    break;
                };
                debug!("Reconnecting push channel in {:?} (attempt {})", delay, attempt);
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            task_connected.store(false, Ordering::Release);
            debug!("Push channel task stopped");
        });

        Subscription {
            cancel,
            connected,
            task: Some(task),
        }
    }
}

/// Hold one connection open until it fails or the server ends it
async fn run_connection<M, Fut>(
    http: &reqwest::Client,
    url: &str,
    connected: &AtomicBool,
    attempt: &mut u32,
    on_message: &mut M,
) -> Result<()>
where
    M: FnMut(RadioMessage) -> Fut,
    Fut: Future<Output = ()>,
{
    let response = http
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(Error::Status(response.status().as_u16()));
    }

    connected.store(true, Ordering::Release);
    *attempt = 0;
    info!("Push channel connected to {}", url);

    let mut parser = SseParser::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        for event in parser.feed(&chunk) {
            if let Some(message) = decode_event(&event) {
                debug!("Received {} message", message.event_name());
                on_message(message).await;
            }
        }
    }
    Ok(())
}
