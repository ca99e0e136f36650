//! Listener channel registry and fan-out
//!
//! Each connected listener owns one bounded mpsc channel registered here.
//! Broadcasting snapshots the registry under the lock and delivers outside
//! it, so a disconnect racing a broadcast can neither deadlock nor corrupt
//! iteration. A channel that is closed or full is evicted; the rest still
//! get the message.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use radiocast_common::RadioMessage;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// Opaque handle identifying one listener channel
pub type ChannelId = u64;

/// Registry of connected listener channels
pub struct Broadcaster {
    channels: Mutex<HashMap<ChannelId, mpsc::Sender<RadioMessage>>>,
    next_id: AtomicU64,
    capacity: usize,
    keepalive: Duration,
}

/// Removes its channel from the registry when dropped
///
/// Owned by the per-connection SSE stream, so the transport closing the
/// stream is what unregisters the listener.
pub struct ChannelGuard {
    id: ChannelId,
    broadcaster: Arc<Broadcaster>,
}

impl ChannelGuard {
    pub fn id(&self) -> ChannelId {
        self.id
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        if self.broadcaster.remove(self.id) {
            debug!("Listener channel {} disconnected", self.id);
        }
    }
}

impl Broadcaster {
    /// Create a broadcaster
    ///
    /// # Arguments
    ///
    /// * `capacity` - Per-channel message buffer; a listener this far behind is evicted
    /// * `keepalive` - Interval between SSE keepalive comments
    pub fn new(capacity: usize, keepalive: Duration) -> Self {
        info!(
            "Broadcaster initialized (channel capacity {}, keepalive {:?})",
            capacity, keepalive
        );
        Self {
            channels: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            keepalive,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ChannelId, mpsc::Sender<RadioMessage>>> {
        // The map stays consistent even if a holder panicked mid-operation
        self.channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new listener channel
    pub fn register(&self) -> (ChannelId, mpsc::Receiver<RadioMessage>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut channels = self.lock();
            channels.insert(id, tx);
            channels.len()
        };
        info!("Listener channel {} connected, total channels: {}", id, count);
        (id, rx)
    }

    /// Remove a channel; returns whether it was still registered
    pub fn remove(&self, id: ChannelId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Number of registered channels
    pub fn channel_count(&self) -> usize {
        self.lock().len()
    }

    /// Deliver `message` to every channel, evicting the ones that fail
    ///
    /// Returns the number of channels that accepted the message.
    pub fn broadcast(&self, message: &RadioMessage) -> usize {
        let snapshot: Vec<(ChannelId, mpsc::Sender<RadioMessage>)> = self
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, tx) in snapshot {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Closed(_)) => {
                    debug!("Listener channel {} closed during broadcast", id);
                    failed.push(id);
                }
                Err(TrySendError::Full(_)) => {
                    warn!("Listener channel {} is not keeping up, evicting", id);
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut channels = self.lock();
            for id in &failed {
                channels.remove(id);
            }
        }

        debug!(
            "Broadcast {} to {} channels ({} evicted)",
            message.event_name(),
            delivered,
            failed.len()
        );
        delivered
    }

    /// Close every channel; their SSE streams end on the next poll
    pub fn shutdown(&self) {
        let closed = {
            let mut channels = self.lock();
            let n = channels.len();
            channels.clear();
            n
        };
        info!("Broadcaster shut down, closed {} listener channels", closed);
    }

    /// SSE response over an already registered channel
    ///
    /// Registering first lets the caller compute `initial` afterwards without
    /// missing a broadcast in between.
    pub fn attach(
        self: &Arc<Self>,
        guard: ChannelGuard,
        mut rx: mpsc::Receiver<RadioMessage>,
        initial: RadioMessage,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        let stream = async_stream::stream! {
            let _guard = guard;
            if let Some(event) = to_event(&initial) {
                yield Ok(event);
            }
            while let Some(message) = rx.recv().await {
                if let Some(event) = to_event(&message) {
                    yield Ok(event);
                }
            }
        };

        Sse::new(stream).keep_alive(KeepAlive::new().interval(self.keepalive).text("keep-alive"))
    }

    /// Register a channel and hand back its drop guard
    pub fn register_guarded(self: &Arc<Self>) -> (ChannelGuard, mpsc::Receiver<RadioMessage>) {
        let (id, rx) = self.register();
        (
            ChannelGuard {
                id,
                broadcaster: Arc::clone(self),
            },
            rx,
        )
    }
}

fn to_event(message: &RadioMessage) -> Option<Event> {
    match Event::default().event(message.event_name()).json_data(message) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Failed to encode {} message: {}", message.event_name(), e);
            None
        }
    }
}
