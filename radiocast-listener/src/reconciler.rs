//! Client playback reconciler
//!
//! Owns one [`AudioOutput`] and keeps it aligned with what the server says is
//! on air. Two modes:
//!
//! - **Live**: playing the default stream; seeking is meaningless.
//! - **Scheduled**: playing a specific asset at the server-declared position.
//!
//! Server snapshots arrive from the push channel or the poll fallback and go
//! through the same [`Reconciler::apply_state`]. Between snapshots a 1s tick
//! predicts the position from `startedAt`. Local position is snapped to the
//! server's only when the two differ by more than [`DRIFT_TOLERANCE_SECS`].

use chrono::{DateTime, Utc};
use radiocast_common::position::predicted_elapsed;
use radiocast_common::{BroadcastState, RadioMessage};
use tracing::{debug, info};

use crate::audio::AudioOutput;

/// Drift beyond this many seconds is corrected by seeking
pub const DRIFT_TOLERANCE_SECS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    Scheduled,
}

/// What is playing, for display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub show_name: Option<String>,
    pub host_name: Option<String>,
}

impl TrackInfo {
    fn from_state(state: &BroadcastState) -> Self {
        Self {
            title: state.display_title().map(str::to_string),
            artist: state.display_artist().map(str::to_string),
            show_name: state.show_name.clone(),
            host_name: state.host_name.clone(),
        }
    }
}

/// Listener-visible playback state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// User's play intent; survives source reloads
    pub is_playing: bool,
    pub volume: f32,
    pub current_track: Option<TrackInfo>,
    pub is_live: bool,
    /// Seconds into the scheduled asset; 0 while live
    pub progress: f64,
    /// Asset duration in seconds; 0 while live
    pub duration: f64,
    pub listener_count: u32,
    pub is_scheduled: bool,
    pub current_stream_source_url: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            volume: 1.0,
            current_track: None,
            is_live: true,
            progress: 0.0,
            duration: 0.0,
            listener_count: 0,
            is_scheduled: false,
            current_stream_source_url: None,
        }
    }
}

/// Per-listener playback state machine
pub struct Reconciler<O: AudioOutput> {
    output: O,
    default_stream_url: String,
    mode: Mode,
    started_at: Option<DateTime<Utc>>,
    state: PlaybackState,
}

impl<O: AudioOutput> Reconciler<O> {
    /// Create a reconciler in Live mode with nothing loaded yet
    pub fn new(output: O, default_stream_url: impl Into<String>) -> Self {
        Self {
            output,
            default_stream_url: default_stream_url.into(),
            mode: Mode::Live,
            started_at: None,
            state: PlaybackState::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Apply one push-channel message
    pub fn apply_message(&mut self, message: &RadioMessage) {
        match message {
            RadioMessage::State { state } | RadioMessage::ScheduleUpdate { state, .. } => {
                self.apply_state(state);
            }
            RadioMessage::ScheduleDeleted { id } => {
                debug!("Schedule item {} deleted", id);
                self.enter_live(None);
            }
        }
    }

    /// Reconcile against a server snapshot (push or poll)
    pub fn apply_state(&mut self, state: &BroadcastState) {
        self.state.listener_count = state.listener_count;
        if state.is_scheduled {
            self.enter_scheduled(state);
        } else {
            self.enter_live(Some(state));
        }
    }

    /// Local position prediction; returns the new progress while Scheduled
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<f64> {
        if self.mode != Mode::Scheduled {
            return None;
        }
        let started_at = self.started_at?;
        let elapsed = predicted_elapsed(now, started_at, self.state.duration);
        self.state.progress = elapsed;
        Some(elapsed)
    }

    pub fn play(&mut self) {
        if self.state.current_stream_source_url.is_none() {
            let url = self.default_stream_url.clone();
            self.load_source(&url);
        }
        self.state.is_playing = true;
        self.output.play();
    }

    pub fn pause(&mut self) {
        self.state.is_playing = false;
        self.output.pause();
    }

    /// Seek within the scheduled asset; no-op while Live
    ///
    /// Returns whether a seek happened.
    pub fn seek(&mut self, position: f64) -> bool {
        if self.mode == Mode::Live {
            debug!("Ignoring seek while live");
            return false;
        }
        let target = position.clamp(0.0, self.state.duration);
        self.output.seek(target);
        self.state.progress = target;
        true
    }

    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            debug!("Ignoring non-finite volume {}", volume);
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.state.volume = volume;
        self.output.set_volume(volume);
    }

    fn enter_scheduled(&mut self, state: &BroadcastState) {
        if self.mode != Mode::Scheduled {
            info!(
                "Switching to scheduled playback: {}",
                state.display_title().unwrap_or("untitled")
            );
        }
        self.mode = Mode::Scheduled;
        self.state.is_live = false;
        self.state.is_scheduled = true;
        self.state.current_track = Some(TrackInfo::from_state(state));

        self.load_source(&state.stream_url);
        self.started_at = state.started_at;
        self.state.duration = state
            .current_asset
            .as_ref()
            .map(|a| a.duration_seconds)
            .or(state.duration_seconds)
            .map(f64::from)
            .unwrap_or(0.0);

        let local = self.output.position();
        match state.position_seconds.map(f64::from) {
            Some(server) if (local - server).abs() > DRIFT_TOLERANCE_SECS => {
                debug!("Drift {:.1}s, snapping to {}s", local - server, server);
                self.output.seek(server);
                self.state.progress = server;
            }
            _ => {
                self.state.progress = local.clamp(0.0, self.state.duration);
            }
        }
    }

    fn enter_live(&mut self, state: Option<&BroadcastState>) {
        if self.mode != Mode::Live {
            info!("Switching to live stream");
            self.state.current_track = None;
        }
        self.mode = Mode::Live;
        self.started_at = None;
        self.state.is_live = true;
        self.state.is_scheduled = false;
        self.state.progress = 0.0;
        self.state.duration = 0.0;
        if let Some(state) = state {
            self.state.current_track = Some(TrackInfo::from_state(state));
        }

        let url = self.default_stream_url.clone();
        self.load_source(&url);
    }

    /// Load `url` unless it is already the current source
    ///
    /// Play intent carries across the reload. Returns whether a load happened.
    fn load_source(&mut self, url: &str) -> bool {
        if self.state.current_stream_source_url.as_deref() == Some(url) {
            return false;
        }
        self.output.load(url);
        if self.state.is_playing {
            self.output.play();
        }
        self.state.current_stream_source_url = Some(url.to_string());
        true
    }
}
