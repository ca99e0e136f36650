//! Audio output abstraction
//!
//! The reconciler drives playback only through [`AudioOutput`]. Decoding and
//! device handling live behind it; the bundled [`ClockOutput`] is headless and
//! just advances a position by wall clock.

use std::time::Instant;
use tracing::info;

/// Local audio pipeline controlled by one reconciler
pub trait AudioOutput: Send {
    /// Replace the current source; position resets to zero, playback paused
    fn load(&mut self, url: &str);

    fn play(&mut self);

    fn pause(&mut self);

    /// Jump to `position` seconds into the current source
    fn seek(&mut self, position: f64);

    /// Current playback position in seconds
    fn position(&self) -> f64;

    /// Volume in `[0.0, 1.0]`
    fn set_volume(&mut self, volume: f32);
}

/// Headless output: tracks position by wall clock and logs transitions
#[derive(Debug)]
pub struct ClockOutput {
    source: Option<String>,
    base_position: f64,
    playing_since: Option<Instant>,
    volume: f32,
}

impl ClockOutput {
    pub fn new() -> Self {
        Self {
            source: None,
            base_position: 0.0,
            playing_since: None,
            volume: 1.0,
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl Default for ClockOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for ClockOutput {
    fn load(&mut self, url: &str) {
        info!("Loading source {}", url);
        self.source = Some(url.to_string());
        self.base_position = 0.0;
        self.playing_since = None;
    }

    fn play(&mut self) {
        if self.playing_since.is_none() {
            info!("Playback started");
            self.playing_since = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if self.playing_since.is_some() {
            self.base_position = self.position();
            self.playing_since = None;
            info!("Playback paused at {:.1}s", self.base_position);
        }
    }

    fn seek(&mut self, position: f64) {
        info!("Seek to {:.1}s", position);
        self.base_position = position.max(0.0);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn position(&self) -> f64 {
        match self.playing_since {
            Some(since) => self.base_position + since.elapsed().as_secs_f64(),
            None => self.base_position,
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_resets_position_and_pauses() {
        let mut output = ClockOutput::new();
        output.load("https://live.example.com/a");
        output.play();
        output.seek(42.0);
        output.load("https://live.example.com/b");

        assert_eq!(output.source(), Some("https://live.example.com/b"));
        assert!(!output.is_playing());
        assert_eq!(output.position(), 0.0);
    }

    #[test]
    fn test_paused_position_is_frozen() {
        let mut output = ClockOutput::new();
        output.load("https://live.example.com/a");
        output.seek(10.0);
        assert_eq!(output.position(), 10.0);

        output.play();
        output.pause();
        assert!(output.position() >= 10.0);
        assert!(output.position() < 11.0);
    }
}
