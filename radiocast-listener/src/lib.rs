//! radiocast-listener library
//!
//! Client side of radiocast: follows the server's push channel (with a poll
//! fallback) and keeps a local audio output on the same stream and position
//! as every other listener.

pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod push;
pub mod reconciler;
pub mod sse;

pub use audio::{AudioOutput, ClockOutput};
pub use client::{ClientConfig, RadioClient};
pub use error::{Error, Result};
pub use push::{FixedDelay, PushChannel, RetryPolicy, Subscription};
pub use reconciler::{Mode, PlaybackState, Reconciler};
