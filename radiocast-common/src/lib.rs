//! # radiocast Common Library
//!
//! Shared code for the radiocast server and listener:
//! - Radio data model (schedule items, assets, shows, broadcast state)
//! - Push-channel message types
//! - Playback position calculation
//! - Configuration loading and root folder resolution
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod messages;
pub mod model;
pub mod position;
pub mod time;

pub use error::{Error, Result};
pub use messages::RadioMessage;
pub use model::{Asset, BroadcastState, DemoTrack, ScheduleItem, Show};
