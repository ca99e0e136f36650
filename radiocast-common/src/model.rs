//! Radio data model
//!
//! Persisted reference data (schedule items, assets, shows) and the derived
//! [`BroadcastState`] served to listeners. All JSON uses camelCase keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A time-boxed assignment of one audio asset to a broadcast slot
///
/// The window is half-open: `[scheduled_start, scheduled_end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub id: Uuid,
    pub asset_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_id: Option<Uuid>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
}

impl ScheduleItem {
    /// Reject windows where start is not strictly before end
    pub fn validate(&self) -> Result<()> {
        if self.scheduled_start >= self.scheduled_end {
            return Err(Error::InvalidInput(format!(
                "scheduledStart ({}) must be before scheduledEnd ({})",
                self.scheduled_start, self.scheduled_end
            )));
        }
        Ok(())
    }

    /// Whether `now` falls inside `[scheduled_start, scheduled_end)`
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_start <= now && now < self.scheduled_end
    }
}

/// A playable audio file with known duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    pub audio_url: String,
    pub duration_seconds: u32,
}

/// A named radio show, optionally with a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
}

/// Entry of the fixed track list shown while the live stream plays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoTrack {
    pub title: String,
    pub artist: String,
}

impl DemoTrack {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }
}

/// What is playing right now, as seen by every listener
///
/// Derived on every query and never persisted. Scheduled states carry the
/// asset and position fields; live states carry the demo `title`/`artist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastState {
    pub is_scheduled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_item_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_asset: Option<Asset>,
    pub stream_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default)]
    pub listener_count: u32,
}

impl BroadcastState {
    /// State for an active schedule item
    pub fn scheduled(
        item: &ScheduleItem,
        asset: Asset,
        show: Option<&Show>,
        position_seconds: u32,
        listener_count: u32,
    ) -> Self {
        Self {
            is_scheduled: true,
            schedule_item_id: Some(item.id),
            stream_url: asset.audio_url.clone(),
            started_at: Some(item.scheduled_start),
            duration_seconds: Some(asset.duration_seconds),
            position_seconds: Some(position_seconds),
            title: None,
            artist: None,
            show_name: show.map(|s| s.name.clone()),
            host_name: show.and_then(|s| s.host_name.clone()),
            current_asset: Some(asset),
            listener_count,
        }
    }

    /// Synthetic state for the live fallback stream
    pub fn live(
        track: &DemoTrack,
        stream_url: &str,
        show_name: &str,
        host_name: &str,
        listener_count: u32,
    ) -> Self {
        Self {
            is_scheduled: false,
            schedule_item_id: None,
            current_asset: None,
            stream_url: stream_url.to_string(),
            started_at: None,
            duration_seconds: None,
            position_seconds: None,
            title: Some(track.title.clone()),
            artist: Some(track.artist.clone()),
            show_name: Some(show_name.to_string()),
            host_name: Some(host_name.to_string()),
            listener_count,
        }
    }

    /// Display title: the asset's when scheduled, the demo track's otherwise
    pub fn display_title(&self) -> Option<&str> {
        self.current_asset
            .as_ref()
            .map(|a| a.title.as_str())
            .or(self.title.as_deref())
    }

    /// Display artist: the asset's when scheduled, the demo track's otherwise
    pub fn display_artist(&self) -> Option<&str> {
        self.current_asset
            .as_ref()
            .map(|a| a.artist.as_str())
            .or(self.artist.as_deref())
    }
}
