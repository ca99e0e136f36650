//! Playback position calculation
//!
//! Pure functions mapping wall-clock time onto a schedule item. Malformed
//! timestamps are the caller's problem; nothing here fails.

use chrono::{DateTime, Utc};

use crate::model::{Asset, ScheduleItem};

/// Result of placing `now` against a schedule item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackPosition {
    /// Whole seconds into the asset, within `[0, duration_seconds]`
    pub position_seconds: u32,
    /// Whether `now` is inside the item's window
    pub is_active: bool,
}

/// `clamp(floor((now - start) / 1s), 0, duration)`
pub fn position_seconds(now: DateTime<Utc>, item: &ScheduleItem, asset: &Asset) -> u32 {
    let elapsed_ms = (now - item.scheduled_start).num_milliseconds();
    let whole_secs = elapsed_ms.div_euclid(1000);
    whole_secs.clamp(0, i64::from(asset.duration_seconds)) as u32
}

/// Position and activity of `item` at `now`
pub fn calculate(now: DateTime<Utc>, item: &ScheduleItem, asset: &Asset) -> PlaybackPosition {
    PlaybackPosition {
        position_seconds: position_seconds(now, item, asset),
        is_active: item.contains(now),
    }
}

/// Fractional seconds elapsed since `started_at`, clamped to `[0, duration]`
///
/// Used for local prediction between server corrections.
pub fn predicted_elapsed(now: DateTime<Utc>, started_at: DateTime<Utc>, duration_seconds: f64) -> f64 {
    let elapsed = (now - started_at).num_milliseconds() as f64 / 1000.0;
    elapsed.clamp(0.0, duration_seconds.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn fixture(duration_seconds: u32) -> (ScheduleItem, Asset) {
        let start = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        let asset = Asset {
            id: Uuid::new_v4(),
            title: "Tape 4".to_string(),
            artist: "Orla".to_string(),
            audio_url: "https://cdn.example.com/tape4.mp3".to_string(),
            duration_seconds,
        };
        let item = ScheduleItem {
            id: Uuid::new_v4(),
            asset_id: asset.id,
            show_id: None,
            scheduled_start: start,
            scheduled_end: start + Duration::seconds(i64::from(duration_seconds)),
        };
        (item, asset)
    }

    #[test]
    fn test_position_floors_partial_seconds() {
        let (item, asset) = fixture(180);
        let now = item.scheduled_start + Duration::milliseconds(42_999);
        assert_eq!(position_seconds(now, &item, &asset), 42);
    }

    #[test]
    fn test_position_before_start_is_zero() {
        let (item, asset) = fixture(180);
        let now = item.scheduled_start - Duration::milliseconds(1500);
        assert_eq!(position_seconds(now, &item, &asset), 0);
        assert!(!calculate(now, &item, &asset).is_active);
    }

    #[test]
    fn test_position_clamped_to_duration() {
        let (item, asset) = fixture(180);
        let now = item.scheduled_start + Duration::seconds(200);
        let pos = calculate(now, &item, &asset);
        assert_eq!(pos.position_seconds, 180);
        assert!(!pos.is_active);
    }

    #[test]
    fn test_position_inside_window_is_active() {
        let (item, asset) = fixture(180);
        let now = item.scheduled_start + Duration::seconds(90);
        assert_eq!(
            calculate(now, &item, &asset),
            PlaybackPosition { position_seconds: 90, is_active: true }
        );
    }

    #[test]
    fn test_predicted_elapsed_clamps_both_ends() {
        let start = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        assert_eq!(predicted_elapsed(start - Duration::seconds(5), start, 180.0), 0.0);
        assert_eq!(predicted_elapsed(start + Duration::milliseconds(1500), start, 180.0), 1.5);
        assert_eq!(predicted_elapsed(start + Duration::seconds(500), start, 180.0), 180.0);
    }
}
