//! Metadata resolver: "what is playing right now"
//!
//! Combines the schedule store with the position calculator. Never fails:
//! nothing scheduled, dangling asset references and store errors all resolve
//! to the synthetic live state.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use radiocast_common::position;
use radiocast_common::{Asset, BroadcastState, DemoTrack, ScheduleItem, Show};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::ScheduleStore;
use crate::error::Result;

/// Selection strategy for the live fallback's demo track
pub trait TrackPicker: Send + Sync {
    fn pick<'a>(&self, candidates: &'a [DemoTrack]) -> Option<&'a DemoTrack>;
}

/// Uniformly random pick from the thread-local RNG
#[derive(Debug, Default)]
pub struct RandomPicker;

impl TrackPicker for RandomPicker {
    fn pick<'a>(&self, candidates: &'a [DemoTrack]) -> Option<&'a DemoTrack> {
        candidates.choose(&mut rand::thread_rng())
    }
}

/// Reproducible pick sequence from a fixed seed
pub struct SeededPicker {
    rng: Mutex<StdRng>,
}

impl SeededPicker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl TrackPicker for SeededPicker {
    fn pick<'a>(&self, candidates: &'a [DemoTrack]) -> Option<&'a DemoTrack> {
        match self.rng.lock() {
            Ok(mut rng) => candidates.choose(&mut *rng),
            Err(poisoned) => candidates.choose(&mut *poisoned.into_inner()),
        }
    }
}

/// Always the first candidate
#[derive(Debug, Default)]
pub struct FirstPicker;

impl TrackPicker for FirstPicker {
    fn pick<'a>(&self, candidates: &'a [DemoTrack]) -> Option<&'a DemoTrack> {
        candidates.first()
    }
}

/// Display-only listener count; there is no accuracy contract
pub trait ListenerEstimator: Send + Sync {
    fn estimate(&self) -> u32;
}

/// Random count in `[min, max]`
#[derive(Debug, Clone, Copy)]
pub struct RandomEstimate {
    pub min: u32,
    pub max: u32,
}

impl ListenerEstimator for RandomEstimate {
    fn estimate(&self) -> u32 {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Constant count
#[derive(Debug, Clone, Copy)]
pub struct FixedEstimate(pub u32);

impl ListenerEstimator for FixedEstimate {
    fn estimate(&self) -> u32 {
        self.0
    }
}

/// Everything needed to build the live fallback state
#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub stream_url: String,
    pub show_name: String,
    pub host_name: String,
    pub demo_tracks: Vec<DemoTrack>,
}

/// Answers "what is playing right now" for queries and broadcasts
pub struct MetadataResolver {
    store: Arc<dyn ScheduleStore>,
    live: LiveSettings,
    picker: Arc<dyn TrackPicker>,
    estimator: Arc<dyn ListenerEstimator>,
}

impl MetadataResolver {
    /// Resolver with random demo-track and listener-count selection
    pub fn new(store: Arc<dyn ScheduleStore>, live: LiveSettings) -> Self {
        Self {
            store,
            live,
            picker: Arc::new(RandomPicker),
            estimator: Arc::new(RandomEstimate { min: 20, max: 120 }),
        }
    }

    pub fn with_picker(mut self, picker: Arc<dyn TrackPicker>) -> Self {
        self.picker = picker;
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn ListenerEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Current broadcast state at `now`
    pub async fn resolve_current(&self, now: DateTime<Utc>) -> BroadcastState {
        match self.scheduled_state(now).await {
            Ok(Some(state)) => state,
            Ok(None) => self.live_state(),
            Err(e) => {
                warn!("Schedule lookup failed, falling back to live stream: {}", e);
                self.live_state()
            }
        }
    }

    /// Asset for a schedule item, `None` when dangling or on store error
    pub async fn lookup_asset(&self, asset_id: Uuid) -> Option<Asset> {
        match self.store.get_asset(asset_id).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!("Asset lookup for {} failed: {}", asset_id, e);
                None
            }
        }
    }

    async fn scheduled_state(&self, now: DateTime<Utc>) -> Result<Option<BroadcastState>> {
        let Some(item) = self.store.find_schedule_item_active_at(now).await? else {
            return Ok(None);
        };

        let Some(asset) = self.store.get_asset(item.asset_id).await? else {
            debug!(
                "Schedule item {} references missing asset {}, treating as unscheduled",
                item.id, item.asset_id
            );
            return Ok(None);
        };

        let pos = position::calculate(now, &item, &asset);
        if !pos.is_active {
            warn!("Store returned item {} outside its window at {}", item.id, now);
            return Ok(None);
        }

        let show = self.lookup_show(&item).await;
        Ok(Some(BroadcastState::scheduled(
            &item,
            asset,
            show.as_ref(),
            pos.position_seconds,
            self.estimator.estimate(),
        )))
    }

    async fn lookup_show(&self, item: &ScheduleItem) -> Option<Show> {
        let show_id = item.show_id?;
        match self.store.get_show(show_id).await {
            Ok(show) => show,
            Err(e) => {
                warn!("Show lookup for {} failed: {}", show_id, e);
                None
            }
        }
    }

    fn live_state(&self) -> BroadcastState {
        let fallback = DemoTrack::new(self.live.show_name.clone(), self.live.host_name.clone());
        let track = self.picker.pick(&self.live.demo_tracks).unwrap_or(&fallback);
        BroadcastState::live(
            track,
            &self.live.stream_url,
            &self.live.show_name,
            &self.live.host_name,
            self.estimator.estimate(),
        )
    }
}
