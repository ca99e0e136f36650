//! Admin schedule, asset and show endpoints
//!
//! Every successful schedule mutation is pushed to all listeners. Delivery
//! is fire-and-forget: its outcome never changes the mutation's response.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use radiocast_common::{time, Asset, RadioMessage, ScheduleItem, Show};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::AppState;

/// Body of schedule item create/update requests
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItemRequest {
    pub asset_id: Uuid,
    #[serde(default)]
    pub show_id: Option<Uuid>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
}

impl ScheduleItemRequest {
    /// Build the stored item; timestamps are cut to the store's millisecond precision
    fn into_item(self, id: Uuid) -> ScheduleItem {
        ScheduleItem {
            id,
            asset_id: self.asset_id,
            show_id: self.show_id,
            scheduled_start: time::from_epoch_ms(time::to_epoch_ms(self.scheduled_start)),
            scheduled_end: time::from_epoch_ms(time::to_epoch_ms(self.scheduled_end)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRequest {
    pub title: String,
    pub artist: String,
    pub audio_url: String,
    pub duration_seconds: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowRequest {
    pub name: String,
    #[serde(default)]
    pub host_name: Option<String>,
}

/// Push `schedule_update` for a created or modified item
async fn notify_update(state: &AppState, item: &ScheduleItem) {
    let asset = state.resolver.lookup_asset(item.asset_id).await;
    let snapshot = state.resolver.resolve_current(time::now()).await;
    let delivered = state.broadcaster.broadcast(&RadioMessage::ScheduleUpdate {
        item: item.clone(),
        asset,
        state: snapshot,
    });
    info!("Schedule item {} pushed to {} listeners", item.id, delivered);
}

/// GET /radio/schedule
pub async fn list_schedule(State(state): State<AppState>) -> Result<Json<Vec<ScheduleItem>>> {
    Ok(Json(state.store.list_schedule_items().await?))
}

/// GET /radio/schedule/:id
pub async fn get_schedule_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleItem>> {
    state
        .store
        .get_schedule_item(id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("schedule item {}", id)))
}

/// POST /radio/schedule
pub async fn create_schedule_item(
    State(state): State<AppState>,
    Json(request): Json<ScheduleItemRequest>,
) -> Result<(StatusCode, Json<ScheduleItem>)> {
    let item = request.into_item(Uuid::new_v4());
    state.store.create_schedule_item(&item).await?;
    info!(
        "Created schedule item {} ({} .. {})",
        item.id, item.scheduled_start, item.scheduled_end
    );
    notify_update(&state, &item).await;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /radio/schedule/:id
pub async fn update_schedule_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ScheduleItemRequest>,
) -> Result<Json<ScheduleItem>> {
    let item = request.into_item(id);
    if !state.store.update_schedule_item(&item).await? {
        return Err(Error::NotFound(format!("schedule item {}", id)));
    }
    info!("Updated schedule item {}", id);
    notify_update(&state, &item).await;
    Ok(Json(item))
}

/// DELETE /radio/schedule/:id
pub async fn delete_schedule_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.store.delete_schedule_item(id).await? {
        return Err(Error::NotFound(format!("schedule item {}", id)));
    }
    let delivered = state
        .broadcaster
        .broadcast(&RadioMessage::ScheduleDeleted { id });
    info!("Deleted schedule item {}, notified {} listeners", id, delivered);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /radio/assets
pub async fn list_assets(State(state): State<AppState>) -> Result<Json<Vec<Asset>>> {
    Ok(Json(state.store.list_assets().await?))
}

/// GET /radio/assets/:id
pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Asset>> {
    state
        .store
        .get_asset(id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("asset {}", id)))
}

/// POST /radio/assets
pub async fn create_asset(
    State(state): State<AppState>,
    Json(request): Json<AssetRequest>,
) -> Result<(StatusCode, Json<Asset>)> {
    if request.audio_url.trim().is_empty() {
        return Err(Error::BadRequest("audioUrl must not be empty".to_string()));
    }
    let asset = Asset {
        id: Uuid::new_v4(),
        title: request.title,
        artist: request.artist,
        audio_url: request.audio_url,
        duration_seconds: request.duration_seconds,
    };
    state.store.create_asset(&asset).await?;
    info!("Created asset {} ({})", asset.id, asset.title);
    Ok((StatusCode::CREATED, Json(asset)))
}

/// POST /radio/shows
pub async fn create_show(
    State(state): State<AppState>,
    Json(request): Json<ShowRequest>,
) -> Result<(StatusCode, Json<Show>)> {
    let show = Show {
        id: Uuid::new_v4(),
        name: request.name,
        host_name: request.host_name,
    };
    state.store.create_show(&show).await?;
    info!("Created show {} ({})", show.id, show.name);
    Ok((StatusCode::CREATED, Json(show)))
}
