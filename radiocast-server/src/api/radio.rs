//! Public radio endpoints: metadata query and push channel

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::Stream;
use radiocast_common::{time, BroadcastState, RadioMessage};
use std::convert::Infallible;
use tracing::debug;

use crate::AppState;

/// GET /radio/metadata
///
/// On-demand snapshot; also the listener's poll fallback.
pub async fn get_metadata(State(state): State<AppState>) -> Json<BroadcastState> {
    Json(state.resolver.resolve_current(time::now()).await)
}

/// GET /radio/stream-state - SSE push channel
///
/// The channel is registered before the initial snapshot is computed, so a
/// mutation landing in between is delivered rather than lost.
pub async fn stream_state(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (guard, rx) = state.broadcaster.register_guarded();
    let snapshot = state.resolver.resolve_current(time::now()).await;
    debug!(
        "Channel {} initial state: scheduled={}",
        guard.id(),
        snapshot.is_scheduled
    );
    state
        .broadcaster
        .attach(guard, rx, RadioMessage::State { state: snapshot })
}
