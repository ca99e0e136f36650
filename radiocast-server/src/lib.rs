//! radiocast-server library
//!
//! Broadcast schedule storage, "what is playing now" resolution, and the
//! SSE push channel that keeps every listener on the same position.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod resolver;
pub mod sse;

pub use error::{Error, Result};

use api::AuthService;
use db::ScheduleStore;
use resolver::MetadataResolver;
use sse::Broadcaster;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ScheduleStore>,
    pub resolver: Arc<MetadataResolver>,
    pub broadcaster: Arc<Broadcaster>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        resolver: MetadataResolver,
        broadcaster: Broadcaster,
        auth: AuthService,
    ) -> Self {
        Self {
            store,
            resolver: Arc::new(resolver),
            broadcaster: Arc::new(broadcaster),
            auth: Arc::new(auth),
        }
    }
}

/// Build application router
///
/// Radio metadata, the push channel, login and health are public; schedule,
/// asset and show administration require a bearer token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let admin = Router::new()
        .route(
            "/radio/schedule",
            get(api::list_schedule).post(api::create_schedule_item),
        )
        .route(
            "/radio/schedule/:id",
            get(api::get_schedule_item)
                .put(api::update_schedule_item)
                .delete(api::delete_schedule_item),
        )
        .route("/radio/assets", get(api::list_assets).post(api::create_asset))
        .route("/radio/assets/:id", get(api::get_asset))
        .route("/radio/shows", post(api::create_show))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_admin,
        ));

    let public = Router::new()
        .route("/radio/metadata", get(api::get_metadata))
        .route("/radio/stream-state", get(api::stream_state))
        .route("/auth/login", post(api::login))
        .route("/health", get(api::health_check));

    Router::new()
        .merge(admin)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
