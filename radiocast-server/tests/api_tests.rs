//! Integration tests for the radiocast-server HTTP API
//!
//! Drives the real router with `tower::ServiceExt::oneshot` over an
//! in-memory database.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use radiocast_common::{DemoTrack, RadioMessage};
use radiocast_server::api::auth::{sha256_hex, AuthService};
use radiocast_server::db::{connect_in_memory, SqliteStore};
use radiocast_server::resolver::{FirstPicker, FixedEstimate, LiveSettings, MetadataResolver};
use radiocast_server::sse::Broadcaster;
use radiocast_server::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tower::ServiceExt;

const PASSWORD: &str = "on-air";
const LIVE_URL: &str = "https://live.example.com/stream";

async fn setup(auth_enabled: bool) -> (Router, AppState) {
    setup_with_keepalive(auth_enabled, StdDuration::from_secs(30)).await
}

async fn setup_with_keepalive(auth_enabled: bool, keepalive: StdDuration) -> (Router, AppState) {
    let store = Arc::new(SqliteStore::new(connect_in_memory().await.unwrap()));
    let live = LiveSettings {
        stream_url: LIVE_URL.to_string(),
        show_name: "Live Radio".to_string(),
        host_name: "Resident DJ".to_string(),
        demo_tracks: vec![DemoTrack::new("Demo One", "Demo Artist")],
    };
    let resolver = MetadataResolver::new(store.clone(), live)
        .with_picker(Arc::new(FirstPicker))
        .with_estimator(Arc::new(FixedEstimate(9)));
    let auth = AuthService::new(
        auth_enabled.then(|| sha256_hex(PASSWORD)),
        StdDuration::ZERO,
    );
    let broadcaster = Broadcaster::new(16, keepalive);
    let state = AppState::new(store, resolver, broadcaster, auth);
    (build_router(state.clone()), state)
}

async fn request(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json_body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json_body = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, json_body)
}

async fn login(app: &Router) -> String {
    let (status, body) = request(app, "POST", "/auth/login", None, Some(json!({ "password": PASSWORD }))).await;
    assert_eq!(status, StatusCode::OK);
    body.unwrap()["token"].as_str().unwrap().to_string()
}

async fn create_asset(app: &Router, token: Option<&str>, duration: u32) -> Value {
    let (status, body) = request(
        app,
        "POST",
        "/radio/assets",
        token,
        Some(json!({
            "title": "Coastline",
            "artist": "Aster",
            "audioUrl": "https://cdn.example.com/coastline.mp3",
            "durationSeconds": duration,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body.unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = setup(true).await;
    let (status, body) = request(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "radiocast-server");
    assert_eq!(body["listeners"], 0);
}

#[tokio::test]
async fn test_metadata_live_when_nothing_scheduled() {
    let (app, _) = setup(true).await;
    let (status, body) = request(&app, "GET", "/radio/metadata", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.unwrap(),
        json!({
            "isScheduled": false,
            "title": "Demo One",
            "artist": "Demo Artist",
            "showName": "Live Radio",
            "hostName": "Resident DJ",
            "streamUrl": LIVE_URL,
            "listenerCount": 9,
        })
    );
}

#[tokio::test]
async fn test_metadata_scheduled_after_create() {
    let (app, _) = setup(false).await;
    let asset = create_asset(&app, None, 180).await;

    let start = Utc::now() - Duration::seconds(30);
    let (status, item) = request(
        &app,
        "POST",
        "/radio/schedule",
        None,
        Some(json!({
            "assetId": asset["id"],
            "scheduledStart": start,
            "scheduledEnd": start + Duration::seconds(180),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = request(&app, "GET", "/radio/metadata", None, None).await;
    let body = body.unwrap();
    assert_eq!(body["isScheduled"], true);
    assert_eq!(body["streamUrl"], "https://cdn.example.com/coastline.mp3");
    assert_eq!(body["durationSeconds"], 180);
    assert_eq!(body["currentAsset"]["id"], asset["id"]);
    assert_eq!(body["scheduleItemId"], item.unwrap()["id"]);
    let position = body["positionSeconds"].as_u64().unwrap();
    assert!((29..=31).contains(&position), "position {}", position);
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let (app, _) = setup(true).await;

    let (status, _) = request(&app, "GET", "/radio/schedule", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&app, "GET", "/radio/schedule", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app).await;
    let (status, body) = request(&app, "GET", "/radio/schedule", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap(), json!([]));
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let (app, _) = setup(true).await;
    let (status, body) = request(&app, "POST", "/auth/login", None, Some(json!({ "password": "nope" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.unwrap()["error"].is_string());
}

#[tokio::test]
async fn test_inverted_window_rejected() {
    let (app, _) = setup(true).await;
    let token = login(&app).await;
    let asset = create_asset(&app, Some(&token), 60).await;

    let start = Utc::now();
    let (status, _) = request(
        &app,
        "POST",
        "/radio/schedule",
        Some(&token),
        Some(json!({
            "assetId": asset["id"],
            "scheduledStart": start,
            "scheduledEnd": start - Duration::seconds(1),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mutations_are_pushed_to_listeners() {
    let (app, state) = setup(true).await;
    let token = login(&app).await;
    let asset = create_asset(&app, Some(&token), 240).await;

    let (_, mut rx) = state.broadcaster.register();

    let start = Utc::now() - Duration::seconds(10);
    let (status, item) = request(
        &app,
        "POST",
        "/radio/schedule",
        Some(&token),
        Some(json!({
            "assetId": asset["id"],
            "scheduledStart": start,
            "scheduledEnd": start + Duration::seconds(240),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let item_id = item.unwrap()["id"].as_str().unwrap().to_string();

    match rx.recv().await.unwrap() {
        RadioMessage::ScheduleUpdate { item, asset: pushed_asset, state: snapshot } => {
            assert_eq!(item.id.to_string(), item_id);
            assert_eq!(pushed_asset.unwrap().id.to_string(), asset["id"].as_str().unwrap());
            assert!(snapshot.is_scheduled);
            assert_eq!(snapshot.schedule_item_id, Some(item.id));
        }
        other => panic!("expected schedule_update, got {:?}", other),
    }

    // Move the item into the past: still an update, snapshot now live
    let (status, _) = request(
        &app,
        "PUT",
        &format!("/radio/schedule/{}", item_id),
        Some(&token),
        Some(json!({
            "assetId": asset["id"],
            "scheduledStart": start - Duration::hours(2),
            "scheduledEnd": start - Duration::hours(1),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    match rx.recv().await.unwrap() {
        RadioMessage::ScheduleUpdate { state: snapshot, .. } => assert!(!snapshot.is_scheduled),
        other => panic!("expected schedule_update, got {:?}", other),
    }

    let (status, _) = request(&app, "DELETE", &format!("/radio/schedule/{}", item_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    match rx.recv().await.unwrap() {
        RadioMessage::ScheduleDeleted { id } => assert_eq!(id.to_string(), item_id),
        other => panic!("expected schedule_deleted, got {:?}", other),
    }

    let (status, _) = request(&app, "DELETE", &format!("/radio/schedule/{}", item_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mutation_succeeds_when_a_listener_is_gone() {
    let (app, state) = setup(false).await;
    let asset = create_asset(&app, None, 120).await;

    let (_, dead_rx) = state.broadcaster.register();
    let (_, mut live_rx) = state.broadcaster.register();
    drop(dead_rx);

    let start = Utc::now();
    let (status, _) = request(
        &app,
        "POST",
        "/radio/schedule",
        None,
        Some(json!({
            "assetId": asset["id"],
            "scheduledStart": start + Duration::hours(1),
            "scheduledEnd": start + Duration::hours(2),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(matches!(live_rx.recv().await, Some(RadioMessage::ScheduleUpdate { .. })));
    assert_eq!(state.broadcaster.channel_count(), 1);
}

#[tokio::test]
async fn test_update_unknown_item_is_not_found() {
    let (app, _) = setup(false).await;
    let start = Utc::now();
    let (status, _) = request(
        &app,
        "PUT",
        &format!("/radio/schedule/{}", uuid::Uuid::new_v4()),
        None,
        Some(json!({
            "assetId": uuid::Uuid::new_v4(),
            "scheduledStart": start,
            "scheduledEnd": start + Duration::seconds(60),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stream_state_sends_initial_snapshot_and_unregisters_on_close() {
    let (app, state) = setup(true).await;

    let request = Request::builder()
        .uri("/radio/stream-state")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(state.broadcaster.channel_count(), 1);

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: state"), "{}", text);
    let data_line = text.lines().find(|l| l.starts_with("data: ")).unwrap();
    let message: RadioMessage = serde_json::from_str(&data_line["data: ".len()..]).unwrap();
    match message {
        RadioMessage::State { state: snapshot } => {
            assert!(!snapshot.is_scheduled);
            assert_eq!(snapshot.stream_url, LIVE_URL);
        }
        other => panic!("expected state, got {:?}", other),
    }

    // Listener goes away: the channel leaves the registry
    drop(body);
    assert_eq!(state.broadcaster.channel_count(), 0);
}

#[tokio::test]
async fn test_idle_stream_state_sends_keepalive_comments() {
    let (app, _) = setup_with_keepalive(true, StdDuration::from_millis(50)).await;

    let request = Request::builder()
        .uri("/radio/stream-state")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let mut body = response.into_body();

    let first = body.frame().await.unwrap().unwrap();
    let first = String::from_utf8(first.into_data().unwrap().to_vec()).unwrap();
    assert!(first.contains("event: state"), "{}", first);

    let comment = tokio::time::timeout(StdDuration::from_secs(5), async {
        loop {
            let frame = body.frame().await.unwrap().unwrap();
            let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
            if text.starts_with(':') {
                return text;
            }
        }
    })
    .await
    .unwrap();
    assert!(comment.contains("keep-alive"), "{}", comment);
}

#[tokio::test]
async fn test_schedule_response_matches_stored_item() {
    let (app, state) = setup(false).await;
    let asset = create_asset(&app, None, 300).await;
    let (_, mut rx) = state.broadcaster.register();

    let (status, created) = request(
        &app,
        "POST",
        "/radio/schedule",
        None,
        Some(json!({
            "assetId": asset["id"],
            "scheduledStart": "2026-10-20T10:00:00.123456789Z",
            "scheduledEnd": "2026-10-20T10:05:00.987654321Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = created.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let (status, stored) = request(&app, "GET", &format!("/radio/schedule/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored.unwrap(), created);

    let expected_start: DateTime<Utc> = "2026-10-20T10:00:00.123Z".parse().unwrap();
    match rx.recv().await.unwrap() {
        RadioMessage::ScheduleUpdate { item, .. } => assert_eq!(item.scheduled_start, expected_start),
        other => panic!("expected schedule_update, got {:?}", other),
    }

    let (status, updated) = request(
        &app,
        "PUT",
        &format!("/radio/schedule/{}", id),
        None,
        Some(json!({
            "assetId": asset["id"],
            "scheduledStart": "2026-10-21T10:00:00.000000500Z",
            "scheduledEnd": "2026-10-21T10:05:00.250000001Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, stored) = request(&app, "GET", &format!("/radio/schedule/{}", id), None, None).await;
    assert_eq!(stored.unwrap(), updated.unwrap());
}
