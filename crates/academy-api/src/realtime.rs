// Realtime HTTP routes (SSE stream, replay, broadcast, stats)
//
// The SSE stream is notification-only; it never replays history. The replay
// endpoint is the durability path: a client that can't hold a stream open
// still converges by polling with its last cursor.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::Deserialize;
use std::{convert::Infallible, sync::Arc, time::Duration};
use utoipa::IntoParams;

use academy_contracts::{
    BroadcastRequest, BroadcastResponse, EventKind, EventsResponse, RealtimeStats,
};
use academy_realtime::{
    notifier::{content_payload, CHANNEL_ADMIN},
    Hub, Notifier,
};
use academy_storage::repository::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use academy_storage::Database;

use crate::services::RealtimeService;

/// Keep-alive comment interval; well under common proxy idle timeouts.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// App state for realtime routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RealtimeService>,
    pub hub: Arc<Hub>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(db: Arc<Database>, hub: Arc<Hub>) -> Self {
        Self {
            service: Arc::new(RealtimeService::new(db.clone())),
            notifier: Notifier::new((*db).clone(), hub.clone()),
            hub,
        }
    }
}

/// Create realtime routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/realtime/events", get(stream_events))
        .route("/v1/realtime/updates", get(list_updates))
        .route("/v1/realtime/broadcast", post(broadcast))
        .route("/v1/realtime/stats", get(stats))
        .with_state(state)
}

/// Query parameters for the replay endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct UpdatesQuery {
    /// Return only events with id greater than this cursor.
    /// Use 0 or omit to start from the beginning of the retained log.
    #[param(example = 0)]
    pub since_id: Option<i64>,
    /// Maximum number of events to return. Defaults to 100, capped at 200.
    #[param(example = 100)]
    pub limit: Option<i64>,
}

/// GET /v1/realtime/events - Live event stream (SSE)
///
/// The first frame is always `{"type":"connected"}`; comment lines are
/// keep-alive heartbeats. Only events broadcast after the subscription
/// starts are delivered - use the replay endpoint to catch up.
#[utoipa::path(
    get,
    path = "/v1/realtime/events",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream")
    ),
    tag = "realtime"
)]
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (subscriber_id, mut rx) = state.hub.subscribe();
    tracing::debug!(
        subscribers = state.hub.subscriber_count(),
        "realtime stream opened"
    );

    let hub = state.hub.clone();
    let stream = async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            match serde_json::to_string(&frame) {
                Ok(json) => {
                    let mut event = SseEvent::default().data(json);
                    if let Some(id) = frame.event_id() {
                        event = event.id(id.to_string());
                    }
                    yield Ok(event);
                }
                Err(e) => {
                    // Skip the frame; one bad payload must not end the stream.
                    tracing::error!("failed to serialize stream frame: {}", e);
                }
            }
        }

        hub.unsubscribe(&subscriber_id);
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("heartbeat"),
    )
}

/// GET /v1/realtime/updates - Replay events after a cursor (JSON)
///
/// Stateless read against the event log; this is the correctness backstop
/// for clients that missed live pushes.
#[utoipa::path(
    get,
    path = "/v1/realtime/updates",
    params(UpdatesQuery),
    responses(
        (status = 200, description = "Events after the cursor, ascending by id", body = EventsResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "realtime"
)]
pub async fn list_updates(
    State(state): State<AppState>,
    Query(query): Query<UpdatesQuery>,
) -> Result<Json<EventsResponse>, StatusCode> {
    let since_id = query.since_id.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);

    let events = state
        .service
        .events_after(since_id, limit)
        .await
        .map_err(|e| {
            tracing::error!("failed to list realtime updates: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let latest_id = events.last().map(|e| e.id);

    Ok(Json(EventsResponse { events, latest_id }))
}

/// POST /v1/realtime/broadcast - Publish an event manually
///
/// Persists the event on the `admin` channel, then pushes it to all live
/// subscribers. Intended for operator tooling; content mutations use the
/// in-process producer API instead.
#[utoipa::path(
    post,
    path = "/v1/realtime/broadcast",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Broadcast accepted", body = BroadcastResponse),
        (status = 422, description = "Unknown or missing event type")
    ),
    tag = "realtime"
)]
pub async fn broadcast(
    State(state): State<AppState>,
    Json(req): Json<BroadcastRequest>,
) -> Json<BroadcastResponse> {
    let entity = req.entity.unwrap_or_else(|| "content".to_string());

    let (entity, payload) = match req.kind {
        EventKind::Create => {
            let title = req.title.unwrap_or_else(|| "New item".to_string());
            let message = req
                .message
                .unwrap_or_else(|| format!("New {entity} created: {title}"));
            (
                Some(entity.clone()),
                content_payload(&title, &message, req.entity_id, req.data),
            )
        }
        EventKind::Update => {
            let title = req.title.unwrap_or_else(|| "Updated item".to_string());
            let message = req
                .message
                .unwrap_or_else(|| format!("{entity} updated: {title}"));
            (
                Some(entity.clone()),
                content_payload(&title, &message, req.entity_id, req.data),
            )
        }
        EventKind::Delete => {
            let title = req.title.unwrap_or_else(|| "Deleted item".to_string());
            let message = req
                .message
                .unwrap_or_else(|| format!("{entity} deleted: {title}"));
            (
                Some(entity.clone()),
                content_payload(&title, &message, req.entity_id, req.data),
            )
        }
        EventKind::Notification => {
            let title = req.title.unwrap_or_else(|| "Notification".to_string());
            let message = req.message.unwrap_or_else(|| "Notification".to_string());
            (None, content_payload(&title, &message, req.entity_id, req.data))
        }
        EventKind::Sync => {
            let message = req
                .message
                .unwrap_or_else(|| format!("{entity} synchronized"));
            (
                Some(entity.clone()),
                content_payload(&entity, &message, req.entity_id, req.data),
            )
        }
    };

    let published = state
        .notifier
        .publish(CHANNEL_ADMIN, req.kind, entity.as_deref(), payload)
        .await;

    Json(BroadcastResponse {
        ok: published.is_some(),
    })
}

/// GET /v1/realtime/stats - Realtime subsystem monitoring
#[utoipa::path(
    get,
    path = "/v1/realtime/stats",
    responses(
        (status = 200, description = "Connection and event counts", body = RealtimeStats)
    ),
    tag = "realtime"
)]
pub async fn stats(State(state): State<AppState>) -> Json<RealtimeStats> {
    let stats = state.service.stats(state.hub.subscriber_count()).await;

    Json(stats)
}
