// Request/response DTOs for the realtime HTTP endpoints

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::event::{Event, EventKind};

/// Response for the replay (poll) endpoint.
///
/// Events are ascending by `id`. `latest_id` is the id of the last event in
/// this page so clients can advance their cursor without scanning.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub latest_id: Option<i64>,
}

/// Request body for the manual broadcast endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    /// Kind of event to publish.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Affected record kind (course, lesson, project, page).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Optional record snapshot forwarded to subscribers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BroadcastResponse {
    pub ok: bool,
}

/// Snapshot of the realtime subsystem for the monitoring endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeStats {
    /// Live subscribers currently attached to this process's hub.
    pub connected_clients: usize,
    /// Total persisted events.
    pub total_events: i64,
    /// Events persisted in the last 24 hours.
    pub recent_events: i64,
}
