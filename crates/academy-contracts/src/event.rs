// Event DTOs for the realtime notification channel
//
// An `Event` is one persisted notification that a content record changed.
// `StreamFrame` is what actually travels over the live SSE channel: either a
// persisted event or a connection-lifecycle frame that is never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Kind of change an event describes.
///
/// `Create`/`Update`/`Delete` come from content mutations; `Notification` is
/// a free-form operator message and `Sync` a full-record refresh hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Create,
    Update,
    Delete,
    Notification,
    Sync,
}

impl EventKind {
    /// Wire/storage spelling (`CREATE`, `UPDATE`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "CREATE",
            EventKind::Update => "UPDATE",
            EventKind::Delete => "DELETE",
            EventKind::Notification => "NOTIFICATION",
            EventKind::Sync => "SYNC",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for event kinds read back from storage that no variant matches.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(EventKind::Create),
            "UPDATE" => Ok(EventKind::Update),
            "DELETE" => Ok(EventKind::Delete),
            "NOTIFICATION" => Ok(EventKind::Notification),
            "SYNC" => Ok(EventKind::Sync),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// One persisted realtime event.
///
/// `id` is assigned by the store at insert time, strictly increasing, and is
/// the cursor clients use for replay. `created_at` is display-only; ordering
/// is always by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Monotonic event id; the replay cursor.
    pub id: i64,
    /// Kind of change (`CREATE`, `UPDATE`, `DELETE`, `NOTIFICATION`, `SYNC`).
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Producer channel: "auto" for content-mutation hooks, "admin" for
    /// manual broadcasts.
    pub channel: String,
    /// Kind of record affected (course, lesson, project, page). Opaque here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Loose payload map; at least `title`, usually `message`, optionally
    /// `entityId` and a snapshot of the record under `data`.
    pub payload: serde_json::Value,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Best-effort `title` from the payload, for display and filtering.
    pub fn title(&self) -> Option<&str> {
        self.payload.get("title").and_then(|v| v.as_str())
    }

    /// Best-effort `message` from the payload.
    pub fn message(&self) -> Option<&str> {
        self.payload.get("message").and_then(|v| v.as_str())
    }
}

/// Connection-lifecycle frames sent on the live channel only.
/// These are never assigned ids and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LifecycleFrame {
    /// First frame after a subscriber attaches, so a client can tell
    /// "stream open, no events yet" from "stream never opened".
    Connected {
        /// Milliseconds since the Unix epoch, for client-side bookkeeping.
        timestamp: i64,
    },
}

/// One frame on the live SSE channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamFrame {
    Event(Event),
    Lifecycle(LifecycleFrame),
}

impl StreamFrame {
    /// Event id for the SSE `id:` field; lifecycle frames have none.
    pub fn event_id(&self) -> Option<i64> {
        match self {
            StreamFrame::Event(ev) => Some(ev.id),
            StreamFrame::Lifecycle(_) => None,
        }
    }
}

impl From<Event> for StreamFrame {
    fn from(ev: Event) -> Self {
        StreamFrame::Event(ev)
    }
}
