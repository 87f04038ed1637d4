// Producer API called from content-mutation code paths
//
// Every method is fire-and-forget with respect to the caller's transaction:
// the mutation has already committed by the time a notify method runs, and a
// failure here is logged, never propagated.

use academy_contracts::{Event, EventKind};
use academy_storage::{CreateEventRow, Database};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::warn;

use crate::hub::Hub;

/// Channel tag for events produced by content-mutation hooks.
pub const CHANNEL_AUTO: &str = "auto";
/// Channel tag for events published through the manual broadcast endpoint.
pub const CHANNEL_ADMIN: &str = "admin";

#[derive(Clone)]
pub struct Notifier {
    db: Database,
    hub: Arc<Hub>,
}

impl Notifier {
    pub fn new(db: Database, hub: Arc<Hub>) -> Self {
        Self { db, hub }
    }

    /// A content record was created.
    pub async fn notify_created(
        &self,
        entity: &str,
        title: &str,
        entity_id: Option<String>,
        snapshot: Option<Value>,
    ) -> Option<Event> {
        let payload = content_payload(
            title,
            &format!("New {entity} created: {title}"),
            entity_id,
            snapshot,
        );
        self.publish(CHANNEL_AUTO, EventKind::Create, Some(entity), payload)
            .await
    }

    /// A content record was updated.
    pub async fn notify_updated(
        &self,
        entity: &str,
        title: &str,
        entity_id: Option<String>,
        snapshot: Option<Value>,
    ) -> Option<Event> {
        let payload = content_payload(
            title,
            &format!("{entity} updated: {title}"),
            entity_id,
            snapshot,
        );
        self.publish(CHANNEL_AUTO, EventKind::Update, Some(entity), payload)
            .await
    }

    /// A content record was deleted.
    pub async fn notify_deleted(
        &self,
        entity: &str,
        title: &str,
        entity_id: Option<String>,
        snapshot: Option<Value>,
    ) -> Option<Event> {
        let payload = content_payload(
            title,
            &format!("{entity} deleted: {title}"),
            entity_id,
            snapshot,
        );
        self.publish(CHANNEL_AUTO, EventKind::Delete, Some(entity), payload)
            .await
    }

    /// Free-form operator notification, unrelated to a specific record.
    pub async fn send_notification(&self, message: &str, title: Option<&str>) -> Option<Event> {
        let mut payload = Map::new();
        if let Some(title) = title {
            payload.insert("title".to_string(), json!(title));
        }
        payload.insert("message".to_string(), json!(message));

        self.publish(CHANNEL_AUTO, EventKind::Notification, None, Value::Object(payload))
            .await
    }

    /// Push a full-record refresh hint for one entity.
    pub async fn sync_entity(
        &self,
        entity: &str,
        entity_id: &str,
        snapshot: Value,
    ) -> Option<Event> {
        let payload = content_payload(
            entity,
            &format!("{entity} synchronized"),
            Some(entity_id.to_string()),
            Some(snapshot),
        );
        self.publish(CHANNEL_AUTO, EventKind::Sync, Some(entity), payload)
            .await
    }

    /// Publish several updates in order. Each append completes before its
    /// broadcast, so ids observed by subscribers stay monotonic.
    pub async fn broadcast_batch(&self, updates: Vec<(EventKind, Value)>) {
        for (kind, payload) in updates {
            self.publish(CHANNEL_AUTO, kind, None, payload).await;
        }
    }

    /// Append one event to the log, then hand it to the hub.
    ///
    /// The append runs first so the event is already queryable through the
    /// replay endpoint by the time any subscriber reacts to the push. On
    /// store failure nothing is broadcast and the caller's mutation is
    /// untouched.
    pub async fn publish(
        &self,
        channel: &str,
        kind: EventKind,
        entity: Option<&str>,
        payload: Value,
    ) -> Option<Event> {
        let input = CreateEventRow {
            channel: channel.to_string(),
            kind: kind.as_str().to_string(),
            entity: entity.map(str::to_string),
            payload,
        };

        let row = match self.db.insert_event(input).await {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, kind = %kind, "failed to persist realtime event; skipping broadcast");
                return None;
            }
        };

        match Event::try_from(row) {
            Ok(event) => {
                self.hub.broadcast(&event);
                Some(event)
            }
            Err(e) => {
                // We just wrote this kind, so this only fires on a schema skew.
                warn!(error = %e, "persisted event has unreadable kind; skipping broadcast");
                None
            }
        }
    }
}

/// Canonical payload for content events: `{title, message, entityId?, data?}`.
pub fn content_payload(
    title: &str,
    message: &str,
    entity_id: Option<String>,
    snapshot: Option<Value>,
) -> Value {
    let mut payload = Map::new();
    payload.insert("title".to_string(), json!(title));
    payload.insert("message".to_string(), json!(message));
    if let Some(entity_id) = entity_id {
        payload.insert("entityId".to_string(), json!(entity_id));
    }
    if let Some(snapshot) = snapshot {
        payload.insert("data".to_string(), snapshot);
    }

    Value::Object(payload)
}
