// Row models for the events table

use academy_contracts::{Event, UnknownEventKind};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: i64,
    pub channel: String,
    pub kind: String,
    pub entity: Option<String>,
    pub payload: sqlx::types::JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateEventRow {
    pub channel: String,
    pub kind: String,
    pub entity: Option<String>,
    pub payload: serde_json::Value,
}

impl TryFrom<EventRow> for Event {
    type Error = UnknownEventKind;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            kind: row.kind.parse()?,
            channel: row.channel,
            entity: row.entity,
            payload: row.payload,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_contracts::EventKind;
    use serde_json::json;

    fn row(kind: &str) -> EventRow {
        EventRow {
            id: 7,
            channel: "auto".to_string(),
            kind: kind.to_string(),
            entity: Some("lesson".to_string()),
            payload: json!({"title": "Ownership"}),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_contract_event() {
        let event = Event::try_from(row("UPDATE")).unwrap();

        assert_eq!(event.id, 7);
        assert_eq!(event.kind, EventKind::Update);
        assert_eq!(event.entity.as_deref(), Some("lesson"));
        assert_eq!(event.title(), Some("Ownership"));
    }

    #[test]
    fn unknown_kind_is_an_error_not_a_guess() {
        let err = Event::try_from(row("PURGE")).unwrap_err();
        assert!(err.to_string().contains("PURGE"));
    }
}
