// Realtime service for replay queries and monitoring stats

use academy_contracts::{Event, RealtimeStats};
use academy_storage::Database;
use anyhow::Result;
use chrono::{Duration, Utc};
use std::sync::Arc;

pub struct RealtimeService {
    db: Arc<Database>,
}

impl RealtimeService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Events with `id > since_id`, ascending, at most `limit` rows.
    pub async fn events_after(&self, since_id: i64, limit: i64) -> Result<Vec<Event>> {
        let rows = self.db.events_after(since_id, limit).await?;

        rows.into_iter()
            .map(|row| Event::try_from(row).map_err(anyhow::Error::new))
            .collect()
    }

    /// Monitoring snapshot. Count failures degrade to zeros so the endpoint
    /// stays useful for the connection counter even when the store is down.
    pub async fn stats(&self, connected_clients: usize) -> RealtimeStats {
        let total_events = match self.db.count_events().await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("failed to count events: {}", e);
                0
            }
        };

        let recent_events = match self
            .db
            .count_events_since(Utc::now() - Duration::hours(24))
            .await
        {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("failed to count recent events: {}", e);
                0
            }
        };

        RealtimeStats {
            connected_clients,
            total_events,
            recent_events,
        }
    }
}
