// Repository layer for the event log

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::models::*;

/// Default page size for replay queries.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;
/// Hard cap on replay page size; bounds response size for any caller.
pub const MAX_PAGE_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL.
    ///
    /// The acquire timeout bounds how long an append can stall when the
    /// store is unreachable; producers log the failure instead of blocking
    /// the mutation that triggered them.
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Events (append-only realtime log)
    // ============================================

    /// Append one event. The id is assigned by the BIGSERIAL column, so two
    /// concurrent appends can never share an id.
    pub async fn insert_event(&self, input: CreateEventRow) -> Result<EventRow> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events (channel, kind, entity, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING id, channel, kind, entity, payload, created_at
            "#,
        )
        .bind(&input.channel)
        .bind(&input.kind)
        .bind(&input.entity)
        .bind(&input.payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Events with `id > since_id`, ascending, capped at `limit` rows.
    /// The caller is expected to clamp `limit` to [`MAX_PAGE_LIMIT`].
    pub async fn events_after(&self, since_id: i64, limit: i64) -> Result<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, channel, kind, entity, payload, created_at
            FROM events
            WHERE id > $1
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(since_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Stats (monitoring endpoint)
    // ============================================

    pub async fn count_events(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    pub async fn count_events_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM events WHERE created_at >= $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }
}
