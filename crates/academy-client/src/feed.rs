// Display feed: merge, dedup, denylist, ordering, TTL
//
// All mutation goes through the controller's merge task, so none of this
// needs locking. The feed never talks to the network.

use academy_contracts::{Event, EventKind};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

use crate::config::ClientConfig;

/// Live-stream connection state, surfaced for a status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    /// Stream broke; a reconnect is scheduled.
    Error,
    /// Backoff timer running, or retries exhausted. Polling still covers
    /// delivery either way.
    Reconnecting,
    Disconnected,
}

/// One visible notification.
#[derive(Debug, Clone)]
pub struct Notice {
    pub event_id: i64,
    pub kind: EventKind,
    pub title: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    received_at: Instant,
}

/// Read-only copy of the feed for consumers.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    /// Visible notices, newest first.
    pub notices: Vec<Notice>,
    pub status: ConnectionStatus,
    /// Highest event id processed from either source.
    pub cursor: i64,
}

pub struct Feed {
    display_limit: usize,
    dismiss_after: Duration,
    denylist: Vec<String>,
    notices: Vec<Notice>,
    cursor: i64,
    status: ConnectionStatus,
}

impl Feed {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            display_limit: config.display_limit,
            dismiss_after: config.dismiss_after,
            denylist: config.denylist.iter().map(|s| s.to_lowercase()).collect(),
            notices: Vec::new(),
            cursor: 0,
            status: ConnectionStatus::Connecting,
        }
    }

    /// Merge one event from either source. Returns whether it became visible.
    ///
    /// The cursor advances for every observed event, including denylisted
    /// and duplicate ones - replay must never re-deliver what was already
    /// seen, shown or not.
    pub fn apply_event(&mut self, event: &Event, now: Instant) -> bool {
        self.cursor = self.cursor.max(event.id);

        if self.is_denied(event) {
            return false;
        }
        if self.notices.iter().any(|n| n.event_id == event.id) {
            return false;
        }

        let notice = Notice {
            event_id: event.id,
            kind: event.kind,
            title: event.title().map(str::to_string),
            message: event.message().map(str::to_string),
            created_at: event.created_at,
            received_at: now,
        };

        // Insert in descending id order so interleaved push/poll arrivals
        // still render in event order.
        let pos = self
            .notices
            .iter()
            .position(|n| n.event_id < event.id)
            .unwrap_or(self.notices.len());
        self.notices.insert(pos, notice);
        self.notices.truncate(self.display_limit);

        true
    }

    fn is_denied(&self, event: &Event) -> bool {
        let title = event.title().unwrap_or("").to_lowercase();
        let message = event.message().unwrap_or("").to_lowercase();

        self.denylist
            .iter()
            .any(|needle| title.contains(needle) || message.contains(needle))
    }

    /// Drop notices older than the display TTL.
    pub fn expire(&mut self, now: Instant) {
        let ttl = self.dismiss_after;
        self.notices
            .retain(|n| now.duration_since(n.received_at) < ttl);
    }

    /// Remove one notice ahead of its TTL (user clicked dismiss).
    pub fn dismiss(&mut self, event_id: i64) {
        self.notices.retain(|n| n.event_id != event_id);
    }

    pub fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            notices: self.notices.clone(),
            status: self.status,
            cursor: self.cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feed() -> Feed {
        Feed::new(&ClientConfig::default())
    }

    fn event(id: i64, title: &str) -> Event {
        Event {
            id,
            kind: EventKind::Update,
            channel: "auto".to_string(),
            entity: Some("course".to_string()),
            payload: json!({"title": title, "message": format!("course updated: {title}")}),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_delivery_renders_once() {
        let mut feed = feed();
        let now = Instant::now();
        let ev = event(1, "Intro to Rust");

        // once via live push, once via poll replay
        assert!(feed.apply_event(&ev, now));
        assert!(!feed.apply_event(&ev, now));

        assert_eq!(feed.notices().len(), 1);
        assert_eq!(feed.cursor(), 1);
    }

    #[test]
    fn interleaved_sources_render_in_id_order() {
        let mut feed = feed();
        let now = Instant::now();

        // live push delivers 2 before the poll catches up with 1, then 3
        feed.apply_event(&event(2, "b"), now);
        feed.apply_event(&event(1, "a"), now);
        feed.apply_event(&event(3, "c"), now);

        let ids: Vec<i64> = feed.notices().iter().map(|n| n.event_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn display_list_keeps_only_the_newest() {
        let mut feed = feed();
        let now = Instant::now();

        for id in 1..=5 {
            feed.apply_event(&event(id, "x"), now);
        }

        let ids: Vec<i64> = feed.notices().iter().map(|n| n.event_id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
        assert_eq!(feed.cursor(), 5);
    }

    #[test]
    fn denylisted_events_are_hidden_but_advance_the_cursor() {
        let mut feed = feed();
        let now = Instant::now();

        let seeded = Event {
            payload: json!({"title": "Playwright seed run"}),
            ..event(7, "ignored")
        };
        assert!(!feed.apply_event(&seeded, now));

        assert!(feed.notices().is_empty());
        assert_eq!(feed.cursor(), 7, "filtered events still advance the cursor");
    }

    #[test]
    fn denylist_matches_message_too() {
        let mut feed = feed();
        let now = Instant::now();

        let ev = Event {
            payload: json!({"title": "Weekly digest", "message": "test monitor fired"}),
            ..event(8, "ignored")
        };
        assert!(!feed.apply_event(&ev, now));
    }

    #[test]
    fn notices_expire_after_the_ttl() {
        let mut feed = feed();
        let now = Instant::now();

        feed.apply_event(&event(1, "old"), now);
        feed.apply_event(&event(2, "new"), now + Duration::from_secs(4));

        feed.expire(now + Duration::from_secs(6));

        let ids: Vec<i64> = feed.notices().iter().map(|n| n.event_id).collect();
        assert_eq!(ids, vec![2], "only the notice within its TTL survives");
    }

    #[test]
    fn cursor_never_decreases() {
        let mut feed = feed();
        let now = Instant::now();

        feed.apply_event(&event(9, "later"), now);
        feed.apply_event(&event(3, "earlier"), now);

        assert_eq!(feed.cursor(), 9);
    }

    #[test]
    fn dismiss_removes_a_single_notice() {
        let mut feed = feed();
        let now = Instant::now();

        feed.apply_event(&event(1, "a"), now);
        feed.apply_event(&event(2, "b"), now);

        feed.dismiss(1);

        let ids: Vec<i64> = feed.notices().iter().map(|n| n.event_id).collect();
        assert_eq!(ids, vec![2]);
    }
}
