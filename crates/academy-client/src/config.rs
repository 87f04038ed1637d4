// Client configuration with the defaults the admin UI shipped with

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the realtime API, e.g. `http://localhost:9000`.
    pub base_url: String,
    /// Replay poll cadence; runs for the client's whole lifetime regardless
    /// of stream state.
    pub poll_interval: Duration,
    /// First reconnect delay; doubles per attempt.
    pub reconnect_base_delay: Duration,
    /// Ceiling for the reconnect delay.
    pub reconnect_max_delay: Duration,
    /// Consecutive stream failures tolerated before giving up on the live
    /// channel. Polling continues either way.
    pub max_reconnect_attempts: u32,
    /// Newest notices kept visible at once.
    pub display_limit: usize,
    /// How long a notice stays visible before auto-dismissal.
    pub dismiss_after: Duration,
    /// Case-insensitive substrings matched against title and message;
    /// matching events are hidden from the feed (their ids still advance
    /// the cursor). Default covers seeded test traffic.
    pub denylist: Vec<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Reconnect delay for the given attempt: `min(base * 2^attempt, max)`.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.reconnect_base_delay.as_millis() as u64;
        let max_ms = self.reconnect_max_delay.as_millis() as u64;
        let factor = 1u64 << attempt.min(31);

        Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            poll_interval: Duration::from_secs(3),
            reconnect_base_delay: Duration::from_millis(1000),
            reconnect_max_delay: Duration::from_millis(30_000),
            max_reconnect_attempts: 5,
            display_limit: 3,
            dismiss_after: Duration::from_secs(5),
            denylist: vec!["playwright".to_string(), "test".to_string()],
        }
    }
}
