// Connection lifecycle: live stream with bounded backoff, plus the poll loop
//
// Three tasks: the merge task owns the Feed and is the only mutator; the
// stream task and the poll task feed it commands. The poll loop runs for the
// client's whole lifetime - it is the delivery guarantee, the stream is just
// lower latency.

use academy_contracts::{Event, LifecycleFrame, StreamFrame};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::feed::{ConnectionStatus, Feed, FeedSnapshot};

enum FeedCommand {
    Apply(Event),
    ApplyBatch(Vec<Event>),
    Status(ConnectionStatus),
    Dismiss(i64),
}

/// Handle to a running realtime client.
///
/// Consumers read the feed through [`RealtimeClient::updates`] (a watch
/// channel that changes whenever the feed does) or one-off via
/// [`RealtimeClient::snapshot`].
pub struct RealtimeClient {
    updates: watch::Receiver<FeedSnapshot>,
    commands: mpsc::UnboundedSender<FeedCommand>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl RealtimeClient {
    /// Start the merge, stream, and poll tasks.
    pub fn spawn(config: ClientConfig) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let feed = Feed::new(&config);
        let (snapshot_tx, updates) = watch::channel(feed.snapshot());

        let tasks = vec![
            tokio::spawn(run_feed(
                feed,
                command_rx,
                snapshot_tx,
                shutdown_rx.clone(),
            )),
            tokio::spawn(run_stream(
                config.clone(),
                commands.clone(),
                shutdown_rx.clone(),
            )),
            tokio::spawn(run_poll(
                config,
                commands.clone(),
                updates.clone(),
                shutdown_rx,
            )),
        ];

        Self {
            updates,
            commands,
            shutdown,
            tasks,
        }
    }

    /// Current feed state.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.updates.borrow().clone()
    }

    /// Watch channel that changes whenever the feed does.
    pub fn updates(&self) -> watch::Receiver<FeedSnapshot> {
        self.updates.clone()
    }

    /// Dismiss one visible notice ahead of its TTL.
    pub fn dismiss(&self, event_id: i64) {
        let _ = self.commands.send(FeedCommand::Dismiss(event_id));
    }

    /// Stop all tasks and release the stream, reconnect timer, and poll loop.
    pub fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Single owner of the Feed; applies commands and the expiry tick.
async fn run_feed(
    mut feed: Feed,
    mut commands: mpsc::UnboundedReceiver<FeedCommand>,
    snapshots: watch::Sender<FeedSnapshot>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut expiry = tokio::time::interval(std::time::Duration::from_millis(500));
    expiry.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = expiry.tick() => {
                feed.expire(Instant::now());
            }
            command = commands.recv() => {
                let Some(command) = command else { return };
                let now = Instant::now();
                match command {
                    FeedCommand::Apply(event) => {
                        feed.apply_event(&event, now);
                    }
                    FeedCommand::ApplyBatch(events) => {
                        for event in &events {
                            feed.apply_event(event, now);
                        }
                    }
                    FeedCommand::Status(status) => feed.set_status(status),
                    FeedCommand::Dismiss(event_id) => feed.dismiss(event_id),
                }
            }
        }

        let _ = snapshots.send(feed.snapshot());
    }
}

/// Live SSE consumer with bounded exponential reconnect backoff.
async fn run_stream(
    config: ClientConfig,
    commands: mpsc::UnboundedSender<FeedCommand>,
    mut shutdown: watch::Receiver<bool>,
) {
    let client = reqwest::Client::new();
    let url = format!(
        "{}/v1/realtime/events",
        config.base_url.trim_end_matches('/')
    );
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            return;
        }
        let _ = commands.send(FeedCommand::Status(ConnectionStatus::Connecting));

        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                // Stream is open: retries start over from here.
                attempt = 0;
                let _ = commands.send(FeedCommand::Status(ConnectionStatus::Connected));

                let mut stream = response.bytes_stream().eventsource();
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => return,
                        next = stream.next() => match next {
                            Some(Ok(frame)) => handle_frame(&frame.data, &commands),
                            Some(Err(e)) => {
                                debug!(error = %e, "realtime stream error");
                                break;
                            }
                            None => {
                                debug!("realtime stream ended");
                                break;
                            }
                        }
                    }
                }
            }
            Ok(response) => {
                debug!(status = %response.status(), "realtime stream rejected");
            }
            Err(e) => {
                debug!(error = %e, "failed to open realtime stream");
            }
        }

        let _ = commands.send(FeedCommand::Status(ConnectionStatus::Error));

        if attempt >= config.max_reconnect_attempts {
            // Give up on the live channel; polling keeps the feed correct.
            warn!(
                attempts = attempt,
                "giving up on realtime stream after repeated failures"
            );
            let _ = commands.send(FeedCommand::Status(ConnectionStatus::Disconnected));
            return;
        }

        let delay = config.reconnect_delay(attempt);
        attempt += 1;
        let _ = commands.send(FeedCommand::Status(ConnectionStatus::Reconnecting));

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Parse one SSE data payload. Malformed frames are dropped, never fatal.
fn handle_frame(data: &str, commands: &mpsc::UnboundedSender<FeedCommand>) {
    match serde_json::from_str::<StreamFrame>(data) {
        Ok(StreamFrame::Event(event)) => {
            let _ = commands.send(FeedCommand::Apply(event));
        }
        Ok(StreamFrame::Lifecycle(LifecycleFrame::Connected { .. })) => {
            let _ = commands.send(FeedCommand::Status(ConnectionStatus::Connected));
        }
        Err(e) => {
            warn!(error = %e, "dropping malformed stream frame");
        }
    }
}

/// Fixed-interval replay poll; the at-least-once delivery path.
async fn run_poll(
    config: ClientConfig,
    commands: mpsc::UnboundedSender<FeedCommand>,
    snapshots: watch::Receiver<FeedSnapshot>,
    mut shutdown: watch::Receiver<bool>,
) {
    let client = reqwest::Client::new();
    let url = format!(
        "{}/v1/realtime/updates",
        config.base_url.trim_end_matches('/')
    );

    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = ticker.tick() => {}
        }

        let since_id = snapshots.borrow().cursor;
        let request = client.get(&url).query(&[("since_id", since_id)]);

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<academy_contracts::EventsResponse>().await {
                    Ok(body) if !body.events.is_empty() => {
                        let _ = commands.send(FeedCommand::ApplyBatch(body.events));
                    }
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "malformed replay response"),
                }
            }
            Ok(response) => {
                // Retryable by construction: the next tick tries again.
                debug!(status = %response.status(), "replay request failed");
            }
            Err(e) => {
                debug!(error = %e, "replay request failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_contracts::EventKind;
    use chrono::Utc;
    use serde_json::json;

    fn event_json(id: i64, title: &str) -> String {
        serde_json::to_string(&Event {
            id,
            kind: EventKind::Create,
            channel: "auto".to_string(),
            entity: Some("course".to_string()),
            payload: json!({"title": title}),
            created_at: Utc::now(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn handle_frame_routes_events_and_lifecycle() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_frame(&event_json(5, "Intro"), &tx);
        handle_frame(r#"{"type":"connected","timestamp":0}"#, &tx);

        match rx.recv().await.unwrap() {
            FeedCommand::Apply(ev) => assert_eq!(ev.id, 5),
            _ => panic!("expected Apply"),
        }
        match rx.recv().await.unwrap() {
            FeedCommand::Status(status) => assert_eq!(status, ConnectionStatus::Connected),
            _ => panic!("expected Status"),
        }
    }

    #[tokio::test]
    async fn handle_frame_drops_malformed_payloads() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_frame("not json at all", &tx);
        handle_frame(&event_json(6, "still works"), &tx);

        // The malformed frame produced nothing; the stream carries on.
        match rx.recv().await.unwrap() {
            FeedCommand::Apply(ev) => assert_eq!(ev.id, 6),
            _ => panic!("expected Apply"),
        }
    }

    #[tokio::test]
    async fn merge_task_applies_commands_and_publishes_snapshots() {
        let config = ClientConfig::default();
        let feed = Feed::new(&config);
        let (snapshot_tx, mut snapshots) = watch::channel(feed.snapshot());
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_feed(feed, command_rx, snapshot_tx, shutdown_rx));

        commands
            .send(FeedCommand::Apply(
                serde_json::from_str(&event_json(1, "First")).unwrap(),
            ))
            .unwrap();

        // The expiry tick publishes snapshots too; wait for the one that
        // carries the applied event.
        let snapshot = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                snapshots.changed().await.unwrap();
                let snapshot = snapshots.borrow().clone();
                if snapshot.cursor == 1 {
                    return snapshot;
                }
            }
        })
        .await
        .expect("feed never applied the event");

        assert_eq!(snapshot.cursor, 1);
        assert_eq!(snapshot.notices.len(), 1);

        task.abort();
    }
}
