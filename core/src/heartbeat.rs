//! Background liveness pings to a status monitor.
//!
//! # Design
//! The target URI comes in through `HeartbeatConfig`; the heartbeater never
//! reads the environment itself, so tests can configure it directly.
//! `HeartbeatConfig::from_env` exists for hosts that want the
//! `STATUS_CALL_URI` convention.
//!
//! The loop task and the heartbeater share the connection slot. Each `run()`
//! and `stop()` bumps the slot's generation, and a loop only stores or uses a
//! connection while the generation it was started with is current. An
//! aborted loop that is mid-poll on another worker therefore cannot refill
//! the slot after `stop()` has emptied it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::StatusCode;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Environment variable read by [`HeartbeatConfig::from_env`].
pub const STATUS_CALL_URI_ENV: &str = "STATUS_CALL_URI";

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(45);

/// Shortest accepted interval. Smaller values are raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Where and how often to send heartbeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    call_uri: Option<String>,
    interval: Duration,
}

impl HeartbeatConfig {
    pub fn new(call_uri: Option<String>) -> Self {
        Self {
            call_uri: call_uri.filter(|uri| !uri.is_empty()),
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Read the target from `STATUS_CALL_URI`. Unset or empty disables the
    /// heartbeat.
    pub fn from_env() -> Self {
        Self::new(std::env::var(STATUS_CALL_URI_ENV).ok())
    }

    /// Set the ping interval, clamped to at least [`MIN_INTERVAL`].
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    pub fn call_uri(&self) -> Option<&str> {
        self.call_uri.as_deref()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

#[derive(Debug, Default)]
struct SessionSlot {
    generation: u64,
    client: Option<reqwest::Client>,
}

type SharedSession = Arc<Mutex<SessionSlot>>;

fn lock(session: &SharedSession) -> MutexGuard<'_, SessionSlot> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pings `call_uri` every `interval` until stopped or dropped.
///
/// Failures are logged and never surface to the owner.
#[derive(Debug)]
pub struct StatusHeartbeater {
    config: HeartbeatConfig,
    session: SharedSession,
    task: Option<JoinHandle<()>>,
}

impl StatusHeartbeater {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            session: Arc::new(Mutex::new(SessionSlot::default())),
            task: None,
        }
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start the heartbeat loop.
    ///
    /// No-op when no URI is configured or a loop is already running.
    ///
    /// # Panics
    /// Panics if a URI is configured and this is called outside a tokio
    /// runtime.
    pub fn run(&mut self) {
        let Some(uri) = self.config.call_uri.clone() else {
            debug!("no status call URI configured, heartbeat disabled");
            return;
        };
        if self.is_running() {
            warn!(%uri, "status heartbeat already running");
            return;
        }

        let interval = self.config.interval;
        let generation = {
            let mut slot = lock(&self.session);
            slot.generation += 1;
            slot.generation
        };
        let session = Arc::clone(&self.session);
        info!(%uri, ?interval, "starting status heartbeat");
        self.task = Some(tokio::spawn(heartbeat_loop(
            uri, interval, session, generation,
        )));
    }

    /// Cancel the loop and drop its connection. Safe to call when not running.
    pub fn stop(&mut self) {
        {
            let mut slot = lock(&self.session);
            slot.generation += 1;
            slot.client = None;
        }
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("status heartbeat stopped");
        }
    }
}

impl Drop for StatusHeartbeater {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn heartbeat_loop(uri: String, interval: Duration, session: SharedSession, generation: u64) {
    loop {
        let client = match acquire(&session, generation, interval) {
            Some(Ok(client)) => client,
            Some(Err(e)) => {
                error!(error = %e, %uri, "status heartbeat failed");
                tokio::time::sleep(interval).await;
                continue;
            }
            None => return,
        };
        match send_heartbeat(&client, &uri).await {
            Ok(status) => info!(%status, "sent status heartbeat"),
            Err(e) => error!(error = %e, %uri, "status heartbeat failed"),
        }
        tokio::time::sleep(interval).await;
    }
}

/// The loop's connection, created on first use. `None` once the loop that
/// owns `generation` has been stopped or superseded.
fn acquire(
    session: &SharedSession,
    generation: u64,
    timeout: Duration,
) -> Option<Result<reqwest::Client, reqwest::Error>> {
    let mut slot = lock(session);
    if slot.generation != generation {
        return None;
    }
    if let Some(client) = slot.client.as_ref() {
        return Some(Ok(client.clone()));
    }
    // A hung request must not stall the loop past one interval.
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => return Some(Err(e)),
    };
    slot.client = Some(client.clone());
    Some(Ok(client))
}

async fn send_heartbeat(client: &reqwest::Client, uri: &str) -> Result<StatusCode, reqwest::Error> {
    let response = client.get(uri).send().await?.error_for_status()?;
    Ok(response.status())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_uri_counts_as_unset() {
        assert_eq!(HeartbeatConfig::new(Some(String::new())).call_uri(), None);
    }

    #[test]
    fn default_interval_is_45_seconds() {
        let config = HeartbeatConfig::new(Some("http://status.local/ping".to_string()));
        assert_eq!(config.interval(), Duration::from_secs(45));
        assert_eq!(
            config.with_interval(Duration::from_millis(20)).interval(),
            Duration::from_millis(20)
        );
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = HeartbeatConfig::default().with_interval(Duration::ZERO);
        assert_eq!(config.interval(), MIN_INTERVAL);
    }

    #[test]
    fn run_without_uri_is_inert() {
        // No runtime here: a disabled heartbeater must not try to spawn.
        let mut heartbeater = StatusHeartbeater::new(HeartbeatConfig::default());
        heartbeater.run();
        assert!(!heartbeater.is_running());
        heartbeater.stop();
        heartbeater.stop();
        assert!(!heartbeater.is_running());
    }

    #[test]
    fn acquire_creates_once_for_current_generation() {
        let session: SharedSession = Arc::new(Mutex::new(SessionSlot {
            generation: 1,
            client: None,
        }));
        assert!(matches!(acquire(&session, 1, MIN_INTERVAL), Some(Ok(_))));
        assert!(lock(&session).client.is_some());
        assert!(matches!(acquire(&session, 1, MIN_INTERVAL), Some(Ok(_))));
    }

    #[test]
    fn stale_loop_cannot_refill_the_slot() {
        let mut heartbeater = StatusHeartbeater::new(HeartbeatConfig::default());
        let generation = lock(&heartbeater.session).generation;

        // A loop started before this stop() keeps polling after it.
        heartbeater.stop();
        assert!(acquire(&heartbeater.session, generation, MIN_INTERVAL).is_none());
        assert!(lock(&heartbeater.session).client.is_none());
    }

    #[tokio::test]
    async fn stop_clears_task_and_connection() {
        let config = HeartbeatConfig::new(Some("http://127.0.0.1:9/status".to_string()))
            .with_interval(Duration::from_secs(60));
        let mut heartbeater = StatusHeartbeater::new(config);
        heartbeater.run();
        assert!(heartbeater.is_running());

        heartbeater.stop();
        assert!(!heartbeater.is_running());
        assert!(lock(&heartbeater.session).client.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn loop_exits_once_superseded() {
        let config = HeartbeatConfig::new(Some("http://127.0.0.1:9/status".to_string()))
            .with_interval(MIN_INTERVAL);
        let session: SharedSession = Arc::new(Mutex::new(SessionSlot {
            generation: 1,
            client: None,
        }));
        let task = tokio::spawn(heartbeat_loop(
            config.call_uri().unwrap_or_default().to_string(),
            config.interval(),
            Arc::clone(&session),
            1,
        ));

        lock(&session).generation = 2;
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("loop should notice it was superseded")
            .unwrap();
    }
}
