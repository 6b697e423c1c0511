//! The build-trigger coalescer: change events → debounced rebuild requests.
//!
//! A bulk content import can emit hundreds of change events in seconds;
//! firing a rebuild per event would queue hundreds of redundant, expensive
//! builds. The coalescer holds a debounce window per site: each event
//! arriving while the window is open extends it, and only a quiet window
//! produces a trigger — exactly one per burst, carrying the highest content
//! version observed so the build side can assert it reads at-or-after it.
//!
//! State machine: `IDLE → DEBOUNCING → TRIGGERING → IDLE`. Events arriving
//! during `TRIGGERING` sit buffered in the channel and restart `DEBOUNCING`
//! as soon as the in-flight trigger completes, so no event is ever lost.

use std::{future::Future, time::Duration};

use mosaic_core::event::ChangeEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// First retry delay; doubles per attempt.
const RETRY_BASE: Duration = Duration::from_secs(1);

/// Outbound request deadline for the HTTP trigger.
const TRIGGER_TIMEOUT: Duration = Duration::from_secs(10);

// ─── Trigger abstraction ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("build trigger failed: {0}")]
pub struct TriggerError(pub String);

/// The outbound call that asks the external build system for a rebuild.
pub trait BuildTrigger: Send + Sync {
  fn fire(
    &self,
    site_id: &str,
    content_version: i64,
  ) -> impl Future<Output = Result<(), TriggerError>> + Send;
}

/// Production trigger: POST `{site_id, content_version}` to the build
/// system's hook URL.
pub struct HttpBuildTrigger {
  client: reqwest::Client,
  url:    String,
}

impl HttpBuildTrigger {
  pub fn new(url: impl Into<String>) -> reqwest::Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(TRIGGER_TIMEOUT)
      .build()?;
    Ok(Self { client, url: url.into() })
  }
}

impl BuildTrigger for HttpBuildTrigger {
  async fn fire(
    &self,
    site_id: &str,
    content_version: i64,
  ) -> Result<(), TriggerError> {
    self
      .client
      .post(&self.url)
      .json(&serde_json::json!({
        "site_id": site_id,
        "content_version": content_version,
      }))
      .send()
      .await
      .and_then(reqwest::Response::error_for_status)
      .map_err(|e| TriggerError(e.to_string()))?;
    Ok(())
  }
}

// ─── Coalescer ───────────────────────────────────────────────────────────────

/// Debounces change events for one site into rebuild triggers.
///
/// Owns the window state exclusively; no other component reads or writes
/// it.
pub struct Coalescer<T> {
  rx:           mpsc::Receiver<ChangeEvent>,
  trigger:      T,
  site_id:      String,
  window:       Duration,
  max_attempts: u32,
}

impl<T: BuildTrigger> Coalescer<T> {
  pub fn new(
    rx: mpsc::Receiver<ChangeEvent>,
    trigger: T,
    site_id: String,
    window: Duration,
    max_attempts: u32,
  ) -> Self {
    Self { rx, trigger, site_id, window, max_attempts }
  }

  /// Run until the event channel closes. A final pending burst is flushed
  /// before returning.
  pub async fn run(mut self) {
    // IDLE: block until the first event of a burst.
    while let Some(first) = self.rx.recv().await {
      let mut max_version = first.version;
      let mut closed = false;

      // DEBOUNCING: every further event restarts the window.
      loop {
        tokio::select! {
          more = self.rx.recv() => match more {
            Some(ev) => max_version = max_version.max(ev.version),
            None => {
              closed = true;
              break;
            }
          },
          _ = tokio::time::sleep(self.window) => break,
        }
      }

      // TRIGGERING: events arriving now stay buffered in the channel and
      // re-enter DEBOUNCING on the next loop pass.
      self.fire_with_retry(max_version).await;

      if closed {
        return;
      }
    }
  }

  /// Fire the trigger with exponential backoff. Exhaustion is reported and
  /// absorbed — the next incoming event naturally retries the whole cycle.
  async fn fire_with_retry(&self, content_version: i64) {
    let mut delay = RETRY_BASE;
    for attempt in 1..=self.max_attempts {
      match self.trigger.fire(&self.site_id, content_version).await {
        Ok(()) => {
          tracing::info!(
            site_id = %self.site_id,
            content_version,
            "build triggered"
          );
          return;
        }
        Err(e) if attempt < self.max_attempts => {
          tracing::warn!(
            site_id = %self.site_id,
            error = %e,
            attempt,
            "build trigger failed; backing off"
          );
          tokio::time::sleep(delay).await;
          delay *= 2;
        }
        Err(e) => {
          tracing::error!(
            site_id = %self.site_id,
            error = %e,
            attempts = self.max_attempts,
            "build trigger attempts exhausted; awaiting next change event"
          );
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
  };

  use chrono::Utc;
  use mosaic_core::item::ContentType;
  use uuid::Uuid;

  const WINDOW: Duration = Duration::from_secs(30);

  fn event(version: i64) -> ChangeEvent {
    ChangeEvent {
      event_id:        Uuid::new_v4(),
      content_id:      format!("c{version}"),
      content_type:    ContentType::Article,
      version,
      source_provider: "cms".to_string(),
      occurred_at:     Utc::now(),
    }
  }

  #[derive(Default, Clone)]
  struct RecordingTrigger {
    calls: Arc<Mutex<Vec<i64>>>,
  }

  impl BuildTrigger for RecordingTrigger {
    async fn fire(&self, _site: &str, version: i64) -> Result<(), TriggerError> {
      self.calls.lock().unwrap().push(version);
      Ok(())
    }
  }

  /// Fails `failures` times, then succeeds; counts every attempt.
  struct FlakyTrigger {
    failures: AtomicU32,
    attempts: Arc<AtomicU32>,
  }

  impl BuildTrigger for FlakyTrigger {
    async fn fire(&self, _site: &str, _version: i64) -> Result<(), TriggerError> {
      self.attempts.fetch_add(1, Ordering::SeqCst);
      let left = self.failures.load(Ordering::SeqCst);
      if left > 0 {
        self.failures.store(left - 1, Ordering::SeqCst);
        return Err(TriggerError("unavailable".to_string()));
      }
      Ok(())
    }
  }

  /// Succeeds slowly, so events can arrive mid-trigger.
  struct SlowTrigger {
    calls: Arc<Mutex<Vec<i64>>>,
  }

  impl BuildTrigger for SlowTrigger {
    async fn fire(&self, _site: &str, version: i64) -> Result<(), TriggerError> {
      tokio::time::sleep(Duration::from_secs(5)).await;
      self.calls.lock().unwrap().push(version);
      Ok(())
    }
  }

  fn spawn_coalescer<T: BuildTrigger + 'static>(
    trigger: T,
  ) -> (mpsc::Sender<ChangeEvent>, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(64);
    let coalescer =
      Coalescer::new(rx, trigger, "site-1".to_string(), WINDOW, 3);
    (tx, tokio::spawn(coalescer.run()))
  }

  #[tokio::test(start_paused = true)]
  async fn burst_within_window_fires_exactly_one_trigger() {
    let trigger = RecordingTrigger::default();
    let calls = trigger.calls.clone();
    let (tx, handle) = spawn_coalescer(trigger);

    for v in 1..=5 {
      tx.send(event(v)).await.unwrap();
    }
    tokio::time::sleep(WINDOW + Duration::from_secs(1)).await;

    assert_eq!(calls.lock().unwrap().as_slice(), &[5]);
    drop(tx);
    handle.await.unwrap();
  }

  #[tokio::test(start_paused = true)]
  async fn events_spaced_past_the_window_each_fire() {
    let trigger = RecordingTrigger::default();
    let calls = trigger.calls.clone();
    let (tx, handle) = spawn_coalescer(trigger);

    for v in 1..=3 {
      tx.send(event(v)).await.unwrap();
      tokio::time::sleep(WINDOW + Duration::from_secs(1)).await;
    }

    assert_eq!(calls.lock().unwrap().as_slice(), &[1, 2, 3]);
    drop(tx);
    handle.await.unwrap();
  }

  #[tokio::test(start_paused = true)]
  async fn an_event_mid_window_extends_it() {
    let trigger = RecordingTrigger::default();
    let calls = trigger.calls.clone();
    let (tx, handle) = spawn_coalescer(trigger);

    tx.send(event(1)).await.unwrap();
    tokio::time::sleep(WINDOW - Duration::from_secs(5)).await;
    assert!(calls.lock().unwrap().is_empty());

    // Restarts the window; still no trigger at the original deadline.
    tx.send(event(2)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(calls.lock().unwrap().is_empty());

    tokio::time::sleep(WINDOW).await;
    assert_eq!(calls.lock().unwrap().as_slice(), &[2]);
    drop(tx);
    handle.await.unwrap();
  }

  #[tokio::test(start_paused = true)]
  async fn events_arriving_mid_trigger_are_not_lost() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let (tx, handle) = spawn_coalescer(SlowTrigger { calls: calls.clone() });

    tx.send(event(1)).await.unwrap();
    // Land an event while the (5 s) trigger call is in flight.
    tokio::time::sleep(WINDOW + Duration::from_secs(2)).await;
    tx.send(event(2)).await.unwrap();

    // First trigger completes, debounce restarts, second trigger fires.
    tokio::time::sleep(WINDOW + Duration::from_secs(10)).await;
    assert_eq!(calls.lock().unwrap().as_slice(), &[1, 2]);
    drop(tx);
    handle.await.unwrap();
  }

  #[tokio::test(start_paused = true)]
  async fn failed_trigger_retries_with_backoff_until_success() {
    let attempts = Arc::new(AtomicU32::new(0));
    let trigger = FlakyTrigger {
      failures: AtomicU32::new(2),
      attempts: attempts.clone(),
    };
    let (tx, handle) = spawn_coalescer(trigger);

    tx.send(event(1)).await.unwrap();
    // Window + 1 s + 2 s of backoff, with slack.
    tokio::time::sleep(WINDOW + Duration::from_secs(5)).await;

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    drop(tx);
    handle.await.unwrap();
  }

  #[tokio::test(start_paused = true)]
  async fn retry_exhaustion_is_absorbed_and_the_next_event_recovers() {
    let attempts = Arc::new(AtomicU32::new(0));
    let trigger = FlakyTrigger {
      failures: AtomicU32::new(u32::MAX),
      attempts: attempts.clone(),
    };
    let (tx, handle) = spawn_coalescer(trigger);

    tx.send(event(1)).await.unwrap();
    tokio::time::sleep(WINDOW + Duration::from_secs(10)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    // The worker is still alive; a later event starts a fresh cycle.
    tx.send(event(2)).await.unwrap();
    tokio::time::sleep(WINDOW + Duration::from_secs(10)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 6);
    drop(tx);
    handle.await.unwrap();
  }

  #[tokio::test(start_paused = true)]
  async fn closing_the_channel_flushes_the_pending_burst() {
    let trigger = RecordingTrigger::default();
    let calls = trigger.calls.clone();
    let (tx, handle) = spawn_coalescer(trigger);

    tx.send(event(1)).await.unwrap();
    tokio::task::yield_now().await;
    drop(tx);

    handle.await.unwrap();
    assert_eq!(calls.lock().unwrap().as_slice(), &[1]);
  }
}
