//! The change-event publisher: outbox → delivery channel.
//!
//! Runs as a background worker, never inline with the webhook request that
//! created the outbox record — a publish outage can therefore never make
//! the webhook handler slow or fail. The worker wakes on a [`Notify`]
//! signal after each committed upsert and on a periodic sweep tick; the
//! tick is the crash-recovery path, republishing records left unpublished
//! by a process that died between cache-commit and publish-confirm.
//!
//! Delivery is at-least-once: a crash after publish but before
//! `mark_published` redelivers on the next wake. Consumers dedupe on
//! `(content_id, version)`.

use std::{future::Future, sync::Arc, time::Duration};

use mosaic_core::{event::ChangeEvent, store::ContentStore};
use thiserror::Error;
use tokio::sync::{Notify, mpsc};

/// Outbox rows fetched per drain pass.
const DRAIN_BATCH: usize = 64;

// ─── Channel abstraction ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("event channel closed")]
pub struct ChannelClosed;

/// A durable-enough delivery channel for [`ChangeEvent`]s.
///
/// Per-key ordering is whatever the underlying channel provides; the design
/// requires no global ordering across content items.
pub trait EventChannel: Send + Sync {
  fn publish(
    &self,
    event: &ChangeEvent,
  ) -> impl Future<Output = Result<(), ChannelClosed>> + Send;
}

/// The in-process channel feeding the build-trigger coalescer.
pub struct MpscChannel {
  tx: mpsc::Sender<ChangeEvent>,
}

impl MpscChannel {
  pub fn new(tx: mpsc::Sender<ChangeEvent>) -> Self {
    Self { tx }
  }
}

impl EventChannel for MpscChannel {
  async fn publish(&self, event: &ChangeEvent) -> Result<(), ChannelClosed> {
    self.tx.send(event.clone()).await.map_err(|_| ChannelClosed)
  }
}

// ─── Publisher ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum DrainError<E: std::error::Error> {
  #[error("store error: {0}")]
  Store(E),
  #[error(transparent)]
  Channel(ChannelClosed),
}

/// Background worker draining the outbox into an [`EventChannel`].
pub struct Publisher<S, C> {
  store:          Arc<S>,
  channel:        C,
  notify:         Arc<Notify>,
  sweep_interval: Duration,
}

impl<S, C> Publisher<S, C>
where
  S: ContentStore,
  C: EventChannel,
{
  pub fn new(
    store: Arc<S>,
    channel: C,
    notify: Arc<Notify>,
    sweep_interval: Duration,
  ) -> Self {
    Self { store, channel, notify, sweep_interval }
  }

  /// Run forever. Store errors are retried on the next wake; a closed
  /// channel ends the worker (the process is shutting down).
  pub async fn run(self) {
    let mut tick = tokio::time::interval(self.sweep_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        _ = self.notify.notified() => {}
        _ = tick.tick() => {}
      }

      match self.drain().await {
        Ok(()) => {}
        Err(DrainError::Channel(_)) => {
          tracing::info!("event channel closed; publisher stopping");
          return;
        }
        Err(DrainError::Store(e)) => {
          tracing::warn!(error = %e, "outbox drain failed; retrying on next wake");
        }
      }
    }
  }

  /// Publish every pending outbox record, oldest first, marking each
  /// published only after the channel accepts it.
  async fn drain(&self) -> Result<(), DrainError<S::Error>> {
    loop {
      let batch = self
        .store
        .unpublished_outbox(DRAIN_BATCH)
        .await
        .map_err(DrainError::Store)?;
      if batch.is_empty() {
        return Ok(());
      }

      for record in batch {
        self
          .channel
          .publish(&record.event)
          .await
          .map_err(DrainError::Channel)?;
        self
          .store
          .mark_published(record.outbox_id)
          .await
          .map_err(DrainError::Store)?;
        tracing::debug!(
          content_id = %record.event.content_id,
          version = record.event.version,
          "change event published"
        );
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use mosaic_core::item::{ContentType, NewContentItem};
  use mosaic_store_sqlite::SqliteStore;

  fn article(id: &str, title: &str) -> NewContentItem {
    NewContentItem {
      id:              id.to_string(),
      content_type:    ContentType::Article,
      title:           title.to_string(),
      description:     String::new(),
      image:           None,
      price:           None,
      inventory:       None,
      metadata:        serde_json::Map::new(),
      source_provider: "cms".to_string(),
    }
  }

  async fn store_with_items(n: usize) -> Arc<SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    for i in 0..n {
      store
        .upsert(article(&format!("a{i}"), "Title"), None)
        .await
        .unwrap();
    }
    store
  }

  #[tokio::test]
  async fn drain_publishes_pending_in_version_order_and_marks_them() {
    let store = store_with_items(3).await;
    let (tx, mut rx) = mpsc::channel(8);
    let publisher = Publisher::new(
      store.clone(),
      MpscChannel::new(tx),
      Arc::new(Notify::new()),
      Duration::from_secs(60),
    );

    publisher.drain().await.unwrap();

    let mut versions = Vec::new();
    while let Ok(ev) = rx.try_recv() {
      versions.push(ev.version);
    }
    assert_eq!(versions, vec![1, 2, 3]);
    assert!(store.unpublished_outbox(10).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn drain_with_empty_outbox_is_a_no_op() {
    let store = store_with_items(0).await;
    let (tx, mut rx) = mpsc::channel(8);
    let publisher = Publisher::new(
      store,
      MpscChannel::new(tx),
      Arc::new(Notify::new()),
      Duration::from_secs(60),
    );

    publisher.drain().await.unwrap();
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn closed_channel_leaves_records_unpublished_for_redelivery() {
    let store = store_with_items(2).await;
    let (tx, rx) = mpsc::channel(8);
    drop(rx);
    let publisher = Publisher::new(
      store.clone(),
      MpscChannel::new(tx),
      Arc::new(Notify::new()),
      Duration::from_secs(60),
    );

    assert!(publisher.drain().await.is_err());
    // Nothing was marked published without channel confirmation.
    assert_eq!(store.unpublished_outbox(10).await.unwrap().len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn notify_wakes_the_worker_without_waiting_for_the_sweep() {
    let store = store_with_items(0).await;
    let (tx, mut rx) = mpsc::channel(8);
    let notify = Arc::new(Notify::new());
    let publisher = Publisher::new(
      store.clone(),
      MpscChannel::new(tx),
      notify.clone(),
      Duration::from_secs(3600),
    );
    tokio::spawn(publisher.run());
    tokio::task::yield_now().await;

    store.upsert(article("a1", "Title"), None).await.unwrap();
    notify.notify_one();

    let ev = rx.recv().await.unwrap();
    assert_eq!(ev.content_id, "a1");
  }

  #[tokio::test(start_paused = true)]
  async fn sweep_tick_republishes_records_missed_by_notify() {
    let store = store_with_items(1).await;
    let (tx, mut rx) = mpsc::channel(8);
    // No notify is ever sent; only the sweeper can find the record.
    let publisher = Publisher::new(
      store.clone(),
      MpscChannel::new(tx),
      Arc::new(Notify::new()),
      Duration::from_secs(30),
    );
    tokio::spawn(publisher.run());

    let ev = rx.recv().await.unwrap();
    assert_eq!(ev.version, 1);
    // The mark-published write races this assertion; poll until it lands.
    for _ in 0..100 {
      if store.unpublished_outbox(10).await.unwrap().is_empty() {
        break;
      }
      tokio::task::yield_now().await;
    }
    assert!(store.unpublished_outbox(10).await.unwrap().is_empty());
  }
}
