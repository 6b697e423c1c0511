//! The `ContentStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `mosaic-store-sqlite`).
//! Higher layers (webhook ingress, query API, background workers) depend on
//! this abstraction, not on any concrete backend. It is the single source of
//! truth: no component other than the store mutates an item's version.

use std::future::Future;

use uuid::Uuid;

use crate::{
  item::{ContentType, NewContentItem, UnifiedContentItem},
  outbox::OutboxRecord,
};

// ─── UpsertOutcome ───────────────────────────────────────────────────────────

/// Result of a successful [`ContentStore::upsert`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
  /// A new version was committed; an outbox record was written with it.
  Written(UnifiedContentItem),
  /// The input was identical-in-effect to the stored record. No version was
  /// consumed and no outbox record was written.
  Unchanged(UnifiedContentItem),
}

impl UpsertOutcome {
  pub fn item(&self) -> &UnifiedContentItem {
    match self {
      Self::Written(item) | Self::Unchanged(item) => item,
    }
  }

  pub fn into_item(self) -> UnifiedContentItem {
    match self {
      Self::Written(item) | Self::Unchanged(item) => item,
    }
  }

  pub fn is_written(&self) -> bool {
    matches!(self, Self::Written(_))
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Mosaic content cache backend.
///
/// Writes are full replacements keyed on `(id, content_type)`; the store
/// assigns `version` and `updated_at`. The cache upsert and the outbox
/// insert must commit atomically — no error path may leave them
/// inconsistent.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ContentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Replace (or create) the record for `input`'s key, assigning the next
  /// version, and write the matching outbox record in the same transaction.
  ///
  /// With `expected_version: Some(v)`, the write fails with the backend's
  /// conflict error if a concurrent writer already advanced the key past
  /// `v` (`0` means "expected absent"). The webhook-driven path passes
  /// `None`: blind last-write-wins, since each provider delivers its own
  /// events for a key in order.
  ///
  /// An input identical-in-effect to the stored record short-circuits to
  /// [`UpsertOutcome::Unchanged`] — duplicate deliveries consume no version
  /// number and emit no change event.
  fn upsert(
    &self,
    input: NewContentItem,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<UpsertOutcome, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve the record for a key. Returns `None` if never written.
  fn get<'a>(
    &'a self,
    id: &'a str,
    content_type: ContentType,
  ) -> impl Future<Output = Result<Option<UnifiedContentItem>, Self::Error>>
  + Send
  + 'a;

  /// All items with `version > version`, ordered by version ascending.
  /// Finite and restartable: re-running with the same watermark yields the
  /// same (or a superset of the) result. Tombstones are included; callers
  /// filter them explicitly.
  fn list_since(
    &self,
    version: i64,
  ) -> impl Future<Output = Result<Vec<UnifiedContentItem>, Self::Error>>
  + Send
  + '_;

  /// Full snapshot, ordered by version ascending. Used for the first build
  /// of a new site.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<UnifiedContentItem>, Self::Error>>
  + Send
  + '_;

  /// The highest version any committed write has been assigned; `0` for an
  /// empty store.
  fn latest_version(
    &self,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  // ── Outbox ────────────────────────────────────────────────────────────

  /// Unpublished outbox records, oldest first, at most `limit`.
  fn unpublished_outbox(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<OutboxRecord>, Self::Error>> + Send + '_;

  /// Mark an outbox record published after the delivery channel confirmed
  /// receipt.
  fn mark_published(
    &self,
    outbox_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
