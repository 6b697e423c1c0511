//! Error type for `mosaic-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] mosaic_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Optimistic-concurrency check failed: a concurrent writer already
  /// advanced the key past the version the caller observed. The caller
  /// must re-read and retry.
  #[error("version conflict on {id:?}: expected {expected}, found {actual}")]
  Conflict {
    id:       String,
    expected: i64,
    actual:   i64,
  },

  #[error("outbox record not found: {0}")]
  OutboxNotFound(Uuid),
}

impl Error {
  pub fn is_conflict(&self) -> bool {
    matches!(self, Self::Conflict { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
