//! Event types flowing through the pipeline.
//!
//! A [`ProviderEvent`] is the adapter's output: structurally typed but still
//! carrying the raw payload, with no business normalization applied. A
//! [`ChangeEvent`] is emitted once per committed cache write and delivered
//! at-least-once; consumers dedupe on `(content_id, version)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  item::ContentType,
};

// ─── EventKind ───────────────────────────────────────────────────────────────

/// What the originating provider says happened to the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  Created,
  Updated,
  Deleted,
}

impl EventKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Created => "created",
      Self::Updated => "updated",
      Self::Deleted => "deleted",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "created" => Ok(Self::Created),
      "updated" => Ok(Self::Updated),
      "deleted" => Ok(Self::Deleted),
      other => Err(Error::UnknownEventKind(other.to_string())),
    }
  }
}

// ─── ProviderEvent ───────────────────────────────────────────────────────────

/// A decoded, authenticated webhook in provider-neutral form.
///
/// Adapters extract only structure (key, kind, type); the business fields
/// stay untouched in `payload` for the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEvent {
  pub source_provider: String,
  pub kind:            EventKind,
  pub content_type:    ContentType,
  pub content_id:      String,
  pub payload:         serde_json::Value,
}

// ─── ChangeEvent ─────────────────────────────────────────────────────────────

/// Notification that a cache write committed.
///
/// `event_id` is assigned when the outbox record is committed and is stable
/// across redeliveries of the same record. Consumers that need exactly-once
/// semantics dedupe on `(content_id, version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub event_id:        Uuid,
  pub content_id:      String,
  pub content_type:    ContentType,
  pub version:         i64,
  pub source_provider: String,
  pub occurred_at:     DateTime<Utc>,
}
