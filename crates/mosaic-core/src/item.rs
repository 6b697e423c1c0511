//! Content item types — the canonical records every provider is normalized
//! into.
//!
//! A [`UnifiedContentItem`] is a full-replacement record: each successful
//! normalization of a webhook produces a complete new value for its
//! `(id, content_type)` key, never a partial merge. Provider deletes do not
//! remove records; they write a tombstone so consumers can distinguish
//! "removed" from "never existed".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Metadata key set to `true` on records written by a provider delete event.
pub const TOMBSTONE_KEY: &str = "deleted";

/// Metadata key holding the untouched provider payload, kept so a future
/// normalizer upgrade can re-derive structured fields without re-fetching.
pub const RAW_PAYLOAD_KEY: &str = "raw";

// ─── ContentType ─────────────────────────────────────────────────────────────

/// The kind of content a record describes. Part of the unique key together
/// with `id`, since two providers may legitimately use overlapping id spaces
/// for different kinds of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
  Product,
  Article,
  Page,
}

impl ContentType {
  /// The discriminant string stored in the `content_type` column.
  /// Must match the `rename_all = "lowercase"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Product => "product",
      Self::Article => "article",
      Self::Page => "page",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "product" => Ok(Self::Product),
      "article" => Ok(Self::Article),
      "page" => Ok(Self::Page),
      other => Err(Error::UnknownContentType(other.to_string())),
    }
  }
}

// ─── UnifiedContentItem ──────────────────────────────────────────────────────

/// The canonical, provider-agnostic content record as held by the cache.
///
/// `version` and `updated_at` are assigned at cache-write time; provider
/// timestamps are never trusted, since provider clocks differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedContentItem {
  /// Stable across updates; provider-assigned or derived.
  pub id:              String,
  pub content_type:    ContentType,
  pub title:           String,
  pub description:     String,
  pub image:           Option<String>,
  /// Only meaningful for `Product`; `None` for all other content types.
  pub price:           Option<f64>,
  /// Only meaningful for `Product`; `None` for all other content types.
  pub inventory:       Option<i64>,
  /// Open map of provider-specific fields, including the raw payload under
  /// [`RAW_PAYLOAD_KEY`] and the tombstone flag under [`TOMBSTONE_KEY`].
  pub metadata:        serde_json::Map<String, Value>,
  pub source_provider: String,
  /// Store-assigned, drawn from a global strictly-increasing sequence, so
  /// per-key versions also increase strictly and a single watermark totally
  /// orders incremental reads.
  pub version:         i64,
  /// Store-assigned at write time.
  pub updated_at:      DateTime<Utc>,
}

impl UnifiedContentItem {
  /// True if this record was written by a provider delete event.
  pub fn is_tombstone(&self) -> bool {
    self
      .metadata
      .get(TOMBSTONE_KEY)
      .and_then(Value::as_bool)
      .unwrap_or(false)
  }
}

// ─── NewContentItem ──────────────────────────────────────────────────────────

/// Input to [`crate::store::ContentStore::upsert`] — the normalizer's output.
/// `version` and `updated_at` are always set by the store; they are not
/// accepted from callers.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContentItem {
  pub id:              String,
  pub content_type:    ContentType,
  pub title:           String,
  pub description:     String,
  pub image:           Option<String>,
  pub price:           Option<f64>,
  pub inventory:       Option<i64>,
  pub metadata:        serde_json::Map<String, Value>,
  pub source_provider: String,
}

impl NewContentItem {
  /// True if this input carries a tombstone flag.
  pub fn is_tombstone(&self) -> bool {
    self
      .metadata
      .get(TOMBSTONE_KEY)
      .and_then(Value::as_bool)
      .unwrap_or(false)
  }

  /// True if writing this input would leave the stored record unchanged in
  /// every field the store does not assign itself. Used by the cache to skip
  /// the version bump and outbox write for duplicate webhook deliveries.
  pub fn same_effect(&self, existing: &UnifiedContentItem) -> bool {
    self.id == existing.id
      && self.content_type == existing.content_type
      && self.title == existing.title
      && self.description == existing.description
      && self.image == existing.image
      && self.price == existing.price
      && self.inventory == existing.inventory
      && self.metadata == existing.metadata
      && self.source_provider == existing.source_provider
  }

  /// Attach the store-assigned fields, producing the full record.
  pub fn into_item(
    self,
    version: i64,
    updated_at: DateTime<Utc>,
  ) -> UnifiedContentItem {
    UnifiedContentItem {
      id: self.id,
      content_type: self.content_type,
      title: self.title,
      description: self.description,
      image: self.image,
      price: self.price,
      inventory: self.inventory,
      metadata: self.metadata,
      source_provider: self.source_provider,
      version,
      updated_at,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(metadata: serde_json::Map<String, Value>) -> NewContentItem {
    NewContentItem {
      id:              "a1".to_string(),
      content_type:    ContentType::Article,
      title:           "Hello".to_string(),
      description:     String::new(),
      image:           None,
      price:           None,
      inventory:       None,
      metadata,
      source_provider: "cms".to_string(),
    }
  }

  #[test]
  fn content_type_round_trips_through_discriminant() {
    for ct in [ContentType::Product, ContentType::Article, ContentType::Page] {
      assert_eq!(ContentType::parse(ct.as_str()).unwrap(), ct);
    }
    assert!(ContentType::parse("video").is_err());
  }

  #[test]
  fn tombstone_flag_is_read_from_metadata() {
    let mut meta = serde_json::Map::new();
    assert!(!item(meta.clone()).is_tombstone());

    meta.insert(TOMBSTONE_KEY.to_string(), Value::Bool(true));
    assert!(item(meta).is_tombstone());
  }

  #[test]
  fn same_effect_ignores_store_assigned_fields() {
    let new = item(serde_json::Map::new());
    let stored = new.clone().into_item(7, chrono::Utc::now());
    assert!(new.same_effect(&stored));

    let mut changed = new.clone();
    changed.title = "Changed".to_string();
    assert!(!changed.same_effect(&stored));
  }
}
