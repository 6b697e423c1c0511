//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. `metadata` is stored as
//! compact JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use mosaic_core::{
  event::ChangeEvent,
  item::{ContentType, UnifiedContentItem},
  outbox::OutboxRecord,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ContentType ─────────────────────────────────────────────────────────────

pub fn encode_content_type(ct: ContentType) -> &'static str { ct.as_str() }

pub fn decode_content_type(s: &str) -> Result<ContentType> {
  Ok(ContentType::parse(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `content_items` row.
pub struct RawItem {
  pub content_id:      String,
  pub content_type:    String,
  pub title:           String,
  pub description:     String,
  pub image:           Option<String>,
  pub price:           Option<f64>,
  pub inventory:       Option<i64>,
  pub metadata:        String,
  pub source_provider: String,
  pub version:         i64,
  pub updated_at:      String,
}

impl RawItem {
  pub fn into_item(self) -> Result<UnifiedContentItem> {
    Ok(UnifiedContentItem {
      id:              self.content_id,
      content_type:    decode_content_type(&self.content_type)?,
      title:           self.title,
      description:     self.description,
      image:           self.image,
      price:           self.price,
      inventory:       self.inventory,
      metadata:        serde_json::from_str(&self.metadata)?,
      source_provider: self.source_provider,
      version:         self.version,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `outbox` row.
pub struct RawOutbox {
  pub outbox_id:       String,
  pub event_id:        String,
  pub content_id:      String,
  pub content_type:    String,
  pub version:         i64,
  pub source_provider: String,
  pub occurred_at:     String,
  pub published:       bool,
  pub created_at:      String,
}

impl RawOutbox {
  pub fn into_record(self) -> Result<OutboxRecord> {
    Ok(OutboxRecord {
      outbox_id:  decode_uuid(&self.outbox_id)?,
      event:      ChangeEvent {
        event_id:        decode_uuid(&self.event_id)?,
        content_id:      self.content_id,
        content_type:    decode_content_type(&self.content_type)?,
        version:         self.version,
        source_provider: self.source_provider,
        occurred_at:     decode_dt(&self.occurred_at)?,
      },
      published:  self.published,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
