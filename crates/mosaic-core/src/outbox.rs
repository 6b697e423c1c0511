//! The outbox record — the durability bridge between cache writes and event
//! publication.
//!
//! An `OutboxRecord` is inserted in the same transaction as the cache upsert
//! it describes, and marked published only after the delivery channel
//! confirms receipt. A background sweeper republishes any record left
//! unpublished past a grace period, covering a crash between commit and
//! publish-confirm. Net effect: at-least-once publication without
//! distributed transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::ChangeEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
  pub outbox_id:  Uuid,
  pub event:      ChangeEvent,
  pub published:  bool,
  pub created_at: DateTime<Utc>,
}
