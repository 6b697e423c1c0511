//! [`SqliteStore`] — the SQLite implementation of [`ContentStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use mosaic_core::{
  item::{ContentType, NewContentItem, UnifiedContentItem},
  outbox::OutboxRecord,
  store::{ContentStore, UpsertOutcome},
};

use crate::{
  Error, Result,
  encode::{RawItem, RawOutbox, encode_content_type, encode_dt, encode_uuid},
  schema::SCHEMA,
};

const ITEM_COLUMNS: &str = "content_id, content_type, title, description, \
                            image, price, inventory, metadata, \
                            source_provider, version, updated_at";

fn item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawItem> {
  Ok(RawItem {
    content_id:      row.get(0)?,
    content_type:    row.get(1)?,
    title:           row.get(2)?,
    description:     row.get(3)?,
    image:           row.get(4)?,
    price:           row.get(5)?,
    inventory:       row.get(6)?,
    metadata:        row.get(7)?,
    source_provider: row.get(8)?,
    version:         row.get(9)?,
    updated_at:      row.get(10)?,
  })
}

/// Outcome of the upsert transaction, before decoding back to domain types.
enum RawUpsert {
  Written(i64),
  Unchanged(Box<RawItem>),
  Conflict { expected: i64, actual: i64 },
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Mosaic content cache backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_items(&self, since: Option<i64>) -> Result<Vec<UnifiedContentItem>> {
    let raws: Vec<RawItem> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {ITEM_COLUMNS} FROM content_items
           WHERE version > ?1
           ORDER BY version ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![since.unwrap_or(0)], item_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }
}

// ─── ContentStore impl ───────────────────────────────────────────────────────

impl ContentStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert(
    &self,
    input: NewContentItem,
    expected_version: Option<i64>,
  ) -> Result<UpsertOutcome> {
    let now = Utc::now();

    // Encode once, outside the connection thread.
    let content_id      = input.id.clone();
    let content_type    = encode_content_type(input.content_type).to_owned();
    let title           = input.title.clone();
    let description     = input.description.clone();
    let image           = input.image.clone();
    let price           = input.price;
    let inventory       = input.inventory;
    let metadata_str    = serde_json::to_string(&input.metadata)?;
    let source_provider = input.source_provider.clone();
    let updated_at_str  = encode_dt(now);
    let outbox_id_str   = encode_uuid(Uuid::new_v4());
    let event_id_str    = encode_uuid(Uuid::new_v4());

    let outcome: RawUpsert = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let select = format!(
          "SELECT {ITEM_COLUMNS} FROM content_items
           WHERE content_id = ?1 AND content_type = ?2"
        );
        let existing: Option<RawItem> = tx
          .query_row(
            &select,
            rusqlite::params![content_id, content_type],
            item_from_row,
          )
          .optional()?;

        if let Some(expected) = expected_version {
          // 0 means "expected absent".
          let actual = existing.as_ref().map(|r| r.version).unwrap_or(0);
          if actual != expected {
            return Ok(RawUpsert::Conflict { expected, actual });
          }
        }

        // Duplicate delivery: identical-in-effect input leaves the record,
        // the version sequence, and the outbox untouched.
        if let Some(raw) = existing
          && raw.title == title
          && raw.description == description
          && raw.image == image
          && raw.price == price
          && raw.inventory == inventory
          && raw.metadata == metadata_str
          && raw.source_provider == source_provider
        {
          return Ok(RawUpsert::Unchanged(Box::new(raw)));
        }

        let next: i64 = tx.query_row(
          "SELECT next_version FROM meta WHERE id = 1",
          [],
          |r| r.get(0),
        )?;
        tx.execute(
          "UPDATE meta SET next_version = next_version + 1 WHERE id = 1",
          [],
        )?;

        tx.execute(
          "INSERT OR REPLACE INTO content_items (
             content_id, content_type, title, description, image,
             price, inventory, metadata, source_provider, version, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            content_id,
            content_type,
            title,
            description,
            image,
            price,
            inventory,
            metadata_str,
            source_provider,
            next,
            updated_at_str,
          ],
        )?;

        tx.execute(
          "INSERT INTO outbox (
             outbox_id, event_id, content_id, content_type, version,
             source_provider, occurred_at, published, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
          rusqlite::params![
            outbox_id_str,
            event_id_str,
            content_id,
            content_type,
            next,
            source_provider,
            updated_at_str,
            updated_at_str,
          ],
        )?;

        tx.commit()?;
        Ok(RawUpsert::Written(next))
      })
      .await?;

    match outcome {
      RawUpsert::Written(version) => {
        Ok(UpsertOutcome::Written(input.into_item(version, now)))
      }
      RawUpsert::Unchanged(raw) => {
        Ok(UpsertOutcome::Unchanged(raw.into_item()?))
      }
      RawUpsert::Conflict { expected, actual } => Err(Error::Conflict {
        id: input.id,
        expected,
        actual,
      }),
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get(
    &self,
    id: &str,
    content_type: ContentType,
  ) -> Result<Option<UnifiedContentItem>> {
    let id_str = id.to_owned();
    let ct_str = encode_content_type(content_type).to_owned();

    let raw: Option<RawItem> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {ITEM_COLUMNS} FROM content_items
           WHERE content_id = ?1 AND content_type = ?2"
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str, ct_str], item_from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawItem::into_item).transpose()
  }

  async fn list_since(&self, version: i64) -> Result<Vec<UnifiedContentItem>> {
    self.list_items(Some(version)).await
  }

  async fn list_all(&self) -> Result<Vec<UnifiedContentItem>> {
    self.list_items(None).await
  }

  async fn latest_version(&self) -> Result<i64> {
    let latest: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT next_version - 1 FROM meta WHERE id = 1",
          [],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(latest)
  }

  // ── Outbox ────────────────────────────────────────────────────────────────

  async fn unpublished_outbox(&self, limit: usize) -> Result<Vec<OutboxRecord>> {
    let limit = limit as i64;

    let raws: Vec<RawOutbox> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT outbox_id, event_id, content_id, content_type, version,
                  source_provider, occurred_at, published, created_at
           FROM outbox
           WHERE published = 0
           ORDER BY created_at ASC, version ASC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            Ok(RawOutbox {
              outbox_id:       row.get(0)?,
              event_id:        row.get(1)?,
              content_id:      row.get(2)?,
              content_type:    row.get(3)?,
              version:         row.get(4)?,
              source_provider: row.get(5)?,
              occurred_at:     row.get(6)?,
              published:       row.get(7)?,
              created_at:      row.get(8)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOutbox::into_record).collect()
  }

  async fn mark_published(&self, outbox_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(outbox_id);

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE outbox SET published = 1 WHERE outbox_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::OutboxNotFound(outbox_id));
    }
    Ok(())
  }
}
