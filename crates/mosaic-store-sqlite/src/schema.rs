//! SQL schema for the Mosaic SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One live record per (content_id, content_type) key. Writes are full
-- replacements; provider deletes tombstone via metadata, never DELETE.
CREATE TABLE IF NOT EXISTS content_items (
    content_id      TEXT NOT NULL,
    content_type    TEXT NOT NULL,   -- 'product' | 'article' | 'page'
    title           TEXT NOT NULL,
    description     TEXT NOT NULL,
    image           TEXT,
    price           REAL,            -- NULL for non-product types
    inventory       INTEGER,         -- NULL for non-product types
    metadata        TEXT NOT NULL,   -- JSON object; includes raw payload
    source_provider TEXT NOT NULL,
    version         INTEGER NOT NULL,
    updated_at      TEXT NOT NULL,   -- ISO 8601 UTC; store-assigned
    PRIMARY KEY (content_id, content_type)
);

-- Versions are drawn from the meta sequence, one per committed write, so
-- they are unique across all items and order incremental reads.
CREATE UNIQUE INDEX IF NOT EXISTS content_items_version_idx
    ON content_items(version);

-- Outbox: one row per committed write, inserted in the same transaction.
-- Marked published only after the delivery channel confirms receipt.
CREATE TABLE IF NOT EXISTS outbox (
    outbox_id       TEXT PRIMARY KEY,
    event_id        TEXT NOT NULL,
    content_id      TEXT NOT NULL,
    content_type    TEXT NOT NULL,
    version         INTEGER NOT NULL,
    source_provider TEXT NOT NULL,
    occurred_at     TEXT NOT NULL,
    published       INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS outbox_unpublished_idx
    ON outbox(published, created_at);

-- Single-row global version sequence. Bumped inside each write transaction,
-- so a failed write never consumes a version number.
CREATE TABLE IF NOT EXISTS meta (
    id           INTEGER PRIMARY KEY CHECK (id = 1),
    next_version INTEGER NOT NULL
);
INSERT OR IGNORE INTO meta (id, next_version) VALUES (1, 1);

PRAGMA user_version = 1;
";
