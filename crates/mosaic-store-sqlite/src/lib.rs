//! SQLite backend for the Mosaic content cache.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. The cache upsert and its outbox
//! record are written in one transaction; the global version sequence is
//! bumped inside that same transaction, so a rolled-back write consumes no
//! version number.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
