//! Content query API: `GET /content?since=<version>`.
//!
//! The only interface the external build process depends on. It reads the
//! cache directly and never touches provider adapters, so the build side
//! stays decoupled from every provider's wire format.

use axum::{
  Json,
  extract::{Query, State},
};
use mosaic_core::{item::UnifiedContentItem, store::ContentStore};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::Error};

#[derive(Debug, Deserialize)]
pub struct ContentParams {
  /// Return only items written after this version. Omit for the full
  /// snapshot.
  pub since: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
  /// Ordered by version ascending. Includes tombstones; callers filter.
  pub items:          Vec<UnifiedContentItem>,
  /// Watermark for the next incremental query.
  pub latest_version: i64,
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ContentParams>,
) -> Result<Json<ContentResponse>, Error>
where
  S: ContentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let items = match params.since {
    Some(version) => state.store.list_since(version).await,
    None => state.store.list_all().await,
  }
  .map_err(|e| Error::Store(Box::new(e)))?;

  let latest_version = state
    .store
    .latest_version()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  Ok(Json(ContentResponse { items, latest_version }))
}
