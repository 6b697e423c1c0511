//! Webhook ingress: `POST /webhooks/{provider}`.
//!
//! The request path selects the adapter; body and headers are handed to it
//! unmodified. Handling is synchronous through the cache commit and nothing
//! else: decode, normalize, upsert (bounded timeout), wake the publisher.
//! Slow downstream work (publish, build trigger) never holds this request
//! open — a `200` means the write and its outbox record are durable.

use std::{collections::HashMap, time::Duration};

use axum::{
  Json,
  extract::{Path, State},
  http::HeaderMap,
  response::IntoResponse,
};
use bytes::Bytes;
use mosaic_core::store::ContentStore;
use mosaic_providers::normalize::normalize;
use serde_json::json;

use crate::{AppState, error::Error};

/// Collapse HTTP headers into the provider-neutral map adapters consume.
/// Header names are already lowercase; non-UTF-8 values are dropped, since
/// no supported signature scheme uses them.
fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
  headers
    .iter()
    .filter_map(|(name, value)| {
      value
        .to_str()
        .ok()
        .map(|v| (name.as_str().to_string(), v.to_string()))
    })
    .collect()
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Path(provider): Path<String>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<impl IntoResponse, Error>
where
  S: ContentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let adapter = state
    .registry
    .get(&provider)
    .ok_or_else(|| Error::UnknownProvider(provider.clone()))?;

  let header_map = flatten_headers(&headers);
  let event = adapter
    .decode(&body, &header_map)
    .map_err(Error::from_provider)?;
  let input = normalize(&event).map_err(Error::from_provider)?;

  let write_timeout = Duration::from_millis(state.config.cache_write_timeout_ms);
  let outcome = tokio::time::timeout(write_timeout, state.store.upsert(input, None))
    .await
    .map_err(|_| Error::Timeout)?
    .map_err(|e| Error::Store(Box::new(e)))?;

  // Only committed writes have something new in the outbox.
  if outcome.is_written() {
    state.publish_notify.notify_one();
  }

  let item = outcome.item();
  tracing::info!(
    provider = %provider,
    content_id = %item.id,
    content_type = item.content_type.as_str(),
    version = item.version,
    "webhook committed"
  );

  Ok(Json(json!({
    "content_id": item.id,
    "content_type": item.content_type,
    "version": item.version,
  })))
}
