//! HTTP error type and [`axum::response::IntoResponse`] implementation.
//!
//! Adapter and normalizer failures are resolved here, at the request
//! boundary, and never silently swallowed: signature failures map to 401
//! with no processing side effects; malformed or incomplete payloads map to
//! 400. Internal failures map to 500 so the provider's own webhook retry
//! covers them.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown provider: {0:?}")]
  UnknownProvider(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The cache write did not complete within its deadline. It may or may
  /// not have committed; the provider retries and the idempotent upsert
  /// absorbs the duplicate.
  #[error("cache write timed out")]
  Timeout,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Map an adapter/normalizer failure to its request-boundary meaning.
  pub fn from_provider(e: mosaic_providers::Error) -> Self {
    if e.is_authentication() {
      Self::Unauthorized
    } else {
      Self::BadRequest(e.to_string())
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      Error::UnknownProvider(p) => {
        (StatusCode::NOT_FOUND, format!("unknown provider: {p}"))
      }
      Error::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
      }
      Error::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      Error::Timeout => {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
      }
      Error::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
