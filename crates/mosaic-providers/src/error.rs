//! Error type for `mosaic-providers`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing signature header {0:?}")]
  MissingSignature(&'static str),

  #[error("signature verification failed")]
  InvalidSignature,

  #[error("unknown event topic: {0:?}")]
  UnknownTopic(String),

  #[error("malformed payload: {0}")]
  Malformed(String),

  /// The normalizer cannot produce a complete record. The record is
  /// rejected; partial data is never stored.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  /// True for failures the caller must answer with 401 and reject without
  /// further processing.
  pub fn is_authentication(&self) -> bool {
    matches!(self, Self::MissingSignature(_) | Self::InvalidSignature)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
