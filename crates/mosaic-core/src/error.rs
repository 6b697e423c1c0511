//! Error types for `mosaic-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown content type discriminant: {0:?}")]
  UnknownContentType(String),

  #[error("unknown event kind: {0:?}")]
  UnknownEventKind(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
