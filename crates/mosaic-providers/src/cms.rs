//! Adapter for the CMS provider's webhooks.
//!
//! Wire format: the signature header carries hex(SHA-256(secret ‖ body)),
//! the topic header names the entry event (`entry.create` etc.), and the
//! body is an entry JSON document declaring its own `content_type`
//! (`article` or `page`).

use std::collections::HashMap;

use mosaic_core::{
  event::{EventKind, ProviderEvent},
  item::ContentType,
};
use serde_json::Value;

use crate::{
  Error, ProviderAdapter, Result,
  signature::{constant_time_eq, digest},
};

pub const PROVIDER_ID: &str = "cms";
pub const SIGNATURE_HEADER: &str = "x-cms-signature";
pub const TOPIC_HEADER: &str = "x-cms-topic";

pub struct CmsAdapter {
  secret: String,
}

impl CmsAdapter {
  pub fn new(secret: impl Into<String>) -> Self {
    Self { secret: secret.into() }
  }

  fn verify(&self, body: &[u8], headers: &HashMap<String, String>) -> Result<()> {
    let presented = headers
      .get(SIGNATURE_HEADER)
      .ok_or(Error::MissingSignature(SIGNATURE_HEADER))?;
    let expected = hex::encode(digest(self.secret.as_bytes(), body));
    if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
      return Err(Error::InvalidSignature);
    }
    Ok(())
  }
}

impl ProviderAdapter for CmsAdapter {
  fn provider_id(&self) -> &'static str {
    PROVIDER_ID
  }

  fn decode(
    &self,
    body: &[u8],
    headers: &HashMap<String, String>,
  ) -> Result<ProviderEvent> {
    self.verify(body, headers)?;

    let topic = headers
      .get(TOPIC_HEADER)
      .ok_or_else(|| Error::Malformed(format!("missing {TOPIC_HEADER} header")))?;
    let kind = match topic.as_str() {
      "entry.create" => EventKind::Created,
      "entry.update" => EventKind::Updated,
      "entry.delete" => EventKind::Deleted,
      other => return Err(Error::UnknownTopic(other.to_string())),
    };

    let payload: Value = serde_json::from_slice(body)?;
    let content_id = match payload.get("id") {
      Some(Value::String(s)) if !s.is_empty() => s.clone(),
      _ => return Err(Error::Malformed("payload has no usable id".to_string())),
    };

    // The CMS only produces editorial content; a product here would mean a
    // misrouted webhook.
    let content_type = match payload.get("content_type").and_then(Value::as_str) {
      Some("article") => ContentType::Article,
      Some("page") => ContentType::Page,
      Some(other) => {
        return Err(Error::Malformed(format!(
          "unsupported cms content_type: {other:?}"
        )));
      }
      None => {
        return Err(Error::Malformed("payload has no content_type".to_string()));
      }
    };

    Ok(ProviderEvent {
      source_provider: PROVIDER_ID.to_string(),
      kind,
      content_type,
      content_id,
      payload,
    })
  }
}
