//! Adapter for the commerce provider's webhooks.
//!
//! Wire format: the signature header carries base64(SHA-256(secret ‖ body)),
//! the topic header names the product event (`products/create` etc.), and
//! the body is a product JSON document. Product ids may arrive as strings or
//! numbers; prices may arrive as numbers or decimal strings.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use mosaic_core::{
  event::{EventKind, ProviderEvent},
  item::ContentType,
};
use serde_json::Value;

use crate::{
  Error, ProviderAdapter, Result,
  signature::{constant_time_eq, digest},
};

pub const PROVIDER_ID: &str = "commerce";
pub const SIGNATURE_HEADER: &str = "x-commerce-signature";
pub const TOPIC_HEADER: &str = "x-commerce-topic";

pub struct CommerceAdapter {
  secret: String,
}

impl CommerceAdapter {
  pub fn new(secret: impl Into<String>) -> Self {
    Self { secret: secret.into() }
  }

  fn verify(&self, body: &[u8], headers: &HashMap<String, String>) -> Result<()> {
    let presented = headers
      .get(SIGNATURE_HEADER)
      .ok_or(Error::MissingSignature(SIGNATURE_HEADER))?;
    let expected = B64.encode(digest(self.secret.as_bytes(), body));
    if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
      return Err(Error::InvalidSignature);
    }
    Ok(())
  }
}

impl ProviderAdapter for CommerceAdapter {
  fn provider_id(&self) -> &'static str {
    PROVIDER_ID
  }

  fn decode(
    &self,
    body: &[u8],
    headers: &HashMap<String, String>,
  ) -> Result<ProviderEvent> {
    // Authenticate before touching the payload.
    self.verify(body, headers)?;

    let topic = headers
      .get(TOPIC_HEADER)
      .ok_or_else(|| Error::Malformed(format!("missing {TOPIC_HEADER} header")))?;
    let kind = match topic.as_str() {
      "products/create" => EventKind::Created,
      "products/update" => EventKind::Updated,
      "products/delete" => EventKind::Deleted,
      other => return Err(Error::UnknownTopic(other.to_string())),
    };

    let payload: Value = serde_json::from_slice(body)?;
    let content_id = match payload.get("id") {
      Some(Value::String(s)) if !s.is_empty() => s.clone(),
      Some(Value::Number(n)) => n.to_string(),
      _ => return Err(Error::Malformed("payload has no usable id".to_string())),
    };

    Ok(ProviderEvent {
      source_provider: PROVIDER_ID.to_string(),
      kind,
      content_type: ContentType::Product,
      content_id,
      payload,
    })
  }
}
