//! The content normalizer: [`ProviderEvent`] → [`NewContentItem`].
//!
//! Pure: the same event always produces the same item, so it is testable
//! without the cache or the network (`updated_at` is store-assigned later).
//! Every output carries the untouched payload in `metadata["raw"]`, so a
//! future normalizer upgrade can re-derive structured fields without
//! re-fetching from the provider.

use mosaic_core::{
  event::{EventKind, ProviderEvent},
  item::{ContentType, NewContentItem, RAW_PAYLOAD_KEY, TOMBSTONE_KEY},
};
use serde_json::Value;

use crate::{Error, Result};

/// Map a decoded provider event to the unified schema.
///
/// Delete events produce a full tombstone record rather than an omission —
/// even for keys never seen before — with no required-field checks, since a
/// provider's delete payload may carry nothing but the id. Non-delete
/// product events must supply `price` and `inventory`; editorial events
/// must supply `title`. Missing required fields fail the record; partial
/// data is never passed through.
pub fn normalize(ev: &ProviderEvent) -> Result<NewContentItem> {
  let obj = ev
    .payload
    .as_object()
    .ok_or_else(|| Error::Malformed("payload is not a JSON object".to_string()))?;

  let mut metadata = serde_json::Map::new();
  metadata.insert(RAW_PAYLOAD_KEY.to_string(), ev.payload.clone());

  let title = str_field(obj, "title").unwrap_or_default();
  let description = str_field(obj, "description").unwrap_or_default();
  let image = str_field(obj, "image");

  if ev.kind == EventKind::Deleted {
    metadata.insert(TOMBSTONE_KEY.to_string(), Value::Bool(true));
    return Ok(NewContentItem {
      id: ev.content_id.clone(),
      content_type: ev.content_type,
      title,
      description,
      image,
      price: None,
      inventory: None,
      metadata,
      source_provider: ev.source_provider.clone(),
    });
  }

  let (price, inventory) = match ev.content_type {
    ContentType::Product => {
      let price = price_field(obj).ok_or_else(|| {
        Error::Validation("product event is missing a price".to_string())
      })?;
      let inventory = obj.get("inventory").and_then(Value::as_i64).ok_or_else(|| {
        Error::Validation("product event is missing an inventory count".to_string())
      })?;
      (Some(price), Some(inventory))
    }
    ContentType::Article | ContentType::Page => {
      if title.is_empty() {
        return Err(Error::Validation(
          "editorial event is missing a title".to_string(),
        ));
      }
      (None, None)
    }
  };

  Ok(NewContentItem {
    id: ev.content_id.clone(),
    content_type: ev.content_type,
    title,
    description,
    image,
    price,
    inventory,
    metadata,
    source_provider: ev.source_provider.clone(),
  })
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
  obj
    .get(key)
    .and_then(Value::as_str)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

/// Commerce payloads carry prices as numbers or decimal strings ("19.99").
fn price_field(obj: &serde_json::Map<String, Value>) -> Option<f64> {
  match obj.get("price") {
    Some(Value::Number(n)) => n.as_f64(),
    Some(Value::String(s)) => s.parse().ok(),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn product_event(kind: EventKind, payload: Value) -> ProviderEvent {
    ProviderEvent {
      source_provider: "commerce".to_string(),
      kind,
      content_type: ContentType::Product,
      content_id: "p1".to_string(),
      payload,
    }
  }

  fn article_event(kind: EventKind, payload: Value) -> ProviderEvent {
    ProviderEvent {
      source_provider: "cms".to_string(),
      kind,
      content_type: ContentType::Article,
      content_id: "a1".to_string(),
      payload,
    }
  }

  #[test]
  fn product_update_maps_all_typed_fields() {
    let payload = json!({
      "id": "p1", "title": "Mug", "description": "A mug",
      "image": "https://img.example/p1.png",
      "price": 19.99, "inventory": 5
    });
    let item = normalize(&product_event(EventKind::Updated, payload.clone())).unwrap();

    assert_eq!(item.content_type, ContentType::Product);
    assert_eq!(item.title, "Mug");
    assert_eq!(item.price, Some(19.99));
    assert_eq!(item.inventory, Some(5));
    assert_eq!(item.image.as_deref(), Some("https://img.example/p1.png"));
    assert!(!item.is_tombstone());
    // Lossless: the raw payload survives in metadata.
    assert_eq!(item.metadata[RAW_PAYLOAD_KEY], payload);
  }

  #[test]
  fn string_prices_are_parsed() {
    let payload = json!({"id": "p1", "title": "Mug", "price": "19.99", "inventory": 5});
    let item = normalize(&product_event(EventKind::Updated, payload)).unwrap();
    assert_eq!(item.price, Some(19.99));
  }

  #[test]
  fn product_without_price_fails_validation() {
    let payload = json!({"id": "p1", "title": "Mug", "inventory": 5});
    let err = normalize(&product_event(EventKind::Updated, payload)).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn product_without_inventory_fails_validation() {
    let payload = json!({"id": "p1", "title": "Mug", "price": 1.0});
    let err = normalize(&product_event(EventKind::Updated, payload)).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn article_leaves_commerce_fields_null() {
    let payload = json!({"id": "a1", "title": "Hello", "description": "intro"});
    let item = normalize(&article_event(EventKind::Created, payload)).unwrap();
    assert_eq!(item.price, None);
    assert_eq!(item.inventory, None);
  }

  #[test]
  fn article_without_title_fails_validation() {
    let payload = json!({"id": "a1", "description": "intro"});
    let err = normalize(&article_event(EventKind::Created, payload)).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn delete_produces_a_tombstone_without_field_checks() {
    // A delete payload may carry nothing but the id.
    let payload = json!({"id": "p1"});
    let item = normalize(&product_event(EventKind::Deleted, payload)).unwrap();
    assert!(item.is_tombstone());
    assert_eq!(item.price, None);
    assert_eq!(item.inventory, None);
  }

  #[test]
  fn normalize_is_deterministic() {
    let payload = json!({"id": "a1", "title": "Hello"});
    let ev = article_event(EventKind::Updated, payload);
    assert_eq!(normalize(&ev).unwrap(), normalize(&ev).unwrap());
  }
}
