//! Provider adapters for Mosaic.
//!
//! An adapter is a pure protocol translator for one content source: it
//! authenticates an inbound webhook against the provider's signature scheme
//! and extracts a provider-neutral [`ProviderEvent`], with no business
//! normalization. Adding a content source means adding one adapter here;
//! the cache, publisher, and coalescer never change.
//!
//! The [`normalize`] module turns a decoded event into the unified record
//! the cache stores.

pub mod cms;
pub mod commerce;
pub mod error;
pub mod normalize;
pub mod signature;

pub use error::{Error, Result};

use std::{collections::HashMap, sync::Arc};

use mosaic_core::event::ProviderEvent;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// One webhook decoder per content source type.
///
/// `decode` must verify payload authenticity before doing anything else; an
/// authentication failure means the caller rejects the request with no side
/// effects. Header names are lowercase.
pub trait ProviderAdapter: Send + Sync {
  /// The identifier webhooks address this adapter by (URL path segment) and
  /// the `source_provider` tag on everything it decodes.
  fn provider_id(&self) -> &'static str;

  fn decode(
    &self,
    body: &[u8],
    headers: &HashMap<String, String>,
  ) -> Result<ProviderEvent>;
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Adapter lookup keyed on provider identifier, built once at startup.
#[derive(Default)]
pub struct AdapterRegistry {
  adapters: HashMap<&'static str, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
    self.adapters.insert(adapter.provider_id(), adapter);
  }

  pub fn get(&self, provider_id: &str) -> Option<Arc<dyn ProviderAdapter>> {
    self.adapters.get(provider_id).cloned()
  }

  pub fn provider_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.adapters.keys().copied()
  }
}
