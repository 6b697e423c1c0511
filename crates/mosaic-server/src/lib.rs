//! HTTP surface and background workers for Mosaic.
//!
//! Exposes an axum [`Router`] with the webhook ingress and the content
//! query API, plus the outbox [`publisher`] and build-trigger [`coalescer`]
//! workers, all backed by any [`ContentStore`].

pub mod coalescer;
pub mod error;
pub mod ingest;
pub mod publisher;
pub mod query;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use mosaic_core::store::ContentStore;
use mosaic_providers::AdapterRegistry;
use serde::Deserialize;
use tokio::sync::Notify;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `MOSAIC_*` environment overrides.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  /// The site this process integrates content for; carried on every build
  /// trigger.
  pub site_id:           String,
  pub store_path:        PathBuf,
  pub commerce_secret:   String,
  pub cms_secret:        String,
  pub build_trigger_url: String,
  /// Debounce window for the build-trigger coalescer.
  #[serde(default = "default_debounce_secs")]
  pub debounce_secs:     u64,
  /// Grace period after which the sweeper republishes unconfirmed outbox
  /// records.
  #[serde(default = "default_sweep_secs")]
  pub outbox_sweep_secs: u64,
  #[serde(default = "default_write_timeout_ms")]
  pub cache_write_timeout_ms: u64,
  #[serde(default = "default_trigger_attempts")]
  pub trigger_max_attempts: u32,
}

fn default_debounce_secs() -> u64 { 30 }
fn default_sweep_secs() -> u64 { 60 }
fn default_write_timeout_ms() -> u64 { 5_000 }
fn default_trigger_attempts() -> u32 { 5 }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: ContentStore> {
  pub store:          Arc<S>,
  pub registry:       Arc<AdapterRegistry>,
  /// Wakes the outbox publisher after a committed write.
  pub publish_notify: Arc<Notify>,
  pub config:         Arc<ServerConfig>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the integration layer.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ContentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/webhooks/{provider}", post(ingest::handler::<S>))
    .route("/content", get(query::handler::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
