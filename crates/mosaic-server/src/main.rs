//! mosaic-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite content cache, starts the outbox publisher and build-trigger
//! coalescer workers, and serves the webhook ingress and content query API
//! over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use mosaic_providers::{AdapterRegistry, cms::CmsAdapter, commerce::CommerceAdapter};
use mosaic_server::{
  AppState, ServerConfig,
  coalescer::{Coalescer, HttpBuildTrigger},
  publisher::{MpscChannel, Publisher},
};
use mosaic_store_sqlite::SqliteStore;
use tokio::{
  net::TcpListener,
  sync::{Notify, mpsc},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Change events buffered between the publisher and the coalescer.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(author, version, about = "Mosaic content integration server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("MOSAIC"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open the content cache.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  // One adapter per content source; the registry is fixed at startup.
  let mut registry = AdapterRegistry::new();
  registry.register(Arc::new(CommerceAdapter::new(
    server_cfg.commerce_secret.clone(),
  )));
  registry.register(Arc::new(CmsAdapter::new(server_cfg.cms_secret.clone())));

  // Outbox → channel → coalescer → external build system.
  let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
  let publish_notify = Arc::new(Notify::new());

  let publisher = Publisher::new(
    store.clone(),
    MpscChannel::new(tx),
    publish_notify.clone(),
    Duration::from_secs(server_cfg.outbox_sweep_secs),
  );
  tokio::spawn(publisher.run());

  let trigger = HttpBuildTrigger::new(server_cfg.build_trigger_url.clone())
    .context("failed to build HTTP client for build trigger")?;
  let coalescer = Coalescer::new(
    rx,
    trigger,
    server_cfg.site_id.clone(),
    Duration::from_secs(server_cfg.debounce_secs),
    server_cfg.trigger_max_attempts,
  );
  tokio::spawn(coalescer.run());

  // Build application state.
  let state = AppState {
    store,
    registry: Arc::new(registry),
    publish_notify,
    config: Arc::new(server_cfg.clone()),
  };

  let app = mosaic_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
