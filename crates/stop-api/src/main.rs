//! stop-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus `STOP_*`
//! environment variables, opens the SQLite store, and serves the record API
//! over HTTP.
//!
//! ```
//! cargo run -p stop-api --bin stop-server -- --config config.toml
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use stop_api::ServerConfig;
use stop_core::{authority::ProcessIdentity, schema};
use stop_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "STOP record store server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the table layout exported for replication and exit.
  #[arg(long)]
  print_schema: bool,
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
    .set_default("host", "127.0.0.1")?
    .set_default("port", 5280_i64)?
    .set_default("store_path", schema::DATABASE_NAME)?
    .set_default("package_name", "com.aware.app.stop")?
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("STOP"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let identity = ProcessIdentity::from(server_cfg.package_name.clone());

  // Helper mode: dump the replication schema and exit.
  if cli.print_schema {
    let authority = stop_core::authority::Authority::resolve(&identity);
    let exported = schema::export(&authority);
    println!("{}", serde_json::to_string_pretty(&exported)?);
    return Ok(());
  }

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path, &identity)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let app = stop_api::api_router(Arc::new(store));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(package = %server_cfg.package_name, "Listening on http://{address}");
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
