//! `dead-drop-server`: an authenticated, destructive-read object store.
//!
//! Brings the three components together: loads config, builds the
//! object store and authenticator, reindexes the data directory,
//! starts the background tasks, and serves the HTTP(S) API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use tracing::info;

use dead_drop_server::auth::Authenticator;
use dead_drop_server::config::ServerConfig;
use dead_drop_server::dispatch::{build_router, AppState};
use dead_drop_server::store::ObjectStore;

#[derive(Parser, Debug)]
#[command(name = "dead-drop-server", about = "Authenticated destructive-read object store")]
struct Cli {
    /// Path to a config file overlaying the built-in defaults.
    #[arg(long)]
    config: Option<String>,
}

fn parse_addr(addr: &str) -> Result<SocketAddr, dead_drop_common::DeadDropError> {
    let normalized = if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        addr.to_string()
    };
    normalized
        .parse()
        .map_err(|e| dead_drop_common::DeadDropError::internal(format!("invalid addr {addr}: {e}")))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let cli = Cli::parse();
    let cfg = ServerConfig::load(cli.config.as_deref())?;

    info!(addr = %cfg.addr, data_dir = %cfg.data_dir, "starting dead-drop-server");

    let store = Arc::new(ObjectStore::new(cfg.data_dir_path(), cfg.ttl_min, cfg.destructive_read));
    store.startup_reindex()?;
    store.start_background_tasks();

    let auth = Arc::new(Authenticator::new(cfg.keys_dir_path())?);
    auth.start_background_tasks();

    let state = AppState { store, auth };
    let app = build_router(state);

    let socket_addr = parse_addr(&cfg.addr)?;
    let tls_config = RustlsConfig::from_pem_file(&cfg.tls_cert, &cfg.tls_key).await?;

    info!(addr = %socket_addr, "listening");
    axum_server::bind_rustls(socket_addr, tls_config)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
