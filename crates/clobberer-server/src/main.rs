//! Clobberer Server
//!
//! HTTP service that records clobber requests and tells build slaves when
//! their build directories were last clobbered.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use clobberer_core::config::{self, Config};
use clobberer_core::tracing_init::{default_filter, init_tracing};
use clobberer_server::engine::ClobberEngine;
use clobberer_server::http::{build_router, AppState};
use clobberer_server::storage::ClobberDatabase;

#[derive(Parser, Debug)]
#[command(name = "clobberer-server")]
#[command(version, about = "Clobberer server - build directory clobber tracking")]
struct Args {
    /// Path to a JSON settings file.
    #[arg(long, env = "CLOBBERER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Path prefix the API is mounted under.
    #[arg(long)]
    mount_prefix: Option<String>,

    /// Trusted header carrying the authenticated requester.
    #[arg(long)]
    identity_header: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply(self, config: &mut Config) {
        let server = &mut config.server;
        if let Some(addr) = self.addr {
            server.listen_addr = addr;
        }
        if let Some(path) = self.db_path {
            server.database_path = Some(path);
        }
        if let Some(prefix) = self.mount_prefix {
            server.mount_prefix = prefix;
        }
        if let Some(header) = self.identity_header {
            server.identity_header = header;
        }
        server.log_json |= self.log_json;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = config::load_config(args.config.as_deref())?;
    args.apply(&mut config);
    let server = config.server;

    init_tracing(
        &default_filter("clobberer_server", &server.log_level),
        server.log_json,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %server.listen_addr,
        "Starting clobberer-server"
    );

    let db_path = match server.database_path.clone() {
        Some(path) => path,
        None => config::database_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine default database path"))?,
    };
    info!(path = %db_path.display(), "Opening clobberer database");
    let db = ClobberDatabase::open_with(&db_path, server.pool_settings()).await?;

    let state = AppState::new(ClobberEngine::new(db), &server.identity_header)?;
    let app = build_router(state, &server.mount_prefix);

    let listener = tokio::net::TcpListener::bind(server.listen_addr).await?;
    info!(addr = %server.listen_addr, prefix = %server.mount_prefix, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
            }
        })
        .await?;

    info!("Clobberer stopped");
    Ok(())
}
