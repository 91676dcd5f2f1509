//! Uploadbook server binary.
//!
//! Accepts file uploads with a few descriptive fields, keeps one metadata
//! record per upload in a JSON file, and serves the stored files back. The
//! main entry point wires configuration, the record store and the upload
//! directory into the Axum router and serves it until shutdown.

mod atomic;
mod auth;
mod config;
mod error;
mod files;
mod http;
mod logging;
mod multipart;
mod records;
mod router;
mod storage;
mod store;
mod upload;

use axum_server::Handle;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthConfig, TokenSigner};
use crate::config::Args;
use crate::router::{AppState, build_router};
use crate::storage::Storage;
use crate::store::{Catalog, JsonFileStore};

/// Starts the server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let storage = Arc::new(Storage::new(PathBuf::from(&args.upload_dir)));
    storage.ensure_root().await?;
    let store = JsonFileStore::new(PathBuf::from(&args.data_file));
    store.ensure_file().await?;
    info!(data_file = ?store.path(), upload_dir = ?storage.root_path(), "storage ready");
    let catalog = Arc::new(Catalog::new(Arc::new(store)));

    let secret = match args.auth_secret.clone() {
        Some(secret) => secret,
        None => {
            if args.require_auth {
                warn!("no auth secret configured, tokens will not survive a restart");
            }
            Uuid::new_v4().to_string()
        }
    };
    let auth_config = Arc::new(AuthConfig {
        required: args.require_auth,
        username: args.auth_user.clone(),
        password: args.auth_pass.clone(),
        signer: TokenSigner::new(secret),
        token_ttl: Duration::from_secs(args.token_ttl_secs),
    });

    let app = build_router(AppState {
        storage,
        catalog,
        auth: auth_config,
        max_body_size: args.max_body_size,
    });

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let handle = Handle::new();

    info!(
        require_auth = args.require_auth,
        "🚀 Starting HTTP server at {}",
        addr
    );

    let server = axum_server::bind(addr)
        .handle(handle.clone())
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::select! {
        result = server => result?,
        _ = shutdown_signal(handle) => {}
    }

    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
