//! Game API server lifecycle management.
//!
//! Provides [`start_server`] which binds to a TCP port and serves the
//! router until the shutdown channel flips to `true`.

use std::net::SocketAddr;
use std::sync::Arc;

use stronghold_core::config::HttpConfig;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Start the game API server.
///
/// Binds to the configured address, builds the router, and serves
/// requests until `shutdown` becomes `true` or its sender is dropped.
/// In-flight requests are allowed to finish.
///
/// # Errors
///
/// Returns an error if the address is invalid, the TCP listener cannot
/// bind, or the server encounters a fatal I/O error.
pub async fn start_server(
    config: &HttpConfig,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "game API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if shutdown.wait_for(|stop| *stop).await.is_err() {
                info!("shutdown sender dropped");
            }
        })
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("game API stopped");
    Ok(())
}

/// Errors that can occur when starting or running the game API server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stronghold_core::balance::BalanceCatalog;
    use stronghold_core::commands::StartingCity;
    use stronghold_core::config::StartingCityConfig;
    use stronghold_core::coordinator::SharedWorld;

    use super::*;

    fn state() -> Arc<AppState> {
        let catalog = BalanceCatalog::default();
        let start = StartingCity::from_config(&StartingCityConfig::default(), &catalog);
        Arc::new(AppState::new(
            SharedWorld::default(),
            Arc::new(catalog),
            start,
            std::time::Duration::from_secs(60),
            crate::auth::MIN_PASSWORD_COST,
        ))
    }

    #[tokio::test]
    async fn invalid_host_is_a_bind_error() {
        let config = HttpConfig {
            host: "not a host".to_owned(),
            port: 0,
        };
        let (_tx, rx) = watch::channel(false);
        let result = start_server(&config, state(), rx).await;
        assert!(matches!(result, Err(ServerError::Bind(_))));
    }

    #[tokio::test]
    async fn stops_when_shutdown_is_signalled() {
        let config = HttpConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
        };
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(async move { start_server(&config, state(), rx).await });
        tx.send(true).unwrap();
        server.await.unwrap().unwrap();
    }
}
