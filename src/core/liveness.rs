//! HTTP liveness endpoint
//!
//! A single `GET /` route returning fixed plaintext so a hosting platform can
//! tell the process is up. It runs on its own task and shares no state with the
//! bot's dispatcher.

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Body returned by `GET /`
pub const LIVENESS_BODY: &str = "✅ Web server is running and bot is alive.";

/// Build the liveness router
pub fn router() -> Router {
    Router::new().route("/", get(root_handler))
}

/// Bind the listener for the liveness server
pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    TcpListener::bind(addr).await
}

/// Serve the liveness router until `shutdown` is cancelled
///
/// # Arguments
/// * `listener` - Already bound listener (see [`bind`])
/// * `shutdown` - Cancelled by the owner to stop accepting connections
pub async fn serve(listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("Starting liveness server on http://{}", addr);
    }

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    log::info!("Liveness server stopped");
    Ok(())
}

/// Bind and serve, logging instead of failing
///
/// The bot keeps running when the port is unavailable; only supervision is lost.
pub async fn run(addr: SocketAddr, shutdown: CancellationToken) {
    let listener = match bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind liveness server on {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = serve(listener, shutdown).await {
        log::error!("Liveness server error: {}", e);
    }
}

async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, LIVENESS_BODY)
}
