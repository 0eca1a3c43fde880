//! HTTP server for the Nova ask API (axum).
//!
//! Routes: `POST /ask`, `GET /ask/stream` (SSE), session listing/lookup/
//! rename/delete under `/ask/sessions`, and `GET /health`.
//!
//! **Public API**: [`run_serve`], [`run_serve_on_listener`].

mod app;

use tokio::net::TcpListener;
use tracing::info;

use app::{router, AppState};
use nova::service::AskService;

/// Runs the server on an existing listener. Used by tests (bind to
/// 127.0.0.1:0 first, then pass the listener).
pub async fn run_serve_on_listener(
    listener: TcpListener,
    service: AskService,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("ask server listening on http://{}", addr);
    let app = router(AppState { service });
    axum::serve(listener, app).await?;
    Ok(())
}

/// Binds `addr` and runs the server until the process exits.
pub async fn run_serve(
    addr: &str,
    service: AskService,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    run_serve_on_listener(listener, service).await
}
