//! HTTP service.

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AgentError;

pub use error::ApiError;
pub use routes::ChatRequest;
pub use state::ServiceContext;

/// Build the router.
pub fn router(ctx: Arc<ServiceContext>) -> Router {
    Router::new()
        .route("/chat", post(routes::chat))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Any origin, method and header, with credentials.
///
/// Browsers reject a wildcard together with credentials, so the request's own
/// values are echoed back instead.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Serve until Ctrl-C or SIGTERM.
pub async fn serve(
    ctx: Arc<ServiceContext>,
    addr: impl tokio::net::ToSocketAddrs,
) -> Result<(), AgentError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
