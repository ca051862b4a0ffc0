//! HTTP front end: routes, CORS, and request adaptation.

mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use lumen_core::config::ServerConfig;
use lumen_core::Pipeline;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Max request body size. Batch uploads carry several images in one body.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Shared handler state.
///
/// The pipeline holds only immutable configuration and clients, so one
/// instance serves all requests.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Build the application router.
pub fn router(pipeline: Pipeline, config: &ServerConfig) -> anyhow::Result<Router> {
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };
    Ok(Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/upload_multiple", post(handlers::upload_multiple))
        .layer(cors_layer(&config.allowed_origins)?)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state))
}

/// CORS restricted to the configured origin list.
fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::DELETE])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT]))
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, pipeline: Pipeline, config: &ServerConfig) -> anyhow::Result<()> {
    let app = router(pipeline, config)?;
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}
