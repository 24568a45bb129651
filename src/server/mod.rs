//! HTTP adapter.
//!
//! Thin translation layer between HTTP and the service facade. One
//! resource, `/v1/{key}`: PUT writes the request body as the value,
//! GET returns the value bytes, DELETE removes the key. `/healthz`
//! reports liveness.

pub mod service;

use crate::core::error::KvError;
use crate::server::service::KvService;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

impl IntoResponse for KvError {
    fn into_response(self) -> Response {
        let status = match &self {
            KvError::KeyNotFound => StatusCode::NOT_FOUND,
            KvError::InvalidKey { .. } => StatusCode::BAD_REQUEST,
            KvError::WriterClosed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            KvError::OutOfSequence { .. } | KvError::MalformedRecord { .. } | KvError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

/// Build the HTTP router over a live service.
pub fn router(service: KvService) -> Router {
    Router::new()
        .route(
            "/v1/:key",
            get(get_key).put(put_key).delete(delete_key),
        )
        .route("/healthz", get(healthz))
        .with_state(service)
}

async fn put_key(
    State(service): State<KvService>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<StatusCode, KvError> {
    service.put(&key, body.to_vec()).await?;
    Ok(StatusCode::CREATED)
}

async fn get_key(
    State(service): State<KvService>,
    Path(key): Path<String>,
) -> Result<Vec<u8>, KvError> {
    service.get(&key)
}

async fn delete_key(
    State(service): State<KvService>,
    Path(key): Path<String>,
) -> Result<StatusCode, KvError> {
    service.delete(&key).await?;
    Ok(StatusCode::OK)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Bind the listener and serve until the shutdown signal resolves.
pub async fn serve(
    service: KvService,
    bind: &str,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use anyhow::Context;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind to {bind}"))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;
    Ok(())
}
