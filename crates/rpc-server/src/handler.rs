//! HTTP request handlers.

use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rpc_dispatch::{encode, Encoded};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
///
/// The body is taken as raw bytes so that undecodable JSON still gets a
/// protocol-level parse error instead of an HTTP rejection.
pub async fn handle_rpc(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let output = state.entry.handle_bytes(&body).await;

    match encode(output) {
        Ok(Encoded::Json(bytes)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response(),
        Ok(Encoded::Binary(bytes)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        Ok(Encoded::Empty) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("Failed to encode RPC response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
