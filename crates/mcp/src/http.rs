//! HTTP transport for the dispatcher.
//!
//! `POST /` carries JSON-RPC and always answers `200 OK` with an envelope;
//! failures are reported inside it, never through the HTTP status.

use crate::compliance::RequestValidator;
use crate::dispatch::Dispatcher;
use crate::protocol::{ErrorCode, RpcError, RpcResponse};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

/// Largest request body accepted on `POST /`, in bytes.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Build the application router.
pub fn router<V: RequestValidator>(dispatcher: Dispatcher<V>) -> Router {
    Router::new()
        .route("/", get(status::<V>).post(rpc::<V>))
        .with_state(dispatcher)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

async fn status<V: RequestValidator>(State(dispatcher): State<Dispatcher<V>>) -> Json<Value> {
    tracing::info!("status endpoint accessed");
    Json(json!({
        "message": format!(
            "MCP Server is running. Root directory: {}",
            dispatcher.browser().root()
        ),
    }))
}

// Read as raw bytes so a missing or odd content type still gets an envelope.
async fn rpc<V: RequestValidator>(
    State(dispatcher): State<Dispatcher<V>>,
    body: Result<Bytes, BytesRejection>,
) -> Json<RpcResponse> {
    match body {
        Ok(body) => Json(dispatcher.dispatch_bytes(&body).await),
        Err(rejection) => {
            let detail = rejection.body_text();
            tracing::warn!(status = %rejection.status(), error = %detail, "request body rejected");
            Json(RpcResponse::failure(
                Value::Null,
                RpcError::new(ErrorCode::InvalidRequest, detail),
            ))
        }
    }
}
