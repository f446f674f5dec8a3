//! HTTP transport for the MCP server.
//!
//! `POST /mcp` carries one JSON-RPC message per request; the inbound
//! `Authorization` header is copied into the request context so hosted
//! deployments can resolve per-caller API keys. `GET /mcp` opens an SSE
//! stream that announces the message endpoint and then stays open on
//! keep-alive pings. Dispatch runs on the shared runtime, one task per
//! request.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::McpError;
use crate::protocol::{JsonRpcRequest, RequestContext};
use crate::server::McpServer;

/// Build the MCP router over a fully assembled server.
pub fn create_router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp_post))
        .route("/mcp", get(handle_mcp_sse))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// One JSON-RPC message per POST. Notifications get `202 Accepted` with
/// no body; everything else gets the JSON-RPC response.
async fn handle_mcp_post(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    let context = RequestContext {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    };

    match server.handle_request(request, &context).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// SSE channel: announce the message endpoint, then hold the stream open.
async fn handle_mcp_sse(State(_server): State<Arc<McpServer>>) -> impl IntoResponse {
    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(Event::default().event("endpoint").data("/mcp"));
        std::future::pending::<()>().await;
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "easel-mcp",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// HTTP server wrapping an assembled [`McpServer`].
pub struct HttpServer {
    addr: String,
    state: Arc<McpServer>,
}

impl HttpServer {
    pub fn new(addr: impl Into<String>, state: Arc<McpServer>) -> Self {
        Self {
            addr: addr.into(),
            state,
        }
    }

    /// Bind and serve until a client requests shutdown.
    pub async fn run(self) -> Result<(), McpError> {
        let shutdown = self.state.shutdown_requested();
        let app = create_router(self.state);

        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| McpError::StartupFailed(format!("failed to bind {}: {e}", self.addr)))?;

        info!(addr = %self.addr, "MCP HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await
            .map_err(|e| McpError::Internal(e.into()))?;

        Ok(())
    }
}
