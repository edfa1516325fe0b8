//! MCP HTTP endpoint
//!
//! Routes `/mcp` to the stateless request adapter. POST requests get a
//! fresh transport each; GET (server push stream) and DELETE (session
//! teardown) have no meaning without sessions and are rejected.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use http::request::Parts;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{McpHttpConfig, DEFAULT_MAX_BODY_BYTES};
use crate::error::AdapterError;
use crate::mcp::jsonrpc::{ErrorEnvelope, INVALID_REQUEST};
use crate::mcp::protocol::ProtocolServer;
use crate::mcp::transport::{GuardedBody, Transport, TransportFactory, TransportGuard};

/// Path of the MCP endpoint
pub const MCP_PATH: &str = "/mcp";

/// Per-request glue between the HTTP layer and the protocol server
pub struct McpAdapter<H, F> {
    server: Arc<ProtocolServer<H>>,
    factory: F,
    max_body_bytes: usize,
}

impl<H, F> McpAdapter<H, F>
where
    H: Clone + Send + Sync + 'static,
    F: TransportFactory,
    F::Transport: Transport<Handler = H>,
{
    pub fn new(server: Arc<ProtocolServer<H>>, factory: F) -> Self {
        Self {
            server,
            factory,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Apply the listener configuration relevant to request handling
    pub fn with_config(mut self, config: &McpHttpConfig) -> Self {
        self.max_body_bytes = config.max_body_bytes;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Build the axum router serving `/mcp`
    pub fn into_router(self) -> Router {
        Router::new()
            .route(
                MCP_PATH,
                post(handle_post::<H, F>)
                    .get(reject_method)
                    .delete(reject_method),
            )
            .fallback(fallback_handler)
            .layer(middleware::from_fn(log_request_middleware))
            .with_state(Arc::new(self))
    }

    /// Handle one POST to the MCP endpoint
    pub async fn handle(&self, request: Request) -> Response {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("mcp_request", %request_id);

        async move {
            let (parts, body) = request.into_parts();
            let body = match read_json_body(body, self.max_body_bytes).await {
                Ok(body) => body,
                Err(response) => return response,
            };

            match self.dispatch(parts, body, request_id).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("Error handling MCP request: {}", e);
                    ErrorEnvelope::internal_error()
                        .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Create, bind and delegate. Any error returned here happened before a
    /// response existed; the guard closes the transport on the way out.
    async fn dispatch(
        &self,
        parts: Parts,
        body: serde_json::Value,
        request_id: Uuid,
    ) -> Result<Response, AdapterError> {
        let transport = Arc::new(self.factory.create()?);
        let guard = TransportGuard::new(Arc::clone(&transport), request_id);

        self.server.connect(transport.as_ref())?;
        let response = transport.handle_request(parts, body).await?;

        Ok(response.map(|body| Body::new(GuardedBody::new(body, guard))))
    }
}

async fn handle_post<H, F>(
    State(adapter): State<Arc<McpAdapter<H, F>>>,
    request: Request,
) -> Response
where
    H: Clone + Send + Sync + 'static,
    F: TransportFactory,
    F::Transport: Transport<Handler = H>,
{
    adapter.handle(request).await
}

/// Answer GET and DELETE with a fixed JSON-RPC error
pub async fn reject_method(request: Request) -> Response {
    tracing::info!("Received {} MCP request", request.method());
    ErrorEnvelope::method_not_allowed().into_response_with(StatusCode::METHOD_NOT_ALLOWED)
}

/// Collect and parse the request body, answering with an error envelope on
/// failure
async fn read_json_body(body: Body, limit: usize) -> Result<serde_json::Value, Response> {
    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            tracing::warn!("Rejected MCP request body larger than {} bytes", limit);
            return Err(ErrorEnvelope::new(INVALID_REQUEST, "Request body too large")
                .into_response_with(StatusCode::PAYLOAD_TOO_LARGE));
        }
        Err(e) => {
            tracing::warn!("Failed to read MCP request body: {}", e);
            return Err(ErrorEnvelope::new(INVALID_REQUEST, "Invalid request body")
                .into_response_with(StatusCode::BAD_REQUEST));
        }
    };

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::warn!("MCP request body is not valid JSON: {}", e);
        ErrorEnvelope::parse_error().into_response_with(StatusCode::BAD_REQUEST)
    })
}

/// Log every request with its outcome
async fn log_request_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    tracing::debug!(%method, %uri, headers = ?request.headers(), "MCP HTTP request");

    let response = next.run(request).await;

    tracing::info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        elapsed = ?started.elapsed(),
        "MCP HTTP response"
    );

    response
}

/// Fallback for unmatched routes
async fn fallback_handler(request: Request) -> impl IntoResponse {
    tracing::warn!(
        method = %request.method(),
        path = %request.uri().path(),
        "Unmatched request, MCP endpoint is at {}",
        MCP_PATH
    );

    let body = serde_json::json!({
        "error": "Route not found",
        "path": request.uri().path(),
        "hint": format!("MCP endpoint is at {}", MCP_PATH),
    });

    (StatusCode::NOT_FOUND, axum::Json(body))
}

/// Bind the listener and build the router for a protocol server
///
/// Binding happens here, before anything is spawned, so a port already in
/// use is reported to the caller with no listener left behind.
pub async fn bind_mcp_http<H, F>(
    server: Arc<ProtocolServer<H>>,
    factory: F,
    config: &McpHttpConfig,
) -> std::io::Result<(tokio::net::TcpListener, Router)>
where
    H: Clone + Send + Sync + 'static,
    F: TransportFactory,
    F::Transport: Transport<Handler = H>,
{
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    let router = McpAdapter::new(server, factory)
        .with_config(config)
        .into_router();
    Ok((listener, router))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::test_support::LogBuffer;
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test]
    async fn responses_are_logged_with_elapsed_duration() {
        let logs = LogBuffer::default();
        let _capture = logs.capture();

        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn(log_request_middleware));
        let response = app
            .oneshot(
                http::Request::builder()
                    .uri("/ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let contents = logs.contents();
        assert!(contents.contains("MCP HTTP response"), "logs: {contents}");
        assert!(contents.contains("status=200"), "logs: {contents}");
        assert!(contents.contains("elapsed="), "logs: {contents}");
        assert!(!contents.contains("elapsed_ms"), "logs: {contents}");
    }
}
