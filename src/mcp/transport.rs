//! Per-request MCP transports
//!
//! A transport carries exactly one HTTP request to the protocol server.
//! Transports are created fresh for every POST, bound to the shared handler
//! once, and released by a [`TransportGuard`] when the response stream ends
//! or is dropped.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use http::request::Parts;
use http_body::{Frame, SizeHint};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::ServerHandler;
use tower::ServiceExt;
use uuid::Uuid;

use crate::error::TransportError;

/// One request's channel to the protocol server
pub trait Transport: Send + Sync + 'static {
    /// The protocol handler this transport dispatches to
    type Handler;

    /// Attach the protocol handler. A transport accepts a single binding.
    fn bind(&self, handler: Self::Handler) -> Result<(), TransportError>;

    /// Run the request through the bound handler.
    ///
    /// `body` is the already-parsed JSON payload; `parts` is the original
    /// request head.
    fn handle_request(
        &self,
        parts: Parts,
        body: serde_json::Value,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;

    /// Release the transport. Returns `true` only for the call that actually
    /// closed it, so repeated calls are harmless.
    fn close(&self) -> bool;
}

/// Creates a new [`Transport`] per request
pub trait TransportFactory: Send + Sync + 'static {
    type Transport: Transport;

    fn create(&self) -> Result<Self::Transport, TransportError>;
}

/// Factory for stateless streamable HTTP transports backed by rmcp
pub struct StreamableHttpTransportFactory<H> {
    _handler: PhantomData<fn() -> H>,
}

impl<H> StreamableHttpTransportFactory<H> {
    pub fn new() -> Self {
        Self {
            _handler: PhantomData,
        }
    }
}

impl<H> Default for StreamableHttpTransportFactory<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ServerHandler + Clone> TransportFactory for StreamableHttpTransportFactory<H> {
    type Transport = StreamableHttpTransport<H>;

    fn create(&self) -> Result<Self::Transport, TransportError> {
        Ok(StreamableHttpTransport::new())
    }
}

/// Stateless rmcp streamable HTTP transport for a single request
///
/// No session id is issued and nothing is shared between requests.
pub struct StreamableHttpTransport<H: ServerHandler + Clone> {
    config: StreamableHttpServerConfig,
    state: Mutex<State<H>>,
}

enum State<H: ServerHandler + Clone> {
    Unbound,
    Bound(StreamableHttpService<H, LocalSessionManager>),
    Closed,
}

impl<H: ServerHandler + Clone> StreamableHttpTransport<H> {
    pub fn new() -> Self {
        let mut config = StreamableHttpServerConfig::default();
        config.stateful_mode = false;

        Self {
            config,
            state: Mutex::new(State::Unbound),
        }
    }

    fn service(&self) -> Result<StreamableHttpService<H, LocalSessionManager>, TransportError> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            State::Bound(service) => Ok(service.clone()),
            State::Unbound => Err(TransportError::NotBound),
            State::Closed => Err(TransportError::Closed),
        }
    }
}

impl<H: ServerHandler + Clone> Default for StreamableHttpTransport<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ServerHandler + Clone> Transport for StreamableHttpTransport<H> {
    type Handler = H;

    fn bind(&self, handler: H) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            State::Unbound => {
                // Sessions are never created in stateless mode; the manager
                // only satisfies the service signature.
                let service = StreamableHttpService::new(
                    move || Ok(handler.clone()),
                    Arc::new(LocalSessionManager::default()),
                    self.config.clone(),
                );
                *state = State::Bound(service);
                Ok(())
            }
            State::Bound(_) => Err(TransportError::AlreadyBound),
            State::Closed => Err(TransportError::Closed),
        }
    }

    async fn handle_request(
        &self,
        mut parts: Parts,
        body: serde_json::Value,
    ) -> Result<Response, TransportError> {
        let service = self.service()?;

        // The body is re-encoded, so the client's length no longer applies.
        parts.headers.remove(http::header::CONTENT_LENGTH);
        let request = http::Request::from_parts(parts, Body::from(serde_json::to_vec(&body)?));

        let response = service
            .oneshot(request)
            .await
            .map_err(|e| TransportError::Handling(e.to_string()))?;

        Ok(response.map(Body::new))
    }

    fn close(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        !matches!(std::mem::replace(&mut *state, State::Closed), State::Closed)
    }
}

/// Closes a transport when dropped
///
/// Held by the request future until a response exists, then moved into the
/// response body, so both normal completion and client disconnect release
/// the transport.
pub struct TransportGuard<T: Transport> {
    transport: Arc<T>,
    request_id: Uuid,
}

impl<T: Transport> TransportGuard<T> {
    pub fn new(transport: Arc<T>, request_id: Uuid) -> Self {
        Self {
            transport,
            request_id,
        }
    }
}

impl<T: Transport> Drop for TransportGuard<T> {
    fn drop(&mut self) {
        if self.transport.close() {
            tracing::info!(request_id = %self.request_id, "Request closed");
        }
    }
}

/// Response body that owns the transport guard
///
/// Errors surfacing after the response started streaming can no longer be
/// turned into an error envelope; they are logged and passed through.
pub struct GuardedBody<T: Transport> {
    inner: Body,
    guard: Option<TransportGuard<T>>,
}

impl<T: Transport> GuardedBody<T> {
    pub fn new(inner: Body, guard: TransportGuard<T>) -> Self {
        Self {
            inner,
            guard: Some(guard),
        }
    }
}

impl<T: Transport> http_body::Body for GuardedBody<T> {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match http_body::Body::poll_frame(Pin::new(&mut this.inner), cx) {
            Poll::Ready(Some(Err(e))) => {
                let request_id = this.guard.as_ref().map(|guard| guard.request_id);
                tracing::error!(
                    request_id = ?request_id,
                    "Error handling MCP request after response started: {}",
                    e
                );
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.guard.take();
                Poll::Ready(None)
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        http_body::Body::is_end_stream(&self.inner)
    }

    fn size_hint(&self) -> SizeHint {
        http_body::Body::size_hint(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::test_support::LogBuffer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        closes: AtomicUsize,
    }

    impl Transport for CountingTransport {
        type Handler = ();

        fn bind(&self, _handler: ()) -> Result<(), TransportError> {
            Ok(())
        }

        async fn handle_request(
            &self,
            _parts: Parts,
            _body: serde_json::Value,
        ) -> Result<Response, TransportError> {
            Err(TransportError::NotBound)
        }

        fn close(&self) -> bool {
            self.closes.fetch_add(1, Ordering::SeqCst) == 0
        }
    }

    #[test]
    fn dropped_guard_logs_close_at_info() {
        let logs = LogBuffer::default();
        let _capture = logs.capture();

        let transport = Arc::new(CountingTransport::default());
        drop(TransportGuard::new(Arc::clone(&transport), Uuid::new_v4()));
        drop(TransportGuard::new(Arc::clone(&transport), Uuid::new_v4()));

        assert_eq!(transport.closes.load(Ordering::SeqCst), 2);
        let contents = logs.contents();
        assert!(contents.contains("INFO"), "logs: {contents}");
        assert_eq!(contents.matches("Request closed").count(), 1);
    }
}
