//! Shared protocol server

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::AdapterError;
use crate::mcp::transport::Transport;

/// The process-wide protocol server
///
/// Constructed once by the composition root and handed to the request
/// adapter. The handler itself is read-only; every request binds its own
/// clone to a fresh transport, so concurrent requests never share message
/// state.
pub struct ProtocolServer<H> {
    handler: H,
    closed: AtomicBool,
}

impl<H: Clone + Send + Sync + 'static> ProtocolServer<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            closed: AtomicBool::new(false),
        }
    }

    /// Bind this server to a per-request transport
    pub fn connect<T>(&self, transport: &T) -> Result<(), AdapterError>
    where
        T: Transport<Handler = H>,
    {
        if self.is_closed() {
            return Err(AdapterError::ServerClosed);
        }
        transport.bind(self.handler.clone())?;
        Ok(())
    }

    /// Stop accepting new bindings. Transports already bound keep running.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!("Protocol server closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
