//! MCP HTTP server builder and lifecycle

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;

use crate::config::McpHttpConfig;
use crate::mcp::protocol::ProtocolServer;
use crate::mcp::server::{bind_mcp_http, MCP_PATH};
use crate::mcp::transport::{Transport, TransportFactory};

/// A bound MCP HTTP server, ready to serve
pub struct McpHttpServer<H> {
    server: Arc<ProtocolServer<H>>,
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl<H: Clone + Send + Sync + 'static> McpHttpServer<H> {
    /// Create a builder for a shared protocol server
    pub fn builder<F>(server: Arc<ProtocolServer<H>>, factory: F) -> McpHttpServerBuilder<H, F>
    where
        F: TransportFactory,
        F::Transport: Transport<Handler = H>,
    {
        McpHttpServerBuilder::new(server, factory)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        self.serve_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `shutdown` completes.
    ///
    /// On shutdown the protocol server is closed and the listener dropped
    /// right away. Requests still in flight are not drained; they end when
    /// the runtime does.
    pub async fn serve_until<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send,
    {
        let Self {
            server,
            listener,
            router,
            ..
        } = self;

        tokio::select! {
            result = axum::serve(listener, router).into_future() => {
                match result {
                    Ok(()) => tracing::info!("MCP server stopped"),
                    Err(e) => {
                        tracing::error!("MCP server error: {}", e);
                        server.close();
                        return Err(e).context("MCP HTTP server failed");
                    }
                }
            }
            _ = shutdown => {
                tracing::info!("Shutting down server...");
            }
        }

        server.close();
        Ok(())
    }
}

/// Builder for [`McpHttpServer`]
pub struct McpHttpServerBuilder<H, F> {
    server: Arc<ProtocolServer<H>>,
    factory: F,
    config: McpHttpConfig,
}

impl<H, F> McpHttpServerBuilder<H, F>
where
    H: Clone + Send + Sync + 'static,
    F: TransportFactory,
    F::Transport: Transport<Handler = H>,
{
    pub fn new(server: Arc<ProtocolServer<H>>, factory: F) -> Self {
        Self {
            server,
            factory,
            config: McpHttpConfig::default(),
        }
    }

    /// Use a complete listener configuration
    pub fn with_config(mut self, config: McpHttpConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind the listener. Fails if the address is unavailable.
    pub async fn bind(self) -> Result<McpHttpServer<H>> {
        let addr = self.config.addr;
        let (listener, router) = bind_mcp_http(Arc::clone(&self.server), self.factory, &self.config)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            "Weather MCP Stateless HTTP Server listening on port {}",
            local_addr.port()
        );
        tracing::info!(
            "MCP endpoint: http://localhost:{}{}",
            local_addr.port(),
            MCP_PATH
        );

        Ok(McpHttpServer {
            server: self.server,
            listener,
            router,
            local_addr,
        })
    }
}
