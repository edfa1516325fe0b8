//! Weather MCP - stateless Model Context Protocol server over streamable HTTP
//!
//! Each POST to `/mcp` gets its own transport, bound to a single shared
//! protocol server; GET and DELETE are rejected because no session is ever
//! created.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use weather_mcp_http::{
//!     McpHttpServer, ProtocolServer, ServerConfig, StreamableHttpTransportFactory, WeatherServer,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::from_env()?;
//! let server = Arc::new(ProtocolServer::new(WeatherServer::new(&config.weather)?));
//!
//! McpHttpServer::builder(server, StreamableHttpTransportFactory::<WeatherServer>::new())
//!     .with_config(config.mcp_http)
//!     .bind().await?
//!     .serve().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod mcp;
pub mod server;
pub mod weather;

// Re-export main API
pub use config::{McpHttpConfig, ServerConfig, WeatherConfig};
pub use error::{AdapterError, ConfigError, TransportError, WeatherError};
pub use mcp::{
    McpAdapter, ProtocolServer, StreamableHttpTransport, StreamableHttpTransportFactory,
    Transport, TransportFactory,
};
pub use server::{McpHttpServer, McpHttpServerBuilder};
pub use weather::WeatherServer;
