//! Weather MCP stateless HTTP server
//!
//! Run with: weather-mcp-http
//! Port: FUNCTIONS_CUSTOMHANDLER_PORT, then PORT, then 3000.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use weather_mcp_http::{
    McpHttpServer, ProtocolServer, ServerConfig, StreamableHttpTransportFactory, WeatherServer,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Failed to start server: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = ServerConfig::from_env()?;

    // One protocol server for the whole process; every request binds it to
    // its own transport.
    let server = Arc::new(ProtocolServer::new(WeatherServer::new(&config.weather)?));

    McpHttpServer::builder(server, StreamableHttpTransportFactory::<WeatherServer>::new())
        .with_config(config.mcp_http)
        .bind()
        .await?
        .serve()
        .await
}
