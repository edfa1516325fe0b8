//! MCP (Model Context Protocol) over stateless streamable HTTP
//!
//! Protocol semantics live in rmcp; this module only creates a transport per
//! request, binds the shared protocol server to it and shapes the HTTP
//! envelope around it.

pub mod jsonrpc;
pub mod protocol;
pub mod server;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use jsonrpc::ErrorEnvelope;
pub use protocol::ProtocolServer;
pub use server::{bind_mcp_http, reject_method, McpAdapter, MCP_PATH};
pub use transport::{
    StreamableHttpTransport, StreamableHttpTransportFactory, Transport, TransportFactory,
    TransportGuard,
};
