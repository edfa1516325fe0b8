//! JSON-RPC error envelopes written by the adapter itself
//!
//! Everything the protocol server answers goes through the transport; these
//! envelopes only cover failures the adapter detects before dispatch, so the
//! request id is never known and is always `null`.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const INTERNAL_ERROR: i32 = -32603;
/// Implementation-defined server error
pub const SERVER_ERROR: i32 = -32000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
}

/// `{"jsonrpc":"2.0","error":{"code":..,"message":..},"id":null}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    jsonrpc: &'static str,
    pub error: ErrorObject,
    id: Option<serde_json::Value>,
}

impl ErrorEnvelope {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            error: ErrorObject {
                code,
                message: message.into(),
            },
            id: None,
        }
    }

    pub fn internal_error() -> Self {
        Self::new(INTERNAL_ERROR, "Internal server error")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(SERVER_ERROR, "Method not allowed.")
    }

    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse error")
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        match serde_json::to_vec(&self) {
            Ok(body) => (
                status,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Failed to encode JSON-RPC error envelope: {}", e);
                status.into_response()
            }
        }
    }
}
