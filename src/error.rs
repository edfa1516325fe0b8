//! Error types

use thiserror::Error;

/// Failures of a single per-request transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to construct transport: {0}")]
    Construction(String),

    #[error("transport is already bound to a protocol server")]
    AlreadyBound,

    #[error("transport has not been bound to a protocol server")]
    NotBound,

    #[error("transport is closed")]
    Closed,

    #[error("failed to encode request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("transport failed to handle request: {0}")]
    Handling(String),
}

/// Failures of the request adapter before a response exists
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("protocol server is closed")]
    ServerClosed,
}

/// Invalid startup configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid port in {var}: {value:?}")]
    InvalidPort { var: &'static str, value: String },

    #[error("invalid body limit: {0:?}")]
    InvalidBodyLimit(String),
}

/// Failures talking to the National Weather Service API
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}
