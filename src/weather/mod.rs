//! Weather tools backed by the US National Weather Service API

pub mod client;
pub mod handler;

pub use client::NwsClient;
pub use handler::WeatherServer;
