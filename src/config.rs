//! Configuration types for the MCP HTTP server
//!
//! Everything is read once from the environment at startup. The
//! `from_lookup` constructors take the variable lookup as a closure so the
//! resolution rules can be exercised without touching the process
//! environment.

use std::net::{Ipv4Addr, SocketAddr};

use crate::error::ConfigError;

/// Azure Functions custom handler port, consulted before `PORT`
pub const CUSTOM_PORT_VAR: &str = "FUNCTIONS_CUSTOMHANDLER_PORT";
/// Generic port variable
pub const PORT_VAR: &str = "PORT";
/// Port used when neither variable is set
pub const DEFAULT_PORT: u16 = 3000;

pub const MAX_BODY_BYTES_VAR: &str = "MCP_MAX_BODY_BYTES";
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

pub const NWS_API_BASE_VAR: &str = "NWS_API_BASE";
pub const NWS_USER_AGENT_VAR: &str = "NWS_USER_AGENT";
pub const DEFAULT_NWS_API_BASE: &str = "https://api.weather.gov";
pub const DEFAULT_NWS_USER_AGENT: &str = "weather-app/1.0";

/// Complete server configuration
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub mcp_http: McpHttpConfig,
    pub weather: WeatherConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            mcp_http: McpHttpConfig::from_lookup(&lookup)?,
            weather: WeatherConfig::from_lookup(&lookup),
        })
    }
}

/// MCP HTTP listener configuration
#[derive(Debug, Clone)]
pub struct McpHttpConfig {
    pub addr: SocketAddr,
    /// Largest request body accepted before JSON parsing
    pub max_body_bytes: usize,
}

impl Default for McpHttpConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

impl McpHttpConfig {
    /// Listen on all interfaces at `port`
    pub fn new(port: u16) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(resolve_port(&lookup)?);

        if let Some(raw) = non_empty(&lookup, MAX_BODY_BYTES_VAR) {
            config.max_body_bytes = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidBodyLimit(raw.clone()))?;
        }

        Ok(config)
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// National Weather Service client configuration
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_base: String,
    pub user_agent: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_NWS_API_BASE.to_string(),
            user_agent: DEFAULT_NWS_USER_AGENT.to_string(),
        }
    }
}

impl WeatherConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            api_base: non_empty(&lookup, NWS_API_BASE_VAR)
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            user_agent: non_empty(&lookup, NWS_USER_AGENT_VAR).unwrap_or(defaults.user_agent),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

/// Custom handler port, then `PORT`, then the default.
///
/// Unset and empty variables fall through; anything else must be a port.
fn resolve_port<F>(lookup: &F) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for var in [CUSTOM_PORT_VAR, PORT_VAR] {
        if let Some(raw) = non_empty(lookup, var) {
            return raw.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var,
                value: raw.clone(),
            });
        }
    }
    Ok(DEFAULT_PORT)
}

fn non_empty<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn generic_port_is_used_without_custom_port() {
        let config = McpHttpConfig::from_lookup(env(&[("PORT", "4000")])).unwrap();
        assert_eq!(config.addr.port(), 4000);
    }

    #[test]
    fn default_port_without_variables() {
        let config = McpHttpConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config.addr.port(), 3000);
        assert!(config.addr.ip().is_unspecified());
    }

    #[test]
    fn custom_port_wins_over_generic_port() {
        let config = McpHttpConfig::from_lookup(env(&[
            ("FUNCTIONS_CUSTOMHANDLER_PORT", "7071"),
            ("PORT", "4000"),
        ]))
        .unwrap();
        assert_eq!(config.addr.port(), 7071);
    }

    #[test]
    fn empty_custom_port_falls_through() {
        let config = McpHttpConfig::from_lookup(env(&[
            ("FUNCTIONS_CUSTOMHANDLER_PORT", ""),
            ("PORT", "4000"),
        ]))
        .unwrap();
        assert_eq!(config.addr.port(), 4000);
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let err = McpHttpConfig::from_lookup(env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { var: "PORT", .. }));
    }

    #[test]
    fn body_limit_override() {
        let config =
            McpHttpConfig::from_lookup(env(&[("MCP_MAX_BODY_BYTES", "1024")])).unwrap();
        assert_eq!(config.max_body_bytes, 1024);

        let err = McpHttpConfig::from_lookup(env(&[("MCP_MAX_BODY_BYTES", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBodyLimit(_)));
    }

    #[test]
    fn weather_defaults_and_overrides() {
        let config = WeatherConfig::from_lookup(env(&[]));
        assert_eq!(config.api_base, "https://api.weather.gov");
        assert_eq!(config.user_agent, "weather-app/1.0");

        let config = WeatherConfig::from_lookup(env(&[
            ("NWS_API_BASE", "http://127.0.0.1:9000/"),
            ("NWS_USER_AGENT", "tests"),
        ]));
        assert_eq!(config.api_base, "http://127.0.0.1:9000");
        assert_eq!(config.user_agent, "tests");
    }
}
