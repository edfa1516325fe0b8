//! Weather MCP server: `get_alerts` and `get_forecast` tools

use std::sync::Arc;

use rmcp::model::*;
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::client::{AlertProperties, ForecastPeriod, NwsClient};
use crate::config::WeatherConfig;
use crate::error::WeatherError;

pub const SERVER_NAME: &str = "weather";
pub const SERVER_VERSION: &str = "1.0.0";

pub const GET_ALERTS: &str = "get_alerts";
pub const GET_FORECAST: &str = "get_forecast";

#[derive(Debug, Deserialize)]
struct AlertsArgs {
    state: String,
}

#[derive(Debug, Deserialize)]
struct ForecastArgs {
    latitude: f64,
    longitude: f64,
}

/// Protocol handler exposing National Weather Service data
#[derive(Debug, Clone)]
pub struct WeatherServer {
    client: Arc<NwsClient>,
}

impl WeatherServer {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        Ok(Self {
            client: Arc::new(NwsClient::new(config)?),
        })
    }

    pub fn tools() -> Vec<Tool> {
        vec![
            Tool::new(
                GET_ALERTS,
                "Get weather alerts for a US state",
                schema(json!({
                    "type": "object",
                    "properties": {
                        "state": {
                            "type": "string",
                            "minLength": 2,
                            "maxLength": 2,
                            "description": "Two-letter state code (e.g. CA, NY)"
                        }
                    },
                    "required": ["state"]
                })),
            ),
            Tool::new(
                GET_FORECAST,
                "Get weather forecast for a location",
                schema(json!({
                    "type": "object",
                    "properties": {
                        "latitude": {
                            "type": "number",
                            "minimum": -90,
                            "maximum": 90,
                            "description": "Latitude of the location"
                        },
                        "longitude": {
                            "type": "number",
                            "minimum": -180,
                            "maximum": 180,
                            "description": "Longitude of the location"
                        }
                    },
                    "required": ["latitude", "longitude"]
                })),
            ),
        ]
    }

    pub async fn get_alerts(&self, state: &str) -> Result<CallToolResult, McpError> {
        let state = state.trim();
        if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(McpError::invalid_params(
                format!("Invalid state code: {:?} (expected two letters)", state),
                None,
            ));
        }
        let state = state.to_ascii_uppercase();

        let alerts = match self.client.alerts(&state).await {
            Ok(alerts) => alerts,
            Err(e) => {
                tracing::warn!("Failed to fetch alerts for {}: {}", state, e);
                return Ok(text_result("Failed to retrieve alerts data"));
            }
        };

        if alerts.features.is_empty() {
            return Ok(text_result(format!("No active alerts for {}", state)));
        }

        let formatted: Vec<String> = alerts
            .features
            .iter()
            .map(|feature| format_alert(&feature.properties))
            .collect();

        Ok(text_result(format!(
            "Active alerts for {}:\n\n{}",
            state,
            formatted.join("\n")
        )))
    }

    pub async fn get_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CallToolResult, McpError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(McpError::invalid_params(
                format!("Latitude out of range: {}", latitude),
                None,
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(McpError::invalid_params(
                format!("Longitude out of range: {}", longitude),
                None,
            ));
        }

        let points = match self.client.points(latitude, longitude).await {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!("Failed to fetch grid point {}, {}: {}", latitude, longitude, e);
                return Ok(text_result(format!(
                    "Failed to retrieve grid point data for coordinates: {}, {}. \
                     This location may not be supported by the NWS API (only US locations are supported).",
                    latitude, longitude
                )));
            }
        };

        let Some(forecast_url) = points.properties.forecast else {
            return Ok(text_result("Failed to get forecast URL from grid point data"));
        };

        let forecast = match self.client.forecast(&forecast_url).await {
            Ok(forecast) => forecast,
            Err(e) => {
                tracing::warn!("Failed to fetch forecast {}: {}", forecast_url, e);
                return Ok(text_result("Failed to retrieve forecast data"));
            }
        };

        let periods = forecast.properties.periods;
        if periods.is_empty() {
            return Ok(text_result("No forecast periods available"));
        }

        let formatted: Vec<String> = periods.iter().map(format_period).collect();

        Ok(text_result(format!(
            "Forecast for {}, {}:\n\n{}",
            latitude,
            longitude,
            formatted.join("\n")
        )))
    }
}

impl ServerHandler for WeatherServer {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = SERVER_NAME.to_string();
        server_info.version = SERVER_VERSION.to_string();

        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info,
            instructions: Some(
                "US weather alerts and forecasts from the National Weather Service. \
                 Tools: get_alerts, get_forecast"
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(Self::tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        match request.name.as_ref() {
            GET_ALERTS => {
                let args: AlertsArgs = parse_args(request.arguments)?;
                self.get_alerts(&args.state).await
            }
            GET_FORECAST => {
                let args: ForecastArgs = parse_args(request.arguments)?;
                self.get_forecast(args.latitude, args.longitude).await
            }
            _ => Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            )),
        }
    }
}

pub fn format_alert(alert: &AlertProperties) -> String {
    [
        format!("Event: {}", or_unknown(&alert.event)),
        format!("Area: {}", or_unknown(&alert.area_desc)),
        format!("Severity: {}", or_unknown(&alert.severity)),
        format!("Status: {}", or_unknown(&alert.status)),
        format!("Headline: {}", alert.headline.as_deref().unwrap_or("No headline")),
        "---".to_string(),
    ]
    .join("\n")
}

pub fn format_period(period: &ForecastPeriod) -> String {
    let temperature = period
        .temperature
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "Unknown".to_string());

    [
        format!("{}:", or_unknown(&period.name)),
        format!(
            "Temperature: {}°{}",
            temperature,
            period.temperature_unit.as_deref().unwrap_or("F")
        ),
        format!(
            "Wind: {} {}",
            or_unknown(&period.wind_speed),
            period.wind_direction.as_deref().unwrap_or("")
        ),
        period
            .short_forecast
            .clone()
            .unwrap_or_else(|| "No forecast available".to_string()),
        "---".to_string(),
    ]
    .join("\n")
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("Unknown")
}

fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

fn parse_args<T: DeserializeOwned>(arguments: Option<JsonObject>) -> Result<T, McpError> {
    let value = serde_json::Value::Object(arguments.unwrap_or_default());
    serde_json::from_value(value)
        .map_err(|e| McpError::invalid_params(format!("Invalid arguments: {}", e), None))
}

fn schema(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_formatting_fills_missing_fields() {
        let alert = AlertProperties {
            event: Some("Flood Warning".to_string()),
            area_desc: Some("Travis, TX".to_string()),
            severity: Some("Severe".to_string()),
            ..Default::default()
        };

        assert_eq!(
            format_alert(&alert),
            "Event: Flood Warning\nArea: Travis, TX\nSeverity: Severe\nStatus: Unknown\nHeadline: No headline\n---"
        );
    }

    #[test]
    fn period_formatting() {
        let period = ForecastPeriod {
            name: Some("Tonight".to_string()),
            temperature: Some(serde_json::Number::from(58)),
            temperature_unit: Some("F".to_string()),
            wind_speed: Some("5 mph".to_string()),
            wind_direction: Some("SW".to_string()),
            short_forecast: Some("Mostly Clear".to_string()),
        };

        assert_eq!(
            format_period(&period),
            "Tonight:\nTemperature: 58°F\nWind: 5 mph SW\nMostly Clear\n---"
        );
    }

    #[test]
    fn period_formatting_defaults() {
        assert_eq!(
            format_period(&ForecastPeriod::default()),
            "Unknown:\nTemperature: Unknown°F\nWind: Unknown \nNo forecast available\n---"
        );
    }

    #[test]
    fn tools_are_advertised() {
        let names: Vec<String> = WeatherServer::tools()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        assert_eq!(names, vec![GET_ALERTS, GET_FORECAST]);
    }

    #[test]
    fn server_info_names_weather() {
        let server = WeatherServer::new(&WeatherConfig::default()).unwrap();
        let info = server.get_info();
        assert_eq!(info.server_info.name, "weather");
        assert_eq!(info.server_info.version, "1.0.0");
        assert!(info.capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn invalid_state_code_is_rejected_without_network() {
        let server = WeatherServer::new(&WeatherConfig::default()).unwrap();
        assert!(server.get_alerts("California").await.is_err());
        assert!(server.get_alerts("C1").await.is_err());
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_rejected_without_network() {
        let server = WeatherServer::new(&WeatherConfig::default()).unwrap();
        assert!(server.get_forecast(91.0, 0.0).await.is_err());
        assert!(server.get_forecast(0.0, -180.5).await.is_err());
        assert!(server.get_forecast(f64::NAN, 0.0).await.is_err());
    }

    #[test]
    fn missing_arguments_are_invalid_params() {
        let result: Result<ForecastArgs, McpError> = parse_args(None);
        assert!(result.is_err());
    }
}
