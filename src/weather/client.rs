//! National Weather Service API client

use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::WeatherConfig;
use crate::error::WeatherError;

#[derive(Debug, Deserialize)]
pub struct AlertsResponse {
    #[serde(default)]
    pub features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
pub struct AlertFeature {
    pub properties: AlertProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertProperties {
    pub event: Option<String>,
    pub area_desc: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub headline: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PointsResponse {
    pub properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
pub struct PointsProperties {
    /// URL of the gridpoint forecast
    pub forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
pub struct ForecastProperties {
    #[serde(default)]
    pub periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub name: Option<String>,
    pub temperature: Option<serde_json::Number>,
    pub temperature_unit: Option<String>,
    pub wind_speed: Option<String>,
    pub wind_direction: Option<String>,
    pub short_forecast: Option<String>,
}

/// Thin typed wrapper over the NWS JSON API
#[derive(Debug, Clone)]
pub struct NwsClient {
    http: reqwest::Client,
    api_base: String,
}

impl NwsClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
        })
    }

    /// Active alerts for a two-letter state code
    pub async fn alerts(&self, state: &str) -> Result<AlertsResponse, WeatherError> {
        let url = format!("{}/alerts?area={}", self.api_base, state);
        self.get_json(&url).await
    }

    /// Gridpoint metadata for a coordinate pair
    pub async fn points(&self, latitude: f64, longitude: f64) -> Result<PointsResponse, WeatherError> {
        let url = format!("{}/points/{:.4},{:.4}", self.api_base, latitude, longitude);
        self.get_json(&url).await
    }

    /// Forecast at a URL previously returned by [`NwsClient::points`]
    pub async fn forecast(&self, url: &str) -> Result<ForecastResponse, WeatherError> {
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, WeatherError> {
        tracing::debug!("NWS request: {}", url);

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/geo+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::UnexpectedResponse(format!(
                "{} returned {}",
                url, status
            )));
        }

        Ok(response.json().await?)
    }
}
