//! API client for communicating with the forecast service

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Error returned when the service answers with a non-success status
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service understood the request and refused it
    #[error("{message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("API error ({status}): {body}")]
    Http { status: u16, body: String },
}

impl ApiError {
    fn from_body(status: StatusCode, body: String) -> Self {
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => ApiError::Rejected {
                status: status.as_u16(),
                code: err.code,
                message: err.error,
                details: err.details,
            },
            Err(_) => ApiError::Http {
                status: status.as_u16(),
                body,
            },
        }
    }
}

/// API client for the forecast service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let (status, body) = self.fetch(path, query).await?;

        if !status.is_success() {
            return Err(ApiError::from_body(status, body).into());
        }

        serde_json::from_str(&body).context("Failed to parse response")
    }

    /// Make a GET request whose body is meaningful for any status code,
    /// as with the health endpoints answering 503
    pub async fn get_with_status<T: DeserializeOwned>(&self, path: &str) -> Result<(StatusCode, T)> {
        let (status, body) = self.fetch(path, &[]).await?;
        let parsed = serde_json::from_str(&body)
            .map_err(|_| anyhow::Error::from(ApiError::from_body(status, body)))?;
        Ok((status, parsed))
    }

    async fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<(StatusCode, String)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;
        Ok((status, body))
    }

    /// Request a forecast for one place and date
    pub async fn forecast(&self, request: &ForecastRequest) -> Result<Forecast> {
        self.get(
            "api/v1/predict",
            &[
                ("city", request.city.as_str()),
                ("state", request.state.as_str()),
                ("country", request.country.as_str()),
                ("date", request.date.as_str()),
            ],
        )
        .await
    }

    pub async fn date_range(&self) -> Result<DateRange> {
        self.get("api/v1/date-range", &[]).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let (_, health) = self.get_with_status("healthz").await?;
        Ok(health)
    }

    pub async fn readiness(&self) -> Result<ReadinessResponse> {
        let (_, readiness) = self.get_with_status("readyz").await?;
        Ok(readiness)
    }
}

/// Parameters of a forecast request
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub city: String,
    pub state: String,
    pub country: String,
    pub date: String,
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub location: Location,
    pub date: String,
    pub day_name: String,
    pub temperature: f64,
    pub rain_probability: f64,
    pub expected_rainfall: f64,
    pub wind_speed: f64,
    pub condition: String,
    pub day_type: String,
    pub day_type_description: String,
    pub day_type_icon: String,
    pub recommendations: Vec<String>,
    pub backdrop: String,
    pub ml_day_type: String,
    pub ml_day_type_label: String,
    pub ml_confidence: f64,
    pub elevation: f64,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub today: NaiveDate,
    pub max_date: NaiveDate,
    pub horizon_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(default)]
    pub reason: Option<String>,
}
