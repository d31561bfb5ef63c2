//! HTTP API for health checks, Prometheus metrics and predictions

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use forecast_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::ForecastMetrics,
    DateRange, ForecastError, PredictionService, ValidationError,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: ForecastMetrics,
    horizon_days: i64,
    service: OnceLock<Arc<PredictionService>>,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, metrics: ForecastMetrics, horizon_days: i64) -> Self {
        Self {
            health_registry,
            metrics,
            horizon_days,
            service: OnceLock::new(),
        }
    }

    /// Make a trained service available to the prediction API.
    ///
    /// Returns `false` if a service was already installed.
    pub fn install(&self, service: Arc<PredictionService>) -> bool {
        self.service.set(service).is_ok()
    }

    pub fn service(&self) -> Option<&Arc<PredictionService>> {
        self.service.get()
    }
}

/// Body of every non-2xx prediction API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    fn validation(err: &ValidationError) -> Self {
        let details = match err {
            ValidationError::InvalidFormat(text) => serde_json::json!({ "input": text }),
            ValidationError::PastDate { date, today } => {
                serde_json::json!({ "date": date, "today": today })
            }
            ValidationError::BeyondHorizon { date, max } => {
                serde_json::json!({ "date": date, "max_date": max })
            }
        };
        Self {
            error: err.to_string(),
            code: err.code().to_string(),
            details: Some(details),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub date: String,
}

fn default_country() -> String {
    "India".to_string()
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once the models are trained
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Forecast for one city and date
async fn predict(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PredictQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(rejection.body_text(), "invalid_request")),
            )
                .into_response();
        }
    };
    let Some(service) = state.service() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("Models are still training", "not_ready")),
        )
            .into_response();
    };

    match service
        .predict(&query.city, &query.state, &query.country, &query.date)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(ForecastError::Validation(e)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::validation(&e)),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, city = %query.city, date = %query.date, "Prediction failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string(), "prediction_failed")),
            )
                .into_response()
        }
    }
}

/// Dates a forecast can currently be requested for
async fn date_range(State(state): State<Arc<AppState>>) -> Json<DateRange> {
    let range = match state.service() {
        Some(service) => service.date_range(),
        None => DateRange::current(state.horizon_days),
    };
    Json(range)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/predict", get(predict))
        .route("/api/v1/date-range", get(date_range))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
