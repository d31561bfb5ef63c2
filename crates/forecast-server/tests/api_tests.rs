//! Integration tests for the forecast API endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use forecast_lib::{
    climate::{SeasonalRecordStore, SynthesisConfig},
    geo::ElevationProvider,
    health::{Component, HealthRegistry},
    observability::ForecastMetrics,
    predictor::{EnsembleParams, ForestParams, MaxFeatures},
    Coordinates, PredictionService, SeasonalRecord, ServiceConfig,
};
use forecast_server::api::{create_router, AppState};
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;

struct SeaLevel;

#[async_trait]
impl ElevationProvider for SeaLevel {
    async fn elevation(&self, _coordinates: Coordinates) -> anyhow::Result<f64> {
        Ok(0.0)
    }
}

fn trained_service() -> Arc<PredictionService> {
    static SERVICE: OnceLock<Arc<PredictionService>> = OnceLock::new();
    SERVICE
        .get_or_init(|| {
            let records: Vec<SeasonalRecord> = (2016..=2024)
                .map(|year| SeasonalRecord {
                    year,
                    winter_temp: 17.5,
                    pre_monsoon_temp: 26.0,
                    monsoon_temp: 28.0,
                    post_monsoon_temp: 22.5,
                    annual_temp: 24.5,
                    jun_rain: 170.0,
                    jul_rain: 280.0,
                    aug_rain: 260.0,
                    sep_rain: 180.0,
                })
                .collect();
            let forest = ForestParams {
                n_trees: 8,
                max_depth: 8,
                ..ForestParams::default()
            };
            let config = ServiceConfig {
                synthesis: SynthesisConfig {
                    start_year: 2019,
                    end_year: 2024,
                },
                synthesis_seed: Some(3),
                ensemble: EnsembleParams {
                    regression: forest.clone(),
                    classification: ForestParams {
                        max_features: MaxFeatures::Sqrt,
                        ..forest
                    },
                    ..EnsembleParams::default()
                },
                ..ServiceConfig::default()
            };
            let store = SeasonalRecordStore::from_records(&records);
            Arc::new(PredictionService::from_store(&store, &config, Arc::new(SeaLevel)).unwrap())
        })
        .clone()
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();

    let metrics = ForecastMetrics::new();
    let state = Arc::new(AppState::new(health_registry, metrics, 180));
    let router = create_router(state.clone());

    (router, state)
}

async fn ready_app() -> Router {
    let (app, state) = setup_test_app().await;
    assert!(state.install(trained_service()));
    state.health_registry.mark_serving().await;
    app
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn days_from_today(days: i64) -> String {
    (chrono::Local::now().date_naive() + chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;
    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["dataset"].is_object());
    assert!(health["components"]["models"].is_object());
    assert!(health["components"]["elevation"].is_object());
}

#[tokio::test]
async fn test_healthz_returns_ok_when_elevation_degraded() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set_degraded(Component::Elevation, "Elevation API error (502)")
        .await;

    let (status, health) = get_json(app, "/healthz").await;

    // Degraded still returns 200 (operational)
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_dataset_unhealthy() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set_unhealthy(Component::Dataset, "Climate table missing")
        .await;

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_returns_503_while_training() {
    let (app, _state) = setup_test_app().await;
    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
    assert_eq!(readiness["phase"], "training");
    assert_eq!(readiness["reason"], "Models are still training");
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let app = ready_app().await;
    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_readyz_stays_ok_when_elevation_fails() {
    let (app, state) = setup_test_app().await;
    assert!(state.install(trained_service()));
    state.health_registry.mark_serving().await;
    state
        .health_registry
        .set_unhealthy(Component::Elevation, "Elevation API unreachable")
        .await;

    let (status, readiness) = get_json(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);

    let (status, health) = get_json(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["elevation"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_predict_returns_503_before_initialization() {
    let (app, _state) = setup_test_app().await;
    let uri = format!("/api/v1/predict?city=Delhi&date={}", days_from_today(3));
    let (status, body) = get_json(app, &uri).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "not_ready");
}

#[tokio::test]
async fn test_predict_returns_forecast() {
    let app = ready_app().await;
    let date = days_from_today(10);
    let uri = format!(
        "/api/v1/predict?city=Pune&state=Maharashtra&country=India&date={}",
        date
    );
    let (status, body) = get_json(app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], date.as_str());
    assert_eq!(body["location"]["city"], "Pune");
    assert_eq!(body["coordinates"]["latitude"], 18.5204);
    assert!(body["temperature"].is_number());
    assert!(body["day_type"].is_string());
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 3);
    assert_eq!(body["elevation"], 0.0);
}

#[tokio::test]
async fn test_predict_rejects_past_date() {
    let app = ready_app().await;
    let (status, body) = get_json(app, "/api/v1/predict?city=Delhi&date=2000-01-01").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "past_date");
    assert_eq!(body["details"]["date"], "2000-01-01");
}

#[tokio::test]
async fn test_predict_rejects_date_beyond_horizon() {
    let app = ready_app().await;
    let uri = format!("/api/v1/predict?city=Delhi&date={}", days_from_today(181));
    let (status, body) = get_json(app, &uri).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "beyond_horizon");
    assert_eq!(body["details"]["max_date"], days_from_today(180).as_str());
}

#[tokio::test]
async fn test_predict_rejects_malformed_date() {
    let app = ready_app().await;
    let (status, body) = get_json(app, "/api/v1/predict?city=Delhi&date=15-08-2025").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_format");
}

#[tokio::test]
async fn test_predict_missing_city_is_structured_400() {
    let app = ready_app().await;
    let uri = format!("/api/v1/predict?date={}", days_from_today(10));
    let (status, body) = get_json(app, &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert!(body["error"].as_str().unwrap().contains("city"));
}

#[tokio::test]
async fn test_date_range_available_before_initialization() {
    let (app, _state) = setup_test_app().await;
    let (status, body) = get_json(app, "/api/v1/date-range").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["horizon_days"], 180);
    assert_eq!(body["today"], days_from_today(0).as_str());
    assert_eq!(body["max_date"], days_from_today(180).as_str());
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, state) = setup_test_app().await;

    state.metrics.observe_prediction_latency(0.002);
    state.metrics.inc_validation_rejections("past_date");
    state.metrics.set_dataset_rows(2192);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("weather_forecast_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("weather_forecast_validation_rejections_total"));
    assert!(metrics_text.contains("weather_forecast_dataset_rows"));
}

#[tokio::test]
async fn test_install_is_one_shot() {
    let (_app, state) = setup_test_app().await;
    assert!(state.install(trained_service()));
    assert!(!state.install(trained_service()));
}
