//! Observability infrastructure for the forecaster
//!
//! Provides:
//! - Prometheus metrics (initialization time, training diagnostics, prediction latency and outcomes)
//! - Structured JSON logging with tracing

use crate::models::{Coordinates, PredictionResult};
use crate::predictor::TrainingReport;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for prediction latency (in seconds); the upper end
/// covers the elevation lookup timeout
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ForecastMetricsInner> = OnceLock::new();

struct ForecastMetricsInner {
    initialization_seconds: Gauge,
    dataset_rows: IntGauge,
    day_type_accuracy: Gauge,
    prediction_latency_seconds: Histogram,
    predictions_served: IntCounter,
    prediction_errors: IntCounter,
    validation_rejections: IntCounterVec,
    elevation_fallbacks: IntCounter,
}

impl ForecastMetricsInner {
    fn new() -> Self {
        Self {
            initialization_seconds: register_gauge!(
                "weather_forecast_initialization_seconds",
                "Time spent synthesizing the dataset and training the models"
            )
            .expect("Failed to register initialization_seconds"),

            dataset_rows: register_int_gauge!(
                "weather_forecast_dataset_rows",
                "Number of daily observations in the training series"
            )
            .expect("Failed to register dataset_rows"),

            day_type_accuracy: register_gauge!(
                "weather_forecast_day_type_accuracy",
                "Day-type classifier accuracy on the holdout rows"
            )
            .expect("Failed to register day_type_accuracy"),

            prediction_latency_seconds: register_histogram!(
                "weather_forecast_prediction_latency_seconds",
                "Time spent serving a prediction, including the elevation lookup",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_served: register_int_counter!(
                "weather_forecast_predictions_total",
                "Total number of predictions served"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter!(
                "weather_forecast_prediction_errors_total",
                "Total number of failed predictions"
            )
            .expect("Failed to register prediction_errors_total"),

            validation_rejections: register_int_counter_vec!(
                "weather_forecast_validation_rejections_total",
                "Requested dates rejected by validation",
                &["code"]
            )
            .expect("Failed to register validation_rejections_total"),

            elevation_fallbacks: register_int_counter!(
                "weather_forecast_elevation_fallbacks_total",
                "Elevation lookups that failed and fell back to sea level"
            )
            .expect("Failed to register elevation_fallbacks_total"),
        }
    }
}

/// Forecaster metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ForecastMetrics {
    _private: (),
}

impl Default for ForecastMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ForecastMetricsInner {
        GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new)
    }

    pub fn set_initialization_seconds(&self, seconds: f64) {
        self.inner().initialization_seconds.set(seconds);
    }

    pub fn set_dataset_rows(&self, rows: usize) {
        self.inner().dataset_rows.set(rows as i64);
    }

    pub fn set_day_type_accuracy(&self, accuracy: f64) {
        self.inner().day_type_accuracy.set(accuracy);
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions_served(&self) {
        self.inner().predictions_served.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    /// Count a rejected date under its validation code
    pub fn inc_validation_rejections(&self, code: &str) {
        self.inner()
            .validation_rejections
            .with_label_values(&[code])
            .inc();
    }

    pub fn inc_elevation_fallbacks(&self) {
        self.inner().elevation_fallbacks.inc();
    }
}

/// Structured logger for forecaster events
///
/// Provides consistent JSON-formatted logging for the service lifecycle
/// and for every prediction served.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            "Weather forecast service started"
        );
    }

    /// Log the synthesized training series
    pub fn log_dataset_ready(&self, rows: usize, first_year: i32, last_year: i32) {
        info!(
            event = "dataset_ready",
            instance = %self.instance,
            rows = rows,
            first_year = first_year,
            last_year = last_year,
            "Daily training series ready"
        );
    }

    /// Log a completed training run
    pub fn log_training_complete(&self, report: &TrainingReport) {
        info!(
            event = "training_complete",
            instance = %self.instance,
            train_rows = report.train_rows,
            test_rows = report.test_rows,
            day_type_accuracy = ?report.day_type_accuracy,
            duration_ms = report.duration.as_millis() as u64,
            "Models trained"
        );
    }

    /// Log a served prediction
    pub fn log_prediction(&self, result: &PredictionResult, duration_us: u64) {
        info!(
            event = "prediction_served",
            instance = %self.instance,
            city = %result.location.city,
            date = %result.date,
            temperature = result.temperature,
            rain_probability = result.rain_probability,
            day_type = %result.day_type,
            ml_day_type = %result.ml_day_type,
            ml_confidence = result.ml_confidence,
            duration_us = duration_us,
            "Prediction served"
        );
    }

    /// Log a rejected target date
    pub fn log_validation_rejected(&self, date_text: &str, code: &str) {
        info!(
            event = "validation_rejected",
            instance = %self.instance,
            date = %date_text,
            code = %code,
            "Requested date rejected"
        );
    }

    /// Log a failed elevation lookup
    pub fn log_elevation_fallback(&self, coordinates: Coordinates, error: &anyhow::Error) {
        warn!(
            event = "elevation_fallback",
            instance = %self.instance,
            latitude = coordinates.latitude,
            longitude = coordinates.longitude,
            error = %format!("{error:#}"),
            "Elevation lookup failed, using sea level"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Weather forecast service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_metrics_creation() {
        let metrics = ForecastMetrics::new();

        metrics.set_initialization_seconds(1.5);
        metrics.set_dataset_rows(45_000);
        metrics.set_day_type_accuracy(0.82);
        metrics.observe_prediction_latency(0.004);
        metrics.inc_predictions_served();
        metrics.inc_validation_rejections("past_date");
        metrics.inc_elevation_fallbacks();
    }

    #[test]
    fn test_metrics_are_gathered() {
        let metrics = ForecastMetrics::new();
        metrics.inc_validation_rejections("beyond_horizon");

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "weather_forecast_validation_rejections_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("forecast-0");
        assert_eq!(logger.instance, "forecast-0");
    }
}
