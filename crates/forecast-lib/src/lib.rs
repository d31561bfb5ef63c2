//! Seasonal weather forecaster
//!
//! This crate provides the core functionality for:
//! - Loading seasonal climate tables and synthesizing a daily series
//! - Feature engineering and random-forest training
//! - Day-type classification and forecast post-processing
//! - Location and elevation lookup
//! - Health checks and observability

pub mod climate;
pub mod day_type;
pub mod error;
pub mod geo;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;

pub use day_type::{Backdrop, DayType, TrainingDayType};
pub use error::{ForecastError, InitializationError, PredictionError, ValidationError};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, Phase,
    ReadinessResponse,
};
pub use models::*;
pub use observability::{ForecastMetrics, StructuredLogger};
pub use service::{DateRange, PredictionService, ServiceConfig, FORECAST_HORIZON_DAYS};
