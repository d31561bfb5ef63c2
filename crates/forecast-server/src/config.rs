//! Server configuration
//!
//! Read from an optional `forecast.toml` (or any format the `config` crate
//! recognises under that base name) and then from `FORECAST_*` environment
//! variables, which take precedence.

use anyhow::{Context, Result};
use forecast_lib::climate::{SynthesisConfig, FIRST_YEAR};
use forecast_lib::geo::DEFAULT_ELEVATION_API;
use forecast_lib::predictor::{EnsembleParams, ForestParams};
use forecast_lib::{ServiceConfig, FORECAST_HORIZON_DAYS};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name attached to structured log events
    #[serde(default = "default_instance")]
    pub instance: String,

    /// Port for the health, metrics and prediction API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_rainfall_csv")]
    pub rainfall_csv: PathBuf,

    #[serde(default = "default_temperature_csv")]
    pub temperature_csv: PathBuf,

    /// Open-Elevation compatible lookup endpoint
    #[serde(default = "default_elevation_api_url")]
    pub elevation_api_url: String,

    #[serde(default = "default_elevation_timeout")]
    pub elevation_timeout_secs: u64,

    /// Seed for the synthetic series; unset means a fresh series every start
    #[serde(default)]
    pub synthesis_seed: Option<u64>,

    #[serde(default = "default_start_year")]
    pub start_year: i32,

    /// Last synthesized year; defaults to the current year
    #[serde(default)]
    pub end_year: Option<i32>,

    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,

    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_forest_seed")]
    pub forest_seed: u64,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "forecast".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_rainfall_csv() -> PathBuf {
    PathBuf::from("data/rainfall.csv")
}

fn default_temperature_csv() -> PathBuf {
    PathBuf::from("data/temperature.csv")
}

fn default_elevation_api_url() -> String {
    DEFAULT_ELEVATION_API.to_string()
}

fn default_elevation_timeout() -> u64 {
    10
}

fn default_start_year() -> i32 {
    FIRST_YEAR
}

fn default_horizon_days() -> i64 {
    FORECAST_HORIZON_DAYS
}

fn default_n_trees() -> usize {
    100
}

fn default_max_depth() -> usize {
    15
}

fn default_forest_seed() -> u64 {
    42
}

impl ServerConfig {
    /// Load configuration from the optional config file and environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("forecast").required(false))
            .add_source(config::Environment::with_prefix("FORECAST").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn elevation_timeout(&self) -> Duration {
        Duration::from_secs(self.elevation_timeout_secs)
    }

    /// Settings for building the prediction service
    pub fn service_config(&self) -> ServiceConfig {
        let synthesis = SynthesisConfig {
            start_year: self.start_year,
            end_year: self
                .end_year
                .unwrap_or_else(|| SynthesisConfig::default().end_year),
        };
        let forest = |base: ForestParams| ForestParams {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            seed: self.forest_seed,
            ..base
        };

        ServiceConfig {
            rainfall_csv: self.rainfall_csv.clone(),
            temperature_csv: self.temperature_csv.clone(),
            synthesis,
            synthesis_seed: self.synthesis_seed,
            ensemble: EnsembleParams {
                regression: forest(ForestParams::regression()),
                classification: forest(ForestParams::classification()),
                ..EnsembleParams::default()
            },
            horizon_days: self.horizon_days,
            instance: self.instance.clone(),
            ..ServiceConfig::default()
        }
    }
}
