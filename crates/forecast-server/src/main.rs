//! Weather forecast service
//!
//! Starts the HTTP server immediately, trains the models on a blocking
//! thread and opens the prediction API once training completes.

use anyhow::{Context, Result};
use forecast_lib::{
    geo::OpenElevationClient,
    health::{Component, HealthRegistry},
    observability::{ForecastMetrics, StructuredLogger},
    InitializationError, PredictionService,
};
use forecast_server::{api, config::ServerConfig, elevation::MonitoredElevation};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting forecast-server");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance,
        rainfall_csv = %config.rainfall_csv.display(),
        temperature_csv = %config.temperature_csv.display(),
        "Server configured"
    );

    let health_registry = HealthRegistry::new();

    let metrics = ForecastMetrics::new();
    let logger = StructuredLogger::new(&config.instance);
    logger.log_startup(SERVICE_VERSION);

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        config.horizon_days,
    ));

    // Health and metrics are served while the models train
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state.clone()));

    let elevation = OpenElevationClient::with_timeout(
        &config.elevation_api_url,
        config.elevation_timeout(),
    )
    .context("Failed to create elevation client")?;
    let elevation = Arc::new(MonitoredElevation::new(elevation, health_registry.clone()));

    let service_config = config.service_config();
    let started = Instant::now();
    let initialized = tokio::task::spawn_blocking(move || {
        PredictionService::initialize(&service_config, elevation)
    })
    .await
    .map_err(|e| InitializationError::Task(e.to_string()))
    .and_then(|result| result);

    match initialized {
        Ok(service) => {
            app_state.install(Arc::new(service));
            health_registry.mark_serving().await;
            info!(
                duration_secs = started.elapsed().as_secs_f64(),
                "Prediction API ready"
            );
        }
        Err(e) => {
            let component = match e {
                InitializationError::FileOpen(..)
                | InitializationError::Csv(..)
                | InitializationError::MissingColumn { .. }
                | InitializationError::EmptyDataset => Component::Dataset,
                _ => Component::Models,
            };
            health_registry.mark_failed(component, e.to_string()).await;
            error!(error = %e, "Initialization failed");
            logger.log_shutdown("initialization failed");
            api_handle.abort();
            return Err(e).context("Failed to initialize prediction service");
        }
    }

    tokio::select! {
        result = api_handle => {
            result.context("API server task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }
    info!("Shutting down");

    Ok(())
}
