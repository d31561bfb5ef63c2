//! Prediction service
//!
//! [`PredictionService`] owns the synthesized daily series and the trained
//! models. It is built once by [`PredictionService::initialize`], which runs
//! synthesis, feature engineering and training to completion, and is then
//! shared read-only between callers.

use crate::climate::{
    DailySeries, SeasonalRecordStore, SynthesisConfig, SyntheticDailyDatasetBuilder,
};
use crate::error::{ForecastError, InitializationError, PredictionError, ValidationError};
use crate::geo::{coordinates_for, ElevationProvider, DEFAULT_COORDINATES};
use crate::models::{Coordinates, Location, PredictionResult};
use crate::observability::{ForecastMetrics, StructuredLogger};
use crate::predictor::{
    EnsembleParams, FeatureEngineer, ForecastContext, ModelEnsemble, OutputConfig, OutputFormatter,
    RawPrediction, TrainingReport,
};
use chrono::{Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// How far ahead a forecast may be requested (days, inclusive)
pub const FORECAST_HORIZON_DAYS: i64 = 180;

/// Accepted date format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Everything needed to build a [`PredictionService`]
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub rainfall_csv: PathBuf,
    pub temperature_csv: PathBuf,
    pub synthesis: SynthesisConfig,
    /// Seed for the synthesis noise; `None` draws from OS entropy
    pub synthesis_seed: Option<u64>,
    pub ensemble: EnsembleParams,
    pub output: OutputConfig,
    pub horizon_days: i64,
    /// Instance name attached to structured log events
    pub instance: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            rainfall_csv: PathBuf::from("data/rainfall.csv"),
            temperature_csv: PathBuf::from("data/temperature.csv"),
            synthesis: SynthesisConfig::default(),
            synthesis_seed: None,
            ensemble: EnsembleParams::default(),
            output: OutputConfig::default(),
            horizon_days: FORECAST_HORIZON_DAYS,
            instance: "forecast".to_string(),
        }
    }
}

/// Window of dates a forecast can be requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub today: NaiveDate,
    pub max_date: NaiveDate,
    pub horizon_days: i64,
}

impl DateRange {
    pub fn starting(today: NaiveDate, horizon_days: i64) -> Self {
        let max_date = today
            .checked_add_signed(Duration::days(horizon_days))
            .unwrap_or(NaiveDate::MAX);
        Self {
            today,
            max_date,
            horizon_days,
        }
    }

    /// Window starting at the local calendar date
    pub fn current(horizon_days: i64) -> Self {
        Self::starting(today(), horizon_days)
    }
}

/// Trained, read-only forecaster
pub struct PredictionService {
    series: DailySeries,
    ensemble: ModelEnsemble,
    engineer: FeatureEngineer,
    formatter: OutputFormatter,
    elevation: Arc<dyn ElevationProvider>,
    horizon_days: i64,
    metrics: ForecastMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    /// Load the climate tables named in `config` and train the models.
    ///
    /// Blocks for the whole synthesis and training run.
    pub fn initialize(
        config: &ServiceConfig,
        elevation: Arc<dyn ElevationProvider>,
    ) -> Result<Self, InitializationError> {
        let store = SeasonalRecordStore::load(&config.rainfall_csv, &config.temperature_csv)?;
        Self::from_store(&store, config, elevation)
    }

    /// Train the models from an already-loaded store
    pub fn from_store(
        store: &SeasonalRecordStore,
        config: &ServiceConfig,
        elevation: Arc<dyn ElevationProvider>,
    ) -> Result<Self, InitializationError> {
        let started = Instant::now();
        let metrics = ForecastMetrics::new();
        let logger = StructuredLogger::new(config.instance.clone());

        if store.is_empty() {
            warn!("Climate tables have no usable rows, synthesizing from default climate");
        }

        let mut rng = match config.synthesis_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let series =
            SyntheticDailyDatasetBuilder::with_config(store, config.synthesis).build(&mut rng);
        if series.is_empty() {
            return Err(InitializationError::EmptyDataset);
        }
        metrics.set_dataset_rows(series.len());
        logger.log_dataset_ready(
            series.len(),
            config.synthesis.start_year,
            config.synthesis.end_year,
        );

        let engineer = FeatureEngineer::new();
        let features = engineer.engineer(series.observations());
        let ensemble = ModelEnsemble::train(&features, series.observations(), &config.ensemble)?;

        let report = ensemble.report();
        if let Some(accuracy) = report.day_type_accuracy {
            metrics.set_day_type_accuracy(accuracy);
        }
        logger.log_training_complete(report);
        metrics.set_initialization_seconds(started.elapsed().as_secs_f64());

        Ok(Self {
            series,
            ensemble,
            engineer,
            formatter: OutputFormatter::with_config(config.output.clone()),
            elevation,
            horizon_days: config.horizon_days,
            metrics,
            logger,
        })
    }

    /// Validate `text` against the local calendar date
    pub fn validate_date(&self, text: &str) -> Result<NaiveDate, ValidationError> {
        self.validate_date_on(text, today())
    }

    /// Validate `text` as a date in `[today, today + horizon]`
    pub fn validate_date_on(
        &self,
        text: &str,
        today: NaiveDate,
    ) -> Result<NaiveDate, ValidationError> {
        validate_date_on(text, today, self.horizon_days)
    }

    pub fn date_range(&self) -> DateRange {
        DateRange::current(self.horizon_days)
    }

    /// Forecast for a city and a `YYYY-MM-DD` date
    pub async fn predict(
        &self,
        city: &str,
        state: &str,
        country: &str,
        date_text: &str,
    ) -> Result<PredictionResult, ForecastError> {
        self.predict_on(city, state, country, date_text, today()).await
    }

    /// [`predict`](Self::predict) with an explicit "today"
    pub async fn predict_on(
        &self,
        city: &str,
        state: &str,
        country: &str,
        date_text: &str,
        today: NaiveDate,
    ) -> Result<PredictionResult, ForecastError> {
        let started = Instant::now();

        let date = match self.validate_date_on(date_text, today) {
            Ok(date) => date,
            Err(e) => {
                self.metrics.inc_validation_rejections(e.code());
                self.logger.log_validation_rejected(date_text, e.code());
                return Err(e.into());
            }
        };

        let coordinates = coordinates_for(city).unwrap_or_else(|| {
            debug!(city = %city, "Unknown city, using country centroid");
            DEFAULT_COORDINATES
        });
        let elevation = self.resolve_elevation(coordinates).await;

        let result = self.forecast(date).map(|raw| {
            let context = ForecastContext {
                location: Location {
                    city: city.to_string(),
                    state: state.to_string(),
                    country: country.to_string(),
                },
                date,
                coordinates,
                elevation,
            };
            self.formatter.format(&raw, context)
        });

        match result {
            Ok(prediction) => {
                let elapsed = started.elapsed();
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.metrics.inc_predictions_served();
                self.logger
                    .log_prediction(&prediction, elapsed.as_micros() as u64);
                Ok(prediction)
            }
            Err(e) => {
                self.metrics.inc_prediction_errors();
                Err(e.into())
            }
        }
    }

    fn forecast(&self, date: NaiveDate) -> Result<RawPrediction, PredictionError> {
        let features = self.engineer.query_features(&self.series, date);
        if !features.is_complete() {
            return Err(PredictionError::IncompleteFeatures { date });
        }
        self.ensemble.predict(&features)
    }

    /// Elevation for `coordinates`, or sea level when the lookup fails
    async fn resolve_elevation(&self, coordinates: Coordinates) -> f64 {
        let lookup = self
            .elevation
            .elevation(coordinates)
            .await
            .and_then(|e| {
                if e.is_finite() {
                    Ok(e)
                } else {
                    Err(anyhow::anyhow!("Elevation service returned {e}"))
                }
            });
        match lookup {
            Ok(elevation) => elevation,
            Err(e) => {
                self.metrics.inc_elevation_fallbacks();
                self.logger.log_elevation_fallback(coordinates, &e);
                0.0
            }
        }
    }

    pub fn series(&self) -> &DailySeries {
        &self.series
    }

    pub fn training_report(&self) -> &TrainingReport {
        self.ensemble.report()
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse `text` and check it lies in `[today, today + horizon_days]`
pub fn validate_date_on(
    text: &str,
    today: NaiveDate,
    horizon_days: i64,
) -> Result<NaiveDate, ValidationError> {
    let date = NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidFormat(text.to_string()))?;

    let range = DateRange::starting(today, horizon_days);
    if date < range.today {
        return Err(ValidationError::PastDate { date, today });
    }
    if date > range.max_date {
        return Err(ValidationError::BeyondHorizon {
            date,
            max: range.max_date,
        });
    }
    Ok(date)
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("series_len", &self.series.len())
            .field("horizon_days", &self.horizon_days)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeasonalRecord;
    use crate::predictor::{ForestParams, MaxFeatures};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    struct FixedElevation {
        metres: f64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ElevationProvider for FixedElevation {
        async fn elevation(&self, _coordinates: Coordinates) -> anyhow::Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.metres)
        }
    }

    struct FailingElevation;

    #[async_trait]
    impl ElevationProvider for FailingElevation {
        async fn elevation(&self, _coordinates: Coordinates) -> anyhow::Result<f64> {
            anyhow::bail!("Elevation API error (504 Gateway Timeout)")
        }
    }

    fn records() -> Vec<SeasonalRecord> {
        (2015..=2024)
            .map(|year| SeasonalRecord {
                year,
                winter_temp: 18.0,
                pre_monsoon_temp: 27.5,
                monsoon_temp: 28.5,
                post_monsoon_temp: 22.0,
                annual_temp: 25.0,
                jun_rain: 160.0,
                jul_rain: 270.0,
                aug_rain: 250.0,
                sep_rain: 170.0,
            })
            .collect()
    }

    fn test_config() -> ServiceConfig {
        let forest = ForestParams {
            n_trees: 10,
            max_depth: 8,
            ..ForestParams::default()
        };
        ServiceConfig {
            synthesis: SynthesisConfig {
                start_year: 2018,
                end_year: 2024,
            },
            synthesis_seed: Some(11),
            ensemble: EnsembleParams {
                regression: forest.clone(),
                classification: ForestParams {
                    max_features: MaxFeatures::Sqrt,
                    ..forest
                },
                ..EnsembleParams::default()
            },
            ..ServiceConfig::default()
        }
    }

    fn service_with(elevation: Arc<dyn ElevationProvider>) -> PredictionService {
        let store = SeasonalRecordStore::from_records(&records());
        PredictionService::from_store(&store, &test_config(), elevation).unwrap()
    }

    fn shared_service() -> &'static PredictionService {
        static SERVICE: OnceLock<PredictionService> = OnceLock::new();
        SERVICE.get_or_init(|| {
            service_with(Arc::new(FixedElevation {
                metres: 0.0,
                calls: AtomicUsize::new(0),
            }))
        })
    }

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_past_date_rejected() {
        let err = validate_date_on("2024-01-01", june_first(), 180).unwrap_err();
        assert!(matches!(err, ValidationError::PastDate { .. }));
        assert_eq!(err.code(), "past_date");
    }

    #[test]
    fn test_horizon_is_inclusive() {
        let today = june_first();
        let at_limit = today + Duration::days(180);
        assert_eq!(
            validate_date_on(&at_limit.to_string(), today, 180),
            Ok(at_limit)
        );

        let beyond = today + Duration::days(200);
        let err = validate_date_on(&beyond.to_string(), today, 180).unwrap_err();
        assert_eq!(
            err,
            ValidationError::BeyondHorizon {
                date: beyond,
                max: at_limit
            }
        );
    }

    #[test]
    fn test_today_is_accepted() {
        assert_eq!(validate_date_on("2025-06-01", june_first(), 180), Ok(june_first()));
    }

    #[test]
    fn test_invalid_format_rejected() {
        for text in ["01/07/2025", "2025-13-01", "2025-02-30", "tomorrow", ""] {
            let err = validate_date_on(text, june_first(), 180).unwrap_err();
            assert_eq!(err.code(), "invalid_format", "{text}");
        }
    }

    #[test]
    fn test_date_range_spans_horizon() {
        let range = DateRange::starting(june_first(), 180);
        assert_eq!(range.max_date, NaiveDate::from_ymd_opt(2025, 11, 28).unwrap());
    }

    #[test]
    fn test_empty_store_synthesizes_from_default_climate() {
        let config = ServiceConfig {
            synthesis: SynthesisConfig {
                start_year: 2020,
                end_year: 2021,
            },
            synthesis_seed: Some(1),
            ..test_config()
        };
        let service = PredictionService::from_store(
            &SeasonalRecordStore::default(),
            &config,
            Arc::new(FailingElevation),
        )
        .unwrap();

        assert_eq!(service.series().len(), 366 + 365);
        assert!(service
            .series()
            .observations()
            .iter()
            .all(|o| o.annual_temp_trend == crate::climate::DEFAULT_ANNUAL_TEMP));
    }

    #[test]
    fn test_empty_year_range_fails_initialization() {
        let config = ServiceConfig {
            synthesis: SynthesisConfig {
                start_year: 2024,
                end_year: 2020,
            },
            ..test_config()
        };
        let store = SeasonalRecordStore::from_records(&records());
        let err = PredictionService::from_store(&store, &config, Arc::new(FailingElevation))
            .unwrap_err();
        assert!(matches!(err, InitializationError::EmptyDataset));
    }

    #[test]
    fn test_missing_tables_fail_initialization() {
        let config = ServiceConfig {
            rainfall_csv: PathBuf::from("/nonexistent/rain.csv"),
            ..test_config()
        };
        let err = PredictionService::initialize(&config, Arc::new(FailingElevation)).unwrap_err();
        assert!(matches!(err, InitializationError::FileOpen(..)));
    }

    #[tokio::test]
    async fn test_predict_known_city() {
        let service = shared_service();
        let result = service
            .predict_on("Mumbai", "Maharashtra", "India", "2025-07-20", june_first())
            .await
            .unwrap();

        assert_eq!(result.location.city, "Mumbai");
        assert_eq!(result.coordinates.latitude, 19.0760);
        assert_eq!(result.date, "2025-07-20");
        assert_eq!(result.day_name, "Sunday");
        assert!(result.expected_rainfall >= 0.0);
        assert!((0.0..=100.0).contains(&result.rain_probability));
        assert!((0.0..=100.0).contains(&result.ml_confidence));
        assert_eq!(result.recommendations.len(), 3);
        assert_eq!(result.day_type_description, result.day_type.description());
    }

    #[tokio::test]
    async fn test_unknown_city_uses_centroid() {
        let result = shared_service()
            .predict_on("Nowhereville", "", "India", "2025-06-15", june_first())
            .await
            .unwrap();
        assert_eq!(result.coordinates, DEFAULT_COORDINATES);
    }

    #[tokio::test]
    async fn test_failed_elevation_lookup_is_sea_level() {
        let service = service_with(Arc::new(FailingElevation));
        let result = service
            .predict_on("Shimla", "Himachal Pradesh", "India", "2025-06-15", june_first())
            .await
            .unwrap();
        assert_eq!(result.elevation, 0.0);
    }

    #[tokio::test]
    async fn test_elevation_timeout_is_sea_level() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let client = crate::geo::OpenElevationClient::with_timeout(
            &format!("http://{addr}/api/v1/lookup"),
            std::time::Duration::from_millis(50),
        )
        .unwrap();

        let result = service_with(Arc::new(client))
            .predict_on("Shimla", "Himachal Pradesh", "India", "2025-06-15", june_first())
            .await
            .unwrap();
        assert_eq!(result.elevation, 0.0);
    }

    #[tokio::test]
    async fn test_elevation_cools_prediction() {
        let high = service_with(Arc::new(FixedElevation {
            metres: 2000.0,
            calls: AtomicUsize::new(0),
        }));
        let low = service_with(Arc::new(FixedElevation {
            metres: 0.0,
            calls: AtomicUsize::new(0),
        }));

        let date = "2025-08-01";
        let a = high.predict_on("Delhi", "", "India", date, june_first()).await.unwrap();
        let b = low.predict_on("Delhi", "", "India", date, june_first()).await.unwrap();
        // Same seeds give the same models; only the lapse-rate term differs
        assert!((b.temperature - a.temperature - 13.0).abs() < 0.11);
        assert_eq!(a.elevation, 2000.0);
    }

    #[tokio::test]
    async fn test_rejected_date_skips_lookup() {
        let provider = Arc::new(FixedElevation {
            metres: 100.0,
            calls: AtomicUsize::new(0),
        });
        let service = service_with(provider.clone());
        let err = service
            .predict_on("Delhi", "", "India", "2024-01-01", june_first())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ForecastError::Validation(ValidationError::PastDate { .. })
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_seeded_initialization_is_reproducible() {
        let a = service_with(Arc::new(FailingElevation));
        let b = service_with(Arc::new(FailingElevation));
        let temps = |s: &PredictionService| {
            s.series()
                .observations()
                .iter()
                .map(|o| o.temperature)
                .collect::<Vec<_>>()
        };
        assert_eq!(temps(&a), temps(&b));
        assert_eq!(
            a.training_report().day_type_accuracy,
            b.training_report().day_type_accuracy
        );
    }
}
