//! The five weather models
//!
//! Every model is trained on the same feature rows and the same 80/20 row
//! partition. Only the day-type classifier is scored on the holdout rows;
//! the score is a diagnostic and never blocks startup.

use super::forest::{ForestParams, RandomForestClassifier, RandomForestRegressor};
use crate::day_type::TrainingDayType;
use crate::error::{InitializationError, PredictionError, TrainingError};
use crate::models::{DailyObservation, FeatureRow, FeatureVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Share of rows held out for the day-type accuracy diagnostic
pub const TEST_FRACTION: f64 = 0.2;

/// Seed for the holdout shuffle
pub const SPLIT_SEED: u64 = 42;

/// Training configuration for the whole ensemble
#[derive(Debug, Clone)]
pub struct EnsembleParams {
    pub regression: ForestParams,
    pub classification: ForestParams,
    pub test_fraction: f64,
    pub split_seed: u64,
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self {
            regression: ForestParams::regression(),
            classification: ForestParams::classification(),
            test_fraction: TEST_FRACTION,
            split_seed: SPLIT_SEED,
        }
    }
}

/// Row partition shared by every target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl HoldoutSplit {
    /// Shuffle `0..n` with `seed` and hold out `ceil(n * test_fraction)` rows.
    /// At least one row always stays in the training part.
    pub fn new(n: usize, test_fraction: f64, seed: u64) -> Self {
        let mut rows: Vec<usize> = (0..n).collect();
        rows.shuffle(&mut StdRng::seed_from_u64(seed));

        let n_test = ((n as f64 * test_fraction.clamp(0.0, 1.0)).ceil() as usize)
            .min(n.saturating_sub(1));
        let train = rows.split_off(n_test);
        Self { train, test: rows }
    }
}

/// Summary of a completed training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    /// Day-type classifier accuracy on the holdout rows, if any were held out
    pub day_type_accuracy: Option<f64>,
    pub duration: Duration,
}

/// Unrounded outputs of the five models for one feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPrediction {
    pub temperature: f64,
    /// Expected rainfall (mm), floored at zero
    pub rainfall: f64,
    /// Probability of rain as a percentage
    pub rain_probability: f64,
    /// Wind speed (km/h), floored at zero
    pub wind_speed: f64,
    pub day_type: TrainingDayType,
    /// Probability of `day_type` in `[0, 1]`
    pub confidence: f64,
}

/// Trained temperature, rainfall, rain occurrence, wind and day-type models
#[derive(Debug)]
pub struct ModelEnsemble {
    temperature: RandomForestRegressor,
    rainfall: RandomForestRegressor,
    rain_occurrence: RandomForestClassifier,
    wind_speed: RandomForestRegressor,
    day_type: RandomForestClassifier,
    report: TrainingReport,
}

fn training_failed(model: &'static str) -> impl FnOnce(TrainingError) -> InitializationError {
    move |source| InitializationError::Training { model, source }
}

impl ModelEnsemble {
    /// Train all five models on `features`, where `features[i]` was built from
    /// `observations[i]`.
    pub fn train(
        features: &[FeatureVector],
        observations: &[DailyObservation],
        params: &EnsembleParams,
    ) -> Result<Self, InitializationError> {
        if features.is_empty() || observations.is_empty() {
            return Err(InitializationError::EmptyDataset);
        }
        if features.len() != observations.len() {
            return Err(InitializationError::Training {
                model: "ensemble",
                source: TrainingError::LengthMismatch {
                    rows: features.len(),
                    targets: observations.len(),
                },
            });
        }

        let started = Instant::now();
        let split = HoldoutSplit::new(features.len(), params.test_fraction, params.split_seed);
        info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            "Training weather models"
        );

        let rows: Vec<FeatureRow> = split.train.iter().map(|&i| features[i].to_row()).collect();
        let train_obs: Vec<&DailyObservation> = split.train.iter().map(|&i| &observations[i]).collect();

        let temperatures: Vec<f64> = train_obs.iter().map(|o| o.temperature).collect();
        let rain_amounts: Vec<f64> = train_obs.iter().map(|o| o.rainfall).collect();
        let has_rain: Vec<usize> = train_obs.iter().map(|o| usize::from(o.has_rain)).collect();
        let winds: Vec<f64> = train_obs.iter().map(|o| o.wind_speed).collect();
        let day_types: Vec<usize> = train_obs.iter().map(|o| o.day_type.index()).collect();

        let temperature = RandomForestRegressor::fit(&rows, &temperatures, &params.regression)
            .map_err(training_failed("temperature"))?;
        debug!(model = "temperature", "Model trained");

        let rainfall = RandomForestRegressor::fit(&rows, &rain_amounts, &params.regression)
            .map_err(training_failed("rainfall"))?;
        debug!(model = "rainfall", "Model trained");

        let rain_occurrence =
            RandomForestClassifier::fit(&rows, &has_rain, 2, &params.classification)
                .map_err(training_failed("rain_occurrence"))?;
        debug!(model = "rain_occurrence", "Model trained");

        let wind_speed = RandomForestRegressor::fit(&rows, &winds, &params.regression)
            .map_err(training_failed("wind_speed"))?;
        debug!(model = "wind_speed", "Model trained");

        let day_type = RandomForestClassifier::fit(
            &rows,
            &day_types,
            TrainingDayType::COUNT,
            &params.classification,
        )
        .map_err(training_failed("day_type"))?;
        debug!(model = "day_type", "Model trained");

        let day_type_accuracy = if split.test.is_empty() {
            None
        } else {
            let correct = split
                .test
                .iter()
                .filter(|&&i| {
                    let (class, _) = day_type.predict(&features[i].to_row());
                    class == observations[i].day_type.index()
                })
                .count();
            Some(correct as f64 / split.test.len() as f64)
        };

        let report = TrainingReport {
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            day_type_accuracy,
            duration: started.elapsed(),
        };
        info!(
            day_type_accuracy = ?report.day_type_accuracy,
            duration_ms = report.duration.as_millis() as u64,
            "Weather models trained"
        );

        Ok(Self {
            temperature,
            rainfall,
            rain_occurrence,
            wind_speed,
            day_type,
            report,
        })
    }

    /// Run every model on one feature vector
    pub fn predict(&self, features: &FeatureVector) -> Result<RawPrediction, PredictionError> {
        let row = features.to_row();

        let temperature = finite("temperature", self.temperature.predict(&row))?;
        let rainfall = finite("rainfall", self.rainfall.predict(&row))?.max(0.0);
        let proba = self.rain_occurrence.predict_proba(&row);
        let rain_probability =
            finite("rain_occurrence", proba.get(1).copied().unwrap_or(0.0) * 100.0)?;
        let wind_speed = finite("wind_speed", self.wind_speed.predict(&row))?.max(0.0);

        let (class, confidence) = self.day_type.predict(&row);
        let day_type = TrainingDayType::from_index(class)
            .ok_or(PredictionError::NonFiniteOutput { model: "day_type" })?;

        Ok(RawPrediction {
            temperature,
            rainfall,
            rain_probability,
            wind_speed,
            day_type,
            confidence: finite("day_type", confidence)?,
        })
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }
}

fn finite(model: &'static str, value: f64) -> Result<f64, PredictionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PredictionError::NonFiniteOutput { model })
    }
}
