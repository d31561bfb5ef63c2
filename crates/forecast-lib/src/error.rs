use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error returned at the forecaster's public boundary
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

/// Fatal errors raised while loading data or training models
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to open climate table '{0}'")]
    FileOpen(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse climate table '{0}'")]
    Csv(PathBuf, #[source] csv::Error),

    #[error("Required column '{column}' not found in '{path}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Synthesized dataset is empty")]
    EmptyDataset,

    #[error("Failed to train {model} model")]
    Training {
        model: &'static str,
        #[source]
        source: TrainingError,
    },

    #[error("Background initialization task failed: {0}")]
    Task(String),
}

/// Errors from fitting a tree ensemble
#[derive(Debug, Error, PartialEq)]
pub enum TrainingError {
    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Feature rows ({rows}) and targets ({targets}) differ in length")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("Class label {label} is outside 0..{n_classes}")]
    LabelOutOfRange { label: usize, n_classes: usize },

    #[error("Target value at row {row} is not finite")]
    NonFiniteTarget { row: usize },
}

/// Rejected target date
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid date format '{0}'. Please use YYYY-MM-DD format.")]
    InvalidFormat(String),

    #[error("Date {date} is in the past. Please select today ({today}) or a future date.")]
    PastDate { date: NaiveDate, today: NaiveDate },

    #[error("Date {date} is too far in the future. Maximum allowed: {max}")]
    BeyondHorizon { date: NaiveDate, max: NaiveDate },
}

impl ValidationError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidFormat(_) => "invalid_format",
            ValidationError::PastDate { .. } => "past_date",
            ValidationError::BeyondHorizon { .. } => "beyond_horizon",
        }
    }
}

/// Recoverable failure during feature construction or inference
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Feature vector for {date} contains undefined values")]
    IncompleteFeatures { date: NaiveDate },

    #[error("Model '{model}' produced a non-finite output")]
    NonFiniteOutput { model: &'static str },
}
