//! Core data models for the forecaster

use crate::day_type::{Backdrop, DayType, TrainingDayType};
use serde::{Deserialize, Serialize};

/// Number of model input features
pub const FEATURE_COUNT: usize = 15;

/// Model input row in canonical feature order
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Column names in the order they appear in a [`FeatureRow`]
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "year",
    "month",
    "day",
    "day_of_year",
    "year_trend",
    "day_sin",
    "day_cos",
    "month_sin",
    "month_cos",
    "temp_lag1",
    "rain_lag1",
    "wind_lag1",
    "temp_roll7",
    "rain_roll7",
    "annual_temp",
];

/// One year of aggregated climate statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalRecord {
    pub year: i32,
    /// Jan-Feb mean temperature (°C)
    pub winter_temp: f64,
    /// Mar-May mean temperature (°C)
    pub pre_monsoon_temp: f64,
    /// Jun-Sep mean temperature (°C)
    pub monsoon_temp: f64,
    /// Oct-Dec mean temperature (°C)
    pub post_monsoon_temp: f64,
    pub annual_temp: f64,
    /// Monthly rainfall totals (mm) for June through September
    pub jun_rain: f64,
    pub jul_rain: f64,
    pub aug_rain: f64,
    pub sep_rain: f64,
}

/// Synthesized weather for a single calendar day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyObservation {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub temperature: f64,
    pub rainfall: f64,
    pub wind_speed: f64,
    pub has_rain: bool,
    pub annual_temp_trend: f64,
    pub day_type: TrainingDayType,
}

/// Feature vector for model training and inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub year: f64,
    pub month: f64,
    pub day: f64,
    pub day_of_year: f64,
    pub year_trend: f64,
    pub day_sin: f64,
    pub day_cos: f64,
    pub month_sin: f64,
    pub month_cos: f64,
    pub temp_lag1: f64,
    pub rain_lag1: f64,
    pub wind_lag1: f64,
    pub temp_roll7: f64,
    pub rain_roll7: f64,
    pub annual_temp: f64,
}

impl FeatureVector {
    pub fn to_row(&self) -> FeatureRow {
        [
            self.year,
            self.month,
            self.day,
            self.day_of_year,
            self.year_trend,
            self.day_sin,
            self.day_cos,
            self.month_sin,
            self.month_cos,
            self.temp_lag1,
            self.rain_lag1,
            self.wind_lag1,
            self.temp_roll7,
            self.rain_roll7,
            self.annual_temp,
        ]
    }

    pub fn is_complete(&self) -> bool {
        self.to_row().iter().all(|v| v.is_finite())
    }
}

/// Place a forecast was requested for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Forecast for one location and day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub location: Location,
    /// Target date as `YYYY-MM-DD`
    pub date: String,
    pub day_name: String,
    pub temperature: f64,
    pub rain_probability: f64,
    pub expected_rainfall: f64,
    pub wind_speed: f64,
    pub condition: String,
    pub day_type: DayType,
    pub day_type_description: String,
    pub day_type_icon: String,
    pub recommendations: Vec<String>,
    pub backdrop: Backdrop,
    /// Direct classification from the day-type model; may disagree with `day_type`
    pub ml_day_type: TrainingDayType,
    pub ml_day_type_label: String,
    /// Day-type model confidence as a percentage
    pub ml_confidence: f64,
    pub elevation: f64,
    pub coordinates: Coordinates,
}
