//! Prediction output post-processing
//!
//! Turns raw model outputs into a [`PredictionResult`]: temperature is
//! corrected for elevation and warming, the rule-based day type and the
//! condition text are derived from the corrected values, and every reported
//! number is rounded to one decimal.

use super::ensemble::RawPrediction;
use crate::day_type::classify;
use crate::models::{Coordinates, Location, PredictionResult};
use chrono::{Datelike, NaiveDate};

/// Temperature change per metre of elevation (°C)
pub const LAPSE_RATE_PER_M: f64 = -0.0065;

/// Warming trend per year since [`WARMING_BASE_YEAR`] (°C)
pub const WARMING_PER_YEAR: f64 = 0.02;

pub const WARMING_BASE_YEAR: i32 = 2000;

/// Configuration for output post-processing
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub lapse_rate_per_m: f64,
    pub warming_per_year: f64,
    pub warming_base_year: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            lapse_rate_per_m: LAPSE_RATE_PER_M,
            warming_per_year: WARMING_PER_YEAR,
            warming_base_year: WARMING_BASE_YEAR,
        }
    }
}

/// Where and when a prediction applies
#[derive(Debug, Clone)]
pub struct ForecastContext {
    pub location: Location,
    pub date: NaiveDate,
    pub coordinates: Coordinates,
    /// Metres above sea level; 0 when the lookup failed
    pub elevation: f64,
}

/// Round half away from zero to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Free-text summary of the corrected temperature, rain chance and wind
pub fn weather_condition(temperature: f64, rain_probability: f64, wind_speed: f64) -> &'static str {
    if rain_probability > 70.0 {
        if wind_speed > 25.0 {
            "Stormy"
        } else if wind_speed > 15.0 {
            "Rainy with strong winds"
        } else {
            "Rainy"
        }
    } else if rain_probability > 40.0 {
        if wind_speed > 20.0 {
            "Cloudy with strong winds"
        } else {
            "Cloudy with chance of rain"
        }
    } else if temperature > 35.0 {
        if wind_speed > 20.0 {
            "Hot and windy"
        } else {
            "Hot and sunny"
        }
    } else if temperature > 25.0 {
        if wind_speed > 15.0 {
            "Warm and breezy"
        } else {
            "Warm and pleasant"
        }
    } else if temperature > 15.0 {
        if wind_speed > 15.0 {
            "Cool and windy"
        } else {
            "Cool and clear"
        }
    } else {
        "Cold"
    }
}

/// Formats raw model outputs into a [`PredictionResult`]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self {
            config: OutputConfig::default(),
        }
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Temperature adjustment for `elevation` metres in `year`
    pub fn temperature_correction(&self, elevation: f64, year: i32) -> f64 {
        self.config.lapse_rate_per_m * elevation
            + self.config.warming_per_year * (year - self.config.warming_base_year) as f64
    }

    pub fn format(&self, raw: &RawPrediction, context: ForecastContext) -> PredictionResult {
        let temperature =
            raw.temperature + self.temperature_correction(context.elevation, context.date.year());

        let day_type = classify(
            raw.rainfall,
            temperature,
            raw.wind_speed,
            raw.rain_probability,
        );
        let condition = weather_condition(temperature, raw.rain_probability, raw.wind_speed);

        PredictionResult {
            location: context.location,
            date: context.date.format("%Y-%m-%d").to_string(),
            day_name: context.date.format("%A").to_string(),
            temperature: round1(temperature),
            rain_probability: round1(raw.rain_probability),
            expected_rainfall: round1(raw.rainfall),
            wind_speed: round1(raw.wind_speed),
            condition: condition.to_string(),
            day_type,
            day_type_description: day_type.description().to_string(),
            day_type_icon: day_type.icon().to_string(),
            recommendations: day_type
                .recommendations()
                .iter()
                .map(|r| r.to_string())
                .collect(),
            backdrop: day_type.backdrop(),
            ml_day_type: raw.day_type,
            ml_day_type_label: raw.day_type.label().to_string(),
            ml_confidence: round1(raw.confidence * 100.0),
            elevation: round1(context.elevation),
            coordinates: context.coordinates,
        }
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}
