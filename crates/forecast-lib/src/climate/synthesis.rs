//! Daily series synthesis
//!
//! Expands yearly seasonal aggregates into one observation per calendar day.
//! Temperature is the season mean plus noise and a fixed seasonal offset.
//! Monsoon rainfall uses an occurrence draw followed by a log-normal intensity
//! multiplier on the month's mean daily total; other months get rare,
//! exponentially distributed showers. Wind follows the rainfall regime.
//!
//! All randomness comes from the caller's generator, so a seeded generator
//! reproduces the series exactly.

use super::series::DailySeries;
use super::store::SeasonalRecordStore;
use crate::day_type::training_label;
use crate::models::{DailyObservation, SeasonalRecord};
use chrono::Datelike;
use rand::Rng;
use rand_distr::{Exp1, StandardNormal};
use tracing::{debug, info};

/// First year of the synthesized series
pub const FIRST_YEAR: i32 = 1901;

/// Rainfall above which a day counts as rainy (mm)
pub const RAIN_THRESHOLD_MM: f64 = 0.1;

/// Climatological season of a calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    /// January and February
    Winter,
    /// March to May
    PreMonsoon,
    /// June to September
    Monsoon,
    /// October to December
    PostMonsoon,
}

impl Season {
    pub fn of_month(month: u32) -> Self {
        match month {
            1 | 2 => Season::Winter,
            3..=5 => Season::PreMonsoon,
            6..=9 => Season::Monsoon,
            _ => Season::PostMonsoon,
        }
    }

    /// The season's mean temperature in `record`
    pub fn mean_temperature(self, record: &SeasonalRecord) -> f64 {
        match self {
            Season::Winter => record.winter_temp,
            Season::PreMonsoon => record.pre_monsoon_temp,
            Season::Monsoon => record.monsoon_temp,
            Season::PostMonsoon => record.post_monsoon_temp,
        }
    }
}

/// Fixed adjustment applied on top of the season mean.
///
/// December reads the Oct-Dec mean but is cooled like the winter months.
pub fn temperature_offset(month: u32) -> f64 {
    match month {
        12 | 1 | 2 => -3.0,
        3..=5 => 1.0,
        6..=9 => 2.0,
        _ => 0.5,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 30,
    }
}

/// Mean daily rainfall for a monsoon month, zero otherwise
pub fn monsoon_daily_rain(record: &SeasonalRecord, month: u32) -> f64 {
    match month {
        6 => record.jun_rain / 30.0,
        7 => record.jul_rain / 31.0,
        8 => record.aug_rain / 31.0,
        9 => record.sep_rain / 30.0,
        _ => 0.0,
    }
}

/// Inclusive range of years to synthesize
#[derive(Debug, Clone, Copy)]
pub struct SynthesisConfig {
    pub start_year: i32,
    pub end_year: i32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            start_year: FIRST_YEAR,
            end_year: chrono::Local::now().year(),
        }
    }
}

/// Builds the synthetic daily corpus from a [`SeasonalRecordStore`]
pub struct SyntheticDailyDatasetBuilder<'a> {
    store: &'a SeasonalRecordStore,
    config: SynthesisConfig,
}

impl<'a> SyntheticDailyDatasetBuilder<'a> {
    pub fn new(store: &'a SeasonalRecordStore) -> Self {
        Self::with_config(store, SynthesisConfig::default())
    }

    pub fn with_config(store: &'a SeasonalRecordStore, config: SynthesisConfig) -> Self {
        Self { store, config }
    }

    /// Generate every day of every configured year
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> DailySeries {
        let years = self.config.start_year..=self.config.end_year;
        let mut observations = Vec::with_capacity(years.clone().count() * 366);
        let mut fallback_years = 0usize;

        for year in years {
            let record = match self.store.record_for(year) {
                Some(record) => record,
                None => {
                    fallback_years += 1;
                    self.store.recent_average(year)
                }
            };
            for month in 1..=12 {
                for day in 1..=days_in_month(year, month) {
                    observations.push(synthesize_day(rng, &record, month, day));
                }
            }
        }

        debug!(fallback_years, "Years synthesized from recent averages");
        info!(records = observations.len(), "Historical daily series synthesized");
        DailySeries::new(observations)
    }
}

fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + std_dev * z
}

fn log_normal<R: Rng + ?Sized>(rng: &mut R, location: f64, scale: f64) -> f64 {
    normal(rng, location, scale).exp()
}

/// Draw one day's temperature, rainfall and wind
fn synthesize_day<R: Rng + ?Sized>(
    rng: &mut R,
    record: &SeasonalRecord,
    month: u32,
    day: u32,
) -> DailyObservation {
    let season = Season::of_month(month);
    let temperature =
        normal(rng, season.mean_temperature(record), 2.0) + temperature_offset(month);

    let rainfall = if season == Season::Monsoon {
        let probability = normal(rng, 60.0, 15.0).clamp(0.0, 100.0);
        if rng.gen::<f64>() < probability / 100.0 {
            let base = monsoon_daily_rain(record, month);
            let intensity: f64 = rng.gen();
            let multiplier = if intensity < 0.5 {
                log_normal(rng, -1.0, 0.3)
            } else if intensity < 0.8 {
                log_normal(rng, 0.0, 0.3)
            } else {
                log_normal(rng, 1.0, 0.4)
            };
            (base * multiplier).max(0.0)
        } else {
            0.0
        }
    } else {
        let probability = normal(rng, 10.0, 5.0).clamp(0.0, 100.0);
        if rng.gen::<f64>() <= probability / 100.0 {
            let draw: f64 = rng.sample(Exp1);
            2.0 * draw
        } else {
            0.0
        }
    };

    let base_wind = if rainfall > 20.0 {
        normal(rng, 20.0, 5.0)
    } else if rainfall > 0.0 {
        normal(rng, 12.0, 3.0)
    } else if season == Season::Monsoon {
        normal(rng, 10.0, 2.0)
    } else {
        normal(rng, 8.0, 2.0)
    };
    let wind_speed = (base_wind + normal(rng, 0.0, 2.0)).max(0.0);

    DailyObservation {
        year: record.year,
        month,
        day,
        temperature,
        rainfall,
        wind_speed,
        has_rain: rainfall > RAIN_THRESHOLD_MM,
        annual_temp_trend: record.annual_temp,
        day_type: training_label(rainfall, temperature, wind_speed),
    }
}
