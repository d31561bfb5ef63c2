//! Feature engineering for the weather models
//!
//! Derives cyclic calendar encodings, previous-day lags, trailing rolling
//! means and a secular trend for every observation in the daily series, and
//! builds the matching vector for a single future date at query time.

use crate::climate::DailySeries;
use crate::models::{DailyObservation, FeatureVector};
use chrono::{Datelike, NaiveDate};
use std::f64::consts::PI;

/// Trailing window for rolling means (days)
pub const ROLLING_WINDOW: usize = 7;

/// Base year for the secular trend feature
pub const TREND_BASE_YEAR: i32 = 1900;

/// Number of prior years averaged when last year's same day is missing
pub const HISTORY_YEARS: i32 = 5;

/// Lag values used when no history exists at all
pub const DEFAULT_TEMP_LAG: f64 = 25.0;
pub const DEFAULT_RAIN_LAG: f64 = 0.0;
pub const DEFAULT_WIND_LAG: f64 = 10.0;

/// Day of year, falling back to a 30-day-month estimate for an invalid date
pub fn day_of_year(year: i32, month: u32, day: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| d.ordinal())
        .unwrap_or_else(|| month.saturating_sub(1) * 30 + day)
}

/// Fill gaps backward from the nearest later value, then forward from the
/// nearest earlier one. Leaves the column untouched if every value is missing.
pub fn fill_gaps(values: &mut [Option<f64>]) {
    let mut next = None;
    for value in values.iter_mut().rev() {
        match value {
            Some(v) => next = Some(*v),
            None => *value = next,
        }
    }
    let mut prev = None;
    for value in values.iter_mut() {
        match value {
            Some(v) => prev = Some(*v),
            None => *value = prev,
        }
    }
}

fn lag(values: &[f64]) -> Vec<Option<f64>> {
    std::iter::once(None)
        .chain(values.iter().take(values.len().saturating_sub(1)).map(|v| Some(*v)))
        .collect()
}

fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            Some(slice.iter().sum::<f64>() / slice.len() as f64)
        })
        .collect()
}

/// Lag and rolling inputs for one row
#[derive(Debug, Clone, Copy)]
struct History {
    temp_lag: f64,
    rain_lag: f64,
    wind_lag: f64,
    temp_roll: f64,
    rain_roll: f64,
}

impl History {
    const DEFAULT: History = History {
        temp_lag: DEFAULT_TEMP_LAG,
        rain_lag: DEFAULT_RAIN_LAG,
        wind_lag: DEFAULT_WIND_LAG,
        temp_roll: DEFAULT_TEMP_LAG,
        rain_roll: DEFAULT_RAIN_LAG,
    };
}

/// Builds [`FeatureVector`]s for training and inference
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    rolling_window: usize,
}

impl FeatureEngineer {
    pub fn new() -> Self {
        Self {
            rolling_window: ROLLING_WINDOW,
        }
    }

    pub fn with_window(rolling_window: usize) -> Self {
        Self {
            rolling_window: rolling_window.max(1),
        }
    }

    /// Feature vectors for a temporally ordered series, one per observation
    pub fn engineer(&self, observations: &[DailyObservation]) -> Vec<FeatureVector> {
        let temps: Vec<f64> = observations.iter().map(|o| o.temperature).collect();
        let rains: Vec<f64> = observations.iter().map(|o| o.rainfall).collect();
        let winds: Vec<f64> = observations.iter().map(|o| o.wind_speed).collect();

        let mut columns = [
            lag(&temps),
            lag(&rains),
            lag(&winds),
            rolling_mean(&temps, self.rolling_window),
            rolling_mean(&rains, self.rolling_window),
        ];
        for column in columns.iter_mut() {
            fill_gaps(column);
        }
        let [temp_lag, rain_lag, wind_lag, temp_roll, rain_roll] = columns;

        observations
            .iter()
            .enumerate()
            .map(|(i, obs)| {
                let history = History {
                    temp_lag: temp_lag[i].unwrap_or(DEFAULT_TEMP_LAG),
                    rain_lag: rain_lag[i].unwrap_or(DEFAULT_RAIN_LAG),
                    wind_lag: wind_lag[i].unwrap_or(DEFAULT_WIND_LAG),
                    temp_roll: temp_roll[i].unwrap_or(DEFAULT_TEMP_LAG),
                    rain_roll: rain_roll[i].unwrap_or(DEFAULT_RAIN_LAG),
                };
                calendar_features(obs.year, obs.month, obs.day, history, obs.annual_temp_trend)
            })
            .collect()
    }

    /// Feature vector for a future date.
    ///
    /// Lag and rolling inputs come from the same day one year earlier, else
    /// the mean of that day over the previous [`HISTORY_YEARS`] years, else
    /// fixed defaults.
    pub fn query_features(&self, series: &DailySeries, date: NaiveDate) -> FeatureVector {
        let (year, month, day) = (date.year(), date.month(), date.day());

        let history = match series.get(year - 1, month, day) {
            Some(obs) => History {
                temp_lag: obs.temperature,
                rain_lag: obs.rainfall,
                wind_lag: obs.wind_speed,
                temp_roll: obs.temperature,
                rain_roll: obs.rainfall,
            },
            None => {
                let similar: Vec<_> = series
                    .same_day_in(month, day, (year - HISTORY_YEARS)..year)
                    .collect();
                if similar.is_empty() {
                    History::DEFAULT
                } else {
                    let n = similar.len() as f64;
                    let temp = similar.iter().map(|o| o.temperature).sum::<f64>() / n;
                    let rain = similar.iter().map(|o| o.rainfall).sum::<f64>() / n;
                    let wind = similar.iter().map(|o| o.wind_speed).sum::<f64>() / n;
                    History {
                        temp_lag: temp,
                        rain_lag: rain,
                        wind_lag: wind,
                        temp_roll: temp,
                        rain_roll: rain,
                    }
                }
            }
        };

        calendar_features(year, month, day, history, annual_trend_temperature(year))
    }
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new()
    }
}

/// Projected annual mean temperature used at query time
pub fn annual_trend_temperature(year: i32) -> f64 {
    25.0 + 0.02 * (year - 2000) as f64
}

fn calendar_features(
    year: i32,
    month: u32,
    day: u32,
    history: History,
    annual_temp: f64,
) -> FeatureVector {
    let doy = day_of_year(year, month, day) as f64;
    let month_f = month as f64;
    FeatureVector {
        year: year as f64,
        month: month_f,
        day: day as f64,
        day_of_year: doy,
        year_trend: (year - TREND_BASE_YEAR) as f64,
        day_sin: (2.0 * PI * doy / 365.0).sin(),
        day_cos: (2.0 * PI * doy / 365.0).cos(),
        month_sin: (2.0 * PI * month_f / 12.0).sin(),
        month_cos: (2.0 * PI * month_f / 12.0).cos(),
        temp_lag1: history.temp_lag,
        rain_lag1: history.rain_lag,
        wind_lag1: history.wind_lag,
        temp_roll7: history.temp_roll,
        rain_roll7: history.rain_roll,
        annual_temp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day_type::training_label;

    fn obs(year: i32, month: u32, day: u32, temp: f64, rain: f64, wind: f64) -> DailyObservation {
        DailyObservation {
            year,
            month,
            day,
            temperature: temp,
            rainfall: rain,
            wind_speed: wind,
            has_rain: rain > 0.1,
            annual_temp_trend: 24.0,
            day_type: training_label(rain, temp, wind),
        }
    }

    fn january(year: i32, days: u32) -> Vec<DailyObservation> {
        (1..=days)
            .map(|d| obs(year, 1, d, 20.0 + d as f64, d as f64 * 0.5, 5.0 + d as f64))
            .collect()
    }

    #[test]
    fn test_day_of_year() {
        assert_eq!(day_of_year(2024, 3, 1), 61);
        assert_eq!(day_of_year(2023, 3, 1), 60);
        assert_eq!(day_of_year(2023, 12, 31), 365);
        // Invalid date falls back to the 30-day estimate
        assert_eq!(day_of_year(2023, 2, 30), 60);
    }

    #[test]
    fn test_fill_gaps_backward_then_forward() {
        let mut values = vec![None, None, Some(3.0), None, Some(5.0), None];
        fill_gaps(&mut values);
        assert_eq!(
            values,
            vec![Some(3.0), Some(3.0), Some(3.0), Some(5.0), Some(5.0), Some(5.0)]
        );

        let mut empty: Vec<Option<f64>> = vec![None, None];
        fill_gaps(&mut empty);
        assert_eq!(empty, vec![None, None]);
    }

    #[test]
    fn test_first_row_lag_is_filled() {
        let features = FeatureEngineer::new().engineer(&january(2000, 10));
        // Row 0 has no predecessor; the backward fill takes row 1's lag (row 0's value)
        assert_eq!(features[0].temp_lag1, 21.0);
        assert_eq!(features[1].temp_lag1, 21.0);
        assert_eq!(features[5].wind_lag1, 10.0);
        assert!(features.iter().all(FeatureVector::is_complete));
    }

    #[test]
    fn test_rolling_window_grows_then_slides() {
        let features = FeatureEngineer::new().engineer(&january(2000, 10));
        assert_eq!(features[0].temp_roll7, 21.0);
        assert_eq!(features[2].temp_roll7, 22.0);
        // Days 2..=8 => temps 22..=28
        assert_eq!(features[7].temp_roll7, 25.0);
    }

    #[test]
    fn test_single_observation_uses_defaults() {
        let features = FeatureEngineer::new().engineer(&january(2000, 1));
        assert_eq!(features[0].temp_lag1, DEFAULT_TEMP_LAG);
        assert_eq!(features[0].wind_lag1, DEFAULT_WIND_LAG);
        assert!(features[0].is_complete());
    }

    #[test]
    fn test_calendar_encoding() {
        let features = FeatureEngineer::new().engineer(&january(1950, 2));
        let f = features[0];
        assert_eq!(f.year_trend, 50.0);
        assert_eq!(f.day_of_year, 1.0);
        assert!((f.month_sin - (2.0 * PI / 12.0).sin()).abs() < 1e-12);
        assert_eq!(f.annual_temp, 24.0);
    }

    #[test]
    fn test_query_features_use_last_year() {
        let series = DailySeries::new(january(2025, 31));
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let f = FeatureEngineer::new().query_features(&series, date);
        assert_eq!(f.temp_lag1, 35.0);
        assert_eq!(f.rain_roll7, 7.5);
        assert!((f.annual_temp - 25.52).abs() < 1e-9);
    }

    #[test]
    fn test_query_features_average_recent_years() {
        let mut observations = january(2021, 3);
        observations.extend(
            (1..=3).map(|d| obs(2022, 1, d, 30.0 + d as f64, 0.0, 10.0)),
        );
        let series = DailySeries::new(observations);
        // 2025 is missing, so 2021 and 2022 are averaged
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let f = FeatureEngineer::new().query_features(&series, date);
        assert_eq!(f.temp_lag1, (22.0 + 32.0) / 2.0);
        assert_eq!(f.wind_lag1, (7.0 + 10.0) / 2.0);
    }

    #[test]
    fn test_query_features_default_without_history() {
        let series = DailySeries::default();
        let date = NaiveDate::from_ymd_opt(2026, 7, 4).unwrap();
        let f = FeatureEngineer::new().query_features(&series, date);
        assert_eq!((f.temp_lag1, f.rain_lag1, f.wind_lag1), (25.0, 0.0, 10.0));
        assert!(f.is_complete());
    }
}
