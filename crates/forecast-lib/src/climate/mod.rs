//! Historical climate data
//!
//! Seasonal tables are loaded once and expanded into a synthetic daily
//! series that serves as both the training corpus and the query-time
//! lookup source for lag features.

mod series;
mod store;
mod synthesis;


pub use series::DailySeries;
pub use store::{SeasonalRecordStore, DEFAULT_ANNUAL_TEMP, RECENT_WINDOW};
pub use synthesis::{
    days_in_month, is_leap_year, monsoon_daily_rain, temperature_offset, Season,
    SynthesisConfig, SyntheticDailyDatasetBuilder, FIRST_YEAR, RAIN_THRESHOLD_MM,
};
