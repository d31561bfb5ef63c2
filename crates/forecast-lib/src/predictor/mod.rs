//! ML prediction engine

mod ensemble;
mod features;
mod forest;
mod output;

pub use ensemble::{
    EnsembleParams, HoldoutSplit, ModelEnsemble, RawPrediction, TrainingReport, SPLIT_SEED,
    TEST_FRACTION,
};
pub use features::{
    annual_trend_temperature, day_of_year, fill_gaps, FeatureEngineer, DEFAULT_RAIN_LAG,
    DEFAULT_TEMP_LAG, DEFAULT_WIND_LAG, HISTORY_YEARS, ROLLING_WINDOW, TREND_BASE_YEAR,
};
pub use forest::{
    DecisionTree, ForestParams, MaxFeatures, RandomForestClassifier, RandomForestRegressor,
};
pub use output::{
    round1, weather_condition, ForecastContext, OutputConfig, OutputFormatter, LAPSE_RATE_PER_M,
    WARMING_BASE_YEAR, WARMING_PER_YEAR,
};
