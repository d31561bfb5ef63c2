//! Day-type classification rules
//!
//! Two vocabularies live here. [`TrainingDayType`] is the 7-class set used to
//! label the synthetic training corpus and is what the day-type model learns.
//! [`DayType`] is the finer 13-class set applied to predicted values at query
//! time. Both are kept because the model is bound to the training labels.

use serde::{Deserialize, Serialize};

/// Labels assigned to synthesized days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingDayType {
    Thunderstorm,
    Rainy,
    CloudyRainy,
    Cloudy,
    SunnyHot,
    SunnyWarm,
    SunnyCool,
}

impl TrainingDayType {
    /// All labels, in class-index order
    pub const ALL: [TrainingDayType; 7] = [
        TrainingDayType::Thunderstorm,
        TrainingDayType::Rainy,
        TrainingDayType::CloudyRainy,
        TrainingDayType::Cloudy,
        TrainingDayType::SunnyHot,
        TrainingDayType::SunnyWarm,
        TrainingDayType::SunnyCool,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrainingDayType::Thunderstorm => "thunderstorm",
            TrainingDayType::Rainy => "rainy",
            TrainingDayType::CloudyRainy => "cloudy_rainy",
            TrainingDayType::Cloudy => "cloudy",
            TrainingDayType::SunnyHot => "sunny_hot",
            TrainingDayType::SunnyWarm => "sunny_warm",
            TrainingDayType::SunnyCool => "sunny_cool",
        }
    }

    /// Title-cased name, e.g. "Sunny Warm"
    pub fn label(self) -> &'static str {
        match self {
            TrainingDayType::Thunderstorm => "Thunderstorm",
            TrainingDayType::Rainy => "Rainy",
            TrainingDayType::CloudyRainy => "Cloudy Rainy",
            TrainingDayType::Cloudy => "Cloudy",
            TrainingDayType::SunnyHot => "Sunny Hot",
            TrainingDayType::SunnyWarm => "Sunny Warm",
            TrainingDayType::SunnyCool => "Sunny Cool",
        }
    }
}

impl std::fmt::Display for TrainingDayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label a synthesized day from its rainfall (mm), temperature (°C) and wind (km/h)
pub fn training_label(rainfall: f64, temperature: f64, wind_speed: f64) -> TrainingDayType {
    if rainfall > 20.0 && wind_speed > 25.0 {
        TrainingDayType::Thunderstorm
    } else if rainfall > 10.0 {
        TrainingDayType::Rainy
    } else if rainfall > 2.0 {
        TrainingDayType::CloudyRainy
    } else if rainfall > 0.1 {
        TrainingDayType::Cloudy
    } else if temperature > 35.0 {
        TrainingDayType::SunnyHot
    } else if temperature > 25.0 {
        TrainingDayType::SunnyWarm
    } else {
        TrainingDayType::SunnyCool
    }
}

/// Day types reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Thunderstorm,
    HeavyRain,
    Rainy,
    ModerateRain,
    LightRain,
    CloudyRainy,
    Cloudy,
    SunnyHot,
    SunnyWarm,
    SunnyPleasant,
    SunnyCool,
    SunnyCold,
}

/// Background scene category a frontend should show for a day type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backdrop {
    Thunderstorm,
    Rainy,
    Cloudy,
    Sunny,
}

struct DayTypeInfo {
    description: &'static str,
    icon: &'static str,
    backdrop: Backdrop,
    advice: &'static [&'static str; 3],
}

const STORM_ADVICE: [&str; 3] = [
    "Avoid outdoor activities",
    "Stay away from tall objects and water",
    "Consider indoor alternatives",
];

const RAIN_ADVICE: [&str; 3] = [
    "Carry waterproof gear",
    "Allow extra travel time",
    "Check for flood alerts",
];

const CLOUD_ADVICE: [&str; 3] = [
    "Carry an umbrella just in case",
    "Good day for photography",
    "Pleasant for walking",
];

const HOT_ADVICE: [&str; 3] = [
    "Stay hydrated",
    "Use sun protection",
    "Avoid peak sun hours (12-3 PM)",
];

const WARM_ADVICE: [&str; 3] = [
    "Perfect outdoor day",
    "Great for picnics and activities",
    "Keep water handy",
];

const MILD_ADVICE: [&str; 3] = [
    "Dress in layers",
    "Excellent for outdoor activities",
    "Enjoy the pleasant weather",
];

impl DayType {
    pub const ALL: [DayType; 12] = [
        DayType::Thunderstorm,
        DayType::HeavyRain,
        DayType::Rainy,
        DayType::ModerateRain,
        DayType::LightRain,
        DayType::CloudyRainy,
        DayType::Cloudy,
        DayType::SunnyHot,
        DayType::SunnyWarm,
        DayType::SunnyPleasant,
        DayType::SunnyCool,
        DayType::SunnyCold,
    ];

    fn info(self) -> DayTypeInfo {
        let (description, icon, backdrop, advice) = match self {
            DayType::Thunderstorm => ("Thunderstorm Day", "⛈️", Backdrop::Thunderstorm, &STORM_ADVICE),
            DayType::HeavyRain => ("Heavy Rain Day", "🌧️", Backdrop::Rainy, &RAIN_ADVICE),
            DayType::Rainy => ("Rainy Day", "🌧️", Backdrop::Rainy, &RAIN_ADVICE),
            DayType::ModerateRain => ("Moderate Rain Day", "🌦️", Backdrop::Rainy, &RAIN_ADVICE),
            DayType::LightRain => ("Light Rain Day", "🌦️", Backdrop::Cloudy, &CLOUD_ADVICE),
            DayType::CloudyRainy => ("Cloudy with Rain", "🌧️☁️", Backdrop::Cloudy, &RAIN_ADVICE),
            DayType::Cloudy => ("Cloudy Day", "☁️", Backdrop::Cloudy, &CLOUD_ADVICE),
            DayType::SunnyHot => ("Sunny Hot Day", "☀️🔥", Backdrop::Sunny, &HOT_ADVICE),
            DayType::SunnyWarm => ("Sunny Warm Day", "☀️🌡️", Backdrop::Sunny, &WARM_ADVICE),
            DayType::SunnyPleasant => ("Sunny Pleasant Day", "☀️😊", Backdrop::Sunny, &MILD_ADVICE),
            DayType::SunnyCool => ("Sunny Cool Day", "☀️❄️", Backdrop::Sunny, &MILD_ADVICE),
            DayType::SunnyCold => ("Sunny Cold Day", "☀️🧊", Backdrop::Sunny, &MILD_ADVICE),
        };
        DayTypeInfo {
            description,
            icon,
            backdrop,
            advice,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayType::Thunderstorm => "thunderstorm",
            DayType::HeavyRain => "heavy_rain",
            DayType::Rainy => "rainy",
            DayType::ModerateRain => "moderate_rain",
            DayType::LightRain => "light_rain",
            DayType::CloudyRainy => "cloudy_rainy",
            DayType::Cloudy => "cloudy",
            DayType::SunnyHot => "sunny_hot",
            DayType::SunnyWarm => "sunny_warm",
            DayType::SunnyPleasant => "sunny_pleasant",
            DayType::SunnyCool => "sunny_cool",
            DayType::SunnyCold => "sunny_cold",
        }
    }

    /// Human-readable label, e.g. "Heavy Rain Day"
    pub fn description(self) -> &'static str {
        self.info().description
    }

    pub fn icon(self) -> &'static str {
        self.info().icon
    }

    pub fn backdrop(self) -> Backdrop {
        self.info().backdrop
    }

    /// Planning advice for an outdoor event on this kind of day.
    ///
    /// Light rain and moderate rain have no advice of their own; they use
    /// this crate's defaults: the cloudy-day advice and the rain advice.
    pub fn recommendations(self) -> &'static [&'static str] {
        self.info().advice
    }
}

impl std::fmt::Display for DayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a predicted day.
///
/// Rules are checked in order and the first match wins, so a storm-force day
/// is never reported as plain heavy rain.
pub fn classify(rainfall: f64, temperature: f64, wind_speed: f64, rain_probability: f64) -> DayType {
    if rainfall > 25.0 && wind_speed > 30.0 && rain_probability > 80.0 {
        DayType::Thunderstorm
    } else if rainfall > 15.0 && wind_speed > 25.0 {
        DayType::Thunderstorm
    } else if rainfall > 20.0 {
        DayType::HeavyRain
    } else if rainfall > 10.0 {
        DayType::Rainy
    } else if rainfall > 5.0 {
        DayType::ModerateRain
    } else if rainfall > 2.0 {
        DayType::LightRain
    } else if rainfall > 0.1 || rain_probability > 60.0 {
        DayType::CloudyRainy
    } else if rain_probability > 40.0 {
        DayType::Cloudy
    } else if temperature > 35.0 {
        DayType::SunnyHot
    } else if temperature > 30.0 {
        DayType::SunnyWarm
    } else if temperature > 25.0 {
        DayType::SunnyPleasant
    } else if temperature > 20.0 {
        DayType::SunnyCool
    } else {
        DayType::SunnyCold
    }
}
