//! Forecast commands

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, ApiError, Forecast, ForecastRequest};
use crate::output::{
    color_confidence, color_day_type, color_rain_probability, format_rainfall,
    format_temperature, format_wind, print_error, print_info, print_json, OutputFormat,
};

/// Row of the multi-date forecast table
#[derive(Tabled, Serialize)]
struct ForecastRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "Rain")]
    rain_probability: String,
    #[tabled(rename = "Amount")]
    rainfall: String,
    #[tabled(rename = "Wind")]
    wind: String,
    #[tabled(rename = "Day Type")]
    day_type: String,
}

impl From<&Forecast> for ForecastRow {
    fn from(f: &Forecast) -> Self {
        Self {
            date: f.date.clone(),
            day: f.day_name.clone(),
            temperature: format_temperature(f.temperature),
            rain_probability: color_rain_probability(f.rain_probability),
            rainfall: format_rainfall(f.expected_rainfall),
            wind: format_wind(f.wind_speed),
            day_type: color_day_type(&f.day_type_description, &f.backdrop),
        }
    }
}

/// Show the forecast for one place on one or more dates
pub async fn show_forecast(
    client: &ApiClient,
    city: &str,
    state: &str,
    country: &str,
    dates: &[String],
    format: OutputFormat,
) -> Result<()> {
    let mut forecasts = Vec::with_capacity(dates.len());
    for date in dates {
        let request = ForecastRequest {
            city: city.to_string(),
            state: state.to_string(),
            country: country.to_string(),
            date: date.clone(),
        };
        match client.forecast(&request).await {
            Ok(forecast) => forecasts.push(forecast),
            Err(e) => {
                explain_rejection(&e);
                return Err(e);
            }
        }
    }

    match format {
        OutputFormat::Json => match forecasts.as_slice() {
            [single] => print_json(single)?,
            many => print_json(&many)?,
        },
        OutputFormat::Table => match forecasts.as_slice() {
            [single] => print_detail(single),
            many => {
                if let Some(first) = many.first() {
                    print_header(first);
                }
                let rows: Vec<ForecastRow> = many.iter().map(ForecastRow::from).collect();
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }
        },
    }

    Ok(())
}

fn print_header(forecast: &Forecast) {
    let place = [
        forecast.location.city.as_str(),
        forecast.location.state.as_str(),
        forecast.location.country.as_str(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(", ");

    println!("{}", format!("Forecast for {}", place).bold());
    println!(
        "Coordinates: {:.4}, {:.4}   Elevation: {:.0} m",
        forecast.coordinates.latitude, forecast.coordinates.longitude, forecast.elevation
    );
    println!("{}", "=".repeat(60));
}

fn print_detail(forecast: &Forecast) {
    print_header(forecast);
    println!("Date:              {} ({})", forecast.date.cyan(), forecast.day_name);
    println!(
        "Day Type:          {} {}",
        forecast.day_type_icon,
        color_day_type(&forecast.day_type_description, &forecast.backdrop)
    );
    println!("Condition:         {}", forecast.condition);
    println!();
    println!("{}", "Conditions".bold());
    println!("{}", "-".repeat(60));
    println!("Temperature:       {}", format_temperature(forecast.temperature));
    println!(
        "Rain Probability:  {}",
        color_rain_probability(forecast.rain_probability)
    );
    println!("Expected Rainfall: {}", format_rainfall(forecast.expected_rainfall));
    println!("Wind Speed:        {}", format_wind(forecast.wind_speed));
    println!();
    println!("{}", "Model".bold());
    println!("{}", "-".repeat(60));
    println!("Classified As:     {}", forecast.ml_day_type_label);
    println!("Confidence:        {}", color_confidence(forecast.ml_confidence));
    println!();
    println!("{}", "Recommendations".bold());
    println!("{}", "-".repeat(60));
    for advice in &forecast.recommendations {
        println!("  • {}", advice);
    }
}

fn explain_rejection(err: &anyhow::Error) {
    let Some(ApiError::Rejected { code, message, details, .. }) = err.downcast_ref::<ApiError>()
    else {
        return;
    };

    print_error(message);
    match code.as_str() {
        "past_date" | "beyond_horizon" => {
            if let Some(max) = details.as_ref().and_then(|d| d.get("max_date")) {
                print_info(&format!("Forecasts are available up to {}", max));
            }
            print_info("Run `wxp range` to see the forecastable dates");
        }
        "invalid_format" => print_info("Dates must be written as YYYY-MM-DD"),
        "not_ready" => print_info("The service is still training; check `wxp health`"),
        _ => {}
    }
}
