//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn format_temperature(celsius: f64) -> String {
    format!("{:.1}°C", celsius)
}

pub fn format_rainfall(mm: f64) -> String {
    format!("{:.1} mm", mm)
}

pub fn format_wind(kmh: f64) -> String {
    format!("{:.1} km/h", kmh)
}

/// Format a 0-100 value as a percentage
pub fn format_percent(value: f64) -> String {
    format!("{:.0}%", value)
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" => status.green().to_string(),
        "degraded" | "training" => status.yellow().to_string(),
        "unhealthy" | "error" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a 0-100 model confidence
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_percent(confidence);
    if confidence >= 80.0 {
        formatted.green().to_string()
    } else if confidence >= 60.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color a rain probability, wetter is bluer
pub fn color_rain_probability(probability: f64) -> String {
    let formatted = format_percent(probability);
    if probability >= 60.0 {
        formatted.blue().bold().to_string()
    } else if probability >= 30.0 {
        formatted.cyan().to_string()
    } else {
        formatted
    }
}

/// Color a day type by its backdrop category
pub fn color_day_type(label: &str, backdrop: &str) -> String {
    match backdrop {
        "thunderstorm" => label.magenta().bold().to_string(),
        "rainy" => label.blue().to_string(),
        "cloudy" => label.white().to_string(),
        "sunny" => label.yellow().to_string(),
        _ => label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatters() {
        assert_eq!(format_temperature(28.54), "28.5°C");
        assert_eq!(format_rainfall(0.0), "0.0 mm");
        assert_eq!(format_wind(12.24), "12.2 km/h");
        assert_eq!(format_percent(64.4), "64%");
    }

    #[test]
    fn test_colors_keep_text() {
        colored::control::set_override(false);
        assert_eq!(color_status("degraded"), "degraded");
        assert_eq!(color_confidence(91.0), "91%");
        assert_eq!(color_day_type("Thunderstorm", "thunderstorm"), "Thunderstorm");
    }
}
