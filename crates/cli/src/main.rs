//! Weather forecast CLI
//!
//! A command-line tool for requesting seasonal day-type forecasts and
//! checking on the forecast service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use commands::{health, predict, range};
use config::Config;
use output::{print_info, print_success, OutputFormat};

/// Weather forecast CLI
#[derive(Parser)]
#[command(name = "wxp")]
#[command(author, version, about = "CLI for the seasonal weather forecast service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via WXP_API_URL env var)
    #[arg(long, env = "WXP_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Forecast the weather for a city
    Predict {
        /// City name (unknown cities use the country centroid)
        #[arg(long, short)]
        city: String,

        /// State or region
        #[arg(long, short, default_value = "")]
        state: String,

        /// Country (defaults to the configured country, else India)
        #[arg(long)]
        country: Option<String>,

        /// Date(s) to forecast, YYYY-MM-DD
        #[arg(long, short, required = true, num_args = 1..)]
        date: Vec<String>,
    },

    /// Show the dates that can currently be forecast
    Range,

    /// Show service health and readiness
    Health,

    /// View or change saved CLI settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings
    Show,

    /// Save settings to the config file
    Set {
        /// API endpoint URL
        #[arg(long)]
        api_url: Option<String>,

        /// Country used when --country is omitted
        #[arg(long)]
        country: Option<String>,

        /// Default output format
        #[arg(long)]
        format: Option<OutputFormat>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let saved = Config::load()?;

    let format = match cli.format {
        Some(format) => format,
        None => saved
            .default_format
            .as_deref()
            .map(|f| OutputFormat::from_str(f, true))
            .transpose()
            .map_err(|e| anyhow::anyhow!("Invalid default_format in config file: {}", e))?
            .unwrap_or_default(),
    };
    let api_url = cli
        .api_url
        .clone()
        .unwrap_or_else(|| saved.api_url().to_string());

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Predict {
            city,
            state,
            country,
            date,
        } => {
            let country = country.unwrap_or_else(|| saved.country().to_string());
            predict::show_forecast(&client, &city, &state, &country, &date, format).await?;
        }
        Commands::Range => {
            range::show_range(&client, format).await?;
        }
        Commands::Health => {
            health::show_health(&client, format).await?;
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show => {
                let path = Config::config_path()?;
                print_info(&format!("Config file: {}", path.display()));
                println!("api_url:         {}", api_url);
                println!("default_country: {}", saved.country());
                println!("default_format:  {:?}", format);
            }
            ConfigCommands::Set {
                api_url,
                country,
                format,
            } => {
                if let Some(url) = &api_url {
                    url::Url::parse(url).context("Invalid API URL")?;
                }
                let mut updated = saved;
                updated.merge(Config {
                    api_url,
                    default_country: country,
                    default_format: format
                        .and_then(|f| f.to_possible_value())
                        .map(|v| v.get_name().to_string()),
                });
                let path = updated.save()?;
                print_success(&format!("Settings saved to {}", path.display()));
            }
        },
    }

    Ok(())
}
