//! Forecast window commands

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{print_json, OutputFormat};

/// Show the dates a forecast can currently be requested for
pub async fn show_range(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let range = client.date_range().await?;

    match format {
        OutputFormat::Json => print_json(&range)?,
        OutputFormat::Table => {
            println!("{}", "Forecast Window".bold());
            println!("{}", "=".repeat(40));
            println!("From:     {}", range.today.to_string().cyan());
            println!("Until:    {}", range.max_date.to_string().cyan());
            println!("Horizon:  {} days", range.horizon_days);
        }
    }

    Ok(())
}
