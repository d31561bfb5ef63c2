//! Service health commands

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_table, print_warning, OutputFormat};

/// Row for the component table
#[derive(Tabled, Serialize)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

#[derive(Serialize)]
struct ServiceStatus {
    health: crate::client::HealthResponse,
    readiness: crate::client::ReadinessResponse,
}

/// Show component health and whether predictions are being served
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;
    let readiness = client.readiness().await?;

    if format == OutputFormat::Json {
        return print_json(&ServiceStatus { health, readiness });
    }

    println!("{}", "Service Health".bold());
    println!("{}", "=".repeat(50));
    println!("Overall:  {}", color_status(&health.status));
    let ready = if readiness.ready { "ready" } else { "training" };
    println!("Serving:  {}", color_status(ready));
    if let Some(reason) = &readiness.reason {
        print_warning(reason);
    }
    println!();

    let rows: Vec<ComponentRow> = health
        .components
        .iter()
        .map(|(name, component)| ComponentRow {
            name: name.clone(),
            status: color_status(&component.status),
            message: component.message.clone().unwrap_or_else(|| "-".to_string()),
            last_check: format_timestamp(component.last_check_timestamp),
        })
        .collect();
    print_table(&rows, format);

    Ok(())
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
