//! Elevation lookup client

use crate::models::Coordinates;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Public Open-Elevation lookup endpoint
pub const DEFAULT_ELEVATION_API: &str = "https://api.open-elevation.com/api/v1/lookup";

/// Upper bound on a single lookup
pub const ELEVATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of ground elevation for a coordinate
#[async_trait]
pub trait ElevationProvider: Send + Sync {
    /// Elevation in metres above sea level
    async fn elevation(&self, coordinates: Coordinates) -> Result<f64>;
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    elevation: f64,
}

/// HTTP client for an Open-Elevation compatible service.
///
/// Makes one attempt per lookup; there is no retry.
pub struct OpenElevationClient {
    client: Client,
    base_url: Url,
}

impl OpenElevationClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, ELEVATION_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        let base_url = Url::parse(base_url).context("Invalid elevation API URL")?;
        Ok(Self { client, base_url })
    }

    fn lookup_url(&self, coordinates: Coordinates) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair(
            "locations",
            &format!("{},{}", coordinates.latitude, coordinates.longitude),
        );
        url
    }
}

#[async_trait]
impl ElevationProvider for OpenElevationClient {
    async fn elevation(&self, coordinates: Coordinates) -> Result<f64> {
        let url = self.lookup_url(coordinates);
        debug!(url = %url, "Requesting elevation");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send elevation request")?;

        if !response.status().is_success() {
            anyhow::bail!("Elevation API error ({})", response.status());
        }

        let body: LookupResponse = response
            .json()
            .await
            .context("Failed to parse elevation response")?;

        // An empty result set means the service has no data for the point
        Ok(body.results.first().map_or(0.0, |r| r.elevation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const DELHI: Coordinates = Coordinates {
        latitude: 28.6139,
        longitude: 77.209,
    };

    fn client(server: &mockito::ServerGuard) -> OpenElevationClient {
        OpenElevationClient::new(&format!("{}/api/v1/lookup", server.url())).unwrap()
    }

    #[test]
    fn test_lookup_url_carries_locations() {
        let client = OpenElevationClient::new(DEFAULT_ELEVATION_API).unwrap();
        let url = client.lookup_url(DELHI);
        assert_eq!(url.path(), "/api/v1/lookup");
        assert_eq!(url.query(), Some("locations=28.6139%2C77.209"));
    }

    #[tokio::test]
    async fn test_successful_lookup() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/lookup")
            .match_query(Matcher::UrlEncoded("locations".into(), "28.6139,77.209".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"results":[{"latitude":28.6139,"longitude":77.209,"elevation":216.0}]}"#)
            .create_async()
            .await;

        let elevation = client(&server).elevation(DELHI).await.unwrap();
        assert_eq!(elevation, 216.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_results_is_sea_level() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/lookup")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"results":[]}"#)
            .create_async()
            .await;

        assert_eq!(client(&server).elevation(DELHI).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_error_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/lookup")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        assert!(client(&server).elevation(DELHI).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/lookup")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        assert!(client(&server).elevation(DELHI).await.is_err());
    }

    /// Accepts connections and never writes a response
    async fn silent_server() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_unresponsive_service_times_out() {
        let addr = silent_server().await;
        let client = OpenElevationClient::with_timeout(
            &format!("http://{addr}/api/v1/lookup"),
            Duration::from_millis(50),
        )
        .unwrap();

        let started = std::time::Instant::now();
        assert!(client.elevation(DELHI).await.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(OpenElevationClient::new("not a url").is_err());
    }
}
