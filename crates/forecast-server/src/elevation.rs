//! Elevation provider that reports lookup outcomes to the health registry

use async_trait::async_trait;
use forecast_lib::geo::ElevationProvider;
use forecast_lib::health::{Component, HealthRegistry};
use forecast_lib::Coordinates;

/// Wraps a provider and marks the elevation component degraded while
/// lookups are failing
pub struct MonitoredElevation<P> {
    inner: P,
    health: HealthRegistry,
}

impl<P> MonitoredElevation<P> {
    pub fn new(inner: P, health: HealthRegistry) -> Self {
        Self { inner, health }
    }
}

#[async_trait]
impl<P: ElevationProvider> ElevationProvider for MonitoredElevation<P> {
    async fn elevation(&self, coordinates: Coordinates) -> anyhow::Result<f64> {
        let result = self.inner.elevation(coordinates).await;
        match &result {
            Ok(_) => self.health.set_healthy(Component::Elevation).await,
            Err(e) => {
                self.health
                    .set_degraded(Component::Elevation, format!("{e:#}"))
                    .await
            }
        }
        result
    }
}
