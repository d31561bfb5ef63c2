//! Service health and readiness
//!
//! The forecaster has a fixed set of components and a one-way startup
//! lifecycle: it trains, then either serves predictions or stops with a
//! failure. Liveness reports every component; readiness depends on the
//! lifecycle phase and on the components predictions cannot run without.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Working with reduced quality
    Degraded,
    Unhealthy,
}

/// Parts of the service whose health is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Component {
    /// Climate tables and the synthesized daily series
    Dataset,
    /// The trained model ensemble
    Models,
    /// External elevation lookup
    Elevation,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Dataset, Component::Models, Component::Elevation];

    pub fn as_str(self) -> &'static str {
        match self {
            Component::Dataset => "dataset",
            Component::Models => "models",
            Component::Elevation => "elevation",
        }
    }

    /// Whether predictions stop when this component fails.
    ///
    /// A failing elevation lookup falls back to sea level: it never affects
    /// readiness and counts at most as degraded in the overall status.
    pub fn is_critical(self) -> bool {
        !matches!(self, Component::Elevation)
    }
}

/// Startup lifecycle of the prediction service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Training,
    Serving,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub phase: Phase,
    pub components: BTreeMap<String, ComponentHealth>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    components: BTreeMap<Component, ComponentHealth>,
}

/// Shared health state, cheap to clone
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    state: Arc<RwLock<State>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    /// All components start healthy and the service starts in training
    pub fn new() -> Self {
        let components = Component::ALL
            .into_iter()
            .map(|c| (c, ComponentHealth::new(ComponentStatus::Healthy, None)))
            .collect();
        Self {
            state: Arc::new(RwLock::new(State {
                phase: Phase::Training,
                components,
            })),
        }
    }

    async fn set(&self, component: Component, status: ComponentStatus, message: Option<String>) {
        let mut state = self.state.write().await;
        state
            .components
            .insert(component, ComponentHealth::new(status, message));
    }

    pub async fn set_healthy(&self, component: Component) {
        self.set(component, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    pub async fn set_unhealthy(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    /// Training finished: dataset and models are healthy and predictions open
    pub async fn mark_serving(&self) {
        let mut state = self.state.write().await;
        for component in [Component::Dataset, Component::Models] {
            state.components.insert(
                component,
                ComponentHealth::new(ComponentStatus::Healthy, None),
            );
        }
        state.phase = Phase::Serving;
    }

    /// Initialization failed in `component`
    pub async fn mark_failed(&self, component: Component, message: impl Into<String>) {
        let mut state = self.state.write().await;
        state.components.insert(
            component,
            ComponentHealth::new(ComponentStatus::Unhealthy, Some(message.into())),
        );
        state.phase = Phase::Failed;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        let worst = state
            .components
            .iter()
            .map(|(c, h)| match h.status {
                ComponentStatus::Unhealthy if !c.is_critical() => ComponentStatus::Degraded,
                status => status,
            })
            .fold(ComponentStatus::Healthy, |worst, status| match (worst, status) {
                (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                    ComponentStatus::Unhealthy
                }
                (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                    ComponentStatus::Degraded
                }
                _ => ComponentStatus::Healthy,
            });
        HealthResponse {
            status: worst,
            phase: state.phase.clone(),
            components: state
                .components
                .iter()
                .map(|(c, h)| (c.as_str().to_string(), h.clone()))
                .collect(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let failing = state
            .components
            .iter()
            .find(|(c, h)| c.is_critical() && h.status == ComponentStatus::Unhealthy);

        let reason = match (&state.phase, failing) {
            (Phase::Failed, Some((c, h))) => Some(format!(
                "Initialization failed in {}: {}",
                c.as_str(),
                h.message.as_deref().unwrap_or("unknown error")
            )),
            (Phase::Failed, None) => Some("Initialization failed".to_string()),
            (Phase::Training, _) => Some("Models are still training".to_string()),
            (Phase::Serving, Some((c, _))) => Some(format!("Component {} is unhealthy", c.as_str())),
            (Phase::Serving, None) => None,
        };

        ReadinessResponse {
            ready: reason.is_none(),
            phase: state.phase.clone(),
            reason,
        }
    }
}
