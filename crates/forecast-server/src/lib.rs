//! Weather forecast HTTP service
//!
//! Serves health, readiness and Prometheus metrics from the moment it
//! starts, and the prediction API once the models have been trained.

pub mod api;
pub mod config;
pub mod elevation;
