//! Location lookups
//!
//! Coordinates come from a fixed city table. Elevation comes from an
//! external lookup that is allowed to fail; callers fall back to sea level.

mod elevation;
mod locations;

pub use elevation::{
    ElevationProvider, OpenElevationClient, DEFAULT_ELEVATION_API, ELEVATION_TIMEOUT,
};
pub use locations::{coordinates_for, known_cities, DEFAULT_COORDINATES};
