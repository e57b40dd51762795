#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Input and output around the clustering and fitting core.
//!
//! Reads locality polygons (`GeoJSON`) and the locality census (CSV),
//! joins them on `CVEGEO`, writes natural cities back out as `GeoJSON`
//! and result records as two-column CSV, and partitions features into
//! regions of states for regional analysis. SUN-2018 metropolitan areas
//! are dissolved by key into a third city system.

pub mod dissolve;
pub mod export;
pub mod ingest;
pub mod regions;

use thiserror::Error;

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum GeographyError {
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A regionalization document is malformed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A geometry operation failed on an input feature.
    #[error(transparent)]
    Spatial(#[from] natural_cities_spatial::SpatialError),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
