//! Error types for boundary loading, topology conversion and official lookups.

use thiserror::Error;

/// Errors raised while converting a TopoJSON document.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Topology has no object named '{0}'")]
    MissingObject(String),
    #[error("Arc index {index} out of range ({available} arcs)")]
    ArcOutOfRange { index: i64, available: usize },
}

/// Errors raised while fetching or decoding the boundary dataset.
#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid topology document: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("Invalid boundary location '{0}'")]
    InvalidLocation(String),
}

/// Errors raised by the official lookup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Unknown boundary layer: {0}")]
    UnknownLayer(String),
}

/// Errors raised while loading the officials dataset.
#[derive(Debug, Error)]
pub enum OfficialsError {
    #[error("Failed to read officials dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse officials dataset: {0}")]
    Json(#[from] serde_json::Error),
}
