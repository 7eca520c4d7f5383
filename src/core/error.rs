//! Error types for the placement engine

use thiserror::Error;

/// Main error type for the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Placement error: {0}")]
    Placement(String),

    #[error("No optimizer connection")]
    NotConnected,

    #[error("Optimizer link error: {0}")]
    Link(#[from] arplace_link::LinkError),
}
