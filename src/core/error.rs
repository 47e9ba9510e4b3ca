//! Error types for the skinning deformer

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Skeleton error: {0}")]
    Skeleton(String),

    #[error("Mesh error: {0}")]
    Mesh(String),
}
