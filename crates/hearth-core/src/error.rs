//! Error types for hearth-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed history: {0}")]
    MalformedHistory(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
