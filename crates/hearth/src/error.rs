//! Error types for the hearth crate

use hearth_core::CoreError;
use serde::Serialize;
use thiserror::Error;

/// Stable identifier for each chat failure, reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    EngineLoad,
    EngineNotReady,
    PromptFile,
    Inference,
    MalformedHistory,
    EmptyTurn,
}

/// Failures surfaced at the chat-turn boundary
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Failed to load model '{model}': {reason}")]
    EngineLoad { model: String, reason: String },

    #[error("Engine not ready: {0}")]
    EngineNotReady(String),

    #[error("Prompt file '{name}' unavailable: {reason}")]
    PromptFile { name: String, reason: String },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Malformed history: {0}")]
    MalformedHistory(String),

    #[error("Empty turn: no user input, image, or prior conversation to respond to")]
    EmptyTurn,
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::EngineLoad { .. } => ErrorKind::EngineLoad,
            ChatError::EngineNotReady(_) => ErrorKind::EngineNotReady,
            ChatError::PromptFile { .. } => ErrorKind::PromptFile,
            ChatError::Inference(_) => ErrorKind::Inference,
            ChatError::MalformedHistory(_) => ErrorKind::MalformedHistory,
            ChatError::EmptyTurn => ErrorKind::EmptyTurn,
        }
    }
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;

impl From<CoreError> for ChatError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MalformedHistory(msg) => ChatError::MalformedHistory(msg),
            CoreError::Inference(msg) => ChatError::Inference(msg),
            CoreError::UnsupportedContent(msg) => ChatError::Inference(msg),
            CoreError::InvalidConfig(msg) | CoreError::Load(msg) => ChatError::EngineLoad {
                model: "unknown".to_string(),
                reason: msg,
            },
        }
    }
}

/// Errors raised while assembling the application
#[derive(Error, Debug)]
pub enum HearthError {
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Build error: {0}")]
    Build(String),
}

pub type Result<T> = std::result::Result<T, HearthError>;
