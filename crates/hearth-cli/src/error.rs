//! Error types for hearth-cli

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line editor error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    #[error(transparent)]
    Chat(#[from] hearth::ChatError),

    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<hearth::HearthError> for CliError {
    fn from(err: hearth::HearthError) -> Self {
        CliError::Setup(err.to_string())
    }
}

impl From<hearth::storage::StorageError> for CliError {
    fn from(err: hearth::storage::StorageError) -> Self {
        CliError::Setup(err.to_string())
    }
}
