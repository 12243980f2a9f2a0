//! Error types for hearth-candle

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CandleError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] tokenizers::Error),

    #[error("No tokenizer found for {model}; looked for {candidates:?}")]
    TokenizerNotFound {
        model: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("Prompt of {prompt_tokens} tokens does not fit the {context_size}-token context")]
    ContextOverflow {
        prompt_tokens: usize,
        context_size: usize,
    },

    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl CandleError {
    /// Convert a failure during model construction
    pub fn into_load_error(self) -> hearth_core::CoreError {
        hearth_core::CoreError::Load(self.to_string())
    }
}

// Failures during generation surface as inference errors
impl From<CandleError> for hearth_core::CoreError {
    fn from(err: CandleError) -> Self {
        match err {
            CandleError::UnsupportedContent(msg) => hearth_core::CoreError::UnsupportedContent(msg),
            other => hearth_core::CoreError::Inference(other.to_string()),
        }
    }
}
