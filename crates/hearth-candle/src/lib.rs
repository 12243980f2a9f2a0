//! Candle backend for Hearth
//!
//! Runs quantized llama-family GGUF chat models on CPU, CUDA or Metal.

pub mod error;
pub mod loader;
pub mod model;
pub mod template;

pub use error::CandleError;
pub use loader::{CandleLoader, CandleLoaderBuilder};
pub use model::GgufEngine;
pub use template::ChatTemplate;
