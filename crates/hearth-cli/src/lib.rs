//! Hearth CLI library

use hearth::{EchoLoader, Hearth, HearthConfig};
use std::path::PathBuf;

pub mod commands;
pub mod error;

use error::CliError;

/// Inference backend for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Backend {
    /// Quantized GGUF models on candle
    Candle,
    /// Repeats the user's message; no model is read
    Echo,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Candle => write!(f, "candle"),
            Backend::Echo => write!(f, "echo"),
        }
    }
}

/// Options shared by every command
#[derive(Debug, Clone, clap::Args)]
pub struct GlobalOptions {
    /// JSON file with Hearth settings
    #[arg(long, short = 'c', global = true, env = "HEARTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding GGUF model files (default: ~/gguf)
    #[arg(long, global = true, env = "HEARTH_MODELS_DIR")]
    pub models_dir: Option<PathBuf>,

    /// Directory holding system prompt files (default: ~/prompts)
    #[arg(long, global = true, env = "HEARTH_PROMPTS_DIR")]
    pub prompts_dir: Option<PathBuf>,

    /// Inference backend
    #[arg(long, global = true, value_enum, default_value_t = Backend::Candle, env = "HEARTH_BACKEND")]
    pub backend: Backend,

    /// Tokenizer file for GGUF models that have none beside them
    #[arg(long, global = true, env = "HEARTH_TOKENIZER")]
    pub tokenizer: Option<PathBuf>,

    /// Reload the model on context size or vision changes as well
    #[arg(long, global = true, default_value_t = false)]
    pub reload_on_any_change: bool,
}

impl GlobalOptions {
    /// Settings file merged with command-line overrides
    pub fn hearth_config(&self) -> Result<HearthConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => HearthConfig::load_from_file(path)
                .map_err(|e| CliError::Setup(e.to_string()))?,
            None => HearthConfig::default(),
        };

        if let Some(dir) = &self.models_dir {
            config.models_dir = dir.clone();
        }
        if let Some(dir) = &self.prompts_dir {
            config.prompts_dir = dir.clone();
        }
        if self.reload_on_any_change {
            config.reload_on_any_change = true;
        }
        Ok(config)
    }

    /// Assemble the application for the selected backend
    pub fn build_app(&self) -> Result<Hearth, CliError> {
        let builder = Hearth::builder(self.hearth_config()?);
        let builder = match self.backend {
            Backend::Echo => builder.loader(EchoLoader),
            #[cfg(feature = "candle")]
            Backend::Candle => {
                let mut loader = hearth::CandleLoader::builder();
                if let Some(tokenizer) = &self.tokenizer {
                    loader = loader.tokenizer_file(tokenizer);
                }
                builder.loader(loader.build())
            }
            #[cfg(not(feature = "candle"))]
            Backend::Candle => {
                return Err(CliError::Setup(
                    "this build has no candle backend; use --backend echo".to_string(),
                ));
            }
        };
        Ok(builder.build()?)
    }
}
