//! Inference capability traits and engine configuration
//!
//! Backends plug in at two seams: an [`EngineLoader`] turns a [`LoadSpec`]
//! into a live [`InferenceEngine`], and the engine answers one chat
//! completion at a time. Both are synchronous; callers decide where the
//! blocking work runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{CoreError, Message, Result};

/// Template used to serialize role-tagged messages into the model's prompt.
/// Fixed for the lifetime of a loaded engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatFormat {
    #[serde(rename = "chatml")]
    ChatMl,
    Gemma,
}

impl ChatFormat {
    /// Vision-capable sessions use the multimodal template
    pub fn for_vision(vision: bool) -> Self {
        if vision {
            ChatFormat::Gemma
        } else {
            ChatFormat::ChatMl
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatFormat::ChatMl => "chatml",
            ChatFormat::Gemma => "gemma",
        }
    }
}

impl fmt::Display for ChatFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model file name inside the model directory
    pub model: String,
    /// Context window in tokens
    pub context_size: u32,
    /// Layers to offload to the GPU (0 = CPU only)
    pub gpu_layers: u32,
    /// Whether image parts are accepted
    pub vision: bool,
}

impl EngineConfig {
    pub fn new(model: impl Into<String>, context_size: u32, gpu_layers: u32, vision: bool) -> Self {
        Self {
            model: model.into(),
            context_size,
            gpu_layers,
            vision,
        }
    }

    pub fn chat_format(&self) -> ChatFormat {
        ChatFormat::for_vision(self.vision)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "model identifier cannot be empty".to_string(),
            ));
        }
        if self.context_size == 0 {
            return Err(CoreError::InvalidConfig(
                "context size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sampling settings forwarded verbatim to the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParameters {
    pub temperature: f32,
    pub top_k: usize,
}

impl Default for SamplingParameters {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_k: 40,
        }
    }
}

/// Everything a loader needs to construct an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSpec {
    pub model_path: PathBuf,
    pub context_size: u32,
    pub chat_format: ChatFormat,
    pub gpu_layers: u32,
}

impl LoadSpec {
    pub fn from_config(config: &EngineConfig, model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            context_size: config.context_size,
            chat_format: config.chat_format(),
            gpu_layers: config.gpu_layers,
        }
    }
}

/// Metadata about an engine implementation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub capabilities: Vec<String>,
}

/// A loaded model ready to answer chat completions
pub trait InferenceEngine: Send + Sync {
    /// Path of the model file this engine was built from
    fn model_path(&self) -> &Path;

    /// GPU layer count this engine was built with
    fn gpu_layers(&self) -> u32;

    fn chat_format(&self) -> ChatFormat;

    /// Produce the assistant reply for `messages`
    fn complete(&self, messages: &[Message], sampling: &SamplingParameters) -> Result<Message>;

    fn metadata(&self) -> EngineMetadata {
        EngineMetadata::default()
    }
}

/// Constructs engines from model files
pub trait EngineLoader: Send + Sync {
    fn load(&self, spec: &LoadSpec) -> Result<Box<dyn InferenceEngine>>;
}

/// Arc-wrapped engine for sharing with blocking workers
pub type SharedEngine = Arc<dyn InferenceEngine>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_format_selection() {
        assert_eq!(ChatFormat::for_vision(true), ChatFormat::Gemma);
        assert_eq!(ChatFormat::for_vision(false), ChatFormat::ChatMl);
        assert_eq!(
            EngineConfig::new("m.gguf", 2048, 0, true).chat_format(),
            ChatFormat::Gemma
        );
        assert_eq!(ChatFormat::ChatMl.to_string(), "chatml");
        assert_eq!(
            serde_json::to_string(&ChatFormat::ChatMl).unwrap(),
            "\"chatml\""
        );
    }

    #[test]
    fn test_validate() {
        assert!(EngineConfig::new("m.gguf", 2048, 0, false).validate().is_ok());
        assert!(EngineConfig::new("", 2048, 0, false).validate().is_err());
        assert!(EngineConfig::new("m.gguf", 0, 0, false).validate().is_err());
    }

    #[test]
    fn test_sampling_defaults() {
        let sampling = SamplingParameters::default();
        assert_eq!(sampling.temperature, 0.8);
        assert_eq!(sampling.top_k, 40);

        let parsed: SamplingParameters = serde_json::from_str("{\"top_k\": 5}").unwrap();
        assert_eq!(parsed.top_k, 5);
        assert_eq!(parsed.temperature, 0.8);
    }

    #[test]
    fn test_load_spec_from_config() {
        let config = EngineConfig::new("m.gguf", 4096, 12, true);
        let spec = LoadSpec::from_config(&config, "/models/m.gguf");
        assert_eq!(spec.model_path, PathBuf::from("/models/m.gguf"));
        assert_eq!(spec.context_size, 4096);
        assert_eq!(spec.gpu_layers, 12);
        assert_eq!(spec.chat_format, ChatFormat::Gemma);
    }
}
