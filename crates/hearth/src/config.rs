use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::lifecycle::ReloadPolicy;

/// Hearth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HearthConfig {
    /// Directory holding GGUF model files
    pub models_dir: PathBuf,

    /// Directory holding system prompt files
    pub prompts_dir: PathBuf,

    /// Extension listed as a model (without the dot)
    pub model_extension: String,

    /// Extension listed as a prompt (without the dot)
    pub prompt_extension: String,

    /// Context size used when a request names a model but no size
    pub default_context_size: u32,

    /// GPU layers used when a request names a model but no layer count
    pub default_gpu_layers: u32,

    /// Reload on context size or vision changes too, not just model and GPU layers
    pub reload_on_any_change: bool,
}

impl Default for HearthConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            models_dir: home.join("gguf"),
            prompts_dir: home.join("prompts"),
            model_extension: "gguf".to_string(),
            prompt_extension: "prompt".to_string(),
            default_context_size: 2048,
            default_gpu_layers: 0,
            reload_on_any_change: false,
        }
    }
}

impl HearthConfig {
    /// Configuration rooted at explicit model and prompt directories
    pub fn with_dirs(models_dir: impl AsRef<Path>, prompts_dir: impl AsRef<Path>) -> Self {
        Self {
            models_dir: models_dir.as_ref().to_path_buf(),
            prompts_dir: prompts_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn reload_policy(&self) -> ReloadPolicy {
        if self.reload_on_any_change {
            ReloadPolicy::AnyChange
        } else {
            ReloadPolicy::ModelOrGpuLayers
        }
    }

    /// Load from configuration file
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))
    }
}
