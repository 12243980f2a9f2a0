//! Loads GGUF files into [`GgufEngine`]s

use candle_core::Device;
use candle_core::quantized::gguf_file;
use candle_transformers::models::quantized_llama::ModelWeights;
use hearth_core::{EngineLoader, InferenceEngine, LoadSpec, Result as CoreResult};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::{info, warn};

use crate::CandleError;
use crate::model::GgufEngine;

const DEFAULT_MAX_NEW_TOKENS: usize = 512;

/// Engine loader for quantized llama-family GGUF files.
///
/// GGUF files don't always ship a usable tokenizer, so a `tokenizer.json`
/// is looked up next to the model unless one is configured explicitly.
#[derive(Debug, Clone)]
pub struct CandleLoader {
    tokenizer_file: Option<PathBuf>,
    max_new_tokens: usize,
}

impl Default for CandleLoader {
    fn default() -> Self {
        Self {
            tokenizer_file: None,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
        }
    }
}

impl CandleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> CandleLoaderBuilder {
        CandleLoaderBuilder::default()
    }

    /// Paths checked for a tokenizer, in order
    pub fn tokenizer_candidates(&self, model_path: &Path) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(file) = &self.tokenizer_file {
            candidates.push(file.clone());
        }
        let dir = model_path.parent().unwrap_or_else(|| Path::new("."));
        if let Some(stem) = model_path.file_stem() {
            candidates.push(dir.join(format!("{}.tokenizer.json", stem.to_string_lossy())));
        }
        candidates.push(dir.join("tokenizer.json"));
        candidates
    }

    fn load_tokenizer(&self, model_path: &Path) -> Result<Tokenizer, CandleError> {
        let candidates = self.tokenizer_candidates(model_path);
        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Ok(Tokenizer::from_file(path)?),
            None => Err(CandleError::TokenizerNotFound {
                model: model_path.to_path_buf(),
                candidates,
            }),
        }
    }

    fn select_device(gpu_layers: u32) -> Result<Device, CandleError> {
        if gpu_layers == 0 {
            return Ok(Device::Cpu);
        }

        #[cfg(feature = "metal")]
        let device = Device::new_metal(0)?;
        #[cfg(not(feature = "metal"))]
        let device = Device::cuda_if_available(0)?;

        if device.is_cpu() {
            warn!(
                gpu_layers,
                "GPU offload requested but no accelerator is available, running on CPU"
            );
        }
        Ok(device)
    }

    fn load_engine(&self, spec: &LoadSpec) -> Result<GgufEngine, CandleError> {
        let started = Instant::now();
        let device = Self::select_device(spec.gpu_layers)?;

        let file = File::open(&spec.model_path)?;
        let mut reader = BufReader::new(file);
        let content = gguf_file::Content::read(&mut reader)
            .map_err(|e| e.with_path(&spec.model_path))?;
        let tensor_count = content.tensor_infos.len();
        let weights = ModelWeights::from_gguf(content, &mut reader, &device)?;

        let tokenizer = self.load_tokenizer(&spec.model_path)?;

        info!(
            model = %spec.model_path.display(),
            tensors = tensor_count,
            format = %spec.chat_format,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "GGUF model loaded"
        );

        Ok(GgufEngine::new(
            spec.clone(),
            weights,
            tokenizer,
            device,
            self.max_new_tokens,
        ))
    }
}

impl EngineLoader for CandleLoader {
    fn load(&self, spec: &LoadSpec) -> CoreResult<Box<dyn InferenceEngine>> {
        let engine = self
            .load_engine(spec)
            .map_err(CandleError::into_load_error)?;
        Ok(Box::new(engine))
    }
}

/// Builder for [`CandleLoader`]
#[derive(Debug, Default)]
pub struct CandleLoaderBuilder {
    tokenizer_file: Option<PathBuf>,
    max_new_tokens: Option<usize>,
}

impl CandleLoaderBuilder {
    pub fn tokenizer_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tokenizer_file = Some(path.into());
        self
    }

    pub fn max_new_tokens(mut self, tokens: usize) -> Self {
        self.max_new_tokens = Some(tokens);
        self
    }

    pub fn build(self) -> CandleLoader {
        CandleLoader {
            tokenizer_file: self.tokenizer_file,
            max_new_tokens: self
                .max_new_tokens
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_NEW_TOKENS),
        }
    }
}
