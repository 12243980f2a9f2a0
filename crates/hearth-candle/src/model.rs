//! GGUF chat engine backed by candle's quantized llama

use candle_core::{Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::quantized_llama::ModelWeights;
use hearth_core::{
    ChatFormat, EngineMetadata, InferenceEngine, LoadSpec, Message, Result as CoreResult,
    SamplingParameters,
};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::debug;

use crate::CandleError;
use crate::template::ChatTemplate;

/// Sampling strategy for the requested parameters.
/// A non-positive temperature means greedy decoding; `top_k == 0` disables the cut-off.
pub(crate) fn sampling_strategy(params: &SamplingParameters) -> Sampling {
    let temperature = f64::from(params.temperature);
    if temperature <= 0.0 {
        Sampling::ArgMax
    } else if params.top_k == 0 {
        Sampling::All { temperature }
    } else {
        Sampling::TopK {
            k: params.top_k,
            temperature,
        }
    }
}

/// A loaded GGUF model with its tokenizer
pub struct GgufEngine {
    spec: LoadSpec,
    weights: Mutex<ModelWeights>, // forward() needs &mut for the kv cache
    tokenizer: Tokenizer,
    template: ChatTemplate,
    device: Device,
    stop_ids: Vec<u32>,
    max_new_tokens: usize,
}

impl GgufEngine {
    pub(crate) fn new(
        spec: LoadSpec,
        weights: ModelWeights,
        tokenizer: Tokenizer,
        device: Device,
        max_new_tokens: usize,
    ) -> Self {
        let template = ChatTemplate::new(spec.chat_format);
        let stop_ids = template
            .stop_tokens()
            .iter()
            .filter_map(|token| tokenizer.token_to_id(token))
            .collect();

        Self {
            spec,
            weights: Mutex::new(weights),
            tokenizer,
            template,
            device,
            stop_ids,
            max_new_tokens,
        }
    }

    fn generate(&self, prompt: &str, params: &SamplingParameters) -> Result<String, CandleError> {
        let encoding = self.tokenizer.encode(prompt, true)?;
        let prompt_tokens = encoding.get_ids();

        let context_size = self.spec.context_size as usize;
        if prompt_tokens.len() >= context_size {
            return Err(CandleError::ContextOverflow {
                prompt_tokens: prompt_tokens.len(),
                context_size,
            });
        }
        let budget = (context_size - prompt_tokens.len()).min(self.max_new_tokens);

        let mut weights = self
            .weights
            .lock()
            .map_err(|e| CandleError::Other(format!("model lock poisoned: {}", e)))?;
        let mut logits_processor =
            LogitsProcessor::from_sampling(rand::random(), sampling_strategy(params));

        let started = Instant::now();
        let input = Tensor::new(prompt_tokens, &self.device)?.unsqueeze(0)?;
        let logits = weights.forward(&input, 0)?.squeeze(0)?;
        let mut next = logits_processor.sample(&logits)?;

        let mut generated = Vec::new();
        for step in 0..budget {
            if self.stop_ids.contains(&next) {
                break;
            }
            generated.push(next);
            if step + 1 == budget {
                break;
            }

            let input = Tensor::new(&[next], &self.device)?.unsqueeze(0)?;
            let logits = weights
                .forward(&input, prompt_tokens.len() + step)?
                .squeeze(0)?;
            next = logits_processor.sample(&logits)?;
        }

        debug!(
            prompt_tokens = prompt_tokens.len(),
            generated_tokens = generated.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generation finished"
        );

        Ok(self.tokenizer.decode(&generated, true)?)
    }
}

impl InferenceEngine for GgufEngine {
    fn model_path(&self) -> &Path {
        &self.spec.model_path
    }

    fn gpu_layers(&self) -> u32 {
        self.spec.gpu_layers
    }

    fn chat_format(&self) -> ChatFormat {
        self.template.format()
    }

    fn complete(&self, messages: &[Message], sampling: &SamplingParameters) -> CoreResult<Message> {
        let prompt = self.template.render(messages)?;
        let text = self.generate(&prompt, sampling)?;
        Ok(Message::assistant(text.trim()))
    }

    fn metadata(&self) -> EngineMetadata {
        EngineMetadata {
            name: self
                .spec
                .model_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string()),
            description: Some("Quantized llama GGUF model on candle".to_string()),
            capabilities: vec!["text-generation".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_strategy() {
        let greedy = SamplingParameters {
            temperature: 0.0,
            top_k: 40,
        };
        assert!(matches!(sampling_strategy(&greedy), Sampling::ArgMax));

        let top_k = SamplingParameters::default();
        match sampling_strategy(&top_k) {
            Sampling::TopK { k, temperature } => {
                assert_eq!(k, 40);
                assert!((temperature - 0.8).abs() < 1e-6);
            }
            _ => panic!("expected top-k sampling"),
        }

        let unbounded = SamplingParameters {
            temperature: 1.0,
            top_k: 0,
        };
        assert!(matches!(
            sampling_strategy(&unbounded),
            Sampling::All { .. }
        ));
    }
}
