//! Fakes shared by the unit tests of this crate

use hearth_core::{
    ChatFormat, CoreError, EngineLoader, EngineMetadata, InferenceEngine, LoadSpec, Message,
    Result as CoreResult, SamplingParameters,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Every message sequence sent to any engine built by one loader
pub type CallLog = Arc<Mutex<Vec<Vec<Message>>>>;

/// Loader that counts constructions and fails for models named `broken*`
#[derive(Default)]
pub struct CountingLoader {
    loads: Arc<AtomicUsize>,
    specs: Arc<Mutex<Vec<LoadSpec>>>,
    calls: CallLog,
    reply: Option<Message>,
    load_delay: Duration,
    reply_delay: Duration,
    in_flight: Arc<AtomicUsize>,
    overlaps: Arc<AtomicUsize>,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engines built by this loader answer with `reply` instead of an echo
    pub fn replying(reply: Message) -> Self {
        Self {
            reply: Some(reply),
            ..Self::default()
        }
    }

    /// Loads sleep for `delay` before returning
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Completions sleep for `delay` before replying
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Loads that started while some engine was inside `complete`
    pub fn overlapping_loads(&self) -> Arc<AtomicUsize> {
        self.overlaps.clone()
    }

    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        self.loads.clone()
    }

    pub fn specs(&self) -> Arc<Mutex<Vec<LoadSpec>>> {
        self.specs.clone()
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

impl EngineLoader for CountingLoader {
    fn load(&self, spec: &LoadSpec) -> CoreResult<Box<dyn InferenceEngine>> {
        let name = spec
            .model_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name.starts_with("broken") {
            return Err(CoreError::Load("incompatible model format".to_string()));
        }
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        std::thread::sleep(self.load_delay);

        self.loads.fetch_add(1, Ordering::SeqCst);
        self.specs.lock().unwrap().push(spec.clone());
        Ok(Box::new(RecordingEngine {
            model_path: spec.model_path.clone(),
            gpu_layers: spec.gpu_layers,
            chat_format: spec.chat_format,
            calls: self.calls.clone(),
            reply: self.reply.clone(),
            reply_delay: self.reply_delay,
            in_flight: self.in_flight.clone(),
        }))
    }
}

/// Engine that records its inputs and replies `reply-<n>`
pub struct RecordingEngine {
    model_path: PathBuf,
    gpu_layers: u32,
    chat_format: ChatFormat,
    calls: CallLog,
    reply: Option<Message>,
    reply_delay: Duration,
    in_flight: Arc<AtomicUsize>,
}

impl InferenceEngine for RecordingEngine {
    fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn gpu_layers(&self) -> u32 {
        self.gpu_layers
    }

    fn chat_format(&self) -> ChatFormat {
        self.chat_format
    }

    fn complete(&self, messages: &[Message], _sampling: &SamplingParameters) -> CoreResult<Message> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.reply_delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut calls = self.calls.lock().unwrap();
        calls.push(messages.to_vec());
        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }
        if messages.iter().any(|m| m.text() == "explode") {
            return Err(CoreError::Inference("engine crashed".to_string()));
        }
        Ok(Message::assistant(format!("reply-{}", calls.len())))
    }

    fn metadata(&self) -> EngineMetadata {
        EngineMetadata {
            name: Some("recording".to_string()),
            ..Default::default()
        }
    }
}

/// Temporary model and prompt directories
pub struct Fixture {
    pub dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("models")).unwrap();
        std::fs::create_dir(dir.path().join("prompts")).unwrap();
        for model in ["m.gguf", "other.gguf", "broken.gguf"] {
            std::fs::write(dir.path().join("models").join(model), b"GGUF").unwrap();
        }
        std::fs::write(
            dir.path().join("prompts").join("helpful.prompt"),
            "You are helpful.",
        )
        .unwrap();
        Self { dir }
    }

    pub fn models_dir(&self) -> PathBuf {
        self.dir.path().join("models")
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.dir.path().join("prompts")
    }
}
