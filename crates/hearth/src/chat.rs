//! Chat turn pipeline
//!
//! One turn: pick the engine, prepend the system prompt to the client's
//! history, append the new user contribution, run the engine and hand back
//! the history without the system message.

use hearth_core::{
    ContentPart, EngineConfig, ImageAttachment, Message, Role, SamplingParameters,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::PromptLibrary;
use crate::error::ChatError;
use crate::lifecycle::EngineManager;

/// Everything a client submits for one turn
#[derive(Debug, Clone, Default)]
pub struct ChatTurnRequest {
    /// Engine to use; `None` means whatever is currently loaded
    pub engine: Option<EngineConfig>,
    /// Whether an attached image is forwarded to the engine
    pub vision: bool,
    pub sampling: SamplingParameters,
    /// Prompt file name for the system message
    pub prompt: Option<String>,
    pub user_input: Option<String>,
    /// Full client-held history from previous turns
    pub history: Vec<Message>,
    pub image: Option<ImageAttachment>,
}

impl ChatTurnRequest {
    pub fn new(history: Vec<Message>) -> Self {
        Self {
            history,
            ..Default::default()
        }
    }

    /// Select an engine; the turn's vision flag follows the engine config
    pub fn with_engine(mut self, config: EngineConfig) -> Self {
        self.vision = config.vision;
        self.engine = Some(config);
        self
    }

    pub fn with_vision(mut self, vision: bool) -> Self {
        self.vision = vision;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParameters) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_user_input(mut self, input: impl Into<String>) -> Self {
        self.user_input = Some(input.into());
        self
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }
}

/// Content parts of the new user turn: text first, then the image when
/// vision is enabled.
pub fn new_turn_parts(
    user_input: Option<&str>,
    image: Option<&ImageAttachment>,
    vision: bool,
) -> Vec<ContentPart> {
    let mut parts = Vec::new();

    if let Some(text) = user_input.filter(|t| !t.is_empty()) {
        parts.push(ContentPart::text(text));
    }

    match image.filter(|img| !img.is_empty()) {
        Some(image) if vision => parts.push(ContentPart::image(image.data_url())),
        Some(_) => debug!("Ignoring attached image; vision is disabled"),
        None => {}
    }

    parts
}

/// Message sequence sent to the engine: exactly one leading system message,
/// the non-system history in order, then the new user turn if it has parts.
pub fn build_outbound(
    system_prompt: String,
    history: &[Message],
    new_turn: Vec<ContentPart>,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_prompt));
    messages.extend(history.iter().filter(|m| !m.is_system()).cloned());

    if !new_turn.is_empty() {
        messages.push(Message::user_parts(new_turn));
    }

    messages
}

/// Client-facing history: the outbound sequence without its system message,
/// followed by the reply.
pub fn reconcile(outbound: Vec<Message>, reply: Message) -> Vec<Message> {
    let mut history: Vec<Message> = outbound.into_iter().filter(|m| !m.is_system()).collect();
    history.push(reply);
    history
}

/// Runs chat turns against the managed engine
#[derive(Clone)]
pub struct ChatPipeline {
    engines: Arc<EngineManager>,
    prompts: PromptLibrary,
}

impl ChatPipeline {
    pub fn new(engines: Arc<EngineManager>, prompts: PromptLibrary) -> Self {
        Self { engines, prompts }
    }

    /// Run one turn and return the updated history.
    ///
    /// The engine lock is held from engine selection until the reply is
    /// back, so concurrent turns queue behind each other. Dropping the
    /// returned future does not release the lock while the engine is still
    /// generating.
    pub async fn run_turn(&self, request: ChatTurnRequest) -> Result<Vec<Message>, ChatError> {
        let guard = self.engines.lock().await;
        let engine = match &request.engine {
            Some(config) => guard.acquire(config).await?,
            None => guard.current()?,
        };

        let system_prompt = self.prompts.system_prompt(request.prompt.as_deref()).await?;

        let new_turn = new_turn_parts(
            request.user_input.as_deref(),
            request.image.as_ref(),
            request.vision,
        );
        if new_turn.is_empty() && request.history.iter().all(Message::is_system) {
            return Err(ChatError::EmptyTurn);
        }

        let outbound = build_outbound(system_prompt, &request.history, new_turn);
        info!(
            messages = outbound.len(),
            history = request.history.len(),
            images = outbound.last().map(Message::image_count).unwrap_or(0),
            temperature = request.sampling.temperature,
            top_k = request.sampling.top_k,
            "Running chat turn"
        );

        let (outbound, reply) = engine.complete(outbound, request.sampling).await?;
        if reply.role != Role::Assistant {
            return Err(ChatError::Inference(format!(
                "engine replied with role '{}' instead of 'assistant'",
                reply.role.as_str()
            )));
        }

        Ok(reconcile(outbound, reply))
    }
}
