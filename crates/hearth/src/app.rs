//! Application layer for Hearth
//!
//! Wires the configuration, the model and prompt directories, the engine
//! manager and the chat pipeline into one shareable value.

use hearth_core::{EngineConfig, EngineLoader, Message};
use std::sync::Arc;

use crate::catalog::{ModelCatalog, PromptLibrary};
use crate::chat::{ChatPipeline, ChatTurnRequest};
use crate::config::HearthConfig;
use crate::error::{ChatResult, HearthError, Result};
use crate::lifecycle::{EngineManager, EngineStatus};
use crate::storage::{LocalStorage, Storage};

/// The assembled chat service
pub struct Hearth {
    config: HearthConfig,
    models: ModelCatalog,
    prompts: PromptLibrary,
    engines: Arc<EngineManager>,
    pipeline: ChatPipeline,
}

impl Hearth {
    /// Create a new builder
    pub fn builder(config: HearthConfig) -> HearthBuilder {
        HearthBuilder::new(config)
    }

    pub fn config(&self) -> &HearthConfig {
        &self.config
    }

    pub fn models(&self) -> &ModelCatalog {
        &self.models
    }

    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    pub fn engines(&self) -> &Arc<EngineManager> {
        &self.engines
    }

    /// Session configuration step: load (or keep) the engine for `config`
    pub async fn configure(&self, config: &EngineConfig) -> ChatResult<EngineStatus> {
        let engine = self.engines.lock().await.acquire(config).await?;
        Ok(engine.status())
    }

    /// Run one chat turn
    pub async fn run_turn(&self, request: ChatTurnRequest) -> ChatResult<Vec<Message>> {
        self.pipeline.run_turn(request).await
    }

    /// Engine config for `model`, filling gaps from the configured defaults
    pub fn engine_config(
        &self,
        model: impl Into<String>,
        context_size: Option<u32>,
        gpu_layers: Option<u32>,
        vision: bool,
    ) -> EngineConfig {
        EngineConfig::new(
            model,
            context_size.unwrap_or(self.config.default_context_size),
            gpu_layers.unwrap_or(self.config.default_gpu_layers),
            vision,
        )
    }
}

/// Builder for [`Hearth`]
pub struct HearthBuilder {
    config: HearthConfig,
    loader: Option<Arc<dyn EngineLoader>>,
}

impl HearthBuilder {
    pub fn new(config: HearthConfig) -> Self {
        Self {
            config,
            loader: None,
        }
    }

    /// Set the engine loader
    pub fn loader(mut self, loader: impl EngineLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Set a shared engine loader
    pub fn shared_loader(mut self, loader: Arc<dyn EngineLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Build the application
    pub fn build(self) -> Result<Hearth> {
        let loader = self
            .loader
            .ok_or_else(|| HearthError::Build("No engine loader configured".to_string()))?;

        let model_storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(&self.config.models_dir));
        let prompt_storage: Arc<dyn Storage> =
            Arc::new(LocalStorage::new(&self.config.prompts_dir));

        let models = ModelCatalog::new(model_storage, self.config.model_extension.clone());
        let prompts = PromptLibrary::new(prompt_storage, self.config.prompt_extension.clone());
        let engines = Arc::new(EngineManager::new(
            loader,
            models.clone(),
            self.config.reload_policy(),
        ));
        let pipeline = ChatPipeline::new(engines.clone(), prompts.clone());

        Ok(Hearth {
            config: self.config,
            models,
            prompts,
            engines,
            pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::EchoLoader;
    use crate::testing::Fixture;

    #[test]
    fn test_build_requires_loader() {
        let result = Hearth::builder(HearthConfig::default()).build();
        assert!(matches!(result, Err(HearthError::Build(_))));
    }

    #[tokio::test]
    async fn test_configure_then_chat() {
        let fixture = Fixture::new();
        let app = Hearth::builder(HearthConfig::with_dirs(
            fixture.models_dir(),
            fixture.prompts_dir(),
        ))
        .loader(EchoLoader)
        .build()
        .unwrap();

        let config = app.engine_config("m.gguf", None, Some(2), false);
        assert_eq!(config.context_size, 2048);

        let status = app.configure(&config).await.unwrap();
        assert!(status.is_loaded());

        let history = app
            .run_turn(ChatTurnRequest::new(Vec::new()).with_user_input("hi"))
            .await
            .unwrap();
        assert_eq!(history.last(), Some(&Message::assistant("Echo: hi")));
        assert_eq!(app.models().list().await.unwrap().len(), 3);
    }
}
