//! Main crate for Hearth
//!
//! Keeps one local model loaded, decides when a chat request needs a
//! different one, and turns each request into one engine call plus an
//! updated conversation history.

pub mod app;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod engines;
pub mod error;
pub mod lifecycle;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

// Re-export core types
pub use hearth_core::{
    ChatFormat, ContentPart, CoreError, EngineConfig, EngineLoader, EngineMetadata,
    ImageAttachment, InferenceEngine, LoadSpec, Message, MessageContent, Role, SamplingParameters,
    SharedEngine, parse_history,
};

pub use app::{Hearth, HearthBuilder};
pub use catalog::{CatalogEntry, ModelCatalog, PromptLibrary};
pub use chat::{ChatPipeline, ChatTurnRequest};
pub use config::HearthConfig;
pub use engines::EchoLoader;
pub use error::{ChatError, ChatResult, ErrorKind, HearthError, Result};
pub use lifecycle::{EngineGuard, EngineManager, EngineStatus, LockedEngine, ReloadPolicy};

// Feature-gated re-exports
#[cfg(feature = "candle")]
pub use hearth_candle::{CandleLoader, CandleLoaderBuilder};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::app::Hearth;
    pub use crate::chat::ChatTurnRequest;
    pub use hearth_core::{EngineConfig, Message, SamplingParameters};
}
