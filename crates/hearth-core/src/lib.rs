//! # Hearth Core
//!
//! Message model, engine configuration and the inference capability traits
//! shared by every Hearth crate.

pub mod engine;
pub mod error;
pub mod message;

pub use engine::{
    ChatFormat, EngineConfig, EngineLoader, EngineMetadata, InferenceEngine, LoadSpec,
    SamplingParameters, SharedEngine,
};
pub use error::{CoreError, Result};
pub use message::{
    ContentPart, ImageAttachment, ImageUrl, Message, MessageContent, Role, parse_history,
};
