//! CLI command handlers

pub mod chat;
pub mod list;

pub use chat::{ChatOptions, ChatSession, run_chat};
pub use list::{list_models, list_prompts};
