//! Built-in engine implementations

use hearth_core::{
    ChatFormat, EngineLoader, EngineMetadata, InferenceEngine, LoadSpec, Message,
    Result as CoreResult, Role, SamplingParameters,
};
use std::path::Path;

/// Loader for [`EchoEngine`]; never reads the model file
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoLoader;

impl EngineLoader for EchoLoader {
    fn load(&self, spec: &LoadSpec) -> CoreResult<Box<dyn InferenceEngine>> {
        Ok(Box::new(EchoEngine { spec: spec.clone() }))
    }
}

/// Deterministic engine that repeats the latest user message
pub struct EchoEngine {
    spec: LoadSpec,
}

impl InferenceEngine for EchoEngine {
    fn model_path(&self) -> &Path {
        &self.spec.model_path
    }

    fn gpu_layers(&self) -> u32 {
        self.spec.gpu_layers
    }

    fn chat_format(&self) -> ChatFormat {
        self.spec.chat_format
    }

    fn complete(&self, messages: &[Message], _sampling: &SamplingParameters) -> CoreResult<Message> {
        let reply = match messages.iter().rev().find(|m| m.role == Role::User) {
            Some(message) => {
                let images = message.image_count();
                if images > 0 {
                    format!("Echo: {} [{} image(s)]", message.text(), images)
                } else {
                    format!("Echo: {}", message.text())
                }
            }
            None => "Echo: (nothing to repeat)".to_string(),
        };
        Ok(Message::assistant(reply))
    }

    fn metadata(&self) -> EngineMetadata {
        EngineMetadata {
            name: Some("echo".to_string()),
            description: Some("Repeats the latest user message".to_string()),
            capabilities: vec!["text".to_string(), "vision".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::{ContentPart, EngineConfig};

    #[test]
    fn test_echo_latest_user_message() {
        let spec = LoadSpec::from_config(&EngineConfig::new("m.gguf", 2048, 4, true), "m.gguf");
        let engine = EchoLoader.load(&spec).unwrap();
        assert_eq!(engine.gpu_layers(), 4);
        assert_eq!(engine.chat_format(), ChatFormat::Gemma);

        let messages = vec![
            Message::system(""),
            Message::user("first"),
            Message::assistant("Echo: first"),
            Message::user_parts(vec![
                ContentPart::text("second"),
                ContentPart::image("data:image/png;base64,AA=="),
            ]),
        ];
        let reply = engine
            .complete(&messages, &SamplingParameters::default())
            .unwrap();
        assert_eq!(reply, Message::assistant("Echo: second [1 image(s)]"));

        let reply = engine
            .complete(&[Message::system("")], &SamplingParameters::default())
            .unwrap();
        assert_eq!(reply.role, Role::Assistant);
    }
}
