//! Prompt templates
//!
//! Serializes role-tagged messages into the text the model was trained on.

use hearth_core::{ChatFormat, Message, Role};

use crate::CandleError;

/// Renders messages for one chat format
#[derive(Debug, Clone, Copy)]
pub struct ChatTemplate {
    format: ChatFormat,
}

impl ChatTemplate {
    pub fn new(format: ChatFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ChatFormat {
        self.format
    }

    /// Tokens that end the assistant turn
    pub fn stop_tokens(&self) -> &'static [&'static str] {
        match self.format {
            ChatFormat::ChatMl => &["<|im_end|>", "<|endoftext|>", "</s>"],
            ChatFormat::Gemma => &["<end_of_turn>", "<eos>"],
        }
    }

    /// Render `messages` followed by an open assistant turn.
    ///
    /// Image parts cannot be tokenized by a text-only model and are rejected.
    pub fn render(&self, messages: &[Message]) -> Result<String, CandleError> {
        if let Some(message) = messages.iter().find(|m| m.image_count() > 0) {
            return Err(CandleError::UnsupportedContent(format!(
                "{} message carries image parts, which this backend cannot encode",
                message.role.as_str()
            )));
        }

        Ok(match self.format {
            ChatFormat::ChatMl => render_chatml(messages),
            ChatFormat::Gemma => render_gemma(messages),
        })
    }
}

fn render_chatml(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for message in messages {
        let text = message.text();
        if message.role == Role::System && text.is_empty() {
            continue;
        }
        prompt.push_str("<|im_start|>");
        prompt.push_str(message.role.as_str());
        prompt.push('\n');
        prompt.push_str(&text);
        prompt.push_str("<|im_end|>\n");
    }
    prompt.push_str("<|im_start|>assistant\n");
    prompt
}

// Gemma has no system role: the system text is folded into the first user turn.
fn render_gemma(messages: &[Message]) -> String {
    let mut prompt = String::new();
    let mut pending_system = String::new();

    for message in messages {
        let text = message.text();
        match message.role {
            Role::System => {
                if !text.is_empty() {
                    if !pending_system.is_empty() {
                        pending_system.push_str("\n\n");
                    }
                    pending_system.push_str(&text);
                }
            }
            Role::User => {
                prompt.push_str("<start_of_turn>user\n");
                if !pending_system.is_empty() {
                    prompt.push_str(&pending_system);
                    prompt.push_str("\n\n");
                    pending_system.clear();
                }
                prompt.push_str(&text);
                prompt.push_str("<end_of_turn>\n");
            }
            Role::Assistant => {
                prompt.push_str("<start_of_turn>model\n");
                prompt.push_str(&text);
                prompt.push_str("<end_of_turn>\n");
            }
        }
    }

    if !pending_system.is_empty() {
        prompt.push_str("<start_of_turn>user\n");
        prompt.push_str(&pending_system);
        prompt.push_str("<end_of_turn>\n");
    }
    prompt.push_str("<start_of_turn>model\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::ContentPart;

    fn conversation() -> Vec<Message> {
        vec![
            Message::system("You are helpful."),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user_parts(vec![ContentPart::text("continue")]),
        ]
    }

    #[test]
    fn test_chatml() {
        let prompt = ChatTemplate::new(ChatFormat::ChatMl)
            .render(&conversation())
            .unwrap();
        assert_eq!(
            prompt,
            "<|im_start|>system\nYou are helpful.<|im_end|>\n\
             <|im_start|>user\nhi<|im_end|>\n\
             <|im_start|>assistant\nhello<|im_end|>\n\
             <|im_start|>user\ncontinue<|im_end|>\n\
             <|im_start|>assistant\n"
        );
    }

    #[test]
    fn test_chatml_skips_empty_system() {
        let prompt = ChatTemplate::new(ChatFormat::ChatMl)
            .render(&[Message::system(""), Message::user("hi")])
            .unwrap();
        assert_eq!(prompt, "<|im_start|>user\nhi<|im_end|>\n<|im_start|>assistant\n");
    }

    #[test]
    fn test_gemma_folds_system_prompt() {
        let prompt = ChatTemplate::new(ChatFormat::Gemma)
            .render(&conversation())
            .unwrap();
        assert_eq!(
            prompt,
            "<start_of_turn>user\nYou are helpful.\n\nhi<end_of_turn>\n\
             <start_of_turn>model\nhello<end_of_turn>\n\
             <start_of_turn>user\ncontinue<end_of_turn>\n\
             <start_of_turn>model\n"
        );
    }

    #[test]
    fn test_rejects_images() {
        let messages = vec![Message::user_parts(vec![
            ContentPart::text("describe"),
            ContentPart::image("data:image/jpeg;base64,AA=="),
        ])];
        let err = ChatTemplate::new(ChatFormat::Gemma)
            .render(&messages)
            .unwrap_err();
        assert!(matches!(err, CandleError::UnsupportedContent(_)));
    }

    #[test]
    fn test_stop_tokens() {
        assert!(
            ChatTemplate::new(ChatFormat::ChatMl)
                .stop_tokens()
                .contains(&"<|im_end|>")
        );
        assert!(
            ChatTemplate::new(ChatFormat::Gemma)
                .stop_tokens()
                .contains(&"<end_of_turn>")
        );
    }
}
