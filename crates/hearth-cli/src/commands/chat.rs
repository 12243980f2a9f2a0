//! Chat command handler

use crate::error::CliError;
use hearth::prelude::*;
use hearth::{EngineStatus, ImageAttachment};
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};

/// Settings for one chat session
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub prompt: Option<String>,
    pub context_size: Option<u32>,
    pub gpu_layers: Option<u32>,
    pub sampling: SamplingParameters,
    pub vision: bool,
    pub image: Option<PathBuf>,
    pub once: Option<String>,
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Read an image file to attach to the next turn
pub fn read_image(path: &Path) -> Result<ImageAttachment, CliError> {
    let bytes = std::fs::read(path).map_err(|e| {
        CliError::InvalidInput(format!("Cannot read image {}: {}", path.display(), e))
    })?;
    if bytes.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "Image {} is empty",
            path.display()
        )));
    }
    Ok(ImageAttachment::new(
        bytes,
        content_type_for(path).map(str::to_string),
    ))
}

/// Client side of a conversation: owns the history and resubmits it each turn
pub struct ChatSession<'a> {
    app: &'a Hearth,
    engine: EngineConfig,
    prompt: Option<String>,
    sampling: SamplingParameters,
    history: Vec<Message>,
    pending_image: Option<ImageAttachment>,
}

impl<'a> ChatSession<'a> {
    pub fn new(app: &'a Hearth, options: &ChatOptions) -> Self {
        let engine = app.engine_config(
            options.model.clone(),
            options.context_size,
            options.gpu_layers,
            options.vision,
        );
        Self {
            app,
            engine,
            prompt: options.prompt.clone(),
            sampling: options.sampling,
            history: Vec::new(),
            pending_image: None,
        }
    }

    /// Load (or keep) the session's engine
    pub async fn configure(&self) -> Result<EngineStatus, CliError> {
        Ok(self.app.configure(&self.engine).await?)
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn attach(&mut self, image: ImageAttachment) {
        self.pending_image = Some(image);
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.pending_image = None;
    }

    /// Send one turn; the history only changes when the turn succeeds
    pub async fn send(&mut self, input: &str) -> Result<Message, CliError> {
        let mut request = ChatTurnRequest::new(self.history.clone())
            .with_engine(self.engine.clone())
            .with_sampling(self.sampling)
            .with_user_input(input);
        if let Some(prompt) = &self.prompt {
            request = request.with_prompt(prompt.clone());
        }
        if let Some(image) = self.pending_image.clone() {
            request = request.with_image(image);
        }

        let history = self.app.run_turn(request).await?;
        self.pending_image = None;

        let reply = history
            .last()
            .cloned()
            .ok_or_else(|| CliError::InvalidInput("engine returned no reply".to_string()))?;
        self.history = history;
        Ok(reply)
    }
}

fn history_file() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("hearth").join("chat_history.txt"))
}

pub async fn run_chat(app: Hearth, options: ChatOptions) -> Result<(), CliError> {
    let mut session = ChatSession::new(&app, &options);

    if let Some(path) = &options.image {
        session.attach(read_image(path)?);
    }

    // Single message mode: print the reply only
    if let Some(message) = &options.once {
        let reply = session.send(message).await?;
        println!("{}", reply.text());
        return Ok(());
    }

    println!("🔥 Hearth Chat - Type 'exit' to quit, '/help' for commands");
    println!("================================");
    match session.configure().await? {
        EngineStatus::Loaded {
            model,
            chat_format,
            context_size,
            gpu_layers,
            ..
        } => println!(
            "✅ {} ready ({}, ctx {}, gpu layers {})",
            model, chat_format, context_size, gpu_layers
        ),
        other => println!("⚠️  Engine state: {:?}", other),
    }

    let mut rl = DefaultEditor::new()?;
    let history_path = history_file();
    if let Some(path) = &history_path {
        rl.load_history(path).ok();
    }

    loop {
        let readline = rl.readline("🔥 > ");
        match readline {
            Ok(line) => {
                let input = line.trim();

                if input == "exit" || input == "quit" {
                    println!("Goodbye! 👋");
                    break;
                }

                if input.is_empty() {
                    continue;
                }

                rl.add_history_entry(&line).ok();

                if let Some(command) = input.strip_prefix('/') {
                    handle_command(&mut session, command);
                    continue;
                }

                match session.send(input).await {
                    Ok(reply) => println!("Bot: {}", reply.text()),
                    Err(e) => println!("❌ {}", e),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("\nCtrl-C received. Use 'exit' to quit.");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("\nGoodbye! 👋");
                break;
            }
            Err(err) => {
                return Err(err.into());
            }
        }
    }

    if let Some(path) = &history_path {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).ok();
        }
        rl.save_history(path).ok();
    }

    Ok(())
}

fn handle_command(session: &mut ChatSession<'_>, command: &str) {
    let (name, arg) = match command.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "image" if !arg.is_empty() => match read_image(Path::new(arg)) {
            Ok(image) => {
                session.attach(image);
                println!("📎 Image attached to the next message");
            }
            Err(e) => println!("❌ {}", e),
        },
        "reset" => {
            session.reset();
            println!("🧹 Conversation cleared");
        }
        "history" => {
            for message in session.history() {
                println!("[{}] {}", message.role.as_str(), message.text());
            }
        }
        _ => {
            println!("Commands:");
            println!("  /image PATH   attach an image to the next message");
            println!("  /reset        start a new conversation");
            println!("  /history      show the conversation so far");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth::{EchoLoader, HearthConfig, Role};
    use tempfile::TempDir;

    fn echo_app(dir: &TempDir) -> Hearth {
        let models = dir.path().join("models");
        let prompts = dir.path().join("prompts");
        std::fs::create_dir_all(&models).unwrap();
        std::fs::create_dir_all(&prompts).unwrap();
        std::fs::write(models.join("m.gguf"), b"GGUF").unwrap();
        std::fs::write(prompts.join("helpful.prompt"), "You are helpful.").unwrap();

        Hearth::builder(HearthConfig::with_dirs(models, prompts))
            .loader(EchoLoader)
            .build()
            .unwrap()
    }

    fn options(prompt: Option<&str>) -> ChatOptions {
        ChatOptions {
            model: "m.gguf".to_string(),
            prompt: prompt.map(str::to_string),
            context_size: None,
            gpu_layers: None,
            sampling: SamplingParameters::default(),
            vision: false,
            image: None,
            once: None,
        }
    }

    #[tokio::test]
    async fn test_session_keeps_history() {
        let dir = TempDir::new().unwrap();
        let app = echo_app(&dir);
        let mut session = ChatSession::new(&app, &options(Some("helpful.prompt")));

        let reply = session.send("hi").await.unwrap();
        assert_eq!(reply.text(), "Echo: hi");
        session.send("again").await.unwrap();

        let roles: Vec<Role> = session.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );

        session.reset();
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_history() {
        let dir = TempDir::new().unwrap();
        let app = echo_app(&dir);
        let mut session = ChatSession::new(&app, &options(Some("missing.prompt")));

        let err = session.send("hi").await.unwrap_err();
        assert!(matches!(err, CliError::Chat(_)));
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_read_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.JPG");
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();

        let image = read_image(&path).unwrap();
        assert_eq!(image.content_type.as_deref(), Some("image/jpeg"));
        assert!(read_image(&dir.path().join("absent.png")).is_err());
        assert_eq!(content_type_for(Path::new("notes.txt")), None);
    }
}
