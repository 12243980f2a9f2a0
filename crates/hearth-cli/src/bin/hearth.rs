//! CLI for the Hearth local chat service

use clap::Parser;
use hearth::SamplingParameters;
use hearth_cli::{GlobalOptions, commands, error::CliError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hearth")]
#[command(about = "Chat with local GGUF models", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    /// Log level for diagnostics on stderr
    #[arg(long, global = true, env = "HEARTH_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List model files
    Models,
    /// List system prompt files
    Prompts,
    /// Chat with a model
    Chat {
        /// Model file name in the models directory
        #[arg(long, short = 'm')]
        model: String,

        /// Prompt file name in the prompts directory
        #[arg(long, short = 'p')]
        prompt: Option<String>,

        /// Context size in tokens
        #[arg(long)]
        ctx: Option<u32>,

        /// Layers to offload to the GPU
        #[arg(long)]
        gpu_layers: Option<u32>,

        /// Sampling temperature
        #[arg(long, short = 't', default_value_t = 0.8)]
        temperature: f32,

        /// Top-k cut-off (0 disables it)
        #[arg(long, short = 'k', default_value_t = 40)]
        top_k: usize,

        /// Use the vision chat format and forward images
        #[arg(long)]
        vision: bool,

        /// Image attached to the first message
        #[arg(long)]
        image: Option<PathBuf>,

        /// Send one message, print the reply and exit
        #[arg(long)]
        once: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Models) => {
            let app = cli.global.build_app()?;
            commands::list_models(&app).await?;
        }
        Some(Commands::Prompts) => {
            let app = cli.global.build_app()?;
            commands::list_prompts(&app).await?;
        }
        Some(Commands::Chat {
            model,
            prompt,
            ctx,
            gpu_layers,
            temperature,
            top_k,
            vision,
            image,
            once,
        }) => {
            let app = cli.global.build_app()?;
            let options = commands::ChatOptions {
                model,
                prompt,
                context_size: ctx,
                gpu_layers,
                sampling: SamplingParameters { temperature, top_k },
                vision,
                image,
                once,
            };
            commands::run_chat(app, options).await?;
        }
        None => {
            println!("Hearth - local chat for GGUF models");
            println!("Use --help for more information");
        }
    }

    Ok(())
}
