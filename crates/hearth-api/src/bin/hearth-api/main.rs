use clap::{Parser, ValueEnum};
use hearth::{EchoLoader, Hearth};
use hearth_api::{ApiConfig, AppState, build_app};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Inference backend to serve
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// Quantized GGUF models on candle
    Candle,
    /// Repeats the user's message; no model is read
    Echo,
}

/// Hearth API Server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host address to bind to [default: 127.0.0.1]
    #[arg(short = 'H', long, env = "HEARTH_HOST")]
    host: Option<String>,

    /// Port to listen on [default: 5000]
    #[arg(short, long, env = "HEARTH_PORT")]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace) [default: info]
    #[arg(short, long, env = "HEARTH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Config file path
    #[arg(short, long, env = "HEARTH_CONFIG")]
    config_file: Option<PathBuf>,

    /// Disable Swagger UI
    #[arg(long, env = "HEARTH_DISABLE_SWAGGER", default_value_t = false)]
    disable_swagger: bool,

    /// Directory holding GGUF model files
    #[arg(long, env = "HEARTH_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Directory holding system prompt files
    #[arg(long, env = "HEARTH_PROMPTS_DIR")]
    prompts_dir: Option<PathBuf>,

    /// Inference backend
    #[arg(long, env = "HEARTH_BACKEND", value_enum, default_value_t = Backend::Candle)]
    backend: Backend,

    /// Tokenizer file for GGUF models that have none beside them
    #[arg(long, env = "HEARTH_TOKENIZER")]
    tokenizer: Option<PathBuf>,

    /// Reload the model on context size or vision changes as well
    #[arg(long, env = "HEARTH_RELOAD_ON_ANY_CHANGE", default_value_t = false)]
    reload_on_any_change: bool,
}

fn build_hearth(cli: &Cli, config: &ApiConfig) -> anyhow::Result<Hearth> {
    let builder = Hearth::builder(config.hearth.clone());
    let builder = match cli.backend {
        Backend::Echo => builder.loader(EchoLoader),
        #[cfg(feature = "candle")]
        Backend::Candle => {
            let mut loader = hearth::CandleLoader::builder();
            if let Some(tokenizer) = &cli.tokenizer {
                loader = loader.tokenizer_file(tokenizer);
            }
            builder.loader(loader.build())
        }
        #[cfg(not(feature = "candle"))]
        Backend::Candle => {
            anyhow::bail!("This build has no candle backend; rebuild with `--features candle` or use `--backend echo`")
        }
    };

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build application: {}", e))
}

/// Command-line options win over the config file; unset options keep its values
fn apply_cli(cli: &Cli, config: &mut ApiConfig) {
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if cli.disable_swagger {
        config.enable_swagger = false;
    }
    if let Some(dir) = &cli.models_dir {
        config.hearth.models_dir = dir.clone();
    }
    if let Some(dir) = &cli.prompts_dir {
        config.hearth.prompts_dir = dir.clone();
    }
    if cli.reload_on_any_change {
        config.hearth.reload_on_any_change = true;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let loaded = cli
        .config_file
        .as_ref()
        .map(|path| (path, ApiConfig::load_from_file(path)));
    let mut config = match &loaded {
        Some((_, Ok(cfg))) => cfg.clone(),
        _ => ApiConfig::default(),
    };
    apply_cli(&cli, &mut config);

    // Initialize logging
    let filter = format!(
        "hearth_api={level},hearth={level},hearth_candle={level},tower_http=debug",
        level = config.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &loaded {
        Some((path, Ok(_))) => info!("Configuration loaded from: {}", path.display()),
        Some((_, Err(e))) => warn!(
            "Failed to load config file: {}. Using default configuration.",
            e
        ),
        None => {}
    }

    let addr = config.socket_addr()?;
    let hearth = build_hearth(&cli, &config)?;

    info!(
        "Models: {}, prompts: {}, backend: {:?}, reload policy: {:?}",
        config.hearth.models_dir.display(),
        config.hearth.prompts_dir.display(),
        cli.backend,
        config.hearth.reload_policy()
    );

    let enable_swagger = config.enable_swagger;
    let app = build_app(AppState::new(hearth, config));

    // Start server
    info!("Starting server on: {}", addr);
    if enable_swagger {
        info!("Swagger UI: http://{}/swagger-ui", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
