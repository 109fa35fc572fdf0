//! ffx-pa - Pronunciation Analysis Microservice
//!
//! **Module Identity:**
//! - Name: ffx-pa (Pronunciation Analysis)
//! - Default port: 5731
//!
//! Scores a learner's recording against a target sentence, aggregates the
//! result per phone and adds coaching feedback. Also serves practice
//! question generation and text-to-speech for the Francoflex frontend.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use ffx_pa::config::ServiceConfig;
use ffx_pa::services::Providers;
use ffx_pa::AppState;

/// Francoflex pronunciation analysis service
#[derive(Parser, Debug)]
#[clap(name = "ffx-pa", version)]
struct Args {
    /// Bootstrap TOML file (overrides FFX_CONFIG)
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind (overrides the config file)
    #[clap(long)]
    bind: Option<String>,

    /// Port to listen on (overrides the config file)
    #[clap(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Step 1: Bootstrap configuration
    let config_path = ffx_common::config::resolve_config_path(args.config.as_deref(), "ffx-pa");
    let mut toml_config = ffx_common::config::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        toml_config.bind = bind;
    }
    if let Some(port) = args.port {
        toml_config.port = port;
    }

    // Step 2: Logging
    ffx_common::logging::init(&toml_config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting ffx-pa (Pronunciation Analysis) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: built-in defaults"),
    }

    // Step 3: Resolve keys and build provider clients
    let config = ServiceConfig::from_toml(&toml_config)?;
    let providers = Providers::from_config(&config)?;

    let status = providers.status();
    info!(
        speechace = status.speechace,
        openai = status.openai,
        tts = status.tts,
        langfuse = status.langfuse,
        "Providers configured"
    );
    if !status.speechace {
        warn!("SpeechAce key missing: /pronunciation_analysis will return 503");
    }
    if !status.openai {
        warn!("OpenAI key missing: feedback, questions and audio are unavailable");
    }

    let addr = format!("{}:{}", config.bind, config.port);
    let state = AppState::new(config, providers);
    let app = ffx_pa::build_router(state);

    // Step 4: Serve
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
