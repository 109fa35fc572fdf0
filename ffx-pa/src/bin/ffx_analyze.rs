//! Command-line pronunciation analysis
//!
//! **Usage:**
//! ```bash
//! ffx-analyze --audio take1.wav --text "Bonjour, je m'appelle Marie" [--phones] [--feedback]
//! ffx-analyze --audio take1.wav --text "..." --save-raw take1.json
//! ffx-analyze --raw take1.json --text "..." --phones
//! ```
//!
//! Uses the same configuration file and key resolution as the server.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use ffx_pa::config::ServiceConfig;
use ffx_pa::models::FeedbackOutcome;
use ffx_pa::report::{render_feedback, render_phone_summary, render_result};
use ffx_pa::services::{generate_feedback, group_by_phone, normalize, Providers, ScoringRequest};

/// Score a recording and print a pronunciation report
#[derive(Parser, Debug)]
#[clap(name = "ffx-analyze", version)]
struct Args {
    /// Recording to score
    #[clap(long, value_name = "FILE", conflicts_with = "raw")]
    audio: Option<PathBuf>,

    /// Sentence the speaker read
    #[clap(long)]
    text: String,

    /// Write the raw scoring response to this file
    #[clap(long, value_name = "FILE")]
    save_raw: Option<PathBuf>,

    /// Normalize a previously saved raw response instead of calling SpeechAce
    #[clap(long, value_name = "FILE")]
    raw: Option<PathBuf>,

    /// Print the per-phone summary
    #[clap(long)]
    phones: bool,

    /// Ask the language model for coaching feedback
    #[clap(long)]
    feedback: bool,

    /// Bootstrap TOML file (overrides FFX_CONFIG)
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn audio_content_type(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "webm" => "audio/webm",
        _ => return None,
    };
    Some(mime.to_string())
}

async fn score_file(providers: &Providers, audio: &Path, text: &str) -> Result<Value> {
    let Some(scoring) = providers.scoring.as_ref() else {
        bail!("SpeechAce is not configured; set SPEECHACE_API_KEY or [speechace] api_key");
    };

    let bytes = std::fs::read(audio)
        .with_context(|| format!("Failed to read {}", audio.display()))?;
    if bytes.is_empty() {
        bail!("{} is empty", audio.display());
    }

    let request = ScoringRequest {
        audio: bytes,
        file_name: audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("recording.wav")
            .to_string(),
        content_type: audio_content_type(audio),
        target_text: text.to_string(),
    };

    info!(file = %audio.display(), bytes = request.audio.len(), "Scoring recording");
    Ok(scoring.score(&request).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let text = args.text.trim();
    if text.is_empty() {
        bail!("--text must not be blank");
    }

    let config_path = ffx_common::config::resolve_config_path(args.config.as_deref(), "ffx-pa");
    let toml_config = ffx_common::config::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;
    ffx_common::logging::init(&toml_config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config = ServiceConfig::from_toml(&toml_config)?;
    let providers = Providers::from_config(&config)?;

    let raw = match (&args.raw, &args.audio) {
        (Some(path), _) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("{} is not valid JSON", path.display()))?
        }
        (None, Some(audio)) => score_file(&providers, audio, text).await?,
        (None, None) => bail!("Either --audio or --raw is required"),
    };

    if let Some(path) = &args.save_raw {
        std::fs::write(path, serde_json::to_string_pretty(&raw)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(file = %path.display(), "Saved raw response");
    }

    let result = normalize(&raw, text, &config.cefr_bands)?;
    let groups = group_by_phone(&result);
    let threshold = config.feedback.needs_work_threshold;

    print!("{}", render_result(&result, threshold));

    if args.phones {
        println!();
        print!("{}", render_phone_summary(&groups, threshold));
    }

    if args.feedback {
        let feedback =
            generate_feedback(providers.llm.as_deref(), &result, &groups, &config.feedback).await;
        if !matches!(feedback, FeedbackOutcome::Skipped) {
            println!();
            print!("{}", render_feedback(&feedback));
        }
    }

    Ok(())
}
