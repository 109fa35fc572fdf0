//! Bootstrap configuration loading and config file resolution
//!
//! The TOML file is read once at startup. Every field has a built-in default,
//! so a missing file (or a missing section) never stops a service from
//! starting. Provider keys may also come from the environment; that
//! resolution lives in the service crate.

use crate::cefr::CefrBand;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "FFX_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Interface the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body (audio uploads)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Echo the untouched scoring payload in analysis metadata
    #[serde(default)]
    pub include_raw_response: bool,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub speechace: SpeechAceSection,

    #[serde(default)]
    pub openai: OpenAiSection,

    #[serde(default)]
    pub langfuse: LangfuseSection,

    #[serde(default)]
    pub timeouts: TimeoutSection,

    #[serde(default)]
    pub feedback: FeedbackSection,

    /// Score-to-CEFR table; empty means equal-width bands
    #[serde(default)]
    pub cefr_bands: Vec<CefrBand>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            include_raw_response: false,
            logging: LoggingConfig::default(),
            speechace: SpeechAceSection::default(),
            openai: OpenAiSection::default(),
            langfuse: LangfuseSection::default(),
            timeouts: TimeoutSection::default(),
            feedback: FeedbackSection::default(),
            cefr_bands: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// SpeechAce scoring provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechAceSection {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_speechace_url")]
    pub base_url: String,
    #[serde(default = "default_dialect")]
    pub dialect: String,
}

impl Default for SpeechAceSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_speechace_url(),
            dialect: default_dialect(),
        }
    }
}

/// OpenAI chat completion and speech synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSection {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,
}

impl Default for OpenAiSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_url(),
            chat_model: default_chat_model(),
            tts_model: default_tts_model(),
            tts_voice: default_tts_voice(),
        }
    }
}

/// Langfuse prompt management
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LangfuseSection {
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default = "default_langfuse_host")]
    pub host: String,
}

impl Default for LangfuseSection {
    fn default() -> Self {
        Self {
            public_key: None,
            secret_key: None,
            host: default_langfuse_host(),
        }
    }
}

/// Per-provider outbound call timeouts, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSection {
    #[serde(default = "default_scoring_secs")]
    pub scoring_secs: u64,
    #[serde(default = "default_llm_secs")]
    pub llm_secs: u64,
    #[serde(default = "default_tts_secs")]
    pub tts_secs: u64,
    #[serde(default = "default_prompt_secs")]
    pub prompt_secs: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            scoring_secs: default_scoring_secs(),
            llm_secs: default_llm_secs(),
            tts_secs: default_tts_secs(),
            prompt_secs: default_prompt_secs(),
        }
    }
}

/// Coaching feedback generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSection {
    /// Upper bound on each feedback string, in characters
    #[serde(default = "default_feedback_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_feedback_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_feedback_temperature")]
    pub temperature: f32,
    /// Phones scoring below this are flagged as needing work
    #[serde(default = "default_needs_work_threshold")]
    pub needs_work_threshold: f64,
}

impl Default for FeedbackSection {
    fn default() -> Self {
        Self {
            max_chars: default_feedback_max_chars(),
            max_tokens: default_feedback_max_tokens(),
            temperature: default_feedback_temperature(),
            needs_work_threshold: default_needs_work_threshold(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5731
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_speechace_url() -> String {
    "https://api.speechace.co".to_string()
}

fn default_dialect() -> String {
    "fr-fr".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}

fn default_tts_voice() -> String {
    "alloy".to_string()
}

fn default_langfuse_host() -> String {
    "https://cloud.langfuse.com".to_string()
}

fn default_scoring_secs() -> u64 {
    9
}

fn default_llm_secs() -> u64 {
    8
}

fn default_tts_secs() -> u64 {
    8
}

fn default_prompt_secs() -> u64 {
    5
}

fn default_feedback_max_chars() -> usize {
    800
}

fn default_feedback_max_tokens() -> u32 {
    200
}

fn default_feedback_temperature() -> f32 {
    0.7
}

fn default_needs_work_threshold() -> f64 {
    70.0
}

/// Config file resolution in priority order:
/// 1. Command-line argument
/// 2. `FFX_CONFIG` environment variable
/// 3. `<config_dir>/francoflex/<module>.toml`
///
/// Returns `None` when no candidate exists; callers fall back to defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>, module_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let default_path = default_config_path(module_name)?;
    if default_path.exists() {
        Some(default_path)
    } else {
        None
    }
}

/// Platform config location for a module's TOML file
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("francoflex").join(format!("{}.toml", module_name)))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file if there is one, otherwise built-in defaults
///
/// A path that does not exist only logs a warning. A file that exists but
/// does not parse is an error.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    match path {
        Some(path) if path.exists() => {
            let config = load_toml_config(path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            info!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
