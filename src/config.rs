//! Configuration loader and validator for the bilingual channel bot.
use crate::model::ChatRef;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub telegram: Telegram,
    pub translation: Translation,
    #[serde(default)]
    pub labels: Labels,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    /// Drafts untouched for this long are discarded.
    #[serde(default = "default_draft_ttl")]
    pub draft_ttl_seconds: u64,
    /// Upper bound on the draft excerpt shown with errors.
    #[serde(default = "default_snippet_len")]
    pub snippet_len: usize,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Telegram {
    pub bot_token: String,
    /// Broadcast channel: `@username` or numeric id.
    pub channel: String,
    pub allowed_users: Vec<i64>,
}

/// Source/target language pair and translator backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Translation {
    pub source_lang: String,
    pub target_lang: String,
    /// Cloud Translation API key; the keyless web endpoint is used when absent.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Captions of the language toggle button under channel posts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Labels {
    pub show_source: String,
    pub show_target: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            show_source: "🇷🇺 Показать на русском".into(),
            show_target: "🇬🇧 Show in English".into(),
        }
    }
}

fn default_draft_ttl() -> u64 {
    86_400
}

fn default_snippet_len() -> usize {
    crate::validator::DEFAULT_SNIPPET_LEN
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Parsed broadcast channel. Valid after `validate`.
    pub fn channel(&self) -> Result<ChatRef, ConfigError> {
        ChatRef::parse(&self.telegram.channel)
            .ok_or(ConfigError::Invalid("telegram.channel must be @username or a numeric id"))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.draft_ttl_seconds == 0 {
        return Err(ConfigError::Invalid("app.draft_ttl_seconds must be > 0"));
    }
    if cfg.app.snippet_len == 0 {
        return Err(ConfigError::Invalid("app.snippet_len must be > 0"));
    }

    if cfg.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid("telegram.bot_token must be non-empty"));
    }
    cfg.channel()?;
    if cfg.telegram.allowed_users.is_empty() {
        return Err(ConfigError::Invalid("telegram.allowed_users must list at least one operator"));
    }

    if cfg.translation.source_lang.trim().is_empty() {
        return Err(ConfigError::Invalid("translation.source_lang must be non-empty"));
    }
    if cfg.translation.target_lang.trim().is_empty() {
        return Err(ConfigError::Invalid("translation.target_lang must be non-empty"));
    }
    if cfg.translation.source_lang == cfg.translation.target_lang {
        return Err(ConfigError::Invalid("translation.source_lang and target_lang must differ"));
    }
    if cfg.translation.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("translation.timeout_seconds must be > 0"));
    }

    if cfg.labels.show_source.trim().is_empty() || cfg.labels.show_target.trim().is_empty() {
        return Err(ConfigError::Invalid("labels.show_source and labels.show_target must be non-empty"));
    }

    Ok(())
}

/// Returns a complete example configuration.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  draft_ttl_seconds: 86400
  snippet_len: 1500

telegram:
  bot_token: "YOUR_TELEGRAM_BOT_TOKEN"
  channel: "@your_channel"
  allowed_users:
    - 123456789

translation:
  source_lang: "ru"
  target_lang: "en"
  # api_key: "GOOGLE_CLOUD_TRANSLATION_KEY"
  timeout_seconds: 30

labels:
  show_source: "🇷🇺 Показать на русском"
  show_target: "🇬🇧 Show in English"
"#
}
