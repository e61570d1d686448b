use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::completion::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// An environment variable held an unusable value.
    InvalidEnv { name: &'static str, value: String },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::InvalidEnv { name, value } => {
                write!(f, "invalid value for {name}: '{value}'")
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::InvalidEnv { .. } | Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    telegram_bot_token: String,
    openai_api_key: String,
    openai_base_url: Option<String>,
    model: Option<String>,
    /// Directory holding the .docx/.txt books.
    books_dir: Option<String>,
    /// Public HTTPS URL Telegram should post updates to. Long polling if unset.
    webhook_url: Option<String>,
    port: Option<u16>,
    request_timeout_secs: Option<u64>,
    /// Directory for logs. Defaults to current directory.
    data_dir: Option<String>,
}

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub books_dir: PathBuf,
    pub webhook_url: Option<reqwest::Url>,
    pub port: u16,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
}

impl Config {
    /// Load from an optional JSON file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut file = match path {
            Some(path) => read_file(path)?,
            None => ConfigFile::default(),
        };
        apply_env(&mut file, &env)?;
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required (or TELEGRAM_TOKEN)".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.openai_api_key.is_empty() {
            return Err(ConfigError::Validation("openai_api_key is required (or OPENAI_API_KEY)".into()));
        }

        let webhook_url = file
            .webhook_url
            .filter(|u| !u.trim().is_empty())
            .map(|u| {
                reqwest::Url::parse(u.trim())
                    .map_err(|e| ConfigError::Validation(format!("webhook_url '{u}' is not a valid URL: {e}")))
            })
            .transpose()?;

        let timeout_secs = file.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Validation("request_timeout_secs must be greater than 0".into()));
        }

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            openai_api_key: file.openai_api_key,
            openai_base_url: file.openai_base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: file.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            books_dir: PathBuf::from(file.books_dir.unwrap_or_else(|| "books".to_string())),
            webhook_url,
            port: file.port.unwrap_or(DEFAULT_PORT),
            request_timeout: Duration::from_secs(timeout_secs),
            data_dir: file.data_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadFile { path: path.to_path_buf(), source: e })?;
    serde_json::from_str(&content)
        .map_err(|e| ConfigError::ParseJson { path: path.to_path_buf(), source: e })
}

fn apply_env<F>(file: &mut ConfigFile, env: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = env("TELEGRAM_TOKEN") {
        file.telegram_bot_token = v;
    }
    if let Some(v) = env("OPENAI_API_KEY") {
        file.openai_api_key = v;
    }
    if let Some(v) = env("OPENAI_BASE_URL") {
        file.openai_base_url = Some(v);
    }
    if let Some(v) = env("OPENAI_MODEL") {
        file.model = Some(v);
    }
    if let Some(v) = env("BOOKS_PATH") {
        file.books_dir = Some(v);
    }
    if let Some(v) = env("WEBHOOK_URL") {
        file.webhook_url = Some(v);
    }
    if let Some(v) = env("DATA_DIR") {
        file.data_dir = Some(v);
    }
    if let Some(v) = env("PORT") {
        let port = v.trim().parse().map_err(|_| ConfigError::InvalidEnv { name: "PORT", value: v.clone() })?;
        file.port = Some(port);
    }
    if let Some(v) = env("REQUEST_TIMEOUT_SECS") {
        let secs = v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { name: "REQUEST_TIMEOUT_SECS", value: v.clone() })?;
        file.request_timeout_secs = Some(secs);
    }
    Ok(())
}
