use crate::processing::chunking::SplitPolicy;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_CHUNK_MAX_LENGTH: usize = 1024;
const DEFAULT_SUMMARY_MAX_LENGTH: usize = 250;
const DEFAULT_SUMMARY_MIN_LENGTH: usize = 100;
const DEFAULT_STAGE_CONCURRENCY: usize = 4;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the digest service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Backend used for translation and summarization.
    pub inference_provider: InferenceProvider,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Model used for the translation stage.
    pub translation_model: String,
    /// Model used for the summarization stage.
    pub summarization_model: String,
    /// Language code of uploaded documents.
    pub source_language: String,
    /// Language code produced by translation; also names the download artifacts.
    pub target_language: String,
    /// Upper bound on chunk length, in characters.
    pub chunk_max_length: usize,
    /// Atomic unit used when building chunks.
    pub chunk_split_policy: SplitPolicy,
    /// Upper length bound requested from the summarizer.
    pub summary_max_length: usize,
    /// Lower length bound requested from the summarizer.
    pub summary_min_length: usize,
    /// Number of chunk transforms allowed in flight per stage.
    pub stage_concurrency: usize,
    /// Optional per-chunk timeout, in seconds.
    pub chunk_timeout_secs: Option<u64>,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported inference backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Offline fallback: identity translation and extractive summaries.
    Passthrough,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inference_provider: InferenceProvider::Ollama,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            translation_model: DEFAULT_MODEL.to_string(),
            summarization_model: DEFAULT_MODEL.to_string(),
            source_language: "en".to_string(),
            target_language: "cs".to_string(),
            chunk_max_length: DEFAULT_CHUNK_MAX_LENGTH,
            chunk_split_policy: SplitPolicy::Words,
            summary_max_length: DEFAULT_SUMMARY_MAX_LENGTH,
            summary_min_length: DEFAULT_SUMMARY_MIN_LENGTH,
            stage_concurrency: DEFAULT_STAGE_CONCURRENCY,
            chunk_timeout_secs: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            server_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    ///
    /// Every variable is optional; unset values fall back to [`Config::default`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            inference_provider: parse_optional("INFERENCE_PROVIDER")?
                .unwrap_or(defaults.inference_provider),
            ollama_url: load_env_optional("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            translation_model: load_env_optional("TRANSLATION_MODEL")
                .unwrap_or(defaults.translation_model),
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or(defaults.summarization_model),
            source_language: load_env_optional("SOURCE_LANGUAGE")
                .unwrap_or(defaults.source_language),
            target_language: load_env_optional("TARGET_LANGUAGE")
                .unwrap_or(defaults.target_language),
            chunk_max_length: parse_optional("CHUNK_MAX_LENGTH")?
                .unwrap_or(defaults.chunk_max_length),
            chunk_split_policy: parse_optional("CHUNK_SPLIT_POLICY")?
                .unwrap_or(defaults.chunk_split_policy),
            summary_max_length: parse_optional("SUMMARY_MAX_LENGTH")?
                .unwrap_or(defaults.summary_max_length),
            summary_min_length: parse_optional("SUMMARY_MIN_LENGTH")?
                .unwrap_or(defaults.summary_min_length),
            stage_concurrency: parse_optional("STAGE_CONCURRENCY")?
                .unwrap_or(defaults.stage_concurrency),
            chunk_timeout_secs: parse_optional("CHUNK_TIMEOUT_SECS")?,
            max_upload_bytes: parse_optional("MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
            server_port: parse_optional("SERVER_PORT")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_max_length == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_MAX_LENGTH".into()));
        }
        if self.stage_concurrency == 0 {
            return Err(ConfigError::InvalidValue("STAGE_CONCURRENCY".into()));
        }
        if self.summary_max_length == 0 || self.summary_min_length > self.summary_max_length {
            return Err(ConfigError::InvalidValue("SUMMARY_MIN_LENGTH".into()));
        }
        if self.target_language.trim().is_empty() {
            return Err(ConfigError::MissingVariable("TARGET_LANGUAGE".into()));
        }
        Ok(())
    }

    /// Per-chunk timeout as a [`Duration`], when configured.
    pub fn chunk_timeout(&self) -> Option<Duration> {
        self.chunk_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl FromStr for InferenceProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "passthrough" | "none" => Ok(Self::Passthrough),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
///
/// Install tracing first; the loaded values are logged at `debug`.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        provider = ?config.inference_provider,
        ollama_url = %config.ollama_url,
        source_language = %config.source_language,
        target_language = %config.target_language,
        chunk_max_length = config.chunk_max_length,
        stage_concurrency = config.stage_concurrency,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_bounds() {
        let config = Config::default();
        assert_eq!(config.chunk_max_length, 1024);
        assert_eq!(config.summary_max_length, 250);
        assert_eq!(config.summary_min_length, 100);
        assert_eq!(config.stage_concurrency, 4);
        assert!(config.chunk_timeout().is_none());
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let config = Config {
            stage_concurrency: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(key)) if key == "STAGE_CONCURRENCY"
        ));
    }

    #[test]
    fn validate_rejects_inverted_summary_bounds() {
        let config = Config {
            summary_min_length: 300,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!(
            "OLLAMA".parse::<InferenceProvider>(),
            Ok(InferenceProvider::Ollama)
        );
        assert_eq!(
            "passthrough".parse::<InferenceProvider>(),
            Ok(InferenceProvider::Passthrough)
        );
        assert!("openai".parse::<InferenceProvider>().is_err());
    }

    #[test]
    fn zero_timeout_disables_limit() {
        let config = Config {
            chunk_timeout_secs: Some(0),
            ..Config::default()
        };
        assert!(config.chunk_timeout().is_none());
    }
}
