use crate::content::paths::PathConvention;
use crate::error::SyncError;
use crate::i18n::{DetectorConfig, Language};
use crate::retry::RetryConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2-flash-preview";

/// Settings for the remote translation endpoint.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Credentials that passed validation; required for any API call.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub endpoint: reqwest::Url,
}

/// Everything a run needs, built once in `main` and passed down.
#[derive(Debug, Clone)]
pub struct Config {
    // Layout
    pub content_dir: PathBuf,
    pub primary_root: Option<PathBuf>,
    pub secondary_root: Option<PathBuf>,
    pub primary_language: Language,
    pub secondary_language: Language,
    pub suffix: Option<String>,

    // Behaviour
    pub dry_run: bool,
    pub concurrency: usize,
    pub translate_tags: bool,

    // Translation service
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub detection: DetectorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            primary_root: None,
            secondary_root: None,
            primary_language: Language::ENGLISH,
            secondary_language: Language::SIMPLIFIED_CHINESE,
            suffix: None,
            dry_run: false,
            concurrency: 4,
            translate_tags: false,
            api: ApiConfig {
                api_key: None,
                endpoint: None,
                model: DEFAULT_MODEL.to_string(),
                temperature: 0.3,
                max_tokens: 4096,
                timeout: Duration::from_secs(30),
            },
            retry: RetryConfig::translation(),
            detection: DetectorConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from a variable lookup. Unset values fall back to
    /// defaults; credentials are checked later by [`Config::credentials`] so
    /// a dry run works without them.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let parse_num = |key: &str| -> Result<Option<u64>> {
            var(key)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, v))
                })
                .transpose()
        };

        let temperature = match var("TRANSLATE_TEMPERATURE") {
            Some(v) => v
                .trim()
                .parse::<f32>()
                .with_context(|| format!("TRANSLATE_TEMPERATURE must be a number, got '{}'", v))?,
            None => defaults.api.temperature,
        };

        let primary_language = match var("PRIMARY_LANGUAGE") {
            Some(code) => Language::from_code(&code).context("PRIMARY_LANGUAGE")?,
            None => defaults.primary_language,
        };
        let secondary_language = match var("SECONDARY_LANGUAGE") {
            Some(code) => Language::from_code(&code).context("SECONDARY_LANGUAGE")?,
            None => defaults.secondary_language,
        };

        let retry = match parse_num("TRANSLATE_MAX_RETRIES")? {
            Some(retries) => RetryConfig {
                max_attempts: retries as u32 + 1,
                ..defaults.retry
            },
            None => defaults.retry,
        };

        Ok(Self {
            content_dir: var("CONTENT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.content_dir),
            primary_root: None,
            secondary_root: None,
            primary_language,
            secondary_language,
            suffix: var("SECONDARY_SUFFIX"),
            dry_run: false,
            concurrency: parse_num("SYNC_CONCURRENCY")?
                .map(|n| n as usize)
                .unwrap_or(defaults.concurrency),
            translate_tags: var("TRANSLATE_TAGS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            api: ApiConfig {
                // GEMINI_* names are what the CI workflow has always exported
                api_key: var("TRANSLATE_API_KEY").or_else(|| var("GEMINI_API_KEY")),
                endpoint: var("TRANSLATE_ENDPOINT").or_else(|| var("GEMINI_ENDPOINT")),
                model: var("TRANSLATE_MODEL").unwrap_or(defaults.api.model),
                temperature,
                max_tokens: parse_num("TRANSLATE_MAX_TOKENS")?
                    .map(|n| n as u32)
                    .unwrap_or(defaults.api.max_tokens),
                timeout: parse_num("TRANSLATE_TIMEOUT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.api.timeout),
            },
            retry,
            detection: defaults.detection,
        })
    }

    /// Check the settings that do not depend on the translation service.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.primary_language == self.secondary_language {
            return Err(SyncError::ConfigurationFatal(format!(
                "primary and secondary language are both '{}'",
                self.primary_language
            )));
        }
        if self.primary_language.script() == self.secondary_language.script() {
            return Err(SyncError::ConfigurationFatal(format!(
                "'{}' and '{}' share a script and cannot be told apart",
                self.primary_language, self.secondary_language
            )));
        }
        let suffix = self.suffix();
        if suffix.is_empty() || suffix.contains(['/', '\\']) || suffix.starts_with('.') {
            return Err(SyncError::ConfigurationFatal(format!(
                "invalid file suffix '{}'",
                suffix
            )));
        }
        if self.concurrency == 0 {
            return Err(SyncError::ConfigurationFatal(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// API key and endpoint, or a configuration-fatal error naming what is
    /// missing.
    pub fn credentials(&self) -> Result<ApiCredentials, SyncError> {
        let api_key = self.api.api_key.clone().ok_or_else(|| {
            SyncError::ConfigurationFatal(
                "TRANSLATE_API_KEY (or GEMINI_API_KEY) not set".to_string(),
            )
        })?;
        let endpoint = self.api.endpoint.as_deref().ok_or_else(|| {
            SyncError::ConfigurationFatal(
                "TRANSLATE_ENDPOINT (or GEMINI_ENDPOINT) not set".to_string(),
            )
        })?;
        let endpoint = reqwest::Url::parse(endpoint).map_err(|e| {
            SyncError::ConfigurationFatal(format!("invalid endpoint '{}': {}", endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(SyncError::ConfigurationFatal(format!(
                "endpoint must be http(s), got '{}'",
                endpoint
            )));
        }
        Ok(ApiCredentials { api_key, endpoint })
    }

    /// Secondary file-name suffix; defaults to the secondary language code.
    pub fn suffix(&self) -> String {
        self.suffix
            .clone()
            .unwrap_or_else(|| self.secondary_language.code().to_string())
    }

    pub fn path_convention(&self) -> PathConvention {
        PathConvention {
            primary: self.primary_language,
            secondary: self.secondary_language,
            primary_root: self
                .primary_root
                .clone()
                .unwrap_or_else(|| self.content_dir.join(self.primary_language.code())),
            secondary_root: self
                .secondary_root
                .clone()
                .unwrap_or_else(|| self.content_dir.join(self.secondary_language.code())),
            suffix: self.suffix(),
        }
    }
}
