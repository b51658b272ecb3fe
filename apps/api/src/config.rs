use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::generation::GenerationSettings;
use crate::retry::{Backoff, MAX_ATTEMPTS_LIMIT};

/// Application configuration loaded from environment variables.
/// Every variable has a default; invalid values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub ollama_base_url: String,
    pub default_model: String,
    pub default_temperature: f32,
    pub model_max_attempts: u32,
    pub model_timeout: Duration,
    pub retry_base_delay: Duration,
    pub fetch_max_attempts: u32,
    pub fetch_timeout: Duration,
    pub max_upload_bytes: usize,
    /// Replacement for the default reasoning-marker patterns, `;`-separated.
    pub reasoning_markers: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            default_model: std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| "llama3".to_string()),
            default_temperature: parse_env("DEFAULT_TEMPERATURE", 0.7)?,
            model_max_attempts: parse_env("MODEL_MAX_ATTEMPTS", 3)?,
            model_timeout: Duration::from_secs(parse_env("MODEL_TIMEOUT_SECS", 120)?),
            retry_base_delay: Duration::from_millis(parse_env("RETRY_BASE_DELAY_MS", 1000)?),
            fetch_max_attempts: parse_env("FETCH_MAX_ATTEMPTS", 2)?,
            fetch_timeout: Duration::from_secs(parse_env("FETCH_TIMEOUT_SECS", 10)?),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            reasoning_markers: std::env::var("REASONING_MARKERS")
                .ok()
                .map(|raw| split_markers(&raw)),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.default_temperature) {
            bail!(
                "DEFAULT_TEMPERATURE must be within [0, 1], got {}",
                self.default_temperature
            );
        }
        if !(1..=MAX_ATTEMPTS_LIMIT).contains(&self.model_max_attempts) {
            bail!(
                "MODEL_MAX_ATTEMPTS must be within [1, {MAX_ATTEMPTS_LIMIT}], got {}",
                self.model_max_attempts
            );
        }
        if !(1..=MAX_ATTEMPTS_LIMIT).contains(&self.fetch_max_attempts) {
            bail!(
                "FETCH_MAX_ATTEMPTS must be within [1, {MAX_ATTEMPTS_LIMIT}], got {}",
                self.fetch_max_attempts
            );
        }
        if self.default_model.trim().is_empty() {
            bail!("DEFAULT_MODEL cannot be empty");
        }
        Ok(())
    }

    /// Generation parameters used when a request does not override them.
    pub fn generation_defaults(&self) -> GenerationSettings {
        GenerationSettings {
            model_id: self.default_model.clone(),
            temperature: self.default_temperature,
            max_attempts: self.model_max_attempts,
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            base_delay: self.retry_base_delay,
            ..Backoff::default()
        }
    }
}

#[cfg(test)]
impl Config {
    /// Defaults with a small upload limit, for handler and router tests.
    pub fn for_tests() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            default_model: "llama3".to_string(),
            default_temperature: 0.7,
            model_max_attempts: 3,
            model_timeout: Duration::from_secs(120),
            retry_base_delay: Duration::from_millis(1000),
            fetch_max_attempts: 2,
            fetch_timeout: Duration::from_secs(10),
            max_upload_bytes: 1024 * 1024,
            reasoning_markers: None,
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn split_markers(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
