//! services/portal/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;

use tracing::Level;
use url::Url;

use crate::session::SessionSettings;

/// Guards never wait less or longer than this, whatever the environment says.
const GUARD_TIMEOUT_RANGE: (u64, u64) = (10, 25);

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub supabase_url: Url,
    pub supabase_anon_key: String,
    pub log_level: Level,
    pub site_url: Url,
    pub bootstrap_timeout: Duration,
    pub guard_timeout: Duration,
    pub sign_out_attempts: u32,
    pub sign_out_backoff: Duration,
    pub client_state_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Backend ---
        let supabase_url = parse_url(
            "SUPABASE_URL",
            &lookup("SUPABASE_URL").ok_or_else(|| missing("SUPABASE_URL"))?,
        )?;
        let supabase_anon_key = lookup("SUPABASE_ANON_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| missing("SUPABASE_ANON_KEY"))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let site_url = parse_url(
            "SITE_URL",
            &lookup("SITE_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
        )?;

        // --- Session lifecycle ---
        let bootstrap_timeout =
            Duration::from_secs(parse_number(&lookup, "BOOTSTRAP_TIMEOUT_SECS", 10)?);
        let guard_secs = parse_number(&lookup, "GUARD_TIMEOUT_SECS", 15)?
            .clamp(GUARD_TIMEOUT_RANGE.0, GUARD_TIMEOUT_RANGE.1);
        let sign_out_attempts = parse_number(&lookup, "SIGN_OUT_ATTEMPTS", 3)?.max(1) as u32;
        let sign_out_backoff =
            Duration::from_millis(parse_number(&lookup, "SIGN_OUT_BACKOFF_MS", 500)?);

        let client_state_path = lookup("CLIENT_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./.portal-state.json"));

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            log_level,
            site_url,
            bootstrap_timeout,
            guard_timeout: Duration::from_secs(guard_secs),
            sign_out_attempts,
            sign_out_backoff,
            client_state_path,
        })
    }

    /// The project reference the backend embeds in its storage keys: the first
    /// label of the backend host (`abcd` for `https://abcd.supabase.co`).
    pub fn project_ref(&self) -> String {
        self.supabase_url
            .host_str()
            .and_then(|h| h.split('.').next())
            .unwrap_or("local")
            .to_string()
    }

    pub fn session_settings(&self) -> SessionSettings {
        let mut oauth_redirect = self.site_url.clone();
        oauth_redirect.set_path("/auth/callback");
        SessionSettings {
            bootstrap_timeout: self.bootstrap_timeout,
            sign_out_attempts: self.sign_out_attempts,
            sign_out_backoff: self.sign_out_backoff,
            oauth_redirect: oauth_redirect.to_string(),
        }
    }
}

fn missing(key: &str) -> ConfigError {
    ConfigError::MissingVar(key.to_string())
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn parse_number<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}
