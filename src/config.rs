//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (encryption key, API key) are referenced by env-var name in the
//! config and resolved at runtime.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

use crate::analytics::AnalyticsParams;
use crate::history::{stake, DEFAULT_PAGE_SIZE, DEFAULT_TARGET_COUNT};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub stake: StakeConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Default engine parameters.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub threshold: f64,
    pub start_bet: f64,
    pub escalation_pct: f64,
    pub win_multiplier: Option<f64>,
    pub bet_count_cap: usize,
    pub bankroll: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        let p = AnalyticsParams::default();
        Self {
            threshold: p.threshold,
            start_bet: p.start_bet,
            escalation_pct: p.escalation_pct,
            win_multiplier: p.win_multiplier,
            bet_count_cap: p.default_bet_count,
            bankroll: p.bankroll,
        }
    }
}

impl AnalyticsConfig {
    /// Engine parameters with the bet count left to auto-tuning.
    pub fn params(&self) -> AnalyticsParams {
        AnalyticsParams {
            threshold: self.threshold,
            start_bet: self.start_bet,
            escalation_pct: self.escalation_pct,
            win_multiplier: self.win_multiplier,
            bet_count_cap: None,
            default_bet_count: self.bet_count_cap,
            bankroll: self.bankroll,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StakeConfig {
    pub base_url: String,
    pub page_size: u32,
    pub target_count: usize,
    pub timeout_secs: u64,
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            base_url: stake::DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            target_count: DEFAULT_TARGET_COUNT,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CredentialsConfig {
    pub path: String,
    pub encryption_key_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: "stake_headers.json".to_string(),
            encryption_key_env: "APP_ENCRYPTION_KEY".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub api_key_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            api_key_env: "APP_API_KEY".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Resolve a secret held in an environment variable.
    pub fn resolve_secret(env_name: &str) -> Result<SecretString> {
        Self::resolve_env(env_name).map(SecretString::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        // Requires config.toml in the working directory; cargo test runs
        // from the package root where it lives.
        let result = AppConfig::load("config.toml");
        if let Ok(cfg) = result {
            assert_eq!(cfg.analytics.threshold, 2.0);
            assert!(cfg.analytics.start_bet > 0.0);
            assert_eq!(cfg.stake.page_size, 50);
            assert_eq!(cfg.stake.target_count, 1000);
            assert_eq!(cfg.credentials.encryption_key_env, "APP_ENCRYPTION_KEY");
        }
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = AppConfig::parse("").unwrap();
        assert_eq!(cfg.analytics.threshold, 2.0);
        assert_eq!(cfg.analytics.escalation_pct, 90.0);
        assert_eq!(cfg.analytics.bet_count_cap, 20);
        assert_eq!(cfg.stake.base_url, "https://stake.ac");
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn test_partial_sections() {
        let cfg = AppConfig::parse(
            r#"
            [analytics]
            threshold = 1.5
            bankroll = 250.0

            [server]
            port = 8080
            "#,
        )
        .unwrap();
        assert_eq!(cfg.analytics.threshold, 1.5);
        assert_eq!(cfg.analytics.bankroll, 250.0);
        assert_eq!(cfg.analytics.start_bet, 1.0);
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.api_key_env, "APP_API_KEY");
    }

    #[test]
    fn test_params_leave_bet_count_to_tuning() {
        let cfg = AppConfig::default();
        let params = cfg.analytics.params();
        assert_eq!(params.bet_count_cap, None);
        assert_eq!(params.default_bet_count, 20);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AppConfig::parse("[analytics\nthreshold = ").is_err());
    }

    #[test]
    fn test_resolve_env_missing() {
        assert!(AppConfig::resolve_env("CRASH_ANALYTICS_SURELY_UNSET_VAR").is_err());
    }
}
