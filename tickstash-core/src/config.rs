//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) yields the
//! stock setup: Alpha Vantage with the shared demo key, one-year lookback,
//! synthetic fallback on, snapshots under `./data`.

use crate::data::alphavantage::{is_shared_key, DEFAULT_BASE_URL, DEMO_API_KEY};
use crate::data::provider::DEFAULT_LOOKBACK_DAYS;
use crate::data::rate_limit::RateLimit;
use crate::synthetic::SyntheticConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `provider.api_key`.
pub const API_KEY_ENV: &str = "TICKSTASH_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Live data provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    /// `None` falls back to the shared demo key.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Explicit pacing. When omitted, shared keys get 5/min and private
    /// keys are unpaced.
    pub calls_per_minute: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 30,
            calls_per_minute: None,
        }
    }
}

impl ProviderConfig {
    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or(DEMO_API_KEY)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Pacing to apply between live calls.
    pub fn rate_limit(&self) -> RateLimit {
        match self.calls_per_minute {
            Some(n) => RateLimit::per_minute(n),
            None if is_shared_key(self.api_key()) => RateLimit::shared_key(),
            None => RateLimit::disabled(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickstashConfig {
    /// Directory for CSV snapshots.
    pub data_dir: PathBuf,
    /// Calendar days of history to request.
    pub lookback_days: u32,
    /// Substitute synthetic data when no live data is available.
    pub fallback: bool,
    pub provider: ProviderConfig,
    pub synthetic: SyntheticConfig,
}

impl Default for TickstashConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            fallback: true,
            provider: ProviderConfig::default(),
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl TickstashConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TICKSTASH_API_KEY` if set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.provider.api_key = Some(key.trim().to_string());
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "provider.timeout_secs must be at least 1".into(),
            ));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.base_url is empty".into()));
        }
        self.synthetic
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("synthetic: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = TickstashConfig::from_toml("").unwrap();
        assert_eq!(config, TickstashConfig::default());
        assert_eq!(config.lookback_days, 365);
        assert!(config.fallback);
        assert_eq!(config.provider.api_key(), "demo");
        assert_eq!(config.synthetic.base_price("SPY"), 100.0);
        assert_eq!(config.synthetic.base_price("AAPL"), 150.0);
    }

    #[test]
    fn parses_full_config() {
        let toml = r#"
data_dir = "snapshots"
lookback_days = 90
fallback = false

[provider]
api_key = "PRIVATEKEY"
timeout_secs = 10

[synthetic]
default_base_price = 50.0
volatility = 0.01

[synthetic.base_prices]
QQQ = 300.0
"#;
        let config = TickstashConfig::from_toml(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("snapshots"));
        assert_eq!(config.lookback_days, 90);
        assert!(!config.fallback);
        assert_eq!(config.provider.api_key(), "PRIVATEKEY");
        assert_eq!(config.provider.timeout(), Duration::from_secs(10));
        assert_eq!(config.synthetic.base_price("QQQ"), 300.0);
        assert_eq!(config.synthetic.base_price("SPY"), 50.0);
        assert_eq!(config.synthetic.drift, 0.0005);
    }

    #[test]
    fn shared_key_is_paced_by_default() {
        let provider = ProviderConfig::default();
        assert_eq!(provider.rate_limit(), RateLimit::shared_key());
    }

    #[test]
    fn private_key_is_unpaced_unless_configured() {
        let provider = ProviderConfig {
            api_key: Some("PRIVATEKEY".into()),
            ..ProviderConfig::default()
        };
        assert!(!provider.rate_limit().is_enabled());

        let paced = ProviderConfig {
            calls_per_minute: Some(75),
            ..provider
        };
        assert_eq!(paced.rate_limit().calls_per_minute(), Some(75));
    }

    #[test]
    fn explicit_zero_disables_shared_pacing() {
        let provider = ProviderConfig {
            calls_per_minute: Some(0),
            ..ProviderConfig::default()
        };
        assert!(!provider.rate_limit().is_enabled());
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = TickstashConfig::from_toml("[provider]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_synthetic_section() {
        let err =
            TickstashConfig::from_toml("[synthetic]\nmin_volume = 5\nmax_volume = 1\n").unwrap_err();
        assert!(err.to_string().contains("synthetic"));
    }

    #[test]
    fn rejects_unparseable_toml() {
        let err = TickstashConfig::from_toml("lookback_days = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = TickstashConfig::from_file(Path::new("/nonexistent/tickstash.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
