use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_target_currency() -> String {
    "JPY".to_string()
}

fn default_price_lookback_days() -> i64 {
    1
}

fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Currency the market data is quoted in.
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    /// Currency the converted figures are reported in.
    #[serde(default = "default_target_currency")]
    pub target_currency: String,
    /// Days to look back from the evaluation date when resolving a close.
    /// The default of 1 tolerates a single non-trading day; widen it to
    /// survive longer market holidays.
    #[serde(default = "default_price_lookback_days")]
    pub price_lookback_days: i64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            base_currency: default_base_currency(),
            target_currency: default_target_currency(),
            price_lookback_days: default_price_lookback_days(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default path, falling back to defaults
    /// when no config file exists. The app is fully usable without one.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "divfolio", "divfolio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        // A non-positive lookback inverts the price window and every ticker
        // comes back empty, so reject it here instead of reporting no data.
        if config.price_lookback_days <= 0 {
            bail!(
                "price_lookback_days must be positive, got {}",
                config.price_lookback_days
            );
        }
        debug!("Successfully loaded config");
        Ok(config)
    }
}
