use crate::core::rate::is_currency_code;
use crate::providers::bank_lv::DEFAULT_FEED_URL;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_CURRENCIES: [&str; 10] = [
    "AUD", "BGN", "BRL", "CAD", "CHF", "CNY", "CZK", "DKK", "GBP", "HKD",
];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FeedConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            url: DEFAULT_FEED_URL.to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,
    #[serde(default)]
    pub feed: FeedConfig,
    pub database_path: Option<String>,
    /// Upper bound for a whole sync run; unset means no deadline.
    pub sync_timeout_secs: Option<u64>,
}

fn default_currencies() -> Vec<String> {
    DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currencies: default_currencies(),
            feed: FeedConfig::default(),
            database_path: None,
            sync_timeout_secs: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults if the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxsync", "fxsync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.database_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "fxsync", "fxsync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("rates.db"))
    }

    pub fn sync_timeout(&self) -> Option<Duration> {
        self.sync_timeout_secs.map(Duration::from_secs)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.normalize()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Upper-cases currency codes and rejects anything that is not a 3-letter code.
    fn normalize(&mut self) -> Result<()> {
        for code in &mut self.currencies {
            *code = code.trim().to_ascii_uppercase();
            if !is_currency_code(code) {
                bail!("Invalid currency code in config: '{code}'");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load_str(yaml: &str) -> Result<AppConfig> {
        let mut file = NamedTempFile::new()?;
        file.write_all(yaml.as_bytes())?;
        AppConfig::load_from_path(file.path())
    }

    #[test]
    fn test_config_deserialization() {
        let config = load_str(
            r#"
currencies: [aud, "GBP "]
feed:
  url: "http://localhost:8080/rss.xml"
  timeout_secs: 3
database_path: "/tmp/rates.db"
sync_timeout_secs: 30
"#,
        )
        .unwrap();

        assert_eq!(config.currencies, vec!["AUD", "GBP"]);
        assert_eq!(config.feed.url, "http://localhost:8080/rss.xml");
        assert_eq!(config.feed.timeout(), Duration::from_secs(3));
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/rates.db"));
        assert_eq!(config.sync_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_config_defaults() {
        let config = load_str("feed:\n  url: \"http://example.com/feed\"\n").unwrap();

        assert_eq!(config.currencies.len(), DEFAULT_CURRENCIES.len());
        assert_eq!(config.currencies[0], "AUD");
        assert_eq!(config.feed.timeout_secs, 10);
        assert!(config.database_path.is_none());
        assert!(config.sync_timeout().is_none());

        let defaults = AppConfig::default();
        assert_eq!(defaults.feed.url, DEFAULT_FEED_URL);
    }

    #[test]
    fn test_invalid_currency_rejected() {
        let result = load_str("currencies: [AUD, EURO]\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("EURO"));
    }
}
