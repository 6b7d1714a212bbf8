use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::Period;

const DEFAULT_FRESHNESS_SECONDS: u64 = 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub source: FeedSource,
    pub cache: CacheConfig,
    pub view: ViewConfig,
}

/// Closed set of widget source kinds, validated at the boundary. Only the
/// public feed kind is handled here; the authenticated API source lives in a
/// different widget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedSource {
    IcsUrl { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// 0 means "use the default freshness window".
    pub freshness_seconds: u64,
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewConfig {
    pub period: Period,
    /// Matched against attendee e-mails to highlight the viewer's response.
    /// Never used for access control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_email: Option<String>,
    pub refresh_interval_minutes: u32,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.source {
            FeedSource::IcsUrl { url } if url.trim().is_empty() => Err(ConfigError::Invalid(
                "source.url must be a non-empty feed URL".to_string(),
            )),
            FeedSource::IcsUrl { .. } => Ok(()),
        }
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dashcal")
            .join("config.toml")
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn freshness(&self) -> Duration {
        let seconds = if self.cache.freshness_seconds == 0 {
            DEFAULT_FRESHNESS_SECONDS
        } else {
            self.cache.freshness_seconds
        };
        Duration::seconds(seconds as i64)
    }

    pub fn feed_url(&self) -> &str {
        match &self.source {
            FeedSource::IcsUrl { url } => url,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dashcal");

        Self {
            source: FeedSource::IcsUrl { url: String::new() },
            cache: CacheConfig {
                freshness_seconds: 0,
                db_path: data_dir.join("cache.db"),
            },
            view: ViewConfig {
                period: Period::Week,
                viewer_email: None,
                refresh_interval_minutes: 5,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_refreshes_every_5_minutes() {
        let config = Config::default();
        assert_eq!(config.view.refresh_interval_minutes, 5);
    }

    #[test]
    fn zero_freshness_falls_back_to_default_hour() {
        let config = Config::default();
        assert_eq!(config.freshness(), Duration::hours(1));
    }

    #[test]
    fn explicit_freshness_is_honored() {
        let mut config = Config::default();
        config.cache.freshness_seconds = 120;
        assert_eq!(config.freshness(), Duration::seconds(120));
    }

    #[test]
    fn parse_valid_toml_config() {
        let toml_content = r#"
            [source]
            kind = "ics_url"
            url = "https://example.com/team.ics"

            [cache]
            freshness_seconds = 900
            db_path = "/tmp/dashcal.db"

            [view]
            period = "three_days"
            viewer_email = "me@example.com"
            refresh_interval_minutes = 10
        "#;

        let config = Config::from_toml(toml_content).unwrap();

        assert_eq!(config.feed_url(), "https://example.com/team.ics");
        assert_eq!(config.cache.freshness_seconds, 900);
        assert_eq!(config.view.period, Period::ThreeDays);
        assert_eq!(config.view.viewer_email.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn empty_feed_url_is_rejected() {
        let toml_content = r#"
            [source]
            kind = "ics_url"
            url = ""

            [cache]
            freshness_seconds = 0
            db_path = "/tmp/dashcal.db"

            [view]
            period = "week"
            refresh_interval_minutes = 5
        "#;

        assert!(matches!(
            Config::from_toml(toml_content),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let result = Config::from_toml("this is not valid toml");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn unknown_source_kind_is_rejected() {
        let toml_content = r#"
            [source]
            kind = "carrier_pigeon"
            url = "x"

            [cache]
            freshness_seconds = 0
            db_path = "/tmp/dashcal.db"

            [view]
            period = "week"
            refresh_interval_minutes = 5
        "#;

        assert!(Config::from_toml(toml_content).is_err());
    }
}
