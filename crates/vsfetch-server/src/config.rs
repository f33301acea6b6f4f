//! Service configuration.
//!
//! Read from a TOML file; every field has a default. A few endpoints can be
//! overridden from the environment.

use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use vsfetch_client::{Endpoint, SourceUrls};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/vsfetch/vsfetch.toml";

const DEFAULT_TIMEOUT_SECS: f64 = 3.0;

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackedConfig {
    pub base_url: String,
    pub timeout: f64,
}

impl Default for TrackedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9441".to_string(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VersionedConfig {
    pub base_url: String,
    pub timeout: f64,
}

impl Default for VersionedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9440".to_string(),
            timeout: default_timeout(),
        }
    }
}

/// Live feed and reference dataset sources.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    pub timeout: f64,
    pub data_url: String,
    pub fixed_data_url: String,
    pub boundaries_url: String,
    pub runways_url: String,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        let urls = SourceUrls::default();
        Self {
            timeout: default_timeout(),
            data_url: urls.data_url,
            fixed_data_url: urls.fixed_data_url,
            boundaries_url: urls.boundaries_url,
            runways_url: urls.runways_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay after a cycle that found no new data.
    pub idle_interval_secs: u64,
    /// Delay after a processed cycle.
    pub normal_interval_secs: u64,
    /// First delay after a failed cycle; doubles on every further failure.
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            idle_interval_secs: 3,
            normal_interval_secs: 10,
            backoff_base_secs: 15,
            backoff_max_secs: 120,
        }
    }
}

impl PollConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }

    pub fn normal_interval(&self) -> Duration {
        Duration::from_secs(self.normal_interval_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracked: TrackedConfig,
    pub versioned: VersionedConfig,
    pub external: ExternalConfig,
    pub poll: PollConfig,
}

impl Config {
    /// Load configuration from `path`, then apply environment overrides.
    ///
    /// An unreadable file falls back to defaults; a file that exists but
    /// does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let config = match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text)
                .with_context(|| format!("invalid config file {}", path.display()))?,
            Err(err) => {
                tracing::error!(
                    "error reading config {}: {}, using defaults",
                    path.display(),
                    err
                );
                Self::default()
            }
        };
        Ok(config.with_overrides(|key| env::var(key).ok()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `VSFETCH_TRACKED_URL`, `VSFETCH_VERSIONED_URL` and
    /// `VSFETCH_DATA_URL` as looked up by `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("VSFETCH_TRACKED_URL") {
            self.tracked.base_url = url;
        }
        if let Some(url) = lookup("VSFETCH_VERSIONED_URL") {
            self.versioned.base_url = url;
        }
        if let Some(url) = lookup("VSFETCH_DATA_URL") {
            self.external.data_url = url;
        }
        self
    }

    pub fn source_urls(&self) -> SourceUrls {
        SourceUrls {
            data_url: self.external.data_url.clone(),
            fixed_data_url: self.external.fixed_data_url.clone(),
            boundaries_url: self.external.boundaries_url.clone(),
            runways_url: self.external.runways_url.clone(),
        }
    }

    pub fn external_timeout(&self) -> Duration {
        secs(self.external.timeout)
    }

    pub fn versioned_endpoint(&self) -> Endpoint {
        Endpoint::new(&self.versioned.base_url, secs(self.versioned.timeout))
    }

    pub fn tracked_endpoint(&self) -> Endpoint {
        Endpoint::new(&self.tracked.base_url, secs(self.tracked.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsfetch_client::source::VATSIM_DATA_URL;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.versioned.base_url, "http://localhost:9440");
        assert_eq!(config.tracked.base_url, "http://localhost:9441");
        assert_eq!(config.external.data_url, VATSIM_DATA_URL);
        assert_eq!(config.poll.normal_interval(), Duration::from_secs(10));
        assert!(config.poll.backoff_base() > config.poll.normal_interval());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [versioned]
            timeout = 5.5

            [poll]
            idle_interval_secs = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.versioned.base_url, "http://localhost:9440");
        assert_eq!(config.versioned_endpoint().timeout, Duration::from_millis(5500));
        assert_eq!(config.poll.idle_interval(), Duration::from_secs(1));
        assert_eq!(config.poll.normal_interval_secs, 10);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::parse("[versioned\nbase_url =").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("/nonexistent/vsfetch.toml")).unwrap();
        assert_eq!(config.poll.idle_interval_secs, 3);
    }

    #[test]
    fn environment_overrides_urls() {
        let config = Config::default().with_overrides(|key| match key {
            "VSFETCH_VERSIONED_URL" => Some("http://store:9440".to_string()),
            "VSFETCH_DATA_URL" => Some("http://feed/data.json".to_string()),
            _ => None,
        });
        assert_eq!(config.versioned_endpoint().base_url, "http://store:9440");
        assert_eq!(config.source_urls().data_url, "http://feed/data.json");
        assert_eq!(config.tracked.base_url, "http://localhost:9441");
    }

    #[test]
    fn invalid_timeout_falls_back() {
        let mut config = Config::default();
        config.tracked.timeout = -1.0;
        assert_eq!(config.tracked_endpoint().timeout, Duration::from_secs(3));
    }
}
