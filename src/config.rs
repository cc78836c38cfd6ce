//! Application configuration (`~/.settle/config.yaml`).

use serde::{Deserialize, Serialize};
use settle_core::config::{default_config_path, load_yaml_file};
use settle_core::{Result, SettleError};
use settle_cost::NormalizerConfig;
use settle_rates::{RateClientConfig, RateProvider};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Report output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory for exported snapshots
    pub export_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("./exports"),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub normalizer: NormalizerConfig,
    pub rates: RateClientConfig,
    pub report: ReportConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `~/.settle/config.yaml` is
    /// read if present and defaults are used otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config: Self = match explicit {
            Some(path) => load_yaml_file(path)?,
            None => {
                let path = default_config_path()?;
                if path.exists() {
                    load_yaml_file(&path)?
                } else {
                    debug!(path = %path.display(), "No configuration file, using defaults");
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that deserialize but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.rates.timeout_secs == 0 {
            return Err(SettleError::config_validation(
                "rates.timeout_secs must be greater than 0",
            ));
        }
        if self.rates.currency.trim().is_empty() {
            return Err(SettleError::config_validation("rates.currency must not be empty"));
        }
        let url = match self.rates.provider {
            RateProvider::Smbs => ("rates.smbs_url", &self.rates.smbs_url),
            RateProvider::Koreaexim => ("rates.api_base_url", &self.rates.api_base_url),
        };
        if url.1.trim().is_empty() {
            return Err(SettleError::config_validation(format!(
                "{} must not be empty for provider {}",
                url.0, self.rates.provider
            )));
        }
        Ok(())
    }
}
