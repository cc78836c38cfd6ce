//! Configuration for the rate client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default Korea Eximbank open API host.
pub const DEFAULT_API_BASE_URL: &str = "https://oapi.koreaexim.go.kr";

/// Environment variable holding the API key.
pub const DEFAULT_API_KEY_ENV: &str = "KOREA_EXIM_API_KEY";

/// Seoul Money Brokerage standard rate page.
pub const DEFAULT_SMBS_URL: &str = "http://www.smbs.biz/ExRate/StdExRate.jsp";

/// Which service quotes the official rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateProvider {
    /// Seoul Money Brokerage Services standard rate page
    #[default]
    Smbs,
    /// Korea Eximbank open API (needs an API key)
    Koreaexim,
}

impl RateProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateProvider::Smbs => "smbs",
            RateProvider::Koreaexim => "koreaexim",
        }
    }
}

impl fmt::Display for RateProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "smbs" => Ok(RateProvider::Smbs),
            "koreaexim" | "exim" => Ok(RateProvider::Koreaexim),
            other => Err(format!("unknown rate provider: {}", other)),
        }
    }
}

/// Rate client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateClientConfig {
    /// Rate source used for fetched rates
    pub provider: RateProvider,

    /// Korea Eximbank API host, without the endpoint path
    pub api_base_url: String,

    /// SMBS rate page URL
    pub smbs_url: String,

    /// Name of the environment variable with the API key
    pub api_key_env: String,

    /// Currency unit to look up (e.g., "USD")
    pub currency: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RateClientConfig {
    fn default() -> Self {
        Self {
            provider: RateProvider::default(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            smbs_url: DEFAULT_SMBS_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            currency: "USD".to_string(),
            timeout_secs: 10,
        }
    }
}

impl RateClientConfig {
    /// Set custom API base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the rate provider.
    pub fn with_provider(mut self, provider: RateProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Set the SMBS page URL.
    pub fn with_smbs_url(mut self, url: impl Into<String>) -> Self {
        self.smbs_url = url.into();
        self
    }

    /// Set the currency unit.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
