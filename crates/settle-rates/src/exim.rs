//! Korea Eximbank (한국수출입은행) open API client.
//!
//! The `exchangeJSON` endpoint returns every currency's rates for one date
//! as a JSON array. On weekends and holidays, and before the morning
//! publication, the array is empty.

use crate::config::RateClientConfig;
use crate::error::{RateError, Result};
use crate::source::{RateQuote, RateSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Endpoint path below the API host.
pub const EXCHANGE_ENDPOINT: &str = "/site/program/financial/exchangeJSON";

/// Data code for exchange rates.
const DATA_CODE: &str = "AP01";

/// One currency entry of the response.
#[derive(Debug, Clone, Deserialize)]
struct EximItem {
    /// 1 = success, 2 = bad data code, 3 = bad auth key, 4 = daily limit reached
    #[serde(default = "success_code")]
    result: i64,

    #[serde(default)]
    cur_unit: Option<String>,

    /// Base rate with thousands separators, e.g. "1,320.5"
    #[serde(default)]
    deal_bas_r: Option<String>,
}

fn success_code() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EximResponse {
    Items(Vec<EximItem>),
    Error { error: String },
}

fn result_message(code: i64) -> &'static str {
    match code {
        2 => "invalid data code",
        3 => "invalid authentication key",
        4 => "daily request limit exceeded",
        _ => "unexpected result code",
    }
}

/// Parse a rate cell like `"1,320.5"`.
pub fn parse_deal_rate(value: &str) -> Option<f64> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|rate| rate.is_finite() && *rate > 0.0)
}

/// HTTP client for the Eximbank rate API.
pub struct KoreaEximClient {
    config: RateClientConfig,
    client: reqwest::Client,
    api_key: String,
}

impl KoreaEximClient {
    /// Create a client, reading the API key from the configured variable.
    pub fn from_config(config: RateClientConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| RateError::MissingApiKey(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    /// Create a client with an explicit API key.
    pub fn with_api_key(config: RateClientConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RateError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            api_key: api_key.into(),
        })
    }

    pub fn config(&self) -> &RateClientConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.config.api_base_url.trim_end_matches('/'),
            EXCHANGE_ENDPOINT
        )
    }

    fn pick_quote(&self, items: Vec<EximItem>, date: NaiveDate) -> Result<RateQuote> {
        if let Some(failed) = items.iter().find(|item| item.result != 1) {
            return Err(RateError::Api {
                code: failed.result,
                message: result_message(failed.result).to_string(),
            });
        }

        let no_rate = || RateError::NoRateForDate {
            date,
            currency: self.config.currency.clone(),
        };

        let item = items
            .into_iter()
            .find(|item| item.cur_unit.as_deref() == Some(self.config.currency.as_str()))
            .ok_or_else(no_rate)?;

        let rate = item
            .deal_bas_r
            .as_deref()
            .and_then(parse_deal_rate)
            .ok_or_else(|| {
                RateError::Parse(format!("unusable deal_bas_r {:?}", item.deal_bas_r))
            })?;

        Ok(RateQuote {
            currency: self.config.currency.clone(),
            rate,
            rate_date: date,
            source: self.name().to_string(),
        })
    }
}

#[async_trait]
impl RateSource for KoreaEximClient {
    async fn fetch_rate(&self, date: NaiveDate) -> Result<RateQuote> {
        let search_date = date.format("%Y%m%d").to_string();
        debug!(
            date = %search_date,
            currency = %self.config.currency,
            "Requesting exchange rate"
        );

        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("authkey", self.api_key.as_str()),
                ("searchdate", search_date.as_str()),
                ("data", DATA_CODE),
            ])
            .send()
            .await
            .map_err(|e| RateError::from_reqwest(e, self.config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Rate API returned an error status");
            return Err(RateError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RateError::from_reqwest(e, self.config.timeout_secs))?;

        let parsed: EximResponse =
            serde_json::from_str(&body).map_err(|e| RateError::Parse(e.to_string()))?;

        let quote = match parsed {
            EximResponse::Items(items) => self.pick_quote(items, date)?,
            EximResponse::Error { error } => {
                return Err(RateError::Api {
                    code: 0,
                    message: error,
                });
            }
        };

        debug!(rate = quote.rate, date = %quote.rate_date, "Fetched exchange rate");
        Ok(quote)
    }

    fn name(&self) -> &str {
        "koreaexim"
    }
}
