//! Rate source abstraction.

use crate::config::{RateClientConfig, RateProvider};
use crate::error::{RateError, Result};
use crate::exim::KoreaEximClient;
use crate::smbs::SmbsClient;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A KRW-per-unit rate as published for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    /// Currency unit, e.g. "USD"
    pub currency: String,

    /// KRW per unit; finite and positive
    pub rate: f64,

    /// Publication date the rate applies to
    pub rate_date: NaiveDate,

    /// Name of the source that produced the quote
    pub source: String,
}

/// Something that can quote an exchange rate for a date.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetch the rate published for `date`.
    async fn fetch_rate(&self, date: NaiveDate) -> Result<RateQuote>;

    /// Short source name for logs and reports.
    fn name(&self) -> &str;
}

/// A rate entered by hand; the same quote for every date.
#[derive(Debug, Clone)]
pub struct FixedRateSource {
    currency: String,
    rate: f64,
}

impl FixedRateSource {
    pub fn new(currency: impl Into<String>, rate: f64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(RateError::Config(format!("rate must be positive, got {}", rate)));
        }
        Ok(Self {
            currency: currency.into(),
            rate,
        })
    }
}

#[async_trait]
impl RateSource for FixedRateSource {
    async fn fetch_rate(&self, date: NaiveDate) -> Result<RateQuote> {
        Ok(RateQuote {
            currency: self.currency.clone(),
            rate: self.rate,
            rate_date: date,
            source: self.name().to_string(),
        })
    }

    fn name(&self) -> &str {
        "manual"
    }
}

/// Create the rate source named by `config.provider`.
pub fn create_source(config: &RateClientConfig) -> Result<Box<dyn RateSource>> {
    match config.provider {
        RateProvider::Smbs => {
            info!("Creating SMBS rate source");
            Ok(Box::new(SmbsClient::new(config.clone())?))
        }
        RateProvider::Koreaexim => {
            info!("Creating Korea Eximbank rate source");
            Ok(Box::new(KoreaEximClient::from_config(config.clone())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_source() {
        let source = FixedRateSource::new("USD", 1320.5).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();

        let quote = source.fetch_rate(date).await.unwrap();

        assert_eq!(quote.rate, 1320.5);
        assert_eq!(quote.rate_date, date);
        assert_eq!(quote.source, "manual");
    }

    #[test]
    fn test_fixed_source_rejects_bad_rate() {
        assert!(FixedRateSource::new("USD", 0.0).is_err());
        assert!(FixedRateSource::new("USD", f64::NAN).is_err());
    }

    #[test]
    fn test_create_source_follows_provider() {
        let source = create_source(&RateClientConfig::default()).unwrap();
        assert_eq!(source.name(), "smbs");

        let config = RateClientConfig {
            api_key_env: "SETTLE_TEST_UNSET_SOURCE_KEY".to_string(),
            ..Default::default()
        }
        .with_provider(RateProvider::Koreaexim);
        let err = create_source(&config).err().unwrap();
        assert!(matches!(err, RateError::MissingApiKey(_)));
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let source: Box<dyn RateSource> = Box::new(FixedRateSource::new("USD", 1.0).unwrap());
        assert_eq!(source.name(), "manual");
    }
}
