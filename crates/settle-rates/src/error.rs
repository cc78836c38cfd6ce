//! Error types for exchange rate sources.

use chrono::NaiveDate;
use thiserror::Error;

/// Rate source errors.
///
/// None of these are retried; the caller reports them and the user either
/// picks another date or enters a rate by hand.
#[derive(Debug, Error)]
pub enum RateError {
    // ========== Availability ==========
    /// Nothing published for the date (weekend, holiday, before 11:00 KST)
    #[error("no exchange rate is published for {date}")]
    NoRateForDate { date: NaiveDate, currency: String },

    // ========== Network ==========
    /// Request timed out
    #[error("rate request timed out after {0}s")]
    Timeout(u64),

    /// Connection could not be established
    #[error("rate source unreachable: {0}")]
    Unreachable(String),

    /// Non-success HTTP status
    #[error("rate source returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ========== Response ==========
    /// Body could not be decoded
    #[error("malformed rate response: {0}")]
    Parse(String),

    /// The API answered with an error result code
    #[error("rate API error (result {code}): {message}")]
    Api { code: i64, message: String },

    // ========== Configuration ==========
    /// API key environment variable is not set
    #[error("{0} environment variable not set")]
    MissingApiKey(String),

    /// Client could not be configured
    #[error("rate client configuration error: {0}")]
    Config(String),
}

impl RateError {
    /// Build an error from a failed reqwest call.
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            RateError::Timeout(timeout_secs)
        } else if err.is_connect() {
            RateError::Unreachable(err.to_string())
        } else if err.is_decode() {
            RateError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            RateError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            RateError::Unreachable(err.to_string())
        }
    }

    /// Check if the source simply had no rate for the date.
    pub fn is_no_rate(&self) -> bool {
        matches!(self, RateError::NoRateForDate { .. })
    }

    /// Check if this error is a network-related error.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            RateError::Timeout(_) | RateError::Unreachable(_) | RateError::Http { .. }
        )
    }

    /// Get a user-friendly error message.
    pub fn friendly_message(&self) -> String {
        match self {
            RateError::NoRateForDate { date, .. } => format!(
                "No exchange rate is published for {}. Pick a business day or enter the rate manually.",
                date
            ),
            RateError::Timeout(secs) => {
                format!("The rate service did not answer within {}s. Enter the rate manually or try again later.", secs)
            }
            RateError::Unreachable(_) => {
                "The rate service could not be reached. Check your network or enter the rate manually.".to_string()
            }
            RateError::Api { code: 3, .. } => {
                "The rate service rejected the API key. Check KOREA_EXIM_API_KEY.".to_string()
            }
            RateError::Api { code: 4, .. } => {
                "The daily request limit of the rate service is used up. Enter the rate manually.".to_string()
            }
            RateError::MissingApiKey(var) => {
                format!("Set {} to fetch official rates, or pass --rate.", var)
            }
            _ => format!("Error: {}", self),
        }
    }
}

/// Result type for rate source operations.
pub type Result<T> = std::result::Result<T, RateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rate_message() {
        let err = RateError::NoRateForDate {
            date: NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
            currency: "USD".into(),
        };
        assert_eq!(err.to_string(), "no exchange rate is published for 2024-01-06");
        assert!(err.is_no_rate());
        assert!(!err.is_network_error());
        assert!(err.friendly_message().contains("manually"));
    }

    #[test]
    fn test_network_classification() {
        assert!(RateError::Timeout(10).is_network_error());
        assert!(RateError::Unreachable("refused".into()).is_network_error());
        assert!(
            RateError::Http {
                status: 502,
                body: String::new()
            }
            .is_network_error()
        );
        assert!(!RateError::Parse("eof".into()).is_network_error());
    }

    #[test]
    fn test_api_code_messages() {
        let err = RateError::Api {
            code: 3,
            message: "invalid auth key".into(),
        };
        assert!(err.friendly_message().contains("API key"));

        let err = RateError::Api {
            code: 4,
            message: "limit".into(),
        };
        assert!(err.friendly_message().contains("limit"));
    }
}
