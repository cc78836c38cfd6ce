//! Seoul Money Brokerage Services (서울외국환중개) standard rate page.
//!
//! The page is an HTML table of `date | currency | rate` rows served in
//! EUC-KR. Only ASCII cells are read (dates, currency codes and numbers), so
//! the body is decoded lossily. The page covers recent publication days: a
//! date it does not list falls back to the closest earlier day, then to the
//! newest row.

use crate::config::RateClientConfig;
use crate::error::{RateError, Result};
use crate::source::{RateQuote, RateSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

static ROW_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").expect("Valid table row regex"));

static CELL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td[^>]*>(.*?)</td>").expect("Valid table cell regex"));

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Valid tag regex"));

/// Date formats seen in the first column.
const DATE_FORMATS: &[&str] = &["%Y.%m.%d", "%Y-%m-%d", "%Y/%m/%d"];

const USER_AGENT: &str = "Mozilla/5.0 (compatible; settle rate client)";

/// One usable row of the rate table.
#[derive(Debug, Clone, PartialEq)]
pub struct SmbsRow {
    pub date: NaiveDate,
    pub currency: String,
    pub rate: f64,
}

fn cell_text(html: &str) -> String {
    TAG_REGEX
        .replace_all(html, "")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

fn parse_row_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Parse a rate cell like `"1,473.50"`, keeping only digits and the decimal point.
pub fn parse_rate_cell(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|rate| rate.is_finite() && *rate > 0.0)
}

/// Rows whose first three cells are a date, a cell naming `currency` and a rate.
pub fn parse_rate_rows(html: &str, currency: &str) -> Vec<SmbsRow> {
    let wanted = currency.to_uppercase();

    ROW_REGEX
        .captures_iter(html)
        .filter_map(|row| {
            let cells: Vec<String> = CELL_REGEX
                .captures_iter(&row[1])
                .map(|cell| cell_text(&cell[1]))
                .collect();
            if cells.len() < 3 {
                return None;
            }

            let date = parse_row_date(&cells[0])?;
            if !cells[1].to_uppercase().contains(&wanted) {
                return None;
            }
            let rate = parse_rate_cell(&cells[2])?;

            Some(SmbsRow {
                date,
                currency: cells[1].clone(),
                rate,
            })
        })
        .collect()
}

/// The row for `date`, else the closest earlier row, else the newest row.
pub fn pick_row(rows: &[SmbsRow], date: NaiveDate) -> Option<&SmbsRow> {
    rows.iter()
        .find(|row| row.date == date)
        .or_else(|| {
            rows.iter()
                .filter(|row| row.date < date)
                .max_by_key(|row| row.date)
        })
        .or_else(|| rows.iter().max_by_key(|row| row.date))
}

/// HTTP client for the SMBS rate page.
pub struct SmbsClient {
    config: RateClientConfig,
    client: reqwest::Client,
}

impl SmbsClient {
    pub fn new(config: RateClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RateError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RateClientConfig {
        &self.config
    }
}

#[async_trait]
impl RateSource for SmbsClient {
    async fn fetch_rate(&self, date: NaiveDate) -> Result<RateQuote> {
        debug!(date = %date, url = %self.config.smbs_url, "Requesting SMBS rate page");

        let response = self
            .client
            .get(&self.config.smbs_url)
            .send()
            .await
            .map_err(|e| RateError::from_reqwest(e, self.config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "SMBS returned an error status");
            return Err(RateError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RateError::from_reqwest(e, self.config.timeout_secs))?;
        let html = String::from_utf8_lossy(&bytes);

        let rows = parse_rate_rows(&html, &self.config.currency);
        debug!(rows = rows.len(), "Parsed SMBS rate rows");

        let row = pick_row(&rows, date).ok_or_else(|| {
            RateError::Parse(format!(
                "no {} rows on the SMBS rate page",
                self.config.currency
            ))
        })?;

        if row.date != date {
            warn!(requested = %date, used = %row.date, "SMBS has no rate for the date, using the closest published one");
        }

        Ok(RateQuote {
            currency: self.config.currency.clone(),
            rate: row.rate,
            rate_date: row.date,
            source: self.name().to_string(),
        })
    }

    fn name(&self) -> &str {
        "smbs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    const PAGE: &str = r#"
<table class="tbl_type">
  <tr><th>날짜</th><th>통화</th><th>매매기준율</th></tr>
  <tr><td>2024.01.05</td><td><span>USD</span></td><td>1,310.20</td></tr>
  <tr><td>2024.01.04</td><td>USD</td><td>1,308.00</td></tr>
  <tr><td>2024.01.04</td><td>EUR</td><td>1,430.55</td></tr>
  <tr><td>2024.01.02</td><td>USD</td><td>&nbsp;1,300.40&nbsp;</td></tr>
  <tr><td>공지</td><td>USD</td><td>-</td></tr>
</table>"#;

    #[test]
    fn test_parse_rate_rows() {
        let rows = parse_rate_rows(PAGE, "usd");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], SmbsRow { date: date(5), currency: "USD".into(), rate: 1310.2 });
        assert_eq!(rows[2].rate, 1300.4);
    }

    #[test]
    fn test_parse_rate_cell() {
        assert_eq!(parse_rate_cell("1,473.50"), Some(1473.5));
        assert_eq!(parse_rate_cell("-"), None);
        assert_eq!(parse_rate_cell("0.00"), None);
    }

    #[test]
    fn test_pick_row_prefers_exact_then_earlier_then_newest() {
        let rows = parse_rate_rows(PAGE, "USD");

        assert_eq!(pick_row(&rows, date(4)).unwrap().rate, 1308.0);
        // Saturday the 6th: closest earlier day
        assert_eq!(pick_row(&rows, date(6)).unwrap().date, date(5));
        // The 3rd was not published: the 2nd is the closest earlier day
        assert_eq!(pick_row(&rows, date(3)).unwrap().date, date(2));
        // Older than every row: newest row
        assert_eq!(pick_row(&rows, date(1)).unwrap().date, date(5));
        assert!(pick_row(&[], date(1)).is_none());
    }
}
