//! USD → KRW conversion and display formatting.
//!
//! KRW figures are derived on demand from `(usd, rate)` and are never the
//! stored source of truth. Conversion itself does not round; rounding to whole
//! won happens only in [`format_krw`].

use crate::error::{CostError, Result};
use crate::fees::Settlement;
use crate::models::{ConvertedRecord, CostRecord, CostSummary, DailyCostIndex};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A validated KRW-per-USD rate: finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ExchangeRate(f64);

impl ExchangeRate {
    pub fn new(rate: f64) -> Result<Self> {
        if rate.is_finite() && rate > 0.0 {
            Ok(Self(rate))
        } else {
            Err(CostError::InvalidExchangeRate(rate.to_string()))
        }
    }

    /// Parse user input such as `"1320.5"` or `"1,320.50"`.
    pub fn parse(text: &str) -> Result<Self> {
        let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
        let rate = cleaned
            .parse::<f64>()
            .map_err(|_| CostError::InvalidExchangeRate(text.trim().to_string()))?;
        Self::new(rate)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Convert a USD amount with this rate.
    pub fn convert(&self, amount_usd: f64) -> Option<f64> {
        to_krw(amount_usd, self.0)
    }
}

impl TryFrom<f64> for ExchangeRate {
    type Error = CostError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ExchangeRate> for f64 {
    fn from(rate: ExchangeRate) -> Self {
        rate.0
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// `amount_usd * rate`, or `None` when either input is unusable.
///
/// `None` is the invalid sentinel: never `NaN`, never an error.
pub fn to_krw(amount_usd: f64, rate: f64) -> Option<f64> {
    if !rate.is_finite() || rate <= 0.0 || !amount_usd.is_finite() {
        return None;
    }
    Some(amount_usd * rate)
}

/// Render a KRW amount as whole won, e.g. `₩1,234,567`; the sentinel renders as `₩—`.
pub fn format_krw(amount: Option<f64>) -> String {
    match amount {
        Some(value) if value.is_finite() => {
            let rounded = value.round();
            let sign = if rounded < 0.0 { "-" } else { "" };
            format!("₩{}{}", sign, group_thousands(&format!("{:.0}", rounded.abs())))
        }
        _ => "₩—".to_string(),
    }
}

/// Render a USD amount with two decimals, e.g. `$1,234.50`; non-finite amounts render as `$—`.
pub fn format_usd(amount: f64) -> String {
    if !amount.is_finite() {
        return "$—".to_string();
    }
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("${}{}.{}", sign, group_thousands(int_part), frac_part)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// KRW view of a [`CostSummary`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryKrw {
    pub total_krw: Option<f64>,
    pub custom_charge_krw: Option<f64>,
    pub non_custom_charge_krw: Option<f64>,
    pub undated_krw: Option<f64>,
    pub daily_costs_krw: BTreeMap<NaiveDate, Option<f64>>,
}

/// KRW view of a [`Settlement`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementKrw {
    pub input_total_krw: Option<f64>,
    pub resale_total_krw: Option<f64>,
    pub m2_krw: Option<f64>,
    pub m1_krw: Option<f64>,
    pub entity_usage_krw: Option<f64>,
    pub cross_stream_delta_krw: Option<f64>,
}

/// Builds KRW views with one applied rate.
#[derive(Debug, Clone, Copy)]
pub struct CurrencyConverter {
    rate: ExchangeRate,
}

impl CurrencyConverter {
    pub fn new(rate: ExchangeRate) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> ExchangeRate {
        self.rate
    }

    pub fn convert(&self, amount_usd: f64) -> Option<f64> {
        self.rate.convert(amount_usd)
    }

    fn convert_daily(&self, daily: &DailyCostIndex) -> BTreeMap<NaiveDate, Option<f64>> {
        daily
            .iter()
            .map(|(date, usd)| (*date, self.convert(*usd)))
            .collect()
    }

    pub fn summary(&self, summary: &CostSummary) -> SummaryKrw {
        SummaryKrw {
            total_krw: self.convert(summary.total_cost_usd),
            custom_charge_krw: self.convert(summary.custom_charge_usd),
            non_custom_charge_krw: self.convert(summary.non_custom_charge_usd),
            undated_krw: self.convert(summary.undated_cost_usd),
            daily_costs_krw: self.convert_daily(&summary.daily_costs),
        }
    }

    pub fn settlement(&self, settlement: &Settlement) -> SettlementKrw {
        SettlementKrw {
            input_total_krw: self.convert(settlement.input_total_usd),
            resale_total_krw: self.convert(settlement.resale_total_usd),
            m2_krw: self.convert(settlement.fees.m2),
            m1_krw: self.convert(settlement.fees.m1),
            entity_usage_krw: self.convert(settlement.fees.entity_usage_amount),
            cross_stream_delta_krw: self.convert(settlement.cross_stream_delta),
        }
    }

    /// Attach `cost_krw` to every record, preserving order.
    pub fn convert_records(&self, records: &[CostRecord]) -> Vec<ConvertedRecord> {
        records
            .iter()
            .map(|record| ConvertedRecord {
                record: record.clone(),
                cost_krw: self.convert(record.cost_usd),
            })
            .collect()
    }
}
