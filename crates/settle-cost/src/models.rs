//! Data models for cost settlement.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which uploaded data set a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStream {
    /// Vendor invoice to the intermediary (purchase side, 매입)
    Input,
    /// Intermediary billing to the end customer (sales side, 매출)
    Resale,
}

impl SourceStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStream::Input => "input",
            SourceStream::Resale => "resale",
        }
    }

    /// Longer label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            SourceStream::Input => "Input (purchase)",
            SourceStream::Resale => "Resale (sales)",
        }
    }
}

impl fmt::Display for SourceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceStream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "input" | "purchase" => Ok(SourceStream::Input),
            "resale" | "sales" => Ok(SourceStream::Resale),
            other => Err(format!("unknown source stream: {}", other)),
        }
    }
}

/// One normalized cost line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    /// Workload/billing environment (may be empty)
    pub environment: String,

    /// Service family (e.g. "EC2", "Custom Charge")
    pub service: String,

    /// Region code, when the export carries one
    pub region: Option<String>,

    /// Usage date (time of day discarded)
    pub date: Option<NaiveDate>,

    /// Source date text when it did not parse as a date
    #[serde(skip)]
    pub raw_date: Option<String>,

    /// Cost in USD; always finite, may be zero or negative
    pub cost_usd: f64,

    /// Upload stream this record came from (absent in single-stream mode)
    pub source_stream: Option<SourceStream>,
}

impl CostRecord {
    /// Create a record with a service and cost; other fields empty.
    pub fn new(service: impl Into<String>, cost_usd: f64) -> Self {
        Self {
            environment: String::new(),
            service: service.into(),
            region: None,
            date: None,
            raw_date: None,
            cost_usd,
            source_stream: None,
        }
    }

    /// Set environment.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Set region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set date.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self.raw_date = None;
        self
    }

    /// Set the date text of a row whose date did not parse.
    pub fn with_raw_date(mut self, text: impl Into<String>) -> Self {
        self.date = None;
        self.raw_date = Some(text.into());
        self
    }

    /// Set source stream.
    pub fn with_stream(mut self, stream: SourceStream) -> Self {
        self.source_stream = Some(stream);
        self
    }

    /// ISO date string, or empty when undated.
    pub fn date_key(&self) -> String {
        self.date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Date → summed cost.
pub type DailyCostIndex = BTreeMap<NaiveDate, f64>;

/// Environment → date → summed cost.
pub type EnvironmentDailyIndex = BTreeMap<String, DailyCostIndex>;

/// Inclusive date range as ISO strings; both empty when no record is dated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    /// Build from optional min/max dates.
    pub fn from_bounds(min: Option<NaiveDate>, max: Option<NaiveDate>) -> Self {
        match (min, max) {
            (Some(start), Some(end)) => Self {
                start: start.format("%Y-%m-%d").to_string(),
                end: end.format("%Y-%m-%d").to_string(),
            },
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }

    /// Parsed bounds, if present.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = NaiveDate::parse_from_str(&self.start, "%Y-%m-%d").ok()?;
        let end = NaiveDate::parse_from_str(&self.end, "%Y-%m-%d").ok()?;
        Some((start, end))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("-")
        } else {
            write!(f, "{} ~ {}", self.start, self.end)
        }
    }
}

/// Aggregate of one stream's records.
///
/// Always rebuilt from the full record set; never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    /// Number of records aggregated
    pub record_count: usize,

    /// Sum of all record costs
    pub total_cost_usd: f64,

    /// Sum of pass-through "custom charge" costs
    pub custom_charge_usd: f64,

    /// `total_cost_usd - custom_charge_usd`; the MSP fee base
    pub non_custom_charge_usd: f64,

    /// Min/max record date
    pub date_range: DateRange,

    /// Non-empty environments observed, sorted
    pub environments: Vec<String>,

    /// Non-empty services observed, sorted
    pub services: Vec<String>,

    /// Per-date totals of dated records
    pub daily_costs: DailyCostIndex,

    /// Sum of records without a usable date; completes the daily partition
    #[serde(default)]
    pub undated_cost_usd: f64,

    /// Per-environment, per-date totals
    pub daily_costs_by_environment: EnvironmentDailyIndex,

    /// Per-service totals
    pub service_costs: BTreeMap<String, f64>,

    /// Per-environment totals
    pub environment_costs: BTreeMap<String, f64>,
}

impl CostSummary {
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Sum of the daily index plus the undated bucket; equals the total.
    pub fn daily_total(&self) -> f64 {
        self.daily_costs.values().sum::<f64>() + self.undated_cost_usd
    }
}

/// Tiered MSP fee split derived from a non-custom-charge amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MspFeeBreakdown {
    /// Invoice-side fee (20% of the fee base)
    pub m2: f64,

    /// Resale-side fee (floor below the threshold, else 5%)
    pub m1: f64,

    /// Margin retained by the intermediary: `m2 - m1`
    pub entity_usage_amount: f64,
}

/// Outcome of removing duplicate lines from a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupReport {
    /// Records before deduplication
    pub total_seen: usize,

    /// Records dropped as duplicates
    pub removed: usize,
}

impl DedupReport {
    /// Records retained.
    pub fn kept(&self) -> usize {
        self.total_seen - self.removed
    }
}

/// A record with its KRW amount attached for tabular output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedRecord {
    #[serde(flatten)]
    pub record: CostRecord,

    /// KRW amount; `None` when the rate or amount was unusable
    pub cost_krw: Option<f64>,
}
