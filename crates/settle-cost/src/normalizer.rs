//! Record normalizer: loosely-typed CSV rows → [`CostRecord`].
//!
//! Exporter versions disagree on column names, so every logical field has an
//! ordered list of header aliases in [`HEADER_ALIASES`]. The first alias with
//! a non-empty value wins.
//!
//! Malformed rows are expected noise in real exports: a row whose cost cell is
//! missing or not a finite number is dropped without error. Nothing in this
//! module fails.

use crate::models::{CostRecord, SourceStream};
use crate::parser::RawRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Logical fields of a cost record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostField {
    Environment,
    Service,
    Region,
    Cost,
    Date,
    Description,
}

/// Header aliases per field, in resolution order.
pub const HEADER_ALIASES: &[(CostField, &[&str])] = &[
    (
        CostField::Environment,
        &["Environment Name", "environment_name", "Environment"],
    ),
    (
        CostField::Service,
        &[
            "Service Family",
            "service_family",
            "Service",
            "Service Name",
            "Product Name",
        ],
    ),
    (CostField::Region, &["Region", "region", "AWS Region"]),
    (
        CostField::Cost,
        &["Cost", "cost", "Total Cost", "Unblended Cost", "Blended Cost"],
    ),
    (CostField::Date, &["Date", "date", "Usage Date", "UsageDate"]),
    (
        CostField::Description,
        &["Description", "Service Description"],
    ),
];

/// Date formats accepted after the time-of-day part is removed.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Region display names found in line-item descriptions.
const REGION_NAMES: &[(&str, &str)] = &[
    ("Asia Pacific (Seoul)", "ap-northeast-2"),
    ("Asia Pacific (Tokyo)", "ap-northeast-1"),
    ("Asia Pacific (Sydney)", "ap-southeast-2"),
    ("US East (Northern Virginia)", "us-east-1"),
    ("US East (Ohio)", "us-east-2"),
    ("US West (Oregon)", "us-west-2"),
    ("US West (Northern California)", "us-west-1"),
    ("EU (Germany)", "eu-central-1"),
    ("EU (Ireland)", "eu-west-1"),
];

/// Header aliases for one field.
pub fn aliases(field: CostField) -> &'static [&'static str] {
    HEADER_ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, names)| *names)
        .unwrap_or(&[])
}

/// First non-empty value among the field's aliases.
pub fn resolve(row: &RawRow, field: CostField) -> Option<&str> {
    aliases(field)
        .iter()
        .filter_map(|name| row.get(*name))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

/// Parse a cost cell such as `"12.5"`, `"$1,234.50"` or `"-3"`.
///
/// Returns `None` unless the result is a finite number.
pub fn parse_cost(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse the date part of a date or date-time cell.
///
/// Anything after the first space is time of day and is discarded.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.trim().split(' ').next()?;

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Region code for a description naming a well-known region.
pub fn region_from_description(description: &str) -> Option<&'static str> {
    REGION_NAMES
        .iter()
        .find(|(name, _)| description.contains(name))
        .map(|(_, code)| *code)
}

/// Environment folding rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Environment name → name it is reported under
    pub environment_aliases: BTreeMap<String, String>,

    /// Environment assigned to rows that carry none
    pub default_environment: Option<String>,
}

impl NormalizerConfig {
    /// Add an environment alias.
    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.environment_aliases.insert(from.into(), to.into());
        self
    }

    /// Set the default environment.
    pub fn with_default_environment(mut self, environment: impl Into<String>) -> Self {
        self.default_environment = Some(environment.into());
        self
    }
}

/// Counters from one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Rows offered to the normalizer
    pub rows_seen: usize,

    /// Rows dropped for a missing or non-numeric cost
    pub dropped_cost: usize,

    /// Records kept without a usable date
    pub undated: usize,
}

/// Maps raw rows onto cost records.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    /// Create a normalizer without environment folding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a normalizer with custom folding rules.
    pub fn with_config(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize rows, dropping those without a usable cost.
    pub fn normalize(&self, rows: &[RawRow], stream: Option<SourceStream>) -> Vec<CostRecord> {
        self.normalize_with_stats(rows, stream).0
    }

    /// Normalize rows and report what was dropped.
    pub fn normalize_with_stats(
        &self,
        rows: &[RawRow],
        stream: Option<SourceStream>,
    ) -> (Vec<CostRecord>, NormalizeStats) {
        let mut stats = NormalizeStats {
            rows_seen: rows.len(),
            ..Default::default()
        };
        let mut records = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            match self.normalize_row(row, stream) {
                Some(record) => {
                    if record.date.is_none() {
                        stats.undated += 1;
                    }
                    records.push(record);
                }
                None => {
                    trace!(row = index + 1, "Dropped row without numeric cost");
                    stats.dropped_cost += 1;
                }
            }
        }

        debug!(
            rows = stats.rows_seen,
            kept = records.len(),
            dropped = stats.dropped_cost,
            undated = stats.undated,
            "Normalized rows"
        );

        (records, stats)
    }

    /// Normalize one row; `None` when its cost is missing or not finite.
    pub fn normalize_row(&self, row: &RawRow, stream: Option<SourceStream>) -> Option<CostRecord> {
        let cost_usd = resolve(row, CostField::Cost).and_then(parse_cost)?;

        let region = resolve(row, CostField::Region)
            .map(str::to_string)
            .or_else(|| {
                resolve(row, CostField::Description)
                    .and_then(region_from_description)
                    .map(str::to_string)
            });

        let date_text = resolve(row, CostField::Date);
        let date = date_text.and_then(parse_date);
        let raw_date = match date {
            Some(_) => None,
            None => date_text.map(str::to_string),
        };

        Some(CostRecord {
            environment: self.resolve_environment(resolve(row, CostField::Environment)),
            service: resolve(row, CostField::Service).unwrap_or_default().to_string(),
            region,
            date,
            raw_date,
            cost_usd,
            source_stream: stream,
        })
    }

    /// Environment as written in the row, or the default when the row has none.
    ///
    /// Aliases are not applied here; see [`Normalizer::fold_environments`].
    fn resolve_environment(&self, raw: Option<&str>) -> String {
        match raw {
            Some(name) => name.to_string(),
            None => self
                .config
                .default_environment
                .clone()
                .unwrap_or_default(),
        }
    }

    /// Rewrite aliased environments in place.
    ///
    /// Must run after duplicate removal: lines that differ only in an
    /// aliased environment are distinct lines.
    pub fn fold_environments(&self, records: &mut [CostRecord]) -> usize {
        let mut folded = 0;
        for record in records.iter_mut() {
            if let Some(target) = self.config.environment_aliases.get(&record.environment) {
                record.environment = target.clone();
                folded += 1;
            }
        }

        if folded > 0 {
            debug!(folded, "Folded environment aliases");
        }
        folded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_alias_priority() {
        let r = row(&[
            ("Environment", "fallback"),
            ("Environment Name", "primary"),
            ("Service", "EC2"),
            ("Cost", "1"),
        ]);
        assert_eq!(resolve(&r, CostField::Environment), Some("primary"));
        assert_eq!(resolve(&r, CostField::Service), Some("EC2"));
    }

    #[test]
    fn test_empty_value_falls_through_to_next_alias() {
        let r = row(&[("Cost", "  "), ("Total Cost", "4.25")]);
        assert_eq!(resolve(&r, CostField::Cost), Some("4.25"));
    }

    #[test]
    fn test_parse_cost_variants() {
        assert_eq!(parse_cost("12.5"), Some(12.5));
        assert_eq!(parse_cost("$1,234.50"), Some(1234.5));
        assert_eq!(parse_cost("-3"), Some(-3.0));
        assert_eq!(parse_cost("0"), Some(0.0));
        assert_eq!(parse_cost("abc"), None);
        assert_eq!(parse_cost(""), None);
        assert_eq!(parse_cost("NaN"), None);
        assert_eq!(parse_cost("inf"), None);
    }

    #[test]
    fn test_parse_date_discards_time_of_day() {
        assert_eq!(parse_date("2024-01-05 13:45:00"), Some(date("2024-01-05")));
        assert_eq!(parse_date("2024/01/05"), Some(date("2024-01-05")));
        assert_eq!(parse_date("01/05/2024"), Some(date("2024-01-05")));
        assert_eq!(parse_date("25/01/2024"), Some(date("2024-01-25")));
        assert_eq!(parse_date("Total"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_normalize_row() {
        let r = row(&[
            ("Date", "2024-01-01 00:00:00"),
            ("Environment Name", "prd-app"),
            ("Service Family", "EC2"),
            ("Region", "ap-northeast-2"),
            ("Cost", "100"),
        ]);

        let record = Normalizer::new()
            .normalize_row(&r, Some(SourceStream::Input))
            .unwrap();

        assert_eq!(record.environment, "prd-app");
        assert_eq!(record.service, "EC2");
        assert_eq!(record.region.as_deref(), Some("ap-northeast-2"));
        assert_eq!(record.date, Some(date("2024-01-01")));
        assert_eq!(record.cost_usd, 100.0);
        assert_eq!(record.source_stream, Some(SourceStream::Input));
    }

    #[test]
    fn test_rows_without_numeric_cost_are_dropped() {
        let rows = vec![
            row(&[("Service", "EC2"), ("Cost", "10")]),
            row(&[("Service", "EC2"), ("Cost", "n/a")]),
            row(&[("Service", "EC2")]),
            row(&[("Service", "Credit"), ("Cost", "-2.5")]),
        ];

        let (records, stats) = Normalizer::new().normalize_with_stats(&rows, None);

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].cost_usd, -2.5);
        assert_eq!(stats.rows_seen, 4);
        assert_eq!(stats.dropped_cost, 2);
        assert_eq!(stats.undated, 2);
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let record = Normalizer::new()
            .normalize_row(&row(&[("cost", "1")]), None)
            .unwrap();
        assert_eq!(record.environment, "");
        assert_eq!(record.service, "");
        assert_eq!(record.region, None);
        assert_eq!(record.date, None);
        assert_eq!(record.source_stream, None);
    }

    #[test]
    fn test_region_from_description() {
        let r = row(&[
            ("Service", "EC2"),
            ("Cost", "1"),
            ("Description", "Asia Pacific (Seoul) data transfer"),
        ]);
        let record = Normalizer::new().normalize_row(&r, None).unwrap();
        assert_eq!(record.region.as_deref(), Some("ap-northeast-2"));

        // An explicit region column wins over the description
        let r = row(&[
            ("Region", "us-east-1"),
            ("Cost", "1"),
            ("Description", "Asia Pacific (Seoul) data transfer"),
        ]);
        let record = Normalizer::new().normalize_row(&r, None).unwrap();
        assert_eq!(record.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_environment_folding() {
        let config = NormalizerConfig::default()
            .with_alias("dev-smartmobility", "smartmobility")
            .with_alias("prd-smartmobility", "smartmobility")
            .with_default_environment("cielmobility");
        let normalizer = Normalizer::with_config(config);

        // Rows keep their own environment until folded
        let mut records = vec![
            normalizer
                .normalize_row(&row(&[("Environment", "prd-smartmobility"), ("Cost", "1")]), None)
                .unwrap(),
            normalizer
                .normalize_row(&row(&[("Environment", "prd-app"), ("Cost", "1")]), None)
                .unwrap(),
        ];
        assert_eq!(records[0].environment, "prd-smartmobility");

        assert_eq!(normalizer.fold_environments(&mut records), 1);
        assert_eq!(records[0].environment, "smartmobility");
        assert_eq!(records[1].environment, "prd-app");

        let defaulted = normalizer
            .normalize_row(&row(&[("Cost", "1")]), None)
            .unwrap();
        assert_eq!(defaulted.environment, "cielmobility");
    }

    #[test]
    fn test_unparseable_date_keeps_text() {
        let normalizer = Normalizer::new();

        let record = normalizer
            .normalize_row(&row(&[("Date", "Jan-01"), ("Cost", "5")]), None)
            .unwrap();
        assert_eq!(record.date, None);
        assert_eq!(record.raw_date.as_deref(), Some("Jan-01"));

        let record = normalizer
            .normalize_row(&row(&[("Date", "2024-01-01"), ("Cost", "5")]), None)
            .unwrap();
        assert_eq!(record.raw_date, None);

        let record = normalizer.normalize_row(&row(&[("Cost", "5")]), None).unwrap();
        assert_eq!(record.raw_date, None);
    }

    #[test]
    fn test_empty_input() {
        assert!(Normalizer::new().normalize(&[], None).is_empty());
    }
}
