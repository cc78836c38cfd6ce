//! Duplicate line removal.
//!
//! The same export is often uploaded twice, or overlapping date windows are
//! uploaded together. Two records are duplicates when date, environment,
//! service, region and cost all match; the first occurrence is kept and
//! relative order is preserved. A date that did not parse is compared by its
//! source text.

use crate::models::{CostRecord, DedupReport};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::debug;

/// Identity of a cost line for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    date: Option<NaiveDate>,
    raw_date: Option<String>,
    environment: String,
    service: String,
    region: Option<String>,
    cost_bits: u64,
}

impl Fingerprint {
    pub fn of(record: &CostRecord) -> Self {
        // -0.0 and 0.0 must collide
        let cost = if record.cost_usd == 0.0 {
            0.0
        } else {
            record.cost_usd
        };

        Self {
            date: record.date,
            // Unparseable dates are told apart by their text
            raw_date: record.raw_date.clone(),
            environment: record.environment.clone(),
            service: record.service.clone(),
            region: record.region.clone(),
            cost_bits: cost.to_bits(),
        }
    }
}

/// Remove duplicates, keeping first occurrences in order.
pub fn deduplicate(records: Vec<CostRecord>) -> (Vec<CostRecord>, DedupReport) {
    let total_seen = records.len();
    let mut seen = HashSet::with_capacity(total_seen);

    let kept: Vec<CostRecord> = records
        .into_iter()
        .filter(|record| seen.insert(Fingerprint::of(record)))
        .collect();

    let report = DedupReport {
        total_seen,
        removed: total_seen - kept.len(),
    };

    if report.removed > 0 {
        debug!(
            total = report.total_seen,
            removed = report.removed,
            "Removed duplicate cost lines"
        );
    }

    (kept, report)
}
