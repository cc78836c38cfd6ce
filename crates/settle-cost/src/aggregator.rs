//! Summary aggregation over normalized cost records.
//!
//! A summary is always computed from a complete record set in one pass. It is
//! never patched incrementally; a new batch produces a new summary.

use crate::models::{CostRecord, CostSummary, DailyCostIndex, DateRange, EnvironmentDailyIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Service-name marker of pass-through charges excluded from the MSP fee base.
pub const CUSTOM_CHARGE_MARKER: &str = "custom charge";

/// Bucket label for records without an environment or service.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Whether a service name denotes a pass-through custom charge.
pub fn is_custom_charge(service: &str) -> bool {
    service.to_lowercase().contains(CUSTOM_CHARGE_MARKER)
}

fn bucket_label(value: &str) -> &str {
    if value.is_empty() { UNKNOWN_LABEL } else { value }
}

/// Aggregate records into a summary.
pub fn aggregate(records: &[CostRecord]) -> CostSummary {
    let mut total = 0.0;
    let mut custom = 0.0;
    let mut undated = 0.0;
    let mut min_date = None;
    let mut max_date = None;
    let mut environments = BTreeSet::new();
    let mut services = BTreeSet::new();
    let mut daily_costs = DailyCostIndex::new();
    let mut daily_by_env = EnvironmentDailyIndex::new();
    let mut service_costs: BTreeMap<String, f64> = BTreeMap::new();
    let mut environment_costs: BTreeMap<String, f64> = BTreeMap::new();

    for record in records {
        let cost = record.cost_usd;
        total += cost;

        if is_custom_charge(&record.service) {
            custom += cost;
        }

        if !record.environment.is_empty() {
            environments.insert(record.environment.clone());
        }
        if !record.service.is_empty() {
            services.insert(record.service.clone());
        }

        *service_costs
            .entry(bucket_label(&record.service).to_string())
            .or_default() += cost;
        *environment_costs
            .entry(bucket_label(&record.environment).to_string())
            .or_default() += cost;

        if let Some(date) = record.date {
            if min_date.is_none_or(|min| date < min) {
                min_date = Some(date);
            }
            if max_date.is_none_or(|max| date > max) {
                max_date = Some(date);
            }

            *daily_costs.entry(date).or_default() += cost;
            *daily_by_env
                .entry(bucket_label(&record.environment).to_string())
                .or_default()
                .entry(date)
                .or_default() += cost;
        } else {
            undated += cost;
        }
    }

    let summary = CostSummary {
        record_count: records.len(),
        total_cost_usd: total,
        custom_charge_usd: custom,
        non_custom_charge_usd: total - custom,
        date_range: DateRange::from_bounds(min_date, max_date),
        environments: environments.into_iter().collect(),
        services: services.into_iter().collect(),
        daily_costs,
        undated_cost_usd: undated,
        daily_costs_by_environment: daily_by_env,
        service_costs,
        environment_costs,
    };

    debug!(
        records = summary.record_count,
        total_usd = summary.total_cost_usd,
        custom_usd = summary.custom_charge_usd,
        days = summary.daily_costs.len(),
        "Aggregated cost summary"
    );

    summary
}

/// Daily indices and vocabularies of both streams merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedDaily {
    pub daily_costs: DailyCostIndex,
    pub undated_cost_usd: f64,
    pub daily_costs_by_environment: EnvironmentDailyIndex,
    pub environments: Vec<String>,
    pub services: Vec<String>,
}

/// Merge two summaries' daily views by summing matching dates.
pub fn combine_daily(input: &CostSummary, resale: &CostSummary) -> CombinedDaily {
    let mut daily_costs = input.daily_costs.clone();
    for (date, cost) in &resale.daily_costs {
        *daily_costs.entry(*date).or_default() += cost;
    }

    let mut by_env = input.daily_costs_by_environment.clone();
    for (env, days) in &resale.daily_costs_by_environment {
        let merged = by_env.entry(env.clone()).or_default();
        for (date, cost) in days {
            *merged.entry(*date).or_default() += cost;
        }
    }

    let union = |a: &[String], b: &[String]| -> Vec<String> {
        a.iter().chain(b).cloned().collect::<BTreeSet<_>>().into_iter().collect()
    };

    CombinedDaily {
        daily_costs,
        undated_cost_usd: input.undated_cost_usd + resale.undated_cost_usd,
        daily_costs_by_environment: by_env,
        environments: union(&input.environments, &resale.environments),
        services: union(&input.services, &resale.services),
    }
}
