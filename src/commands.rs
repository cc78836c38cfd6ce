//! Subcommand implementations and text rendering.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use settle_cost::{
    AppState, AppliedRate, CostQuery, CurrencyConverter, ExchangeRate, MspFeeBreakdown,
    Normalizer, RecordPage, ReportSnapshot, SourceStream, StreamData, compute_msp_fees,
    export_to_dir, format_krw, format_usd, process_batch, read_batch,
};
use settle_cost::normalizer::parse_cost;
use settle_rates::{RateClientConfig, create_source};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the KRW rate for a report comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum RateChoice {
    None,
    Manual(String),
    Fetch(NaiveDate),
}

/// Read and process one batch.
pub async fn load_stream(
    paths: &[PathBuf],
    stream: Option<SourceStream>,
    normalizer: &Normalizer,
) -> Result<StreamData> {
    let files = read_batch(paths).await?;
    let data = process_batch(&files, stream, normalizer)?;
    Ok(data)
}

/// Fetch the official rate for a date from the configured provider.
pub async fn fetch_rate(config: &RateClientConfig, date: NaiveDate) -> Result<AppliedRate> {
    let source = create_source(config)?;
    let quote = source.fetch_rate(date).await?;
    info!(rate = quote.rate, date = %quote.rate_date, source = source.name(), "Applied fetched rate");

    if quote.rate_date != date {
        eprintln!(
            "No {} rate published for {}; using the rate of {}.",
            source.name(),
            date,
            quote.rate_date
        );
    }

    Ok(AppliedRate {
        rate: ExchangeRate::new(quote.rate)?,
        rate_date: Some(quote.rate_date),
        source: quote.source,
    })
}

/// Resolve the rate choice. A failed fetch leaves the report without KRW figures.
pub async fn resolve_rate(choice: &RateChoice, config: &RateClientConfig) -> Result<Option<AppliedRate>> {
    match choice {
        RateChoice::None => Ok(None),
        RateChoice::Manual(text) => Ok(Some(AppliedRate::manual(ExchangeRate::parse(text)?))),
        RateChoice::Fetch(date) => match fetch_rate(config, *date).await {
            Ok(rate) => Ok(Some(rate)),
            Err(e) => {
                warn!(error = %e, "Continuing without exchange rate");
                eprintln!("{}", crate::friendly_error(&e));
                Ok(None)
            }
        },
    }
}

/// Write the snapshot files into `dir`.
pub fn export_state(state: &AppState, dir: &Path) -> Result<()> {
    let snapshot = ReportSnapshot::capture(state);
    let paths = export_to_dir(&snapshot, dir)
        .with_context(|| format!("exporting report to {}", dir.display()))?;
    println!("Exported {}", paths.json.display());
    println!("Exported {}", paths.csv.display());
    Ok(())
}

fn money_line(label: &str, usd: f64, converter: Option<CurrencyConverter>) -> String {
    match converter {
        Some(c) => format!("  {:<24}{:>18}  {:>20}", label, format_usd(usd), format_krw(c.convert(usd))),
        None => format!("  {:<24}{:>18}", label, format_usd(usd)),
    }
}

/// Summary block for one stream.
pub fn render_summary(title: &str, data: &StreamData, converter: Option<CurrencyConverter>) -> String {
    let summary = &data.summary;
    let mut lines = vec![
        format!("{} ({} files, {} records)", title, data.files.len(), summary.record_count),
        format!("  {:<24}{}", "Period", summary.date_range),
    ];

    if data.dedup.removed > 0 {
        lines.push(format!("  {:<24}{}", "Duplicates removed", data.dedup.removed));
    }
    if data.normalize.dropped_cost > 0 {
        lines.push(format!("  {:<24}{}", "Rows without cost", data.normalize.dropped_cost));
    }

    lines.push(money_line("Total", summary.total_cost_usd, converter));
    lines.push(money_line("Custom charges", summary.custom_charge_usd, converter));
    lines.push(money_line("Usage (fee base)", summary.non_custom_charge_usd, converter));
    if data.normalize.undated > 0 {
        lines.push(money_line("Undated", summary.undated_cost_usd, converter));
    }

    if !summary.service_costs.is_empty() {
        lines.push("  By service:".to_string());
        for (service, cost) in &summary.service_costs {
            lines.push(money_line(&format!("  {}", service), *cost, converter));
        }
    }
    if !summary.environment_costs.is_empty() {
        lines.push("  By environment:".to_string());
        for (env, cost) in &summary.environment_costs {
            lines.push(money_line(&format!("  {}", env), *cost, converter));
        }
    }

    lines.join("\n")
}

/// MSP fee block.
pub fn render_fees(base_usd: f64, fees: &MspFeeBreakdown, converter: Option<CurrencyConverter>) -> String {
    [
        "MSP fees".to_string(),
        money_line("Fee base", base_usd, converter),
        money_line("M2 (20%)", fees.m2, converter),
        money_line("M1", fees.m1, converter),
        money_line("Entity usage (M2-M1)", fees.entity_usage_amount, converter),
    ]
    .join("\n")
}

/// Full two-stream report.
pub fn render_report(state: &AppState) -> String {
    let converter = state.converter();
    let mut blocks = Vec::new();

    if let Some(rate) = &state.rate {
        let date = rate
            .rate_date
            .map(|d| format!(" on {}", d))
            .unwrap_or_default();
        blocks.push(format!("Exchange rate: {} KRW/USD ({}{})", rate.rate, rate.source, date));
    }
    if let Some(input) = &state.input {
        blocks.push(render_summary(SourceStream::Input.label(), input, converter));
    }
    if let Some(resale) = &state.resale {
        blocks.push(render_summary(SourceStream::Resale.label(), resale, converter));
    }
    if let Some(settlement) = state.settlement() {
        blocks.push(render_fees(settlement.fee_base_usd, &settlement.fees, converter));
        blocks.push(money_line("Input - resale", settlement.cross_stream_delta, converter));
    }

    blocks.join("\n\n")
}

/// One page of records.
pub fn render_page(page: &RecordPage) -> String {
    let mut lines = vec![format!(
        "{:<8} {:<10} {:<20} {:<24} {:<16} {:>14} {:>16}",
        "stream", "date", "environment", "service", "region", "usd", "krw"
    )];

    for converted in &page.records {
        let record = &converted.record;
        lines.push(format!(
            "{:<8} {:<10} {:<20} {:<24} {:<16} {:>14} {:>16}",
            record.source_stream.map(|s| s.as_str()).unwrap_or("-"),
            record.date_key(),
            record.environment,
            record.service,
            record.region.as_deref().unwrap_or(""),
            format_usd(record.cost_usd),
            converted.cost_krw.map(|v| format_krw(Some(v))).unwrap_or_default(),
        ));
    }

    lines.push(format!(
        "page {}/{} ({} records)",
        page.page,
        page.total_pages.max(1),
        page.total
    ));
    lines.join("\n")
}

/// Fee breakdown for an amount typed on the command line.
pub fn fees_for_amount(amount: &str, rate: Option<&str>) -> Result<String> {
    let Some(base) = parse_cost(amount) else {
        anyhow::bail!("not a finite amount: {}", amount);
    };
    let converter = rate
        .map(ExchangeRate::parse)
        .transpose()?
        .map(CurrencyConverter::new);

    Ok(render_fees(base, &compute_msp_fees(base), converter))
}

/// Records query options as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub services: Vec<String>,
    pub environment: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub stream: Option<SourceStream>,
}

/// Build a query from command-line filters.
pub fn build_query(filter: &RecordFilter) -> CostQuery {
    let mut query = CostQuery::new()
        .with_services(filter.services.iter().cloned())
        .with_date_range(filter.from, filter.to);
    if let Some(env) = &filter.environment {
        query = query.with_environment(env.clone());
    }
    if let Some(stream) = filter.stream {
        query = query.with_stream(stream);
    }
    query
}
