//! Batch pipeline and application state.
//!
//! A batch runs parse → normalize → dedup → fold → aggregate to completion and
//! yields a [`StreamData`]. [`AppState`] holds one slot per stream plus the
//! applied exchange rate; every update replaces a slot wholesale.

use crate::aggregator::{CombinedDaily, aggregate, combine_daily};
use crate::batch::SourceFile;
use crate::currency::{CurrencyConverter, ExchangeRate};
use crate::dedup::deduplicate;
use crate::error::{CostError, Result};
use crate::fees::Settlement;
use crate::models::{ConvertedRecord, CostRecord, CostSummary, DedupReport, SourceStream};
use crate::normalizer::{NormalizeStats, Normalizer};
use crate::parser::CsvParser;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use settle_core::log_batch_event;
use tracing::debug;

/// Result of processing one upload batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamData {
    /// Stream tag applied to every record; `None` in single-stream mode
    pub stream: Option<SourceStream>,

    /// File names in selection order
    pub files: Vec<String>,

    /// Deduplicated records
    pub records: Vec<CostRecord>,

    pub summary: CostSummary,
    pub dedup: DedupReport,
    pub normalize: NormalizeStats,
}

/// Run the full pipeline over a batch of decoded files.
///
/// Every file is parsed before anything is normalized; a file whose header
/// cannot be read fails the batch.
pub fn process_batch(
    files: &[SourceFile],
    stream: Option<SourceStream>,
    normalizer: &Normalizer,
) -> Result<StreamData> {
    let parser = CsvParser::new();

    let mut parsed = Vec::with_capacity(files.len());
    for file in files {
        let rows = parser
            .parse_text(&file.contents)
            .map_err(|e| CostError::unreadable(&file.name, e.to_string()))?;
        debug!(file = %file.name, rows = rows.len(), "Parsed batch file");
        parsed.push(rows);
    }

    let mut records = Vec::new();
    let mut normalize = NormalizeStats::default();
    for rows in &parsed {
        let (mut file_records, stats) = normalizer.normalize_with_stats(rows, stream);
        normalize.rows_seen += stats.rows_seen;
        normalize.dropped_cost += stats.dropped_cost;
        normalize.undated += stats.undated;
        records.append(&mut file_records);
    }

    let (mut records, dedup) = deduplicate(records);
    normalizer.fold_environments(&mut records);
    let summary = aggregate(&records);

    log_batch_event!(
        stream = stream.map(|s| s.as_str()).unwrap_or("single"),
        files = files.len(),
        rows = normalize.rows_seen,
        dropped = normalize.dropped_cost,
        duplicates = dedup.removed,
        records = records.len(),
        total_usd = summary.total_cost_usd
    );

    Ok(StreamData {
        stream,
        files: files.iter().map(|f| f.name.clone()).collect(),
        records,
        summary,
        dedup,
        normalize,
    })
}

/// An exchange rate applied to the current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRate {
    pub rate: ExchangeRate,

    /// Publication date of the rate, when fetched from a rate source
    pub rate_date: Option<NaiveDate>,

    /// Where the rate came from ("manual", "koreaexim", ...)
    pub source: String,
}

impl AppliedRate {
    pub fn manual(rate: ExchangeRate) -> Self {
        Self {
            rate,
            rate_date: None,
            source: "manual".to_string(),
        }
    }
}

/// Current settlement state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub input: Option<StreamData>,
    pub resale: Option<StreamData>,
    pub rate: Option<AppliedRate>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot for the data's stream. Single-stream data goes in the input slot.
    pub fn with_stream(mut self, data: StreamData) -> Self {
        match data.stream {
            Some(SourceStream::Resale) => self.resale = Some(data),
            Some(SourceStream::Input) | None => self.input = Some(data),
        }
        self
    }

    /// Replace the applied rate.
    pub fn with_rate(mut self, rate: AppliedRate) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.resale.is_none()
    }

    /// Settlement figures; present only when both streams are loaded.
    pub fn settlement(&self) -> Option<Settlement> {
        match (&self.input, &self.resale) {
            (Some(input), Some(resale)) => {
                Some(Settlement::from_summaries(&input.summary, &resale.summary))
            }
            _ => None,
        }
    }

    /// Both streams' daily views merged; present only when both are loaded.
    pub fn combined_daily(&self) -> Option<CombinedDaily> {
        match (&self.input, &self.resale) {
            (Some(input), Some(resale)) => Some(combine_daily(&input.summary, &resale.summary)),
            _ => None,
        }
    }

    pub fn converter(&self) -> Option<CurrencyConverter> {
        self.rate.as_ref().map(|applied| CurrencyConverter::new(applied.rate))
    }

    /// Input records followed by resale records.
    pub fn records(&self) -> impl Iterator<Item = &CostRecord> {
        self.input
            .iter()
            .chain(self.resale.iter())
            .flat_map(|data| data.records.iter())
    }

    /// Flat record list with KRW amounts; `cost_krw` is `None` until a rate is applied.
    pub fn converted_records(&self) -> Vec<ConvertedRecord> {
        let converter = self.converter();
        self.records()
            .map(|record| ConvertedRecord {
                record: record.clone(),
                cost_krw: converter.and_then(|c| c.convert(record.cost_usd)),
            })
            .collect()
    }
}
