//! # settle-cost
//!
//! Cost settlement engine: turns cloud cost exports into summaries, the MSP
//! fee split and KRW figures.
//!
//! This crate provides:
//! - [`CsvParser`] - Read export CSV text into loosely-typed rows
//! - [`Normalizer`] - Map rows onto [`CostRecord`]s via header aliases
//! - [`deduplicate`] / [`aggregate`] - Clean and summarize a batch
//! - [`compute_msp_fees`] - Tiered MSP fee split
//! - [`CurrencyConverter`] - USD → KRW views
//! - [`AppState`] - Two-stream settlement state
//!
//! ## Example
//!
//! ```no_run
//! use settle_cost::{AppState, Normalizer, SourceStream, process_batch, read_batch};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> settle_cost::Result<()> {
//!     let normalizer = Normalizer::new();
//!
//!     let input = read_batch(&[PathBuf::from("invoice.csv")]).await?;
//!     let resale = read_batch(&[PathBuf::from("billing.csv")]).await?;
//!
//!     let state = AppState::new()
//!         .with_stream(process_batch(&input, Some(SourceStream::Input), &normalizer)?)
//!         .with_stream(process_batch(&resale, Some(SourceStream::Resale), &normalizer)?);
//!
//!     if let Some(settlement) = state.settlement() {
//!         println!("M2 - M1 = {}", settlement.fees.entity_usage_amount);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod batch;
pub mod currency;
pub mod dedup;
pub mod error;
pub mod export;
pub mod fees;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod query;
pub mod state;

// Re-export main types
pub use aggregator::{CombinedDaily, aggregate, combine_daily, is_custom_charge};
pub use batch::{SourceFile, read_batch};
pub use currency::{
    CurrencyConverter, ExchangeRate, SettlementKrw, SummaryKrw, format_krw, format_usd, to_krw,
};
pub use dedup::deduplicate;
pub use error::{CostError, Result};
pub use export::{ReportSnapshot, export_to_dir};
pub use fees::{Settlement, compute_msp_fees, cross_stream_delta};
pub use models::{
    ConvertedRecord, CostRecord, CostSummary, DateRange, DedupReport, MspFeeBreakdown,
    SourceStream,
};
pub use normalizer::{NormalizeStats, Normalizer, NormalizerConfig};
pub use parser::{CsvParser, RawRow, parse_csv};
pub use query::{CostQuery, RecordPage, SortField, SortOrder};
pub use state::{AppState, AppliedRate, StreamData, process_batch};
