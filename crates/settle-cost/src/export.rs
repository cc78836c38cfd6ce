//! Offline report snapshots.
//!
//! A snapshot copies the current [`AppState`] at one instant. Writing it never
//! contacts a rate source; the KRW figures use whatever rate was applied.

use crate::aggregator::CombinedDaily;
use crate::currency::{SettlementKrw, SummaryKrw};
use crate::error::{CostError, Result};
use crate::fees::Settlement;
use crate::models::{ConvertedRecord, CostSummary, DedupReport};
use crate::state::{AppState, AppliedRate, StreamData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Record CSV columns.
pub const RECORD_CSV_HEADER: [&str; 7] = [
    "stream",
    "date",
    "environment",
    "service",
    "region",
    "cost_usd",
    "cost_krw",
];

/// One stream's part of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSnapshot {
    pub files: Vec<String>,
    pub summary: CostSummary,
    pub dedup: DedupReport,
    pub summary_krw: Option<SummaryKrw>,
}

/// Point-in-time copy of the settlement state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub generated_at: DateTime<Utc>,
    pub input: Option<StreamSnapshot>,
    pub resale: Option<StreamSnapshot>,
    pub settlement: Option<Settlement>,
    pub settlement_krw: Option<SettlementKrw>,
    pub combined_daily: Option<CombinedDaily>,
    pub rate: Option<AppliedRate>,
    pub records: Vec<ConvertedRecord>,
}

impl ReportSnapshot {
    /// Copy the state as of now.
    pub fn capture(state: &AppState) -> Self {
        let converter = state.converter();
        let stream = |data: &StreamData| StreamSnapshot {
            files: data.files.clone(),
            summary: data.summary.clone(),
            dedup: data.dedup,
            summary_krw: converter.map(|c| c.summary(&data.summary)),
        };
        let settlement = state.settlement();

        Self {
            generated_at: Utc::now(),
            input: state.input.as_ref().map(stream),
            resale: state.resale.as_ref().map(stream),
            settlement,
            settlement_krw: converter.zip(settlement).map(|(c, s)| c.settlement(&s)),
            combined_daily: state.combined_daily(),
            rate: state.rate.clone(),
            records: state.converted_records(),
        }
    }
}

/// Write the snapshot as pretty-printed JSON.
pub fn write_json(snapshot: &ReportSnapshot, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, snapshot)?;
    Ok(())
}

/// Write the flat record list as CSV.
///
/// Missing region, date, stream or KRW values are written as empty cells.
pub fn write_records_csv(records: &[ConvertedRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(RECORD_CSV_HEADER)?;

    for converted in records {
        let record = &converted.record;
        let date = record.date_key();
        let cost_usd = record.cost_usd.to_string();
        let cost_krw = converted.cost_krw.map(|v| v.to_string()).unwrap_or_default();

        writer.write_record([
            record.source_stream.map(|s| s.as_str()).unwrap_or_default(),
            date.as_str(),
            record.environment.as_str(),
            record.service.as_str(),
            record.region.as_deref().unwrap_or_default(),
            cost_usd.as_str(),
            cost_krw.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Paths written by [`export_to_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Write both the JSON snapshot and the record CSV into `dir`.
///
/// File names carry the snapshot timestamp so repeated exports do not collide.
pub fn export_to_dir(snapshot: &ReportSnapshot, dir: &Path) -> Result<ExportPaths> {
    fs::create_dir_all(dir)
        .map_err(|e| CostError::Export(format!("cannot create {}: {}", dir.display(), e)))?;

    let stamp = snapshot.generated_at.format("%Y%m%dT%H%M%S");
    let paths = ExportPaths {
        json: dir.join(format!("settlement-{}.json", stamp)),
        csv: dir.join(format!("records-{}.csv", stamp)),
    };

    write_json(snapshot, &paths.json)?;
    write_records_csv(&snapshot.records, &paths.csv)?;

    info!(
        json = %paths.json.display(),
        csv = %paths.csv.display(),
        records = snapshot.records.len(),
        "Exported report"
    );

    Ok(paths)
}
