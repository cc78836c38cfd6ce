//! CSV reader for cost-reporting exports.
//!
//! Exports are header-row CSV files, sometimes followed by a summary
//! footer ("Total,", "Cost by Group,", "Daily Max" ...) that is not part of
//! the line items. The parser returns loosely-typed rows keyed by header name;
//! mapping those onto [`CostRecord`](crate::models::CostRecord) is the
//! normalizer's job.

use crate::error::{CostError, Result};
use std::collections::HashMap;
use tracing::{debug, trace};

/// One CSV row: trimmed header name → non-empty trimmed cell value.
pub type RawRow = HashMap<String, String>;

/// Line prefixes that open the exporter's summary footer.
pub const DEFAULT_FOOTER_MARKERS: &[&str] = &[
    "Total,",
    "Cost by Group,",
    "Report for",
    "Daily Max",
    "Daily Min",
];

const UTF8_BOM: char = '\u{feff}';

/// Parser for cost export CSV text.
pub struct CsvParser {
    footer_markers: Vec<String>,
}

impl CsvParser {
    /// Create a parser with the default footer markers.
    pub fn new() -> Self {
        Self {
            footer_markers: DEFAULT_FOOTER_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Create a parser with custom footer markers.
    pub fn with_footer_markers(markers: Vec<String>) -> Self {
        Self {
            footer_markers: markers,
        }
    }

    /// Parse CSV text into rows.
    ///
    /// Empty text yields no rows. Rows the CSV reader cannot split are
    /// skipped; only a broken header fails the file.
    pub fn parse_text(&self, text: &str) -> Result<Vec<RawRow>> {
        let section = self.data_section(text.trim_start_matches(UTF8_BOM));
        if section.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(section.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();

        for (index, result) in reader.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    trace!(row = index + 1, error = %e, "Failed to read CSV row");
                    continue;
                }
            };

            let row: RawRow = headers
                .iter()
                .zip(record.iter())
                .filter(|(header, value)| !header.is_empty() && !value.is_empty())
                .map(|(header, value)| (header.clone(), value.to_string()))
                .collect();

            if !row.is_empty() {
                rows.push(row);
            }
        }

        debug!(columns = headers.len(), rows = rows.len(), "Parsed CSV text");

        Ok(rows)
    }

    /// Slice of `text` holding the header and line items.
    ///
    /// Leading blank lines are skipped. The section ends at the first blank
    /// line after the header or at the first footer marker line.
    fn data_section<'a>(&self, text: &'a str) -> &'a str {
        let mut start = None;
        let mut end = text.len();
        let mut offset = 0;

        for line in text.split_inclusive('\n') {
            let trimmed = line.trim();

            match start {
                None if trimmed.is_empty() => {}
                None => start = Some(offset),
                Some(_) if trimmed.is_empty() || self.is_footer_line(trimmed) => {
                    end = offset;
                    break;
                }
                Some(_) => {}
            }

            offset += line.len();
        }

        match start {
            Some(start) => &text[start..end],
            None => "",
        }
    }

    fn is_footer_line(&self, line: &str) -> bool {
        let line = line.trim_start_matches('"');
        self.footer_markers.iter().any(|m| line.starts_with(m.as_str()))
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse CSV text with the default footer markers.
pub fn parse_csv(text: &str) -> Result<Vec<RawRow>> {
    CsvParser::new().parse_text(text)
}

/// Decode a file's bytes as UTF-8, dropping a leading BOM.
///
/// Invalid encoding rejects the whole file.
pub fn decode_contents(name: &str, bytes: Vec<u8>) -> Result<String> {
    let text = String::from_utf8(bytes).map_err(|e| {
        CostError::unreadable(
            name,
            format!("not valid UTF-8 (first bad byte at offset {})", e.utf8_error().valid_up_to()),
        )
    })?;

    Ok(match text.strip_prefix(UTF8_BOM) {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}
