//! Filtering, sorting and pagination over the flat record list.

use crate::models::{ConvertedRecord, SourceStream};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Default page size.
pub const DEFAULT_PER_PAGE: usize = 50;

/// Sort key for record listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Date,
    Cost,
    Service,
    Environment,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" => Ok(SortField::Date),
            "cost" => Ok(SortField::Cost),
            "service" => Ok(SortField::Service),
            "environment" | "env" => Ok(SortField::Environment),
            other => Err(format!("unknown sort field: {}", other)),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<ConvertedRecord>,
    pub page: usize,
    pub per_page: usize,
    /// Matching records across all pages
    pub total: usize,
    pub total_pages: usize,
}

/// Record query built with `with_*` methods.
#[derive(Debug, Clone, PartialEq)]
pub struct CostQuery {
    services: BTreeSet<String>,
    environment: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    stream: Option<SourceStream>,
    sort_by: SortField,
    order: SortOrder,
    page: usize,
    per_page: usize,
}

impl Default for CostQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl CostQuery {
    /// Match everything, newest first, first page.
    pub fn new() -> Self {
        Self {
            services: BTreeSet::new(),
            environment: None,
            start: None,
            end: None,
            stream: None,
            sort_by: SortField::Date,
            order: SortOrder::Desc,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Restrict to a set of services; an empty set matches all.
    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = services.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Inclusive date window; either bound may be open.
    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_stream(mut self, stream: SourceStream) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn with_sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = field;
        self.order = order;
        self
    }

    /// Select a page (1-based). Zero values are clamped to 1.
    pub fn with_page(mut self, page: usize, per_page: usize) -> Self {
        self.page = page.max(1);
        self.per_page = per_page.max(1);
        self
    }

    /// Whether a record passes every filter.
    ///
    /// Undated records never match a date window.
    pub fn matches(&self, converted: &ConvertedRecord) -> bool {
        let record = &converted.record;

        if !self.services.is_empty() && !self.services.contains(&record.service) {
            return false;
        }
        if let Some(env) = &self.environment
            && &record.environment != env
        {
            return false;
        }
        if let Some(stream) = self.stream
            && record.source_stream != Some(stream)
        {
            return false;
        }
        if self.start.is_some() || self.end.is_some() {
            let Some(date) = record.date else {
                return false;
            };
            if self.start.is_some_and(|start| date < start) || self.end.is_some_and(|end| date > end) {
                return false;
            }
        }
        true
    }

    fn compare(&self, a: &ConvertedRecord, b: &ConvertedRecord) -> Ordering {
        let (a, b) = (&a.record, &b.record);
        let ordering = match self.sort_by {
            SortField::Date => a.date.cmp(&b.date),
            SortField::Cost => a.cost_usd.total_cmp(&b.cost_usd),
            SortField::Service => a.service.cmp(&b.service),
            SortField::Environment => a.environment.cmp(&b.environment),
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Filter, sort (stable) and paginate.
    pub fn run(&self, records: &[ConvertedRecord]) -> RecordPage {
        let mut matching: Vec<&ConvertedRecord> =
            records.iter().filter(|r| self.matches(r)).collect();
        matching.sort_by(|a, b| self.compare(a, b));

        let total = matching.len();
        let total_pages = total.div_ceil(self.per_page);
        let start = (self.page - 1).saturating_mul(self.per_page);

        RecordPage {
            records: matching
                .into_iter()
                .skip(start)
                .take(self.per_page)
                .cloned()
                .collect(),
            page: self.page,
            per_page: self.per_page,
            total,
            total_pages,
        }
    }
}
