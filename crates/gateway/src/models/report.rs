//! Report snapshot domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use petal_core::{ReportFigures, ReportId};

/// A persisted sales report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub id: ReportId,
    /// Day the snapshot was generated; drives the freshness check.
    pub date: NaiveDate,
    /// First day of the aggregated window (inclusive).
    pub window_start: NaiveDate,
    /// Last day of the aggregated window (inclusive).
    pub window_end: NaiveDate,
    #[serde(flatten)]
    pub figures: ReportFigures,
    pub created_at: DateTime<Utc>,
}

/// Parameters for inserting a report.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub date: NaiveDate,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub figures: ReportFigures,
}
