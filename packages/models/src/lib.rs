#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical types shared across the econ-pulse ingestion pipeline.
//!
//! Every data provider (FRED API, Treasury HTML tables, scraped ISM/UMich
//! reports) produces [`RawObservation`] rows in the same long format:
//! one row per (date, category, value). The store persists them as
//! [`Observation`] rows keyed by indicator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The fetch strategy an indicator uses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IndicatorKind {
    /// Single named series from the FRED REST API.
    Fred,
    /// Composite computed row-wise from several FRED series.
    FredCalculated,
    /// Monthly-keyed HTML table (Treasury yield curve pages).
    TreasuryTable,
    /// Scraped monthly narrative report (ISM Report On Business).
    IsmReport,
    /// Scraped monthly narrative report (UMich Surveys of Consumers).
    UmichReport,
}

/// Identity record for an indicator, as registered in the store.
///
/// `name` is the stable key; re-registering an existing name returns the
/// existing row instead of creating a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorIdentity {
    /// Unique stable key (e.g., `"us_real_gdp"`).
    pub name: String,
    /// Human-readable name.
    pub full_name: String,
    /// Publishing organization.
    pub source: String,
    /// Free-text description.
    pub description: String,
}

/// One data point as produced by a source adapter, before persistence.
///
/// An empty `category` means the indicator has no sub-series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Calendar day the value refers to.
    pub date: NaiveDate,
    /// Sub-series tag (tenor, PMI component, ...); empty for none.
    pub category: String,
    /// The observed value.
    pub value: f64,
}

impl RawObservation {
    /// Convenience constructor for a category-less observation.
    #[must_use]
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            category: String::new(),
            value,
        }
    }

    /// Convenience constructor for a categorized observation.
    #[must_use]
    pub fn with_category(date: NaiveDate, category: impl Into<String>, value: f64) -> Self {
        Self {
            date,
            category: category.into(),
            value,
        }
    }
}

/// A stored observation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Database primary key.
    pub id: i64,
    /// The indicator this value belongs to.
    pub indicator_id: i64,
    /// Calendar day the value refers to.
    pub date: NaiveDate,
    /// Sub-series tag; empty for none.
    pub category: String,
    /// The observed value.
    pub value: f64,
    /// When this row was ingested.
    pub recorded_at: Option<DateTime<Utc>>,
}

/// A qualitative release (commentary, report metadata) tied to a numeric
/// release date.
///
/// Releases are append-only; duplicate suppression is the caller's job
/// (check-before-insert), not a database constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    /// Release date (same calendar convention as the observations).
    pub date: NaiveDate,
    /// Release kind tag (e.g., `"metadata"`, `"expectations"`).
    pub category: String,
    /// Structured payload, stored as JSON.
    pub payload: serde_json::Value,
    /// Where the release was scraped from.
    pub source_url: String,
}

/// Everything one adapter fetch produced.
///
/// `warnings` collects per-unit failures (a skipped month, a dead candidate
/// URL) that did not abort the fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchBatch {
    /// Long-format observation rows.
    pub rows: Vec<RawObservation>,
    /// Qualitative releases accompanying the rows.
    pub releases: Vec<Release>,
    /// Non-fatal per-unit failures, for the sync report.
    pub warnings: Vec<String>,
}

impl FetchBatch {
    /// A batch containing only observation rows.
    #[must_use]
    pub fn from_rows(rows: Vec<RawObservation>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }
}

/// A material difference between a freshly fetched value and the value
/// already stored for the same (date, category).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Revision {
    /// Observation date.
    pub date: NaiveDate,
    /// Sub-series tag; empty for none.
    pub category: String,
    /// Value currently persisted.
    pub stored: f64,
    /// Value now published upstream.
    pub fresh: f64,
    /// `fresh - stored`.
    pub delta: f64,
    /// Delta as a percentage of the stored value.
    pub pct: f64,
}

/// Outcome of one indicator's sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Indicator name.
    pub indicator: String,
    /// Rows the adapter returned.
    pub considered: u64,
    /// Rows actually persisted (new triples).
    pub inserted: u64,
    /// Rows skipped by the uniqueness constraint.
    pub duplicates: u64,
    /// Releases persisted.
    pub releases: u64,
    /// Upstream revisions detected (reported, never applied).
    pub revisions: Vec<Revision>,
    /// Per-unit failures that did not abort the run.
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_kind_round_trips_as_snake_case() {
        use std::str::FromStr as _;

        assert_eq!(IndicatorKind::TreasuryTable.to_string(), "treasury_table");
        assert_eq!(
            IndicatorKind::from_str("fred_calculated").unwrap(),
            IndicatorKind::FredCalculated
        );
    }

    #[test]
    fn raw_observation_defaults_to_empty_category() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let obs = RawObservation::new(date, 5.1);
        assert!(obs.category.is_empty());
    }
}
