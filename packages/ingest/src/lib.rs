#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The incremental fetch controller.
//!
//! One sync run processes each indicator to completion, sequentially:
//! register the indicator, read its watermark, fetch from the watermark
//! onward, scan for upstream revisions, persist. Per-unit failures inside an
//! adapter surface as warnings on the [`SyncReport`]; a run that finds zero
//! new rows is still a success.

pub mod revisions;

use std::path::PathBuf;

use chrono::NaiveDate;
use econ_pulse_database::{DbError, IndicatorStore};
use econ_pulse_models::{FetchBatch, SyncReport};
use econ_pulse_source::SourceError;
use econ_pulse_source::indicator_def::IndicatorDef;

/// Default location of the SQLite database, relative to the working
/// directory. Overridden by `ECON_PULSE_DB`.
pub const DEFAULT_DB_PATH: &str = "data/econ_pulse.db";

/// Errors that can abort an indicator's sync run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The store failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The adapter failed before producing any usable batch.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Every indicator in a `sync_all` run failed.
    #[error("all {failed} indicator(s) failed; no data source was reachable")]
    AllFailed {
        /// Number of indicators attempted.
        failed: usize,
    },
}

/// Resolves the database path from `ECON_PULSE_DB`, falling back to
/// [`DEFAULT_DB_PATH`].
#[must_use]
pub fn db_path() -> PathBuf {
    std::env::var("ECON_PULSE_DB").map_or_else(|_| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

/// Decides the lower fetch bound for an indicator.
///
/// No watermark means full history. Revision-aware indicators re-request a
/// trailing window behind "today" so upstream revisions inside the window
/// are seen again; the store's uniqueness constraint keeps the overlap
/// harmless.
#[must_use]
pub fn fetch_since(
    watermark: Option<NaiveDate>,
    revision_window_days: Option<i64>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let watermark = watermark?;
    revision_window_days.map_or(Some(watermark), |days| {
        let window_start = today - chrono::Duration::days(days);
        Some(watermark.min(window_start))
    })
}

/// Persists one fetched batch for an already-registered indicator.
///
/// Every row is attempted: a duplicate triple is a counted no-op and a
/// failed single-row insert is logged without aborting the rest of the
/// batch. Releases are deduplicated check-before-insert.
///
/// # Errors
///
/// Returns [`DbError`] only if a release existence check fails; row-level
/// insert errors are absorbed into the report's warnings.
pub fn persist_batch(
    store: &IndicatorStore,
    indicator_id: i64,
    batch: &FetchBatch,
    report: &mut SyncReport,
) -> Result<(), DbError> {
    for row in &batch.rows {
        report.considered += 1;
        match store.add_observation(indicator_id, row.date, &row.category, row.value) {
            Ok(true) => report.inserted += 1,
            Ok(false) => report.duplicates += 1,
            Err(e) => {
                log::error!(
                    "{}: failed to insert row {} [{}]: {e}",
                    report.indicator,
                    row.date,
                    row.category
                );
                report
                    .warnings
                    .push(format!("insert {} [{}]: {e}", row.date, row.category));
            }
        }
    }

    for release in &batch.releases {
        if store.add_release(indicator_id, release)? {
            report.releases += 1;
        }
    }

    Ok(())
}

/// Fetches, scans, and persists one indicator.
///
/// `force` ignores the watermark and re-requests full history (the store
/// still deduplicates every row).
///
/// # Errors
///
/// Returns [`IngestError`] if the adapter fails outright or the store is
/// unusable. Zero new rows is not an error.
pub async fn sync_indicator(
    store: &IndicatorStore,
    def: &IndicatorDef,
    force: bool,
) -> Result<SyncReport, IngestError> {
    let started = std::time::Instant::now();
    log::info!("syncing indicator: {} ({})", def.full_name, def.name);

    let indicator_id = store.add_indicator(&def.identity())?;

    let today = chrono::Utc::now().date_naive();
    let watermark = store.get_watermark(indicator_id)?;
    let since = if force {
        log::info!("{}: full fetch (--force)", def.name);
        None
    } else {
        let since = fetch_since(watermark, def.revision_window_days, today);
        match since {
            Some(date) => log::info!("{}: incremental fetch from {date}", def.name),
            None => log::info!("{}: full fetch (no stored data)", def.name),
        }
        since
    };

    let batch = econ_pulse_source::fetch_batch(def, since).await?;

    let mut report = SyncReport {
        indicator: def.name.clone(),
        warnings: batch.warnings.clone(),
        ..SyncReport::default()
    };

    // Detection only: a flagged revision is never written over the stored
    // value (see the revisions module).
    let stored = store.stored_values(indicator_id)?;
    let scan = revisions::detect(&stored, &batch.rows, def.epsilon);
    revisions::log_scan(&def.name, &scan);
    report.revisions = scan.revisions;

    persist_batch(store, indicator_id, &batch, &mut report)?;

    let new_watermark = store.get_watermark(indicator_id)?;
    debug_assert!(new_watermark >= watermark);

    log::info!(
        "{}: {} considered, {} inserted, {} duplicate(s), {} release(s), {} warning(s), took {:.1}s",
        def.name,
        report.considered,
        report.inserted,
        report.duplicates,
        report.releases,
        report.warnings.len(),
        started.elapsed().as_secs_f64(),
    );

    Ok(report)
}

/// Syncs a list of indicators sequentially.
///
/// Individual indicator failures are collected and logged; the run as a
/// whole fails only when *every* indicator errored (nothing was reachable).
///
/// # Errors
///
/// Returns [`IngestError::AllFailed`] when no indicator produced a report.
pub async fn sync_all(
    store: &IndicatorStore,
    defs: &[IndicatorDef],
    force: bool,
) -> Result<Vec<SyncReport>, IngestError> {
    let mut reports = Vec::new();
    let mut failures = 0usize;

    for def in defs {
        match sync_indicator(store, def, force).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                failures += 1;
                log::error!("{}: sync failed: {e}", def.name);
            }
        }
    }

    if reports.is_empty() && failures > 0 {
        return Err(IngestError::AllFailed { failed: failures });
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use econ_pulse_models::{IndicatorIdentity, RawObservation};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn friday_batch() -> FetchBatch {
        FetchBatch::from_rows(vec![
            RawObservation::with_category(date(2024, 1, 5), "1 Yr", 5.1),
            RawObservation::with_category(date(2024, 1, 12), "1 Yr", 5.2),
        ])
    }

    fn open_store_with_indicator() -> (IndicatorStore, i64) {
        let store = IndicatorStore::open_in_memory().unwrap();
        let id = store
            .add_indicator(&IndicatorIdentity {
                name: "test_curve".to_owned(),
                full_name: "Test Curve".to_owned(),
                source: "Test".to_owned(),
                description: "Test".to_owned(),
            })
            .unwrap();
        (store, id)
    }

    #[test]
    fn persisting_the_same_batch_twice_inserts_nothing_new() {
        let (store, id) = open_store_with_indicator();
        let batch = friday_batch();

        let mut first = SyncReport::default();
        persist_batch(&store, id, &batch, &mut first).unwrap();
        assert_eq!(first.considered, 2);
        assert_eq!(first.inserted, 2);
        assert_eq!(first.duplicates, 0);

        let mut second = SyncReport::default();
        persist_batch(&store, id, &batch, &mut second).unwrap();
        assert_eq!(second.considered, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 2);

        assert_eq!(store.get_observations(id, None).unwrap().len(), 2);
    }

    #[test]
    fn watermark_is_monotonic_across_persists() {
        let (store, id) = open_store_with_indicator();

        let mut report = SyncReport::default();
        persist_batch(&store, id, &friday_batch(), &mut report).unwrap();
        let after_first = store.get_watermark(id).unwrap();
        assert_eq!(after_first, Some(date(2024, 1, 12)));

        // A later batch that only contains older rows cannot move the
        // watermark backward.
        let older = FetchBatch::from_rows(vec![RawObservation::with_category(
            date(2023, 12, 29),
            "1 Yr",
            5.0,
        )]);
        let mut report = SyncReport::default();
        persist_batch(&store, id, &older, &mut report).unwrap();
        assert_eq!(store.get_watermark(id).unwrap(), after_first);
    }

    #[test]
    fn fetch_since_uses_watermark_or_full_history() {
        let today = date(2025, 8, 1);
        assert_eq!(fetch_since(None, None, today), None);
        assert_eq!(
            fetch_since(Some(date(2025, 6, 1)), None, today),
            Some(date(2025, 6, 1))
        );
    }

    #[test]
    fn fetch_since_re_requests_the_revision_window() {
        let today = date(2025, 8, 1);
        // Watermark is recent: the window start wins.
        assert_eq!(
            fetch_since(Some(date(2025, 7, 1)), Some(730), today),
            Some(today - chrono::Duration::days(730))
        );
        // Watermark predates the window: the watermark wins.
        assert_eq!(
            fetch_since(Some(date(2020, 1, 1)), Some(730), today),
            Some(date(2020, 1, 1))
        );
    }

    #[test]
    fn release_persistence_is_deduplicated() {
        let (store, id) = open_store_with_indicator();
        let batch = FetchBatch {
            rows: Vec::new(),
            releases: vec![econ_pulse_models::Release {
                date: date(2025, 7, 15),
                category: "metadata".to_owned(),
                payload: serde_json::json!({"data_points": 5}),
                source_url: "http://example.test/".to_owned(),
            }],
            warnings: Vec::new(),
        };

        let mut first = SyncReport::default();
        persist_batch(&store, id, &batch, &mut first).unwrap();
        assert_eq!(first.releases, 1);

        let mut second = SyncReport::default();
        persist_batch(&store, id, &batch, &mut second).unwrap();
        assert_eq!(second.releases, 0);
    }
}
