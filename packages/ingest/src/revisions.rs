//! Upstream revision detection.
//!
//! Compares freshly fetched values against what the store already holds for
//! the same (date, category). A difference beyond the indicator's epsilon is
//! a revision, reported for operator review and never applied to the store.
//! Dates present upstream but absent locally are reported as new.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use econ_pulse_models::{RawObservation, Revision};

/// Result of comparing one fetch against the store.
#[derive(Debug, Clone, Default)]
pub struct RevisionScan {
    /// Material changes to already-stored values.
    pub revisions: Vec<Revision>,
    /// (date, category) pairs upstream has that the store does not.
    pub new_dates: Vec<(NaiveDate, String)>,
}

/// Compares `fresh` rows against `stored` values.
///
/// `epsilon` is tuned per indicator (a 0.1 threshold means something very
/// different for GDP in billions than for a yield in percent). Differences
/// at or below epsilon are rounding noise and stay quiet.
#[must_use]
pub fn detect(
    stored: &BTreeMap<(NaiveDate, String), f64>,
    fresh: &[RawObservation],
    epsilon: f64,
) -> RevisionScan {
    let mut scan = RevisionScan::default();

    for obs in fresh {
        let key = (obs.date, obs.category.clone());
        match stored.get(&key) {
            Some(&stored_value) => {
                let delta = obs.value - stored_value;
                if delta.abs() > epsilon {
                    let pct = if stored_value == 0.0 {
                        0.0
                    } else {
                        delta / stored_value * 100.0
                    };
                    scan.revisions.push(Revision {
                        date: obs.date,
                        category: obs.category.clone(),
                        stored: stored_value,
                        fresh: obs.value,
                        delta,
                        pct,
                    });
                }
            }
            None => scan.new_dates.push(key),
        }
    }

    scan
}

/// Logs a scan the way the sync run reports it.
pub fn log_scan(indicator: &str, scan: &RevisionScan) {
    for rev in &scan.revisions {
        log::warn!(
            "{indicator}: revision on {}{}: {} -> {} (delta {:+.4}, {:+.2}%)",
            rev.date,
            if rev.category.is_empty() {
                String::new()
            } else {
                format!(" [{}]", rev.category)
            },
            rev.stored,
            rev.fresh,
            rev.delta,
            rev.pct,
        );
    }
    if !scan.new_dates.is_empty() {
        log::info!("{indicator}: {} new upstream date(s)", scan.new_dates.len());
    }
}
