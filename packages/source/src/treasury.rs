//! Treasury yield curve table adapter.
//!
//! The Treasury publishes daily par yield curve rates as one HTML table per
//! calendar month, addressed by a `YYYYMM` query parameter. The adapter
//! enumerates every month from the watermark through today, melts each
//! month's table into long rows, and reduces the month to a representative
//! day: all Fridays when the month has any, otherwise the latest date
//! present (holiday-shifted or partial months).
//!
//! A month that 404s or whose table no longer parses is skipped with a
//! warning so the remaining months still load. Requests are spaced by a
//! fixed courtesy delay.

use chrono::{Datelike as _, NaiveDate, Weekday};
use econ_pulse_models::{FetchBatch, RawObservation};
use econ_pulse_scraper::html_table::parse_first_table;
use econ_pulse_scraper::http;

use crate::indicator_def::TreasuryConfig;
use crate::normalize::{CategoryMap, melt_table};
use crate::SourceError;

/// Base URL of the monthly rate tables.
const TEXT_VIEW_URL: &str =
    "https://home.treasury.gov/resource-center/data-chart-center/interest-rates/TextView";

/// Date format used in the table's date column.
const DATE_FORMAT: &str = "%m/%d/%Y";

/// Courtesy delay between month requests.
const REQUEST_DELAY_MS: u64 = 1000;

/// Fetches the full month-by-month history from `since` (or the configured
/// history start) through today.
///
/// # Errors
///
/// Returns [`SourceError::Definition`] if the config's `history_start` is
/// malformed. Per-month fetch and parse failures are collected as batch
/// warnings, not errors.
pub async fn fetch_history(
    client: &reqwest::Client,
    indicator: &str,
    cfg: &TreasuryConfig,
    since: Option<NaiveDate>,
) -> Result<FetchBatch, SourceError> {
    let start = match since {
        Some(date) => date,
        None => {
            let default = cfg.history_start_date()?;
            log::info!("{indicator}: store is empty, fetching history from {default}");
            default
        }
    };
    let today = chrono::Utc::now().date_naive();

    let months = month_range(start, today);
    log::info!(
        "{indicator}: fetching {} month(s) from {start} through {today}",
        months.len()
    );

    let mut batch = FetchBatch::default();

    for (i, &(year, month)) in months.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(REQUEST_DELAY_MS)).await;
        }

        match fetch_month(client, &cfg.rate_type, year, month, &cfg.tenors).await {
            Ok(rows) => {
                log::info!("{indicator}: {year}-{month:02} yielded {} rows", rows.len());
                batch.rows.extend(rows);
            }
            Err(SourceError::Scrape(e)) if e.is_not_found() => {
                // Future or not-yet-published months are expected misses.
                log::info!("{indicator}: {year}-{month:02} not published, skipping");
            }
            Err(e) => {
                log::warn!("{indicator}: {year}-{month:02} failed: {e}");
                batch.warnings.push(format!("{year}-{month:02}: {e}"));
            }
        }
    }

    batch
        .rows
        .sort_by(|a, b| (a.date, &a.category).cmp(&(b.date, &b.category)));

    Ok(batch)
}

async fn fetch_month(
    client: &reqwest::Client,
    rate_type: &str,
    year: i32,
    month: u32,
    tenors: &[String],
) -> Result<Vec<RawObservation>, SourceError> {
    let url = format!("{TEXT_VIEW_URL}?type={rate_type}&field_tdr_date_value={year}{month:02}");
    let html = http::get_text(client, &url).await?;
    let table = parse_first_table(&html)?;
    let rows = melt_table(&table, DATE_FORMAT, Some(tenors), &CategoryMap::passthrough())?;
    Ok(reduce_month(rows))
}

/// Reduces one month's daily rows to a representative day.
///
/// Keeps every Friday row when the month has at least one Friday; otherwise
/// keeps all rows for the latest date present.
#[must_use]
pub fn reduce_month(rows: Vec<RawObservation>) -> Vec<RawObservation> {
    if rows.iter().any(|r| r.date.weekday() == Weekday::Fri) {
        return rows
            .into_iter()
            .filter(|r| r.date.weekday() == Weekday::Fri)
            .collect();
    }

    let Some(last_date) = rows.iter().map(|r| r.date).max() else {
        return rows;
    };
    log::debug!("month has no Fridays, keeping latest date {last_date}");
    rows.into_iter().filter(|r| r.date == last_date).collect()
}

/// Enumerates `(year, month)` pairs covering `from..=to`, inclusive on both
/// ends. Empty when `from` is after `to`.
#[must_use]
pub fn month_range(from: NaiveDate, to: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let (mut year, mut month) = (from.year(), from.month());
    let end = (to.year(), to.month());

    while (year, month) <= end {
        months.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    months
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(d: NaiveDate, tenor: &str, value: f64) -> RawObservation {
        RawObservation::with_category(d, tenor, value)
    }

    #[test]
    fn reduce_keeps_only_fridays_when_present() {
        // 2024-01-05 and 2024-01-12 are Fridays; 2024-01-08 is a Monday.
        let rows = vec![
            row(date(2024, 1, 5), "1 Yr", 5.1),
            row(date(2024, 1, 8), "1 Yr", 5.15),
            row(date(2024, 1, 12), "1 Yr", 5.2),
        ];
        let reduced = reduce_month(rows);
        assert_eq!(reduced.len(), 2);
        assert!(reduced.iter().all(|r| r.date.weekday() == Weekday::Fri));
    }

    #[test]
    fn reduce_falls_back_to_latest_date_without_fridays() {
        // Monday through Wednesday only, e.g. a partial month.
        let rows = vec![
            row(date(2024, 1, 1), "1 Yr", 5.0),
            row(date(2024, 1, 2), "1 Yr", 5.05),
            row(date(2024, 1, 3), "1 Yr", 5.1),
            row(date(2024, 1, 3), "2 Yr", 4.8),
        ];
        let reduced = reduce_month(rows);
        assert_eq!(reduced.len(), 2);
        assert!(reduced.iter().all(|r| r.date == date(2024, 1, 3)));
    }

    #[test]
    fn reduce_of_empty_month_is_empty() {
        assert!(reduce_month(Vec::new()).is_empty());
    }

    #[test]
    fn month_range_spans_year_boundary() {
        let months = month_range(date(2023, 11, 15), date(2024, 2, 1));
        assert_eq!(months, vec![(2023, 11), (2023, 12), (2024, 1), (2024, 2)]);
    }

    #[test]
    fn month_range_single_month() {
        assert_eq!(
            month_range(date(2024, 5, 1), date(2024, 5, 31)),
            vec![(2024, 5)]
        );
    }

    #[test]
    fn month_range_is_empty_when_start_is_in_the_future() {
        assert!(month_range(date(2024, 6, 1), date(2024, 5, 1)).is_empty());
    }
}
