//! ISM Report On Business adapter.
//!
//! The ISM publishes the Manufacturing PMI as a narrative web page addressed
//! by month name (`…/pmi/july/`). The adapter guesses which report month is
//! live (see [`crate::report_month`]), tries each candidate URL until one
//! parses, recovers the report's true date from the page text, and mines
//! the headline index plus the sub-indices through per-field pattern
//! cascades bounded to the PMI's [0, 100] range.
//!
//! Fields no pattern matches are absent from the result; an entirely empty
//! page moves on to the next candidate.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use econ_pulse_models::{FetchBatch, RawObservation, Release};
use econ_pulse_scraper::{candidates, http, page_text};
use regex::Regex;

use crate::SourceError;
use crate::extract::FieldCascade;
use crate::report_month::{ReportMonth, candidate_report_months, month_number};

/// Base URL of the monthly PMI report pages.
const REPORT_BASE_URL: &str =
    "https://www.ismworld.org/supply-management-news-and-reports/reports/ism-report-on-business/pmi";

/// Diffusion indices live on a 0-100 scale.
const INDEX_BOUNDS: (f64, f64) = (0.0, 100.0);

/// A parsed report: date, extracted index values, and where it came from.
#[derive(Debug)]
struct IsmReport {
    date: NaiveDate,
    values: BTreeMap<&'static str, f64>,
    url: String,
}

fn report_url(month: ReportMonth) -> String {
    format!("{REPORT_BASE_URL}/{}/", month.name())
}

/// The per-field pattern cascades, tightest pattern first.
fn field_cascades() -> Vec<FieldCascade> {
    vec![
        FieldCascade::new(
            "headline",
            &[
                r"(?i)Manufacturing\s+PMI.{0,60}?registered\s+(\d+\.?\d*)",
                r"(?i)Manufacturing\s+PMI.{0,40}?(\d+\.?\d*)",
                r"(?i)\bPMI\s*[:\-]?\s*(\d+\.?\d*)",
            ],
            INDEX_BOUNDS,
        ),
        FieldCascade::new(
            "new_orders",
            &[
                r"(?i)New\s+Orders\s+Index.{0,60}?(\d+\.?\d*)",
                r"(?i)New\s+Orders.{0,40}?(\d+\.?\d*)",
            ],
            INDEX_BOUNDS,
        ),
        FieldCascade::new(
            "production",
            &[
                r"(?i)Production\s+Index.{0,60}?(\d+\.?\d*)",
                r"(?i)Production.{0,40}?(\d+\.?\d*)",
            ],
            INDEX_BOUNDS,
        ),
        FieldCascade::new(
            "employment",
            &[
                r"(?i)Employment\s+Index.{0,60}?(\d+\.?\d*)",
                r"(?i)Employment.{0,40}?(\d+\.?\d*)",
            ],
            INDEX_BOUNDS,
        ),
        FieldCascade::new(
            "supplier_deliveries",
            &[
                r"(?i)Supplier\s+Deliveries\s+Index.{0,60}?(\d+\.?\d*)",
                r"(?i)Supplier\s+Deliveries.{0,40}?(\d+\.?\d*)",
            ],
            INDEX_BOUNDS,
        ),
        FieldCascade::new(
            "inventories",
            &[
                r"(?i)Inventories\s+Index.{0,60}?(\d+\.?\d*)",
                r"(?i)(?:^|[^'])Inventories.{0,40}?(\d+\.?\d*)",
            ],
            INDEX_BOUNDS,
        ),
        FieldCascade::new(
            "customers_inventories",
            &[
                r"(?i)Customers'?\s+Inventories.{0,60}?(\d+\.?\d*)",
                r"(?i)Customer\s+Inventories.{0,40}?(\d+\.?\d*)",
            ],
            INDEX_BOUNDS,
        ),
        FieldCascade::new(
            "prices",
            &[
                r"(?i)Prices\s+Index.{0,60}?(\d+\.?\d*)",
                r"(?i)Prices\s+Paid.{0,40}?(\d+\.?\d*)",
                r"(?i)Prices.{0,40}?(\d+\.?\d*)",
            ],
            INDEX_BOUNDS,
        ),
        FieldCascade::new(
            "order_backlog",
            &[
                r"(?i)Backlog\s+of\s+Orders\s+Index.{0,60}?(\d+\.\d+)",
                r"(?i)Backlog\s+of\s+Orders.{0,40}?(\d+\.\d+)",
                r"(?i)Order\s+Backlog.{0,40}?(\d+\.\d+)",
            ],
            INDEX_BOUNDS,
        ),
        FieldCascade::new(
            "exports",
            &[
                r"(?i)New\s+Export\s+Orders\s+Index.{0,60}?(\d+\.?\d*)",
                r"(?i)New\s+Export\s+Orders.{0,40}?(\d+\.?\d*)",
                r"(?i)Exports.{0,40}?(\d+\.?\d*)",
            ],
            INDEX_BOUNDS,
        ),
        FieldCascade::new(
            "imports",
            &[r"(?i)Imports\s+Index.{0,60}?(\d+\.?\d*)", r"(?i)Imports.{0,40}?(\d+\.?\d*)"],
            INDEX_BOUNDS,
        ),
    ]
}

/// Recovers the report's own month and year from its text, normalized to
/// the first of the month.
///
/// The page states its period in headings like "JULY 2025 Manufacturing ISM
/// Report On Business"; the URL path alone is not trusted because stale
/// months keep resolving.
fn extract_report_date(text: &str) -> Option<NaiveDate> {
    let re = Regex::new(
        r"(?i)\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{4})\b",
    )
    .ok()?;
    let caps = re.captures(text)?;
    let month = month_number(&caps[1])?;
    let year: i32 = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Mines one report page's text. Returns `None` when the page has no
/// recoverable date or no extractable index values at all.
fn parse_report_text(text: &str, url: &str) -> Option<IsmReport> {
    let date = extract_report_date(text)?;

    let mut values = BTreeMap::new();
    for cascade in field_cascades() {
        if let Some(value) = cascade.extract(text) {
            values.insert(cascade.field, value);
        }
    }

    if values.is_empty() {
        log::info!("no index values extracted from {url}");
        return None;
    }

    Some(IsmReport {
        date,
        values,
        url: url.to_owned(),
    })
}

/// Fetches the most recent parseable PMI report.
///
/// # Errors
///
/// Returns [`SourceError::NoData`] when every candidate month is exhausted
/// without a parseable report.
pub async fn fetch_report(
    client: &reqwest::Client,
    indicator: &str,
    today: NaiveDate,
) -> Result<FetchBatch, SourceError> {
    let months = candidate_report_months(today);
    log::info!(
        "{indicator}: candidate report months: {}",
        months
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let report = candidates::first_success(indicator, &months, |month| {
        let url = report_url(*month);
        async move {
            let html = http::get_text(client, &url).await?;
            let text = page_text(&html);
            Ok::<_, SourceError>(parse_report_text(&text, &url))
        }
    })
    .await
    .ok_or_else(|| SourceError::NoData {
        indicator: indicator.to_owned(),
    })?;

    log::info!(
        "{indicator}: extracted {} index values for {}",
        report.values.len(),
        report.date
    );

    let rows: Vec<RawObservation> = report
        .values
        .iter()
        .map(|(category, value)| RawObservation::with_category(report.date, *category, *value))
        .collect();

    let metadata = serde_json::json!({
        "data_points": report.values.len(),
        "categories": report.values.keys().collect::<Vec<_>>(),
    });
    let release = Release {
        date: report.date,
        category: "metadata".to_owned(),
        payload: metadata,
        source_url: report.url,
    };

    Ok(FetchBatch {
        rows,
        releases: vec![release],
        warnings: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TEXT: &str = "JULY 2025 Manufacturing ISM Report On Business. \
        Manufacturing PMI registered 48.7 percent in July. \
        The New Orders Index registered 47.1 percent. \
        The Production Index registered 51.4 percent. \
        The Employment Index registered 43.4 percent. \
        The Prices Index registered 64.8 percent.";

    #[test]
    fn extracts_report_date_from_heading() {
        assert_eq!(
            extract_report_date(SAMPLE_TEXT),
            NaiveDate::from_ymd_opt(2025, 7, 1)
        );
    }

    #[test]
    fn parses_headline_and_subindices() {
        let report = parse_report_text(SAMPLE_TEXT, "http://example.test/pmi/july/").unwrap();
        assert_eq!(report.date, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert!((report.values["headline"] - 48.7).abs() < f64::EPSILON);
        assert!((report.values["new_orders"] - 47.1).abs() < f64::EPSILON);
        assert!((report.values["production"] - 51.4).abs() < f64::EPSILON);
        assert!((report.values["employment"] - 43.4).abs() < f64::EPSILON);
        assert!((report.values["prices"] - 64.8).abs() < f64::EPSILON);
    }

    #[test]
    fn absent_fields_do_not_block_the_rest() {
        let report = parse_report_text(SAMPLE_TEXT, "http://example.test/").unwrap();
        assert!(!report.values.contains_key("imports"));
    }

    #[test]
    fn page_without_values_is_skipped() {
        assert!(parse_report_text("JULY 2025 — report page under construction", "u").is_none());
    }

    #[test]
    fn page_without_a_date_is_skipped() {
        assert!(parse_report_text("Manufacturing PMI registered 48.7 percent", "u").is_none());
    }
}
