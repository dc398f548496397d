//! University of Michigan Surveys of Consumers adapter.
//!
//! The survey homepage always shows the latest release: a small results
//! table (sentiment, current conditions, expectations) plus the director's
//! narrative commentary. There is no per-month URL, so the adapter fetches
//! one page and mines everything from it:
//!
//! - the report month from the "Final Results for {Month} {Year}" heading
//!   (observation date convention: the 15th of that month);
//! - the three index values from the results table, with a regex cascade
//!   fallback when the table markup drifts;
//! - the commentary split into "expectations" and "inflation" sections by a
//!   keyword-triggered sentence classifier.
//!
//! Preliminary releases get a `_p` category suffix so the final values can
//! land beside them later without colliding.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use econ_pulse_models::{FetchBatch, RawObservation, Release};
use econ_pulse_scraper::http;
use regex::Regex;
use scraper::{Html, Selector};

use crate::SourceError;
use crate::extract::FieldCascade;
use crate::report_month::month_number;

/// The survey homepage, which always carries the latest release.
pub const SURVEY_URL: &str = "https://www.sca.isr.umich.edu/";

/// Sentiment indices have historically ranged roughly 50-110; anything
/// outside this is a mis-extraction.
const INDEX_BOUNDS: (f64, f64) = (0.0, 200.0);

/// Commentary blocks shorter than this are navigation chrome, not prose.
const MIN_COMMENTARY_LEN: usize = 300;

/// Phrases that flip the sentence classifier into the inflation section.
const INFLATION_TRIGGERS: &[&str] = &[
    "year-ahead inflation",
    "inflation expectations",
    "long-run inflation",
];

/// The label cells of the results table, paired with the category each
/// value is stored under.
const VALUE_LABELS: &[(&str, &str)] = &[
    ("Index of Consumer Sentiment", "composite"),
    ("Current Economic Conditions", "current"),
    ("Index of Consumer Expectations", "expectations"),
];

/// One parsed release page.
#[derive(Debug)]
struct UmichReport {
    date: NaiveDate,
    values: BTreeMap<String, f64>,
    expectations_text: String,
    inflation_text: String,
    preliminary: bool,
}

/// Extracts the report month from the page heading and returns the 15th of
/// that month.
fn extract_report_date(text: &str) -> Option<NaiveDate> {
    let month_names =
        "January|February|March|April|May|June|July|August|September|October|November|December";

    let final_re =
        Regex::new(&format!(r"(?i)Final\s+Results\s+for\s+({month_names})\s+(\d{{4}})")).ok()?;
    let generic_re = Regex::new(&format!(r"(?i)\b({month_names})\s+(\d{{4}})\b")).ok()?;

    let caps = final_re.captures(text).or_else(|| generic_re.captures(text))?;
    let month = month_number(&caps[1])?;
    let year: i32 = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 15)
}

/// Extracts the three index values from the results table cells.
///
/// Walks every `td`/`th` in document order; when a cell contains one of the
/// known labels, the next few cells are scanned for a bare number.
fn extract_values_from_cells(document: &Html) -> BTreeMap<String, f64> {
    let mut values = BTreeMap::new();

    let Ok(cell_sel) = Selector::parse("td, th") else {
        return values;
    };
    let Ok(number_re) = Regex::new(r"^\d+\.?\d*$") else {
        return values;
    };

    let cells: Vec<String> = document
        .select(&cell_sel)
        .map(|c| c.text().collect::<String>().trim().to_owned())
        .collect();

    for &(label, category) in VALUE_LABELS {
        let Some(i) = cells.iter().position(|c| c.contains(label)) else {
            continue;
        };
        for cell in cells.iter().skip(i + 1).take(3) {
            if number_re.is_match(cell)
                && let Ok(value) = cell.parse::<f64>()
            {
                values.insert(category.to_owned(), value);
                break;
            }
        }
    }

    values
}

/// Regex fallback for when the results table markup changes shape.
fn extract_values_from_text(text: &str) -> BTreeMap<String, f64> {
    let mut values = BTreeMap::new();
    for &(label, category) in VALUE_LABELS {
        let escaped = regex::escape(label);
        let pattern = format!(r"(?i){escaped}[|\s]*(\d+\.?\d*)");
        let patterns: [&str; 1] = [&pattern];
        let cascade = FieldCascade::new(category, &patterns, INDEX_BOUNDS);
        if let Some(value) = cascade.extract(text) {
            values.insert(category.to_owned(), value);
        }
    }
    values
}

/// Pulls the director's commentary prose out of the page.
///
/// Prefers the block following the "Surveys of Consumers Director" marker;
/// falls back to any substantial block mentioning sentiment or inflation.
/// Returns an empty string when nothing qualifies; commentary is
/// best-effort.
fn extract_commentary(document: &Html) -> String {
    const DIRECTOR_MARKER: &str = "Surveys of Consumers Director Joanne Hsu";
    const SKIP_WORDS: &[&str] = &[
        "home",
        "tables",
        "charts",
        "reports",
        "contact",
        "next data release",
    ];
    const TOPIC_WORDS: &[&str] = &[
        "consumer sentiment",
        "inflation expectations",
        "economic conditions",
    ];

    let Ok(div_sel) = Selector::parse("div") else {
        return String::new();
    };

    let blocks: Vec<String> = document
        .select(&div_sel)
        .map(|d| d.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| t.len() >= MIN_COMMENTARY_LEN)
        .collect();

    // Preferred: the block naming the director, text after the marker.
    // Smallest qualifying block wins, since outer divs wrap the whole page
    // (navigation included) and would drag that chrome along.
    let mut director_blocks: Vec<&String> = blocks
        .iter()
        .filter(|b| b.contains(DIRECTOR_MARKER))
        .collect();
    director_blocks.sort_by_key(|b| b.len());
    for block in director_blocks {
        if let Some(pos) = block.find(DIRECTOR_MARKER) {
            let commentary = block[pos + DIRECTOR_MARKER.len()..].trim();
            if commentary.len() >= 100 {
                return commentary.to_owned();
            }
        }
    }

    // Fallback: the smallest substantial block that reads like commentary.
    // Smallest, because huge blocks are page wrappers that contain
    // navigation along with everything else.
    let mut topical: Vec<&String> = blocks
        .iter()
        .filter(|t| {
            let lower = t.to_lowercase();
            TOPIC_WORDS.iter().any(|w| lower.contains(w))
                && !SKIP_WORDS.iter().any(|w| lower.starts_with(w))
        })
        .collect();
    topical.sort_by_key(|t| t.len());

    topical.first().map(|t| (*t).clone()).unwrap_or_default()
}

/// Splits commentary into (expectations, inflation) sections.
///
/// A two-state sentence classifier: sentences start in the general
/// "expectations" section and switch permanently to "inflation" at the
/// first sentence containing an inflation trigger phrase. Tolerates
/// malformed or reordered prose; worst case everything lands in one
/// section.
fn split_commentary(text: &str) -> (String, String) {
    let mut expectations: Vec<&str> = Vec::new();
    let mut inflation: Vec<&str> = Vec::new();
    let mut in_inflation = false;

    for sentence in text.split('.') {
        let sentence = sentence.trim();
        if sentence.len() < 20 {
            continue;
        }
        let lower = sentence.to_lowercase();
        if INFLATION_TRIGGERS.iter().any(|t| lower.contains(t)) {
            in_inflation = true;
        }
        if in_inflation {
            inflation.push(sentence);
        } else {
            expectations.push(sentence);
        }
    }

    let join = |sentences: Vec<&str>| {
        if sentences.is_empty() {
            String::new()
        } else {
            let mut joined = sentences.join(". ");
            joined.push('.');
            joined
        }
    };

    (join(expectations), join(inflation))
}

fn parse_report(html: &str) -> Result<UmichReport, SourceError> {
    let text = econ_pulse_scraper::page_text(html);

    let date = extract_report_date(&text).ok_or_else(|| {
        SourceError::parse("no report month heading found on survey page".to_owned())
    })?;

    let document = Html::parse_document(html);

    let mut values = extract_values_from_cells(&document);
    if values.is_empty() {
        log::info!("results table scan found nothing, falling back to text patterns");
        values = extract_values_from_text(&text);
    }

    let commentary = extract_commentary(&document);
    let (expectations_text, inflation_text) = split_commentary(&commentary);
    let preliminary = commentary.to_lowercase().contains("preliminary");

    Ok(UmichReport {
        date,
        values,
        expectations_text,
        inflation_text,
        preliminary,
    })
}

/// Fetches and mines the latest survey release.
///
/// # Errors
///
/// Returns [`SourceError::NoData`] when neither index values nor commentary
/// could be recovered, and [`SourceError::Parse`] when the page carries no
/// recognizable report month.
pub async fn fetch_report(
    client: &reqwest::Client,
    indicator: &str,
) -> Result<FetchBatch, SourceError> {
    log::info!("{indicator}: fetching {SURVEY_URL}");
    let html = http::get_text(client, SURVEY_URL).await?;
    let report = parse_report(&html)?;

    if report.values.is_empty() && report.expectations_text.is_empty() {
        return Err(SourceError::NoData {
            indicator: indicator.to_owned(),
        });
    }

    let suffix = if report.preliminary { "_p" } else { "" };
    log::info!(
        "{indicator}: report for {} — {} values{}",
        report.date,
        report.values.len(),
        if report.preliminary {
            " (preliminary)"
        } else {
            ""
        }
    );

    let rows: Vec<RawObservation> = report
        .values
        .iter()
        .map(|(category, value)| {
            RawObservation::with_category(report.date, format!("{category}{suffix}"), *value)
        })
        .collect();

    let mut releases = Vec::new();
    for (kind, content) in [
        ("expectations", &report.expectations_text),
        ("inflation", &report.inflation_text),
    ] {
        if content.trim().is_empty() {
            continue;
        }
        releases.push(Release {
            date: report.date,
            category: kind.to_owned(),
            payload: serde_json::json!({
                "type": kind,
                "content": content,
                "is_preliminary": report.preliminary,
            }),
            source_url: SURVEY_URL.to_owned(),
        });
    }

    Ok(FetchBatch {
        rows,
        releases,
        warnings: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_date_prefers_final_results_heading() {
        let text = "Surveys of Consumers. Final Results for July 2025. Published August 2025.";
        assert_eq!(
            extract_report_date(text),
            NaiveDate::from_ymd_opt(2025, 7, 15)
        );
    }

    #[test]
    fn report_date_falls_back_to_any_month_year() {
        let text = "Surveys of Consumers — June 2024 release.";
        assert_eq!(
            extract_report_date(text),
            NaiveDate::from_ymd_opt(2024, 6, 15)
        );
    }

    #[test]
    fn missing_heading_yields_none() {
        assert!(extract_report_date("Surveys of Consumers").is_none());
    }

    #[test]
    fn values_come_from_table_cells() {
        let html = r"<table>
            <tr><th>Index of Consumer Sentiment</th><td>Jul</td><td>61.7</td></tr>
            <tr><th>Current Economic Conditions</th><td>Jul</td><td>68.0</td></tr>
            <tr><th>Index of Consumer Expectations</th><td>Jul</td><td>57.7</td></tr>
        </table>";
        let document = Html::parse_document(html);
        let values = extract_values_from_cells(&document);
        assert!((values["composite"] - 61.7).abs() < f64::EPSILON);
        assert!((values["current"] - 68.0).abs() < f64::EPSILON);
        assert!((values["expectations"] - 57.7).abs() < f64::EPSILON);
    }

    #[test]
    fn text_fallback_recovers_values() {
        let text = "Index of Consumer Sentiment | 61.7 Current Economic Conditions | 68.0";
        let values = extract_values_from_text(text);
        assert!((values["composite"] - 61.7).abs() < f64::EPSILON);
        assert!((values["current"] - 68.0).abs() < f64::EPSILON);
        assert!(!values.contains_key("expectations"));
    }

    #[test]
    fn commentary_splits_on_inflation_trigger() {
        let text = "Consumer sentiment confirmed its early-month reading this July. \
            Consumers continue to express concerns about the trajectory of the economy. \
            Year-ahead inflation expectations fell back to 4.5% this month. \
            Long-run inflation expectations were little changed at 3.4%.";
        let (expectations, inflation) = split_commentary(text);
        assert!(expectations.contains("sentiment confirmed"));
        assert!(expectations.contains("trajectory of the economy"));
        assert!(!expectations.to_lowercase().contains("inflation"));
        assert!(inflation.contains("Year-ahead inflation"));
        assert!(inflation.contains("Long-run inflation"));
    }

    #[test]
    fn commentary_without_triggers_stays_general() {
        let text = "Consumers reported improving personal finances across the board this month.";
        let (expectations, inflation) = split_commentary(text);
        assert!(!expectations.is_empty());
        assert!(inflation.is_empty());
    }

    #[test]
    fn short_fragments_are_dropped() {
        let (expectations, inflation) = split_commentary("Up. Down. Ok.");
        assert!(expectations.is_empty());
        assert!(inflation.is_empty());
    }
}
