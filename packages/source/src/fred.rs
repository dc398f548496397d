//! FRED REST API adapter.
//!
//! Fetches named series from `api.stlouisfed.org`, one request per series,
//! optionally bounded by an `observation_start` floor. Calculated composites
//! (e.g., Real M2 = `M2SL / CPIAUCSL * 100`) fetch every constituent over
//! the same window and apply a pure row-wise formula on the date-aligned
//! intersection. A row missing any operand is dropped.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use econ_pulse_models::RawObservation;
use econ_pulse_scraper::http;
use serde::Deserialize;

use crate::SourceError;

/// FRED observations endpoint.
const OBSERVATIONS_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// FRED encodes "no value" as a literal `"."` in the value field.
const MISSING_VALUE: &str = ".";

/// A pure row-wise calculation over aligned constituent series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formula {
    /// `operands[0] / operands[1] * 100`, e.g. a nominal series deflated
    /// by a price index.
    RatioX100,
}

impl Formula {
    /// Applies the formula to one date's aligned operands.
    ///
    /// Returns `None` when an operand is missing or the calculation is
    /// undefined (division by zero).
    #[must_use]
    pub fn apply(self, operands: &[f64]) -> Option<f64> {
        match self {
            Self::RatioX100 => {
                let numerator = operands.first()?;
                let denominator = operands.get(1)?;
                if *denominator == 0.0 {
                    None
                } else {
                    Some(numerator / denominator * 100.0)
                }
            }
        }
    }
}

/// Reads the FRED API key from the environment.
///
/// # Errors
///
/// Returns [`SourceError::MissingApiKey`] naming the indicator when the
/// variable is unset or blank.
pub fn api_key_from_env(indicator: &str) -> Result<String, SourceError> {
    match std::env::var("FRED_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(SourceError::MissingApiKey {
            indicator: indicator.to_owned(),
        }),
    }
}

/// Fetches one series, optionally from `since` onward.
///
/// An upstream response with zero usable rows is not an error; the caller
/// sees an empty vector and reports "no new data".
///
/// # Errors
///
/// Returns [`SourceError`] on transport failure or an unexpected response
/// shape.
pub async fn fetch_series(
    client: &reqwest::Client,
    api_key: &str,
    series_id: &str,
    since: Option<NaiveDate>,
) -> Result<Vec<RawObservation>, SourceError> {
    log::info!("FRED: fetching series {series_id} (since {since:?})");

    let since_str = since.map(|d| d.to_string());
    let mut query: Vec<(&str, &str)> = vec![
        ("series_id", series_id),
        ("api_key", api_key),
        ("file_type", "json"),
    ];
    if let Some(ref s) = since_str {
        query.push(("observation_start", s));
    }

    let body = http::get_json(client, OBSERVATIONS_URL, &query).await?;
    let rows = parse_observations(series_id, &body)?;

    if rows.is_empty() {
        log::info!("FRED: series {series_id} returned no rows");
    } else {
        log::info!("FRED: series {series_id} returned {} rows", rows.len());
    }

    Ok(rows)
}

/// Parses the `observations` array of a FRED JSON response.
///
/// Rows carrying the `"."` missing marker or an unparseable value are
/// dropped, never coerced to zero.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] if the response has no `observations`
/// array at all (structure change or API error payload).
pub fn parse_observations(
    series_id: &str,
    body: &serde_json::Value,
) -> Result<Vec<RawObservation>, SourceError> {
    let observations = body
        .get("observations")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| {
            let detail = body
                .get("error_message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("no 'observations' array in response");
            SourceError::parse(format!("FRED series {series_id}: {detail}"))
        })?;

    let mut rows = Vec::with_capacity(observations.len());
    for obs in observations {
        let Some(date_str) = obs.get("date").and_then(serde_json::Value::as_str) else {
            continue;
        };
        let Ok(date) = date_str.parse::<NaiveDate>() else {
            log::debug!("FRED series {series_id}: skipping unparseable date {date_str:?}");
            continue;
        };
        let Some(value_str) = obs.get("value").and_then(serde_json::Value::as_str) else {
            continue;
        };
        if value_str == MISSING_VALUE {
            continue;
        }
        let Ok(value) = value_str.parse::<f64>() else {
            log::debug!("FRED series {series_id}: skipping non-numeric value {value_str:?}");
            continue;
        };
        rows.push(RawObservation::new(date, value));
    }

    Ok(rows)
}

/// Fetches every constituent series and applies `formula` row-wise on the
/// date-aligned intersection.
///
/// # Errors
///
/// Returns [`SourceError`] if any constituent fetch fails; a composite
/// with a missing constituent would silently skew every row.
pub async fn fetch_calculated(
    client: &reqwest::Client,
    api_key: &str,
    series: &[String],
    formula: Formula,
    since: Option<NaiveDate>,
) -> Result<Vec<RawObservation>, SourceError> {
    let mut constituents = Vec::with_capacity(series.len());
    for series_id in series {
        constituents.push(fetch_series(client, api_key, series_id, since).await?);
    }

    let rows = combine_series(&constituents, formula);
    log::info!(
        "FRED: calculated composite over {} series produced {} rows",
        series.len(),
        rows.len()
    );

    Ok(rows)
}

/// Joins constituent series on date (inner join) and applies `formula`
/// row-wise. Dates missing from any constituent are dropped.
#[must_use]
pub fn combine_series(constituents: &[Vec<RawObservation>], formula: Formula) -> Vec<RawObservation> {
    let mut aligned: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();

    for (i, rows) in constituents.iter().enumerate() {
        for obs in rows {
            let operands = aligned.entry(obs.date).or_default();
            // Keep operand order: a date missed by an earlier series can
            // never align, so only extend rows that are still complete.
            if operands.len() == i {
                operands.push(obs.value);
            }
        }
    }

    let expected = constituents.len();
    aligned
        .into_iter()
        .filter(|(_, operands)| operands.len() == expected)
        .filter_map(|(date, operands)| {
            formula
                .apply(&operands)
                .map(|value| RawObservation::new(date, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_observations_and_drops_missing_markers() {
        let body = serde_json::json!({
            "observations": [
                {"date": "2024-01-01", "value": "1420.0"},
                {"date": "2024-02-01", "value": "."},
                {"date": "2024-03-01", "value": "1435.5"},
                {"date": "2024-04-01", "value": "garbage"},
            ]
        });
        let rows = parse_observations("PERMIT", &body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(2024, 1, 1));
        assert!((rows[1].value - 1435.5).abs() < f64::EPSILON);
    }

    #[test]
    fn error_payload_without_observations_is_a_parse_error() {
        let body = serde_json::json!({"error_message": "Bad Request. The series does not exist."});
        let err = parse_observations("NOPE", &body).unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn combine_drops_dates_missing_from_any_constituent() {
        let m2 = vec![
            RawObservation::new(date(2024, 1, 1), 20800.0),
            RawObservation::new(date(2024, 2, 1), 20900.0),
            RawObservation::new(date(2024, 3, 1), 21000.0),
        ];
        // CPI is missing February.
        let cpi = vec![
            RawObservation::new(date(2024, 1, 1), 308.4),
            RawObservation::new(date(2024, 3, 1), 312.3),
        ];

        let rows = combine_series(&[m2, cpi], Formula::RatioX100);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(2024, 1, 1));
        assert!((rows[0].value - 20800.0 / 308.4 * 100.0).abs() < 1e-9);
        assert_eq!(rows[1].date, date(2024, 3, 1));
    }

    #[test]
    fn ratio_formula_divides_and_scales() {
        let value = Formula::RatioX100.apply(&[20900.0, 310.3]).unwrap();
        assert!((value - 20900.0 / 310.3 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn ratio_formula_rejects_zero_denominator_and_missing_operands() {
        assert!(Formula::RatioX100.apply(&[1.0, 0.0]).is_none());
        assert!(Formula::RatioX100.apply(&[1.0]).is_none());
    }
}
