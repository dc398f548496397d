//! Wide-table to long-format normalization.
//!
//! Turns a [`WideTable`] into `(date, category, value)` rows: one row per
//! non-date column, category names canonicalized through a synonym table,
//! non-numeric placeholder cells dropped rather than coerced to zero.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use econ_pulse_models::RawObservation;
use econ_pulse_scraper::html_table::WideTable;

use crate::SourceError;

/// Markers upstream tables use for "no value on this day".
const MISSING_MARKERS: &[&str] = &["", "-", "--", "—", "–", "N/A", "n/a", "NA", "."];

/// Parses a table cell as a number, treating placeholder markers as absent.
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if MISSING_MARKERS.contains(&trimmed) {
        return None;
    }
    trimmed.parse().ok()
}

/// Canonicalization table for category names.
///
/// An empty map passes every name through unchanged (trimmed). A non-empty
/// map acts as a whitelist: synonyms map to their canonical tag, and names
/// with no entry are dropped entirely. Unrecognized columns are noise, not
/// data.
#[derive(Debug, Clone, Default)]
pub struct CategoryMap {
    synonyms: BTreeMap<String, String>,
}

impl CategoryMap {
    /// A map that keeps every category name as-is.
    #[must_use]
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Builds a map from `synonym -> canonical` pairs. Synonym lookup is
    /// case-insensitive.
    #[must_use]
    pub fn from_synonyms(pairs: &BTreeMap<String, String>) -> Self {
        Self {
            synonyms: pairs
                .iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v.clone()))
                .collect(),
        }
    }

    /// Canonicalizes one raw category name, or `None` to drop it.
    #[must_use]
    pub fn apply(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if self.synonyms.is_empty() {
            return Some(trimmed.to_owned());
        }
        self.synonyms.get(&trimmed.to_lowercase()).cloned()
    }
}

/// The synonym table for housing-permit structure types.
///
/// `"5 units"`, `"more than 5 units"`, and `"5 units or more"` have all
/// appeared upstream for the same series; they collapse to `"5+ units"`.
#[must_use]
pub fn permit_category_synonyms() -> BTreeMap<String, String> {
    [
        ("total", "total"),
        ("1 unit", "1 unit"),
        ("2 to 4 units", "2-4 units"),
        ("5 units", "5+ units"),
        ("more than 5 units", "5+ units"),
        ("5 units or more", "5+ units"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect()
}

/// Melts a wide table into long-format rows.
///
/// The date column is located case-insensitively by the header `"Date"` and
/// parsed with `date_format`. Every other column becomes a category:
///
/// - when `keep` is set, columns outside the list are dropped;
/// - duplicate column headers keep the first occurrence only;
/// - `categories` canonicalizes (or drops) the remaining names;
/// - rows with an unparseable date and cells with placeholder values are
///   skipped silently.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] if the table has no date column.
pub fn melt_table(
    table: &WideTable,
    date_format: &str,
    keep: Option<&[String]>,
    categories: &CategoryMap,
) -> Result<Vec<RawObservation>, SourceError> {
    let date_col = table.column("date").ok_or_else(|| {
        SourceError::parse(format!(
            "no date column found; table headers: {:?}",
            table.headers
        ))
    })?;

    let mut seen_headers: BTreeSet<String> = BTreeSet::new();
    let mut out = Vec::new();

    for row in &table.rows {
        let Some(date_raw) = row.get(date_col) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(date_raw.trim(), date_format) else {
            continue;
        };

        seen_headers.clear();
        for (col, header) in table.headers.iter().enumerate() {
            if col == date_col {
                continue;
            }
            let header = header.trim();
            if !seen_headers.insert(header.to_lowercase()) {
                continue;
            }
            if let Some(keep) = keep
                && !keep.iter().any(|k| k.eq_ignore_ascii_case(header))
            {
                continue;
            }
            let Some(category) = categories.apply(header) else {
                continue;
            };
            let Some(value) = row.get(col).and_then(|cell| parse_number(cell)) else {
                continue;
            };
            out.push(RawObservation::with_category(date, category, value));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> WideTable {
        WideTable {
            headers: headers.iter().map(|s| (*s).to_owned()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| (*s).to_owned()).collect())
                .collect(),
        }
    }

    #[test]
    fn melts_every_non_date_column() {
        let t = table(
            &["Date", "1 Yr", "2 Yr"],
            &[&["01/05/2024", "5.1", "4.8"], &["01/12/2024", "5.2", "4.9"]],
        );
        let rows = melt_table(&t, "%m/%d/%Y", None, &CategoryMap::passthrough()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].category, "1 Yr");
        assert!((rows[0].value - 5.1).abs() < f64::EPSILON);
        assert_eq!(rows[1].category, "2 Yr");
    }

    #[test]
    fn drops_placeholder_values_instead_of_zeroing() {
        let t = table(
            &["Date", "1 Yr", "30 Yr"],
            &[&["01/05/2024", "—", "4.4"], &["01/12/2024", "N/A", ""]],
        );
        let rows = melt_table(&t, "%m/%d/%Y", None, &CategoryMap::passthrough()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "30 Yr");
    }

    #[test]
    fn keep_list_drops_unrecognized_columns() {
        let t = table(
            &["Date", "1 Yr", "Notes"],
            &[&["01/05/2024", "5.1", "revised"]],
        );
        let keep = vec!["1 Yr".to_owned()];
        let rows = melt_table(&t, "%m/%d/%Y", Some(&keep), &CategoryMap::passthrough()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "1 Yr");
    }

    #[test]
    fn duplicate_columns_keep_first_occurrence() {
        let t = table(&["Date", "1 Yr", "1 Yr"], &[&["01/05/2024", "5.1", "9.9"]]);
        let rows = melt_table(&t, "%m/%d/%Y", None, &CategoryMap::passthrough()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].value - 5.1).abs() < f64::EPSILON);
    }

    #[test]
    fn unparseable_dates_skip_the_row() {
        let t = table(
            &["Date", "1 Yr"],
            &[&["totals", "99.0"], &["01/05/2024", "5.1"]],
        );
        let rows = melt_table(&t, "%m/%d/%Y", None, &CategoryMap::passthrough()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn missing_date_column_is_an_error() {
        let t = table(&["Day", "1 Yr"], &[&["01/05/2024", "5.1"]]);
        assert!(matches!(
            melt_table(&t, "%m/%d/%Y", None, &CategoryMap::passthrough()),
            Err(SourceError::Parse { .. })
        ));
    }

    #[test]
    fn permit_synonyms_collapse_to_canonical_tags() {
        let map = CategoryMap::from_synonyms(&permit_category_synonyms());
        assert_eq!(map.apply("5 units").as_deref(), Some("5+ units"));
        assert_eq!(map.apply("more than 5 units").as_deref(), Some("5+ units"));
        assert_eq!(map.apply("5 units or more").as_deref(), Some("5+ units"));
        assert_eq!(map.apply("2 to 4 Units").as_deref(), Some("2-4 units"));
        assert_eq!(map.apply("mystery column"), None);
    }

    #[test]
    fn parse_number_handles_markers() {
        assert!(parse_number("—").is_none());
        assert!(parse_number(".").is_none());
        assert!(parse_number("   ").is_none());
        assert!((parse_number(" 4.25 ").unwrap() - 4.25).abs() < f64::EPSILON);
    }
}
