//! HTML wide-table extraction.
//!
//! Locates the first `<table>` element in a page and extracts its header
//! cells and body rows as plain strings. Callers melt the result into long
//! format; this module knows nothing about dates or categories.

use scraper::{Html, Selector};

use crate::ScrapeError;

/// A table as found on the page: one header per column, rows of cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideTable {
    /// Column header texts, in document order.
    pub headers: Vec<String>,
    /// Body rows; each row holds one string per cell.
    pub rows: Vec<Vec<String>>,
}

impl WideTable {
    /// Returns the index of the first column whose header matches `name`
    /// case-insensitively, ignoring surrounding whitespace.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    /// Returns the cell at (`row`, `col`) as a trimmed `&str`, if present.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(|s| s.trim())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Parse(format!("invalid CSS selector '{selector}': {e}")))
}

fn cell_text(el: scraper::ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join("").trim().to_owned()
}

/// Parses the first `<table>` found in `html` into a [`WideTable`].
///
/// Headers come from `thead` cells when a `thead` exists, otherwise from the
/// `<th>` cells of the first row. Body rows are every `<tr>` that contains at
/// least one `<td>`.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if no table is present or no header cells
/// can be located.
pub fn parse_first_table(html: &str) -> Result<WideTable, ScrapeError> {
    let document = Html::parse_document(html);

    let table_sel = parse_selector("table")?;
    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| ScrapeError::Parse("no <table> element found in response".to_owned()))?;

    // ── Headers ─────────────────────────────────────────────────────
    let thead_sel = parse_selector("thead tr th, thead tr td")?;
    let mut headers: Vec<String> = table.select(&thead_sel).map(cell_text).collect();

    if headers.is_empty() {
        // Some layouts put the header row straight into tbody.
        let th_sel = parse_selector("tr th")?;
        headers = table.select(&th_sel).map(cell_text).collect();
    }

    if headers.is_empty() {
        return Err(ScrapeError::Parse(
            "no header cells found in table".to_owned(),
        ));
    }

    // ── Body rows ───────────────────────────────────────────────────
    let row_sel = parse_selector("tr")?;
    let td_sel = parse_selector("td")?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<String> = row.select(&td_sel).map(cell_text).collect();
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    Ok(WideTable { headers, rows })
}
