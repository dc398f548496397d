//! Report month resolution for scraped monthly reports.
//!
//! A report published "for January" appears in early February, so the latest
//! complete report is normally last month's. Within the first few days of a
//! month the publication may not have happened yet, in which case the month
//! before that is the fallback candidate. The adapter tries the candidates
//! in order and stops at the first page that parses.

use std::fmt;

use chrono::{Datelike as _, NaiveDate};

/// Days at the start of a month during which last month's report may not be
/// published yet.
pub const AMBIGUITY_WINDOW_DAYS: u32 = 5;

/// Lowercase English month names, indexed by `month - 1`.
pub const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// A calendar month a report may cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportMonth {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
}

impl ReportMonth {
    /// The month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The preceding calendar month.
    #[must_use]
    pub const fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The first day of the month, the convention scraped monthly reports
    /// are dated with.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Lowercase English name, as used in report URL paths.
    #[must_use]
    pub fn name(self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }
}

impl fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// The ordered candidate list of report months likely published as of
/// `today`: last month, plus the month before it while inside the
/// early-month ambiguity window.
#[must_use]
pub fn candidate_report_months(today: NaiveDate) -> Vec<ReportMonth> {
    let last = ReportMonth::from_date(today).previous();
    let mut candidates = vec![last];
    if today.day() <= AMBIGUITY_WINDOW_DAYS {
        candidates.push(last.previous());
    }
    candidates
}

/// Maps an English month name (any case) to its 1-based number.
#[must_use]
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.trim().to_lowercase();
    MONTH_NAMES
        .iter()
        .position(|m| *m == lower)
        .map(|i| u32::try_from(i).unwrap_or(0) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn mid_month_expects_last_month_only() {
        let candidates = candidate_report_months(date(2025, 8, 15));
        assert_eq!(candidates, vec![ReportMonth { year: 2025, month: 7 }]);
    }

    #[test]
    fn early_month_adds_two_months_prior_as_fallback() {
        let candidates = candidate_report_months(date(2025, 8, 3));
        assert_eq!(
            candidates,
            vec![
                ReportMonth { year: 2025, month: 7 },
                ReportMonth { year: 2025, month: 6 },
            ]
        );
    }

    #[test]
    fn january_wraps_to_previous_year() {
        let candidates = candidate_report_months(date(2025, 1, 2));
        assert_eq!(
            candidates,
            vec![
                ReportMonth {
                    year: 2024,
                    month: 12
                },
                ReportMonth {
                    year: 2024,
                    month: 11
                },
            ]
        );
    }

    #[test]
    fn month_names_and_numbers_round_trip() {
        assert_eq!(ReportMonth { year: 2025, month: 7 }.name(), "july");
        assert_eq!(month_number("July"), Some(7));
        assert_eq!(month_number("DECEMBER"), Some(12));
        assert_eq!(month_number("smarch"), None);
    }
}
