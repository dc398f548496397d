//! Regex pattern cascades for narrative report mining.
//!
//! Scraped reports drift: headings get reworded, tables become prose, prose
//! becomes tables. Each logical field therefore carries an ordered list of
//! extraction patterns, tried in priority order; the first numeric match
//! inside the field's sanity bounds wins. A field no pattern matches is
//! simply absent from the result, never an error.

use regex::Regex;

/// An ordered pattern cascade for one logical field.
#[derive(Debug)]
pub struct FieldCascade {
    /// Canonical field name (becomes the observation category).
    pub field: &'static str,
    patterns: Vec<Regex>,
    min: f64,
    max: f64,
}

impl FieldCascade {
    /// Compiles a cascade. Patterns that fail to compile are dropped with a
    /// log message rather than poisoning the whole cascade.
    #[must_use]
    pub fn new(field: &'static str, patterns: &[&str], bounds: (f64, f64)) -> Self {
        let compiled = patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::error!("invalid extraction pattern for {field}: {e}");
                    None
                }
            })
            .collect();
        Self {
            field,
            patterns: compiled,
            min: bounds.0,
            max: bounds.1,
        }
    }

    /// Runs the cascade over `text`.
    ///
    /// Returns the first capture that parses as a number within the sanity
    /// bounds. A pattern that matches but yields an out-of-bounds or
    /// non-numeric capture falls through to the next pattern.
    #[must_use]
    pub fn extract(&self, text: &str) -> Option<f64> {
        for (i, re) in self.patterns.iter().enumerate() {
            let Some(caps) = re.captures(text) else {
                continue;
            };
            let Some(m) = caps.get(1) else {
                continue;
            };
            let Ok(value) = m.as_str().parse::<f64>() else {
                continue;
            };
            if value < self.min || value > self.max {
                log::debug!(
                    "{}: pattern {i} matched out-of-bounds value {value}, trying next",
                    self.field
                );
                continue;
            }
            log::debug!("{}: pattern {i} matched {value}", self.field);
            return Some(value);
        }
        None
    }
}
