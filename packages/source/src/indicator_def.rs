//! Indicator definition parsing.
//!
//! Each indicator ships as a TOML file embedded at compile time (see
//! [`crate::registry`]). The definition carries the identity record that is
//! upserted into the store plus the adapter configuration for its
//! [`IndicatorKind`].

use chrono::NaiveDate;
use econ_pulse_models::{IndicatorIdentity, IndicatorKind};
use serde::Deserialize;

use crate::SourceError;
use crate::fred::Formula;

/// Default revision epsilon when a definition does not tune one.
const DEFAULT_EPSILON: f64 = 0.1;

/// A fully parsed indicator definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorDef {
    /// Unique stable key (e.g., `"us_real_gdp"`).
    pub name: String,
    /// Human-readable name.
    pub full_name: String,
    /// Publishing organization.
    pub source: String,
    /// Free-text description.
    pub description: String,
    /// Which adapter fetches this indicator.
    pub kind: IndicatorKind,

    /// Revision threshold, tuned to the indicator's typical magnitude.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// When set, incremental runs re-request this trailing window to catch
    /// upstream revisions.
    #[serde(default)]
    pub revision_window_days: Option<i64>,

    /// Configuration for [`IndicatorKind::Fred`].
    #[serde(default)]
    pub fred: Option<FredConfig>,
    /// Configuration for [`IndicatorKind::FredCalculated`].
    #[serde(default)]
    pub calculated: Option<CalculatedConfig>,
    /// Configuration for [`IndicatorKind::TreasuryTable`].
    #[serde(default)]
    pub treasury: Option<TreasuryConfig>,
}

const fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

/// A single named FRED series.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FredConfig {
    /// FRED series id (e.g., `"GDPC1"`).
    pub series_id: String,
}

/// A composite computed row-wise from several FRED series.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalculatedConfig {
    /// Constituent series ids, in operand order.
    pub series: Vec<String>,
    /// The pure row-wise calculation applied to aligned operands.
    pub formula: Formula,
}

/// A monthly-keyed Treasury yield curve table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreasuryConfig {
    /// The `type` query parameter selecting the table
    /// (e.g., `"daily_treasury_yield_curve"`).
    pub rate_type: String,
    /// ISO date the published history starts at; used when the store holds
    /// nothing yet.
    pub history_start: String,
    /// Tenor columns to keep; anything else in the table is dropped.
    pub tenors: Vec<String>,
}

impl TreasuryConfig {
    /// Parses `history_start` as a calendar date.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Definition`] if the field is not an ISO date.
    pub fn history_start_date(&self) -> Result<NaiveDate, SourceError> {
        self.history_start
            .parse()
            .map_err(|e| SourceError::Definition {
                name: self.rate_type.clone(),
                message: format!("history_start '{}' is not a date: {e}", self.history_start),
            })
    }
}

impl IndicatorDef {
    /// The identity record registered in the store for this indicator.
    #[must_use]
    pub fn identity(&self) -> IndicatorIdentity {
        IndicatorIdentity {
            name: self.name.clone(),
            full_name: self.full_name.clone(),
            source: self.source.clone(),
            description: self.description.clone(),
        }
    }

    /// The `[fred]` section, required by [`IndicatorKind::Fred`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Definition`] if the section is missing.
    pub fn fred_config(&self) -> Result<&FredConfig, SourceError> {
        self.fred.as_ref().ok_or_else(|| SourceError::Definition {
            name: self.name.clone(),
            message: "kind = \"fred\" requires a [fred] section".to_owned(),
        })
    }

    /// The `[calculated]` section, required by
    /// [`IndicatorKind::FredCalculated`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Definition`] if the section is missing or
    /// lists no constituent series.
    pub fn calculated_config(&self) -> Result<&CalculatedConfig, SourceError> {
        let cfg = self
            .calculated
            .as_ref()
            .ok_or_else(|| SourceError::Definition {
                name: self.name.clone(),
                message: "kind = \"fred_calculated\" requires a [calculated] section".to_owned(),
            })?;
        if cfg.series.is_empty() {
            return Err(SourceError::Definition {
                name: self.name.clone(),
                message: "[calculated] lists no constituent series".to_owned(),
            });
        }
        Ok(cfg)
    }

    /// The `[treasury]` section, required by [`IndicatorKind::TreasuryTable`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Definition`] if the section is missing.
    pub fn treasury_config(&self) -> Result<&TreasuryConfig, SourceError> {
        self.treasury
            .as_ref()
            .ok_or_else(|| SourceError::Definition {
                name: self.name.clone(),
                message: "kind = \"treasury_table\" requires a [treasury] section".to_owned(),
            })
    }
}

/// Parses and validates one indicator definition from TOML text.
///
/// Validation checks that the adapter section matching `kind` is present and
/// well-formed, so a bad embedded definition fails loudly at startup rather
/// than mid-sync.
///
/// # Errors
///
/// Returns [`SourceError::Definition`] on TOML syntax errors, a missing
/// adapter section, or an unparseable `history_start`.
pub fn parse_indicator_toml(text: &str) -> Result<IndicatorDef, SourceError> {
    let def: IndicatorDef = toml::from_str(text).map_err(|e| SourceError::Definition {
        name: "<toml>".to_owned(),
        message: e.to_string(),
    })?;

    match def.kind {
        IndicatorKind::Fred => {
            def.fred_config()?;
        }
        IndicatorKind::FredCalculated => {
            def.calculated_config()?;
        }
        IndicatorKind::TreasuryTable => {
            def.treasury_config()?.history_start_date()?;
        }
        IndicatorKind::IsmReport | IndicatorKind::UmichReport => {}
    }

    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_fred_definition() {
        let def = parse_indicator_toml(
            r#"
            name = "building_permits_us"
            full_name = "New Private Housing Units Authorized by Building Permits"
            source = "FRED"
            description = "Monthly permits, SAAR."
            kind = "fred"

            [fred]
            series_id = "PERMIT"
            "#,
        )
        .unwrap();
        assert_eq!(def.kind, IndicatorKind::Fred);
        assert_eq!(def.fred_config().unwrap().series_id, "PERMIT");
        assert!((def.epsilon - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_kind_without_matching_section() {
        let err = parse_indicator_toml(
            r#"
            name = "x"
            full_name = "X"
            source = "S"
            description = "D"
            kind = "treasury_table"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::Definition { .. }));
    }

    #[test]
    fn rejects_bad_history_start() {
        let err = parse_indicator_toml(
            r#"
            name = "x"
            full_name = "X"
            source = "S"
            description = "D"
            kind = "treasury_table"

            [treasury]
            rate_type = "daily_treasury_yield_curve"
            history_start = "not-a-date"
            tenors = ["1 Yr"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::Definition { .. }));
    }
}
