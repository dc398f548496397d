//! Indicator registry — loads all indicator definitions from embedded TOML.
//!
//! Each `.toml` file in `packages/source/indicators/` is baked into the
//! binary at compile time via [`include_str!`]. Adding an indicator means
//! creating a new TOML file and adding it to the list below.

use crate::indicator_def::{IndicatorDef, parse_indicator_toml};

/// TOML definitions embedded at compile time.
const INDICATOR_TOMLS: &[(&str, &str)] = &[
    // ── Treasury yield curve tables ──────────────────────────────────
    (
        "us_treasury_yield_curve",
        include_str!("../indicators/us_treasury_yield_curve.toml"),
    ),
    (
        "us_treasury_real_yield_curve",
        include_str!("../indicators/us_treasury_real_yield_curve.toml"),
    ),
    // ── FRED API series ──────────────────────────────────────────────
    (
        "building_permits_us",
        include_str!("../indicators/building_permits_us.toml"),
    ),
    ("us_real_gdp", include_str!("../indicators/us_real_gdp.toml")),
    ("real_m2_usd", include_str!("../indicators/real_m2_usd.toml")),
    // ── Scraped monthly reports ──────────────────────────────────────
    (
        "us_ism_manufacturing_pmi",
        include_str!("../indicators/us_ism_manufacturing_pmi.toml"),
    ),
    ("us_umcsi", include_str!("../indicators/us_umcsi.toml")),
];

/// Total number of registered indicators (used in tests).
#[cfg(test)]
const EXPECTED_INDICATOR_COUNT: usize = 7;

/// Returns all registered indicator definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML definition is malformed (the definitions are embedded,
/// so this is effectively a compile-time guarantee enforced by the tests
/// below).
#[must_use]
pub fn all_indicators() -> Vec<IndicatorDef> {
    INDICATOR_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_indicator_toml(toml).unwrap_or_else(|e| panic!("failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a single indicator definition by name.
#[must_use]
pub fn find_indicator(name: &str) -> Option<IndicatorDef> {
    all_indicators().into_iter().find(|def| def.name == name)
}

/// Returns the indicators to sync, filtered by the `--indicators` CLI flag
/// or the `ECON_PULSE_INDICATORS` environment variable. If neither is set,
/// all indicators are returned.
#[must_use]
pub fn enabled_indicators(cli_filter: Option<String>) -> Vec<IndicatorDef> {
    let filter = cli_filter.or_else(|| std::env::var("ECON_PULSE_INDICATORS").ok());

    let all = all_indicators();

    let Some(filter_str) = filter else {
        return all;
    };

    let names: Vec<&str> = filter_str.split(',').map(str::trim).collect();

    let filtered: Vec<IndicatorDef> = all
        .into_iter()
        .filter(|def| names.contains(&def.name.as_str()))
        .collect();

    if filtered.is_empty() {
        log::warn!(
            "No matching indicators for filter {:?}. Available: {}",
            names,
            all_indicators()
                .iter()
                .map(|def| def.name.clone())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use econ_pulse_models::IndicatorKind;

    #[test]
    fn loads_all_indicators() {
        let indicators = all_indicators();
        assert_eq!(indicators.len(), EXPECTED_INDICATOR_COUNT);
    }

    #[test]
    fn indicator_names_are_unique_and_match_file_stems() {
        let indicators = all_indicators();
        let mut names: Vec<&str> = indicators.iter().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EXPECTED_INDICATOR_COUNT);

        for (stem, _) in INDICATOR_TOMLS {
            assert!(
                indicators.iter().any(|d| d.name == *stem),
                "no definition named {stem}"
            );
        }
    }

    #[test]
    fn all_indicators_have_identity_fields() {
        for def in &all_indicators() {
            assert!(!def.name.is_empty(), "indicator name is empty");
            assert!(!def.full_name.is_empty(), "{}: no full_name", def.name);
            assert!(!def.source.is_empty(), "{}: no source", def.name);
            assert!(!def.description.is_empty(), "{}: no description", def.name);
            assert!(def.epsilon > 0.0, "{}: non-positive epsilon", def.name);
        }
    }

    #[test]
    fn gdp_is_revision_aware() {
        let gdp = find_indicator("us_real_gdp").unwrap();
        assert_eq!(gdp.kind, IndicatorKind::Fred);
        assert_eq!(gdp.revision_window_days, Some(730));
    }

    #[test]
    fn filter_selects_named_indicators() {
        let filtered = enabled_indicators(Some("us_real_gdp, us_umcsi".to_owned()));
        let names: Vec<&str> = filtered.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["us_real_gdp", "us_umcsi"]);
    }
}
