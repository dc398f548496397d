#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Economic data source adapters.
//!
//! Each indicator is described by a TOML definition (see [`registry`]) whose
//! [`econ_pulse_models::IndicatorKind`] selects one of the adapters in this
//! crate:
//!
//! - [`fred`]: named series (and row-wise calculated composites) from the
//!   FRED REST API;
//! - [`treasury`]: monthly-keyed Treasury yield curve HTML tables;
//! - [`ism`]: the scraped ISM Report On Business narrative page;
//! - [`umich`]: the scraped UMich Surveys of Consumers page.
//!
//! Adapters are pure fetch + parse: they return a
//! [`econ_pulse_models::FetchBatch`] and never touch the store.

pub mod extract;
pub mod fred;
pub mod indicator_def;
pub mod ism;
pub mod normalize;
pub mod registry;
pub mod report_month;
pub mod treasury;
pub mod umich;

use chrono::NaiveDate;
use econ_pulse_models::{FetchBatch, IndicatorKind};
use econ_pulse_scraper::ScrapeError;

use crate::indicator_def::IndicatorDef;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed at the transport level.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A fetch or parse step in the scraping framework failed.
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// Upstream content did not match the expected structure.
    #[error("parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// A FRED-backed indicator was requested without an API key configured.
    #[error("FRED_API_KEY is not set (required by indicator '{indicator}')")]
    MissingApiKey {
        /// The indicator that needed the key.
        indicator: String,
    },

    /// No adapter path yielded any data for this indicator's run.
    #[error("no data available for indicator '{indicator}' from any candidate source")]
    NoData {
        /// The indicator that came up empty.
        indicator: String,
    },

    /// An embedded indicator definition is malformed.
    #[error("invalid indicator definition '{name}': {message}")]
    Definition {
        /// Definition name (or file stem).
        name: String,
        /// Description of the problem.
        message: String,
    },
}

impl SourceError {
    fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Fetches one indicator's observations, bounded below by `since`.
///
/// Dispatches to the adapter selected by the definition's `kind`. The
/// returned batch may be empty; "nothing new published" is not an error
/// for incremental sources. Scraped-report adapters return
/// [`SourceError::NoData`] when every candidate URL is exhausted.
///
/// # Errors
///
/// Returns [`SourceError`] on transport failure, on unparseable upstream
/// structure, or on a missing API key.
pub async fn fetch_batch(
    def: &IndicatorDef,
    since: Option<NaiveDate>,
) -> Result<FetchBatch, SourceError> {
    let client = econ_pulse_scraper::http::build_client()?;
    let today = chrono::Utc::now().date_naive();

    match def.kind {
        IndicatorKind::Fred => {
            let cfg = def.fred_config()?;
            let api_key = fred::api_key_from_env(&def.name)?;
            let rows = fred::fetch_series(&client, &api_key, &cfg.series_id, since).await?;
            Ok(FetchBatch::from_rows(rows))
        }
        IndicatorKind::FredCalculated => {
            let cfg = def.calculated_config()?;
            let api_key = fred::api_key_from_env(&def.name)?;
            let rows =
                fred::fetch_calculated(&client, &api_key, &cfg.series, cfg.formula, since).await?;
            Ok(FetchBatch::from_rows(rows))
        }
        IndicatorKind::TreasuryTable => {
            let cfg = def.treasury_config()?;
            treasury::fetch_history(&client, &def.name, cfg, since).await
        }
        IndicatorKind::IsmReport => ism::fetch_report(&client, &def.name, today).await,
        IndicatorKind::UmichReport => umich::fetch_report(&client, &def.name).await,
    }
}
