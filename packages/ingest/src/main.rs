#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the economic indicator collector.
//!
//! Running with no arguments performs a full incremental sync of every
//! registered indicator, the batch-job mode cron invokes. Partial failures
//! (one month missing, one report not yet published) are logged warnings;
//! the process exits non-zero only when no data source was reachable at
//! all.

use clap::{Parser, Subcommand};
use econ_pulse_database::IndicatorStore;
use econ_pulse_ingest::{db_path, fetch_since, revisions, sync_all, sync_indicator};
use econ_pulse_source::registry::{all_indicators, enabled_indicators, find_indicator};

#[derive(Parser)]
#[command(name = "econ_pulse_ingest", about = "Economic indicator collection tool")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync every registered indicator (the default when no command is
    /// given)
    SyncAll {
        /// Comma-separated list of indicator names to sync (overrides the
        /// `ECON_PULSE_INDICATORS` env var)
        #[arg(long)]
        indicators: Option<String>,
        /// Ignore watermarks and re-fetch full history
        #[arg(long)]
        force: bool,
    },
    /// Sync a single indicator
    Sync {
        /// Indicator name (e.g., "`us_real_gdp`")
        indicator: String,
        /// Ignore the watermark and re-fetch full history
        #[arg(long)]
        force: bool,
    },
    /// Compare upstream values against the store and report revisions
    /// without writing anything
    Revisions {
        /// Indicator name; all indicators when omitted
        indicator: Option<String>,
    },
    /// List all registered indicators
    Indicators,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        None => {
            let store = IndicatorStore::open(&db_path())?;
            run_sync_all(&store, None, false).await
        }
        Some(Commands::SyncAll { indicators, force }) => {
            let store = IndicatorStore::open(&db_path())?;
            run_sync_all(&store, indicators, force).await
        }
        Some(Commands::Sync { indicator, force }) => {
            let store = IndicatorStore::open(&db_path())?;
            let def = find_indicator(&indicator)
                .ok_or_else(|| format!("unknown indicator '{indicator}'"))?;
            let report = sync_indicator(&store, &def, force).await?;
            log::info!(
                "done: {} inserted, {} duplicate(s)",
                report.inserted,
                report.duplicates
            );
            Ok(())
        }
        Some(Commands::Revisions { indicator }) => {
            let store = IndicatorStore::open(&db_path())?;
            run_revision_scan(&store, indicator).await
        }
        Some(Commands::Indicators) => {
            for def in all_indicators() {
                println!("{:<32} {:<16} {}", def.name, def.kind, def.full_name);
            }
            Ok(())
        }
    }
}

async fn run_sync_all(
    store: &IndicatorStore,
    filter: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let defs = enabled_indicators(filter);
    if defs.is_empty() {
        return Err("no indicators selected".into());
    }

    let reports = sync_all(store, &defs, force).await?;

    let inserted: u64 = reports.iter().map(|r| r.inserted).sum();
    let warnings: usize = reports.iter().map(|r| r.warnings.len()).sum();
    let revisions: usize = reports.iter().map(|r| r.revisions.len()).sum();
    log::info!(
        "sync complete: {}/{} indicator(s) succeeded, {inserted} row(s) inserted, \
         {warnings} warning(s), {revisions} revision(s) detected",
        reports.len(),
        defs.len(),
    );

    Ok(())
}

/// Read-only revision scan: fetches fresh values and diffs them against the
/// store, writing nothing.
async fn run_revision_scan(
    store: &IndicatorStore,
    filter: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let defs = match filter {
        Some(name) => {
            vec![find_indicator(&name).ok_or_else(|| format!("unknown indicator '{name}'"))?]
        }
        None => all_indicators(),
    };

    let today = chrono::Utc::now().date_naive();
    let mut total_revisions = 0usize;

    for def in &defs {
        let indicator_id = store.add_indicator(&def.identity())?;
        let stored = store.stored_values(indicator_id)?;
        if stored.is_empty() {
            log::info!("{}: nothing stored yet, skipping scan", def.name);
            continue;
        }

        let watermark = store.get_watermark(indicator_id)?;
        let since = fetch_since(watermark, def.revision_window_days, today);

        let batch = match econ_pulse_source::fetch_batch(def, since).await {
            Ok(batch) => batch,
            Err(e) => {
                log::warn!("{}: fetch failed, skipping scan: {e}", def.name);
                continue;
            }
        };

        let scan = revisions::detect(&stored, &batch.rows, def.epsilon);
        revisions::log_scan(&def.name, &scan);
        if scan.revisions.is_empty() && scan.new_dates.is_empty() {
            log::info!("{}: store matches upstream", def.name);
        }
        total_revisions += scan.revisions.len();
    }

    log::info!("revision scan complete: {total_revisions} revision(s) detected");
    Ok(())
}
