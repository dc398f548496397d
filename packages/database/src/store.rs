//! The indicator store.
//!
//! All persistence goes through [`IndicatorStore`], an explicit handle
//! passed into the sync controller (no global connection state). SQLite's
//! own locking serializes concurrent writers; the
//! `UNIQUE(indicator_id, date, category)` index is the sole guard against
//! duplicate observations, so re-ingesting the same data is always safe.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use econ_pulse_models::{IndicatorIdentity, Observation, Release};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::DbError;

/// Timestamp format used for `created_at` columns.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A handle to the indicator database.
pub struct IndicatorStore {
    conn: Connection,
}

impl IndicatorStore {
    /// Opens (or creates) the database at `path` and ensures the schema
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the parent directory cannot be created or the
    /// connection or schema setup fails.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        create_schema(&conn)?;

        log::debug!("opened indicator store at {}", path.display());
        Ok(Self { conn })
    }

    /// Opens an in-memory store. Used by tests and dry runs.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema setup fails.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Registers an indicator, returning its id.
    ///
    /// Idempotent: if the name is already registered the existing id is
    /// returned and the identity record is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert or the id lookup fails.
    pub fn add_indicator(&self, identity: &IndicatorIdentity) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO indicators (name, full_name, source, description)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (name) DO NOTHING",
            params![
                identity.name,
                identity.full_name,
                identity.source,
                identity.description
            ],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM indicators WHERE name = ?1",
            params![identity.name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Inserts one observation.
    ///
    /// Returns `true` if a row was inserted, `false` if the
    /// (indicator, date, category) triple already existed (a silent no-op,
    /// not an error). The empty string is the stored sentinel for "no
    /// sub-series".
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on any failure other than the uniqueness
    /// constraint.
    pub fn add_observation(
        &self,
        indicator_id: i64,
        date: NaiveDate,
        category: &str,
        value: f64,
    ) -> Result<bool, DbError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO indicator_values
                 (indicator_id, date, category, value, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                indicator_id,
                date.to_string(),
                category,
                value,
                Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Returns the latest observation date for an indicator, or `None` when
    /// nothing is stored yet.
    ///
    /// This is the watermark that bounds incremental fetches; it only moves
    /// forward as long as nothing deletes rows underneath it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or a stored date does not
    /// parse.
    pub fn get_watermark(&self, indicator_id: i64) -> Result<Option<NaiveDate>, DbError> {
        let max: Option<String> = self.conn.query_row(
            "SELECT MAX(date) FROM indicator_values WHERE indicator_id = ?1",
            params![indicator_id],
            |row| row.get(0),
        )?;

        max.map(|s| {
            s.parse().map_err(|e| DbError::Conversion {
                message: format!("stored date {s:?} is not ISO: {e}"),
            })
        })
        .transpose()
    }

    /// Returns an indicator's observations in ascending date order,
    /// optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or stored rows do not parse.
    pub fn get_observations(
        &self,
        indicator_id: i64,
        category: Option<&str>,
    ) -> Result<Vec<Observation>, DbError> {
        let sql = "SELECT id, indicator_id, date, category, value, created_at
                   FROM indicator_values
                   WHERE indicator_id = ?1
                     AND (?2 IS NULL OR category = ?2)
                   ORDER BY date, category";
        let mut stmt = self.conn.prepare(sql)?;

        let rows = stmt.query_map(params![indicator_id, category], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut observations = Vec::new();
        for row in rows {
            let (id, indicator_id, date_str, category, value, created_at) = row?;
            let date: NaiveDate = date_str.parse().map_err(|e| DbError::Conversion {
                message: format!("stored date {date_str:?} is not ISO: {e}"),
            })?;
            observations.push(Observation {
                id,
                indicator_id,
                date,
                category,
                value,
                recorded_at: created_at.as_deref().and_then(parse_timestamp),
            });
        }
        Ok(observations)
    }

    /// Returns all stored values for an indicator keyed by
    /// (date, category), for revision comparison.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn stored_values(
        &self,
        indicator_id: i64,
    ) -> Result<BTreeMap<(NaiveDate, String), f64>, DbError> {
        let mut map = BTreeMap::new();
        for obs in self.get_observations(indicator_id, None)? {
            map.insert((obs.date, obs.category), obs.value);
        }
        Ok(map)
    }

    /// Whether a release already exists for (indicator, date, category).
    ///
    /// Releases have no uniqueness constraint; duplicate suppression is this
    /// check-before-insert.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn has_release(
        &self,
        indicator_id: i64,
        date: NaiveDate,
        category: &str,
    ) -> Result<bool, DbError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM indicator_releases
             WHERE indicator_id = ?1 AND date = ?2 AND category = ?3",
            params![indicator_id, date.to_string(), category],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Inserts a release unless one already exists for its
    /// (date, category).
    ///
    /// Returns `true` if the release was inserted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the existence check or insert fails.
    pub fn add_release(&self, indicator_id: i64, release: &Release) -> Result<bool, DbError> {
        if self.has_release(indicator_id, release.date, &release.category)? {
            log::debug!(
                "release for indicator {indicator_id} on {} ({}) already stored",
                release.date,
                release.category
            );
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO indicator_releases
                 (indicator_id, date, category, release_data, source_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                indicator_id,
                release.date.to_string(),
                release.category,
                release.payload.to_string(),
                release.source_url,
                Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            ],
        )?;
        Ok(true)
    }

    /// Fetches a stored release payload and its source URL.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or the stored payload is not
    /// valid JSON.
    pub fn get_release(
        &self,
        indicator_id: i64,
        date: NaiveDate,
        category: &str,
    ) -> Result<Option<(serde_json::Value, String)>, DbError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT release_data, source_url FROM indicator_releases
                 WHERE indicator_id = ?1 AND date = ?2 AND category = ?3",
                params![indicator_id, date.to_string(), category],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(data, url)| {
            let payload = serde_json::from_str(&data).map_err(|e| DbError::Conversion {
                message: format!("stored release payload is not JSON: {e}"),
            })?;
            Ok((payload, url))
        })
        .transpose()
    }
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS indicators (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            source TEXT,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS indicator_values (
            id INTEGER PRIMARY KEY,
            indicator_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            value REAL NOT NULL,
            created_at TEXT,
            FOREIGN KEY (indicator_id) REFERENCES indicators (id),
            UNIQUE (indicator_id, date, category)
        );

        CREATE TABLE IF NOT EXISTS indicator_releases (
            id INTEGER PRIMARY KEY,
            indicator_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            release_data TEXT,
            source_url TEXT,
            created_at TEXT,
            FOREIGN KEY (indicator_id) REFERENCES indicators (id)
        );

        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY,
            indicator_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            comment_text TEXT NOT NULL,
            created_at TEXT,
            FOREIGN KEY (indicator_id) REFERENCES indicators (id)
        );",
    )?;
    Ok(())
}

/// Parses a stored `created_at` timestamp back into a UTC `DateTime`.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .ok()
}
