//! SQLite persistence for scheduling state and the review log
//!
//! Tables:
//! - `items`: one row per catalog item with its current ease, interval and due date
//! - `reviews`: append-only log, one row per answered question
//! - `vocab_files`: corpus file fingerprints recorded at sync time
//!
//! Dates are stored as `YYYY-MM-DD` text so that string comparison orders them.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use super::algorithm::{DEFAULT_EASE, DEFAULT_INTERVAL, MAX_INTERVAL};
use super::models::*;
use crate::vocab::Mode;

const DATE_FORMAT: &str = "%Y-%m-%d";

const ITEM_COLUMNS: &str =
    "item_id, mode, level, variant, ease, interval, due_date, last_result, last_reviewed_at";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Corrupt row for {item_id}: {reason}")]
    Corrupt { item_id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Which side of the due date a selection draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Due,
    Upcoming,
}

type ItemRow = (
    String,
    String,
    Option<String>,
    String,
    f64,
    i64,
    String,
    Option<i64>,
    Option<String>,
);

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn map_item_row(row: &rusqlite::Row) -> rusqlite::Result<ItemRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn decode_item(row: ItemRow) -> Result<ScheduledItem> {
    let (item_id, mode, level, variant, ease, interval, due_date, last_result, last_reviewed_at) = row;
    let corrupt = |reason: String| StoreError::Corrupt {
        item_id: item_id.clone(),
        reason,
    };

    let mode = Mode::parse(&mode).ok_or_else(|| corrupt(format!("unknown mode '{}'", mode)))?;
    let variant = Variant::parse(&variant).ok_or_else(|| corrupt(format!("unknown variant '{}'", variant)))?;
    let due_date = NaiveDate::parse_from_str(&due_date, DATE_FORMAT)
        .map_err(|e| corrupt(format!("bad due date '{}': {}", due_date, e)))?;
    let last_reviewed_at = last_reviewed_at
        .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| corrupt(format!("bad review timestamp: {}", e)))?;

    Ok(ScheduledItem {
        item_id: item_id.clone(),
        mode,
        level,
        variant,
        ease,
        interval: interval.clamp(1, i64::from(MAX_INTERVAL)) as u32,
        due_date,
        last_outcome: last_result.map(|v| v != 0),
        last_reviewed_at,
    })
}

fn insert_item(conn: &Connection, item: &ScheduledItem) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO items (item_id, mode, level, variant, ease, interval, due_date, last_result, last_reviewed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            item.item_id,
            item.mode.as_str(),
            item.level,
            item.variant.as_str(),
            item.ease,
            item.interval as i64,
            format_date(item.due_date),
            item.last_outcome.map(i64::from),
            item.last_reviewed_at.map(format_timestamp),
        ],
    )?;
    Ok(())
}

/// Durable review state backed by a single SQLite database
pub struct ReviewStore {
    conn: Connection,
}

impl ReviewStore {
    /// Open (or create) the database at the given path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(db_path)?)
    }

    /// A throwaway database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                item_id TEXT PRIMARY KEY,
                mode TEXT NOT NULL,
                level TEXT,
                variant TEXT NOT NULL,
                ease REAL NOT NULL,
                interval INTEGER NOT NULL,
                due_date TEXT NOT NULL,
                last_result INTEGER,
                last_reviewed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY,
                item_id TEXT NOT NULL,
                reviewed_at TEXT NOT NULL,
                correct INTEGER NOT NULL,
                response_ms INTEGER NOT NULL,
                ease_before REAL NOT NULL,
                ease_after REAL NOT NULL,
                interval_before INTEGER NOT NULL,
                interval_after INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS vocab_files (
                path TEXT PRIMARY KEY,
                sha256 TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_items_due_date ON items(due_date);
            CREATE INDEX IF NOT EXISTS idx_reviews_reviewed_at ON reviews(reviewed_at);
            "#,
        )?;
        Ok(Self { conn })
    }

    // ==================== Catalog ====================

    /// Bring the items table in line with the catalog
    ///
    /// New ids start with the default ease and interval, due today. Existing ids keep
    /// their scheduling state. Ids no longer in the catalog are removed.
    pub fn sync_items(&mut self, items: &[ItemSpec], today: NaiveDate) -> Result<SyncSummary> {
        let tx = self.conn.transaction()?;

        let existing: HashSet<String> = {
            let mut stmt = tx.prepare("SELECT item_id FROM items")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<HashSet<_>>>()?;
            ids
        };
        let wanted: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();

        let mut summary = SyncSummary::default();
        for item in items.iter().filter(|item| !existing.contains(&item.id)) {
            insert_item(
                &tx,
                &ScheduledItem {
                    item_id: item.id.clone(),
                    mode: item.mode,
                    level: item.level.clone(),
                    variant: item.variant,
                    ease: DEFAULT_EASE,
                    interval: DEFAULT_INTERVAL,
                    due_date: today,
                    last_outcome: None,
                    last_reviewed_at: None,
                },
            )?;
            summary.inserted += 1;
        }

        for stale in existing.iter().filter(|id| !wanted.contains(id.as_str())) {
            tx.execute("DELETE FROM items WHERE item_id = ?1", params![stale])?;
            summary.removed += 1;
        }

        tx.commit()?;
        log::info!(
            "Synced catalog: {} inserted, {} removed",
            summary.inserted,
            summary.removed
        );
        Ok(summary)
    }

    /// Write an item row as-is, replacing any existing state
    pub fn put_item(&self, item: &ScheduledItem) -> Result<()> {
        insert_item(&self.conn, item)
    }

    // ==================== Selection ====================

    fn select(
        &self,
        window: Window,
        scope: &Scope,
        as_of: NaiveDate,
        limit: usize,
        randomized: bool,
    ) -> Result<Vec<ScheduledItem>> {
        let comparison = match window {
            Window::Due => "<=",
            Window::Upcoming => ">",
        };
        let order = if randomized { "RANDOM()" } else { "due_date ASC, item_id ASC" };
        let sql = format!(
            "SELECT {} FROM items
             WHERE mode = ?1 AND (?2 IS NULL OR level = ?2) AND due_date {} ?3
             ORDER BY {}
             LIMIT ?4",
            ITEM_COLUMNS, comparison, order
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![scope.mode.as_str(), scope.level, format_date(as_of), limit as i64],
                map_item_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(decode_item).collect()
    }

    /// Items due on or before `as_of`
    pub fn select_due(&self, scope: &Scope, as_of: NaiveDate, limit: usize, randomized: bool) -> Result<Vec<ScheduledItem>> {
        self.select(Window::Due, scope, as_of, limit, randomized)
    }

    /// Items due after `as_of`
    pub fn select_upcoming(
        &self,
        scope: &Scope,
        as_of: NaiveDate,
        limit: usize,
        randomized: bool,
    ) -> Result<Vec<ScheduledItem>> {
        self.select(Window::Upcoming, scope, as_of, limit, randomized)
    }

    pub fn fetch_item(&self, item_id: &str) -> Result<Option<ScheduledItem>> {
        let sql = format!("SELECT {} FROM items WHERE item_id = ?1", ITEM_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![item_id], map_item_row)
            .optional()?;
        row.map(decode_item).transpose()
    }

    // ==================== Reviews ====================

    /// Commit a review: scheduling update plus log row, in one transaction
    pub fn apply_review(&mut self, update: &ReviewUpdate) -> Result<()> {
        let now = format_timestamp(Utc::now());
        let tx = self.conn.transaction()?;

        let changed = tx.execute(
            "UPDATE items
             SET ease = ?1, interval = ?2, due_date = ?3, last_result = ?4, last_reviewed_at = ?5
             WHERE item_id = ?6",
            params![
                update.ease_after,
                update.interval_after as i64,
                format_date(update.due_date),
                i64::from(update.correct),
                now,
                update.item_id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::ItemNotFound(update.item_id.clone()));
        }

        tx.execute(
            "INSERT INTO reviews (item_id, reviewed_at, correct, response_ms, ease_before, ease_after, interval_before, interval_after)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                update.item_id,
                now,
                i64::from(update.correct),
                update.response_ms as i64,
                update.ease_before,
                update.ease_after,
                update.interval_before as i64,
                update.interval_after as i64,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Review log for one item, oldest first
    pub fn review_log(&self, item_id: &str) -> Result<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, reviewed_at, correct, response_ms, ease_before, ease_after, interval_before, interval_after
             FROM reviews WHERE item_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![item_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, i64>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(item_id, reviewed_at, correct, response_ms, ease_before, ease_after, interval_before, interval_after)| {
                    let reviewed_at = DateTime::parse_from_rfc3339(&reviewed_at)
                        .map_err(|e| StoreError::Corrupt {
                            item_id: item_id.clone(),
                            reason: format!("bad review timestamp: {}", e),
                        })?
                        .with_timezone(&Utc);
                    Ok(ReviewRecord {
                        item_id,
                        reviewed_at,
                        correct: correct != 0,
                        response_ms: response_ms.max(0) as u64,
                        ease_before,
                        ease_after,
                        interval_before: interval_before.max(0) as u32,
                        interval_after: interval_after.max(0) as u32,
                    })
                },
            )
            .collect()
    }

    // ==================== Corpus fingerprints ====================

    pub fn upsert_vocab_hash(&self, path: &str, sha256: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO vocab_files (path, sha256, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET sha256 = excluded.sha256, updated_at = excluded.updated_at",
            params![path, sha256, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    pub fn vocab_hash(&self, path: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT sha256 FROM vocab_files WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?)
    }

    // ==================== Statistics ====================

    pub fn count_items(&self) -> Result<usize> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(total as usize)
    }

    pub fn count_due(&self, today: NaiveDate) -> Result<usize> {
        let due: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE due_date <= ?1",
            params![format_date(today)],
            |row| row.get(0),
        )?;
        Ok(due as usize)
    }

    /// Accuracy of reviews logged at or after `since`
    pub fn accuracy_since(&self, since: DateTime<Utc>) -> Result<Accuracy> {
        let (correct, total): (Option<i64>, i64) = self.conn.query_row(
            "SELECT SUM(correct), COUNT(*) FROM reviews WHERE reviewed_at >= ?1",
            params![format_timestamp(since)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(Accuracy {
            correct: correct.unwrap_or(0) as usize,
            total: total as usize,
        })
    }

    pub fn stats_by_mode(&self, today: NaiveDate) -> Result<Vec<ModeStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT mode, COUNT(*), SUM(CASE WHEN due_date <= ?1 THEN 1 ELSE 0 END)
             FROM items GROUP BY mode ORDER BY mode",
        )?;
        let rows = stmt
            .query_map(params![format_date(today)], |row| {
                Ok(ModeStats {
                    mode: row.get(0)?,
                    total: row.get::<_, i64>(1)? as usize,
                    due: row.get::<_, Option<i64>>(2)?.unwrap_or(0) as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
