// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export history store — append-only SQLite log of every completed export.
//
// Schema:
//   export_history(
//     id        INTEGER PRIMARY KEY AUTOINCREMENT,
//     name      TEXT    NOT NULL,   -- output file name
//     date      TEXT    NOT NULL,   -- RFC 3339, UTC, millisecond precision
//     url       TEXT    NOT NULL,   -- local artifact reference
//     cloud_url TEXT                -- remote artifact reference, if uploaded
//   )

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use archivestream_core::error::{ArchiveError, Result};
use archivestream_core::history::{ExportHistoryItem, HistoryPersistence};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

// ---------------------------------------------------------------------------
// Local error helpers
// ---------------------------------------------------------------------------

/// Convert a `rusqlite::Error` into an `ArchiveError::Database`.
fn db_err(e: rusqlite::Error) -> ArchiveError {
    ArchiveError::Database(e.to_string())
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS export_history (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT    NOT NULL,
    date      TEXT    NOT NULL,
    url       TEXT    NOT NULL,
    cloud_url TEXT
);";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A stored history record together with its row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredExport {
    pub id: i64,
    #[serde(flatten)]
    pub record: ExportHistoryItem,
}

/// Append-only export history backed by a SQLite database.
///
/// The connection sits behind a mutex so one store can be shared by every
/// composer in the process.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (or create) the history database at `path`.
    ///
    /// The `export_history` table is created automatically if it does not
    /// already exist. WAL mode is enabled for concurrent readers.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("history store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory history database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("in-memory history store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append one record.
    #[instrument(skip(self, record), fields(name = %record.name))]
    pub fn append(&self, record: &ExportHistoryItem) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO export_history (name, date, url, cloud_url)
             VALUES (?1, ?2, ?3, ?4)",
            params![record.name, record.date, record.url, record.cloud_url],
        )
        .map_err(db_err)?;

        let id = conn.last_insert_rowid();
        debug!(id, "history record stored");
        Ok(id)
    }

    /// The most recent `limit` records, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<StoredExport>> {
        self.query(
            "SELECT id, name, date, url, cloud_url
             FROM export_history
             ORDER BY id DESC
             LIMIT ?1",
            params![limit],
        )
    }

    /// Every record, oldest first. Suitable for seeding a `HistoryLedger`.
    pub fn all(&self) -> Result<Vec<ExportHistoryItem>> {
        let rows = self.query(
            "SELECT id, name, date, url, cloud_url
             FROM export_history
             ORDER BY id ASC",
            [],
        )?;
        Ok(rows.into_iter().map(|row| row.record).collect())
    }

    /// Records dated at or after `since`, oldest first.
    pub fn since(&self, since: DateTime<Utc>) -> Result<Vec<StoredExport>> {
        // Stored dates share one fixed-width UTC format, so text order is
        // chronological order.
        let since = since.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.query(
            "SELECT id, name, date, url, cloud_url
             FROM export_history
             WHERE date >= ?1
             ORDER BY date ASC, id ASC",
            params![since],
        )
    }

    /// Return the total number of records.
    pub fn count(&self) -> Result<u64> {
        self.lock()?
            .query_row("SELECT COUNT(*) FROM export_history", [], |row| row.get(0))
            .map_err(db_err)
    }

    fn query<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<StoredExport>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let rows = stmt.query_map(params, stored_export).map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ArchiveError::PersistenceUnavailable("history store lock poisoned".to_string()))
    }
}

fn stored_export(row: &Row<'_>) -> rusqlite::Result<StoredExport> {
    Ok(StoredExport {
        id: row.get(0)?,
        record: ExportHistoryItem {
            name: row.get(1)?,
            date: row.get(2)?,
            url: row.get(3)?,
            cloud_url: row.get(4)?,
        },
    })
}

impl HistoryPersistence for SqliteHistoryStore {
    fn persist(&self, record: &ExportHistoryItem) -> Result<()> {
        self.append(record).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_store() -> SqliteHistoryStore {
        SqliteHistoryStore::open_in_memory().expect("open in-memory history store")
    }

    fn record(name: &str, minute: u32) -> ExportHistoryItem {
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 12, minute, 0).unwrap();
        ExportHistoryItem::new(name, at, name)
    }

    #[test]
    fn persist_and_count() {
        let store = make_store();
        assert_eq!(store.count().unwrap(), 0);

        store.persist(&record("a.pdf", 0)).unwrap();
        store
            .persist(&record("b.pdf", 1).with_cloud_url("https://archive.example/b.pdf"))
            .unwrap();

        assert_eq!(store.count().unwrap(), 2);
        let all = store.all().unwrap();
        assert_eq!(all[0].name, "a.pdf");
        assert_eq!(all[1].cloud_url.as_deref(), Some("https://archive.example/b.pdf"));
    }

    #[test]
    fn recent_ordering() {
        let store = make_store();
        for i in 0..5 {
            store.persist(&record(&format!("export_{i}.pdf"), i)).unwrap();
        }

        let recent = store.recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        // Newest first, so ids descend.
        assert!(recent[0].id > recent[1].id);
        assert!(recent[1].id > recent[2].id);
        assert_eq!(recent[0].record.name, "export_4.pdf");
    }

    #[test]
    fn since_filters_by_date() {
        let store = make_store();
        for i in 0..4 {
            store.persist(&record(&format!("export_{i}.pdf"), i * 10)).unwrap();
        }
        let cutoff = Utc.with_ymd_and_hms(2026, 4, 1, 12, 20, 0).unwrap();
        let names: Vec<_> = store
            .since(cutoff)
            .unwrap()
            .into_iter()
            .map(|row| row.record.name)
            .collect();
        assert_eq!(names, vec!["export_2.pdf", "export_3.pdf"]);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");

        {
            let store = SqliteHistoryStore::open(&path).unwrap();
            store.persist(&record("kept.pdf", 5)).unwrap();
        }

        let reopened = SqliteHistoryStore::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert_eq!(reopened.all().unwrap()[0], record("kept.pdf", 5));
    }

    #[test]
    fn stored_export_serialises_flat() {
        let stored = StoredExport {
            id: 7,
            record: record("x.pdf", 0),
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "x.pdf");
        assert!(json.get("cloudUrl").is_none());
    }
}
