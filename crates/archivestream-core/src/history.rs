// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export history — one immutable record per completed export, kept in an
// append-only in-process ledger and optionally handed to a persistence
// collaborator for durability.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Record of one produced artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportHistoryItem {
    /// Output file name.
    pub name: String,
    /// ISO-8601 UTC timestamp of the export.
    pub date: String,
    /// Local artifact reference.
    pub url: String,
    /// Remote artifact reference, when the artifact was uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_url: Option<String>,
}

impl ExportHistoryItem {
    pub fn new(name: impl Into<String>, at: DateTime<Utc>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: format_date(at),
            url: url.into(),
            cloud_url: None,
        }
    }

    pub fn with_cloud_url(mut self, cloud_url: impl Into<String>) -> Self {
        self.cloud_url = Some(cloud_url.into());
        self
    }

    /// Parse `date` back into a timestamp.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.date)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// `at` as fixed-width RFC 3339 UTC, rounded up to the next millisecond so a
/// record is never dated before the instant it was created.
fn format_date(at: DateTime<Utc>) -> String {
    let partial = at.timestamp_subsec_nanos() % 1_000_000;
    let at = if partial == 0 {
        at
    } else {
        at + Duration::nanoseconds(i64::from(1_000_000 - partial))
    };
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Durable storage for history records (remote sync, local database, ...).
///
/// Implementations report failures as
/// [`ArchiveError::PersistenceUnavailable`](crate::ArchiveError::PersistenceUnavailable)
/// or [`ArchiveError::Database`](crate::ArchiveError::Database); the composer
/// treats both as warnings, never as export failures.
pub trait HistoryPersistence: Send + Sync {
    fn persist(&self, record: &ExportHistoryItem) -> Result<()>;
}

/// Append-only, shareable export history.
///
/// Clones share the same underlying log, so several sessions can append
/// concurrently.
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Arc<Mutex<Vec<ExportHistoryItem>>>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ledger with records loaded from storage, oldest first.
    pub fn from_records(records: Vec<ExportHistoryItem>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(records)),
        }
    }

    pub fn append(&self, record: ExportHistoryItem) {
        self.lock().push(record);
    }

    /// Copy of every record, oldest first.
    pub fn snapshot(&self) -> Vec<ExportHistoryItem> {
        self.lock().clone()
    }

    pub fn latest(&self) -> Option<ExportHistoryItem> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ExportHistoryItem>> {
        // Every write is a single push, so a poisoned log is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
