// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// archivestream-history — durable export history for ArchiveStream.

pub mod store;

pub use store::{SqliteHistoryStore, StoredExport};
