// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for ArchiveStream.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One source item that could not be prepared during an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item_id: String,
    pub item_name: String,
    pub reason: String,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.item_name, self.item_id, self.reason)
    }
}

/// Top-level error type for all ArchiveStream operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    // -- Image errors --
    #[error("image decode failed: {0}")]
    ImageDecode(String),

    #[error("render surface unavailable: {0}")]
    RenderSurfaceUnavailable(String),

    // -- Document errors --
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    // -- Theme errors --
    #[error("malformed theme colour {0:?} (expected #RRGGBB)")]
    ThemeHexMalformed(String),

    // -- Export orchestration --
    #[error("export failed for {} item(s): {}", .failures.len(), join_failures(.failures))]
    ExportFailed { failures: Vec<ItemFailure> },

    #[error("invalid output file name {0:?}: path separators are not allowed")]
    InvalidFileName(String),

    #[error("an export is already running for this document set")]
    ExportInProgress,

    #[error("export cancelled")]
    Cancelled,

    // -- Storage / persistence --
    #[error("history persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn join_failures(failures: &[ItemFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ArchiveError>;
