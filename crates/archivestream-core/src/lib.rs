// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ArchiveStream — core types, errors, theme and watermark catalogs, and the
// export history shared across all crates.

pub mod config;
pub mod error;
pub mod history;
pub mod human_errors;
pub mod session;
pub mod theme;
pub mod types;
pub mod watermark;

pub use config::ExportConfig;
pub use error::{ArchiveError, ItemFailure};
pub use history::{ExportHistoryItem, HistoryLedger, HistoryPersistence};
pub use session::ArchiveSession;
pub use theme::{ColorSlot, GlobalTheme, ThemeColor};
pub use types::*;
pub use watermark::{WatermarkKind, WatermarkStyle};
