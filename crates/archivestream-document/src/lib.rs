// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// archivestream-document — the document composition pipeline.
//
// Resolves page selections, optimizes images, renders themed chapter pages,
// merges everything into one PDF, stamps watermark and metadata, and records
// the export in the history ledger.

pub mod compose;
pub mod image;
pub mod pdf;
pub mod selection;

// Re-export the primary entry points so callers can use `archivestream_document::Composer` etc.
pub use compose::{Composer, ExportOutcome, ExportProgress, ExportStage};
pub use crate::image::{ImageOptimizer, OptimizedImage};
pub use pdf::{ChapterWriter, OutputDocument, SourcePdf};
pub use selection::PageSelection;
