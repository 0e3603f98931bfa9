// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading sources, generating chapter pages, assembling the
// output and stamping it.

pub mod assembler;
pub mod reader;
pub mod stamp;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_support;

pub use assembler::OutputDocument;
pub use reader::SourcePdf;
pub use writer::ChapterWriter;
