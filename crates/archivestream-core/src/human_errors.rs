// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the export failure indicator.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how the UI presents the failure.

use crate::error::ArchiveError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Retrying the whole export may succeed.
    Transient,
    /// The user must change an input (replace a file, fix a colour).
    ActionRequired,
    /// The export itself succeeded; something secondary did not.
    Warning,
    /// Cannot be fixed by retrying.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the whole export is worthwhile.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert an `ArchiveError` into a `HumanError`.
pub fn humanize_error(err: &ArchiveError) -> HumanError {
    match err {
        ArchiveError::ImageDecode(_) => HumanError {
            message: "One of the images couldn't be read.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG and add it again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ArchiveError::RenderSurfaceUnavailable(_) => HumanError {
            message: "An image couldn't be prepared for the document.".into(),
            suggestion: "Try the export again. If it keeps failing, remove the image or replace it with a smaller copy.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ArchiveError::UnsupportedDocument(detail) => HumanError {
            message: "This type of document isn't supported.".into(),
            suggestion: format!("Convert the file to PDF first, then add it again. (File type: {detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        ArchiveError::PdfError(_) => HumanError {
            message: "There's a problem with one of the PDF files.".into(),
            suggestion: "The file may be damaged. Open it on a computer to check it works, or remove it from the list.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ArchiveError::ThemeHexMalformed(hex) => HumanError {
            message: "That colour isn't valid.".into(),
            suggestion: format!("Colours must look like #1a2b3c. (You entered: {hex})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ArchiveError::ExportFailed { failures } => {
            let names = failures
                .iter()
                .map(|f| f.item_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            HumanError {
                message: "The document couldn't be created.".into(),
                suggestion: format!("These items caused a problem: {names}. Replace or remove them, then export again."),
                retriable: false,
                severity: Severity::ActionRequired,
            }
        }

        ArchiveError::InvalidFileName(name) => HumanError {
            message: "The output file name can't be used.".into(),
            suggestion: format!("Choose a plain file name without slashes (you entered \"{name}\")."),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ArchiveError::ExportInProgress => HumanError {
            message: "An export is already running.".into(),
            suggestion: "Wait for the current export to finish, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ArchiveError::Cancelled => HumanError {
            message: "The export was cancelled.".into(),
            suggestion: "Start the export again whenever you're ready.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ArchiveError::PersistenceUnavailable(_) | ArchiveError::Database(_) => HumanError {
            message: "Your document was created, but it wasn't saved to your history.".into(),
            suggestion: "Check your connection. The file itself is fine.".into(),
            retriable: false,
            severity: Severity::Warning,
        },

        ArchiveError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try adding the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        ArchiveError::Serialization(_) => HumanError {
            message: "The settings file couldn't be read.".into(),
            suggestion: "Check the file is valid JSON, or delete it to start from the defaults.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
