// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export manifest — the JSON list of source files handed to the CLI.
//
// {
//   "items": [
//     { "type": "chapter", "title": "Part I", "description": "Letters" },
//     { "type": "pdf", "path": "letters.pdf", "pages": "2-3" },
//     { "type": "word", "path": "report.docx", "rendition": "report.pdf" },
//     { "type": "image", "path": "scan.jpg", "sizeMode": { "mode": "fit" } }
//   ]
// }
//
// Relative paths resolve against the manifest's directory.

use std::path::{Path, PathBuf};

use archivestream_core::error::{ArchiveError, Result};
use archivestream_core::types::{ImageSizeMode, PageSelectionSpec, SourceItem};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub items: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ManifestEntry {
    Pdf {
        path: PathBuf,
        #[serde(default)]
        pages: Option<String>,
        #[serde(default, rename = "pageCount")]
        page_count: Option<u32>,
    },
    Word {
        path: PathBuf,
        /// PDF rendition of the document, produced by an external converter.
        #[serde(default)]
        rendition: Option<PathBuf>,
        #[serde(default)]
        pages: Option<String>,
        #[serde(default, rename = "pageCount")]
        page_count: Option<u32>,
    },
    Image {
        path: PathBuf,
        #[serde(default, rename = "mimeType")]
        mime_type: Option<String>,
        #[serde(default, rename = "sizeMode")]
        size_mode: ImageSizeMode,
    },
    Chapter {
        title: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Read every referenced file and build the ordered item list.
    pub fn into_items(self, base_dir: &Path) -> Result<Vec<SourceItem>> {
        self.items
            .into_iter()
            .map(|entry| entry.into_item(base_dir))
            .collect()
    }
}

impl ManifestEntry {
    fn into_item(self, base_dir: &Path) -> Result<SourceItem> {
        let item = match self {
            Self::Pdf {
                path,
                pages,
                page_count,
            } => {
                let bytes = std::fs::read(base_dir.join(&path))?;
                SourceItem::pdf(file_name(&path), bytes, page_count).with_selection(selection(pages))
            }
            Self::Word {
                path,
                rendition,
                pages,
                page_count,
            } => {
                let rendition = rendition.unwrap_or_else(|| path.clone());
                let pdf_bytes = std::fs::read(base_dir.join(&rendition))?;
                if !pdf_bytes.starts_with(b"%PDF") {
                    return Err(ArchiveError::UnsupportedDocument(format!(
                        "{} has no PDF rendition",
                        path.display()
                    )));
                }
                SourceItem::word(file_name(&path), pdf_bytes, page_count).with_selection(selection(pages))
            }
            Self::Image {
                path,
                mime_type,
                size_mode,
            } => {
                let bytes = std::fs::read(base_dir.join(&path))?;
                let mime_type = mime_type.unwrap_or_else(|| mime_from_extension(&path).to_string());
                SourceItem::image(file_name(&path), bytes, mime_type).with_size_mode(size_mode)
            }
            Self::Chapter { title, description } => SourceItem::chapter(title, description),
        };
        debug!(name = %item.name, kind = ?item.kind(), "manifest item loaded");
        Ok(item)
    }
}

fn selection(pages: Option<String>) -> PageSelectionSpec {
    match pages {
        Some(expr) if !expr.trim().eq_ignore_ascii_case("all") => PageSelectionSpec::Custom(expr),
        _ => PageSelectionSpec::All,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
