// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the ArchiveStream composition pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a source item. Items loaded from the remote queue carry a
/// numeric database id, locally added items and chapters carry a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a source item, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Word,
    Image,
    Chapter,
}

/// Which pages of a paged source go into the output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "selectionType", content = "pageSelection", rename_all = "lowercase")]
pub enum PageSelectionSpec {
    #[default]
    All,
    /// A human-entered expression such as `"1, 3-5"`.
    Custom(String),
}

impl PageSelectionSpec {
    /// The expression handed to the page range resolver.
    pub fn expression(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Custom(expr) => expr,
        }
    }
}

/// How an image item is sized on its output page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ImageSizeMode {
    /// Native size at 150 DPI, shrunk only when it would overflow the page.
    #[default]
    Original,
    /// Scaled to fill the usable page area.
    Fit,
    /// Explicit size in points. A missing side follows the aspect ratio.
    Custom {
        width: Option<f32>,
        height: Option<f32>,
    },
}

/// Kind-specific payload of a source item.
#[derive(Debug, Clone)]
pub enum SourceContent {
    Pdf {
        bytes: Vec<u8>,
        /// Page count reported by the document-parsing collaborator.
        page_count: Option<u32>,
        selection: PageSelectionSpec,
    },
    /// A word-processor document, already rendered to PDF upstream.
    Word {
        pdf_bytes: Vec<u8>,
        page_count: Option<u32>,
        selection: PageSelectionSpec,
    },
    Image {
        bytes: Vec<u8>,
        mime_type: String,
        size_mode: ImageSizeMode,
    },
    /// Synthetic title page inserted by the caller.
    Chapter {
        title: String,
        description: Option<String>,
    },
}

/// One entry of the ordered list handed to the composer.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub id: ItemId,
    pub name: String,
    pub content: SourceContent,
}

impl SourceItem {
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>, page_count: Option<u32>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            content: SourceContent::Pdf {
                bytes,
                page_count,
                selection: PageSelectionSpec::All,
            },
        }
    }

    pub fn word(name: impl Into<String>, pdf_bytes: Vec<u8>, page_count: Option<u32>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            content: SourceContent::Word {
                pdf_bytes,
                page_count,
                selection: PageSelectionSpec::All,
            },
        }
    }

    pub fn image(name: impl Into<String>, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            content: SourceContent::Image {
                bytes,
                mime_type: mime_type.into(),
                size_mode: ImageSizeMode::Original,
            },
        }
    }

    pub fn chapter(title: impl Into<String>, description: Option<String>) -> Self {
        let title = title.into();
        Self {
            id: ItemId::new(),
            name: title.clone(),
            content: SourceContent::Chapter { title, description },
        }
    }

    /// Replace the item id (e.g. with the remote queue's row id).
    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the page selection. Has no effect on image and chapter items.
    pub fn with_selection(mut self, spec: PageSelectionSpec) -> Self {
        match &mut self.content {
            SourceContent::Pdf { selection, .. } | SourceContent::Word { selection, .. } => {
                *selection = spec;
            }
            SourceContent::Image { .. } | SourceContent::Chapter { .. } => {}
        }
        self
    }

    /// Set the image sizing mode. Has no effect on non-image items.
    pub fn with_size_mode(mut self, mode: ImageSizeMode) -> Self {
        if let SourceContent::Image { size_mode, .. } = &mut self.content {
            *size_mode = mode;
        }
        self
    }

    pub fn kind(&self) -> SourceKind {
        match self.content {
            SourceContent::Pdf { .. } => SourceKind::Pdf,
            SourceContent::Word { .. } => SourceKind::Word,
            SourceContent::Image { .. } => SourceKind::Image,
            SourceContent::Chapter { .. } => SourceKind::Chapter,
        }
    }
}

/// Standard paper sizes used for generated pages (chapters and images).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in PDF points (1/72 inch).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (w as f32 * 72.0 / 25.4, h as f32 * 72.0 / 25.4)
    }
}

/// Which image transform the composer applies to image items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// Long edge capped at 1200 px (archival quality).
    #[default]
    Resample,
    /// Width capped at `max_width` (aggressive size reduction).
    Shrink,
}
