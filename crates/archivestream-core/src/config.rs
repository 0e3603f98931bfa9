// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::theme::GlobalTheme;
use crate::types::{ImageMode, PaperSize};
use crate::watermark::WatermarkKind;

/// Default width cap for [`ImageMode::Shrink`].
pub const DEFAULT_MAX_WIDTH: u32 = 1600;
/// JPEG quality used by [`ImageMode::Resample`].
pub const RESAMPLE_QUALITY: f32 = 0.7;
/// Default JPEG quality used by [`ImageMode::Shrink`].
pub const SHRINK_QUALITY: f32 = 0.75;

/// Settings consumed by the composer for one export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Transform applied to image items.
    pub image_mode: ImageMode,
    /// Width cap for the shrink transform.
    pub max_width: u32,
    /// Encoder quality (0.0–1.0). When unset, the mode's default is used.
    pub quality: Option<f32>,
    /// Overlay stamped on every page.
    pub watermark: WatermarkKind,
    /// Styling for generated pages and the output name.
    pub theme: GlobalTheme,
    /// Size of generated pages (chapters and images).
    pub paper_size: PaperSize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            image_mode: ImageMode::Resample,
            max_width: DEFAULT_MAX_WIDTH,
            quality: None,
            watermark: WatermarkKind::None,
            theme: GlobalTheme::default(),
            paper_size: PaperSize::A4,
        }
    }
}

impl ExportConfig {
    /// Quality actually handed to the encoder, clamped to 0.0–1.0.
    pub fn effective_quality(&self) -> f32 {
        let default = match self.image_mode {
            ImageMode::Resample => RESAMPLE_QUALITY,
            ImageMode::Shrink => SHRINK_QUALITY,
        };
        self.quality.unwrap_or(default).clamp(0.0, 1.0)
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }
}
