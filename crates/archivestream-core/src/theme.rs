// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Theme engine — the default theme, named presets, and colour edits.
//
// Colours are stored twice (hex string and decomposed channels). Every
// constructor and every edit derives the channels from the hex in the same
// step, so the two representations cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

/// An sRGB colour kept as `#RRGGBB` plus its 8-bit channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColor {
    pub hex: String,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ThemeColor {
    /// Parse a `#RRGGBB` string. The hex text is kept exactly as given.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex
            .strip_prefix('#')
            .filter(|d| d.len() == 6 && d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| ArchiveError::ThemeHexMalformed(hex.to_string()))?;

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| ArchiveError::ThemeHexMalformed(hex.to_string()))
        };

        Ok(Self {
            hex: hex.to_string(),
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Channels scaled to 0.0..=1.0 for PDF colour operators.
    pub fn as_unit_rgb(&self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }

    fn fixed(hex: &str, r: u8, g: u8, b: u8) -> Self {
        Self {
            hex: hex.to_string(),
            r,
            g,
            b,
        }
    }
}

/// Which colour of the theme an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorSlot {
    PrimaryColor,
    AccentColor,
}

/// Visual styling applied to generated pages of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalTheme {
    pub preset: String,
    pub font_family: String,
    pub primary_color: ThemeColor,
    pub accent_color: ThemeColor,
    pub chapter_font_size: f32,
    pub body_font_size: f32,
    pub line_height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_url: Option<String>,
}

impl Default for GlobalTheme {
    fn default() -> Self {
        default_theme()
    }
}

/// The canonical starting theme.
pub fn default_theme() -> GlobalTheme {
    GlobalTheme {
        preset: "corporate".to_string(),
        font_family: "Helvetica".to_string(),
        primary_color: ThemeColor::fixed("#000000", 0, 0, 0),
        accent_color: ThemeColor::fixed("#FFFFFF", 255, 255, 255),
        chapter_font_size: 32.0,
        body_font_size: 11.0,
        line_height: 16.0,
        custom_file_name: None,
        qr_url: None,
    }
}

/// Font, colours and sizes a preset overwrites.
struct PresetStyle {
    font_family: &'static str,
    primary: (&'static str, u8, u8, u8),
    accent: (&'static str, u8, u8, u8),
    chapter_font_size: f32,
    body_font_size: f32,
}

fn preset_style(name: &str) -> Option<PresetStyle> {
    let style = match name {
        "corporate" | "default" => PresetStyle {
            font_family: "Helvetica",
            primary: ("#000000", 0, 0, 0),
            accent: ("#FFFFFF", 255, 255, 255),
            chapter_font_size: 32.0,
            body_font_size: 11.0,
        },
        "atelier" => PresetStyle {
            font_family: "TimesRoman",
            primary: ("#78716c", 120, 113, 108),
            accent: ("#fafaf9", 250, 250, 249),
            chapter_font_size: 40.0,
            body_font_size: 12.0,
        },
        "midnight" => PresetStyle {
            font_family: "Courier",
            primary: ("#09090b", 9, 9, 11),
            accent: ("#d9f99d", 217, 249, 157),
            chapter_font_size: 36.0,
            body_font_size: 10.0,
        },
        "brutalist" => PresetStyle {
            font_family: "Helvetica",
            primary: ("#000000", 0, 0, 0),
            accent: ("#ff3e00", 255, 62, 0),
            chapter_font_size: 48.0,
            body_font_size: 11.0,
        },
        _ => return None,
    };
    Some(style)
}

/// Return a copy of `theme` restyled by the named preset.
///
/// Line height, custom file name and QR URL always carry over. An unknown
/// preset name only replaces the `preset` field.
pub fn apply_preset(theme: &GlobalTheme, preset_name: &str) -> GlobalTheme {
    let mut updated = GlobalTheme {
        preset: preset_name.to_string(),
        ..theme.clone()
    };

    if let Some(style) = preset_style(preset_name) {
        let (hex, r, g, b) = style.primary;
        updated.primary_color = ThemeColor::fixed(hex, r, g, b);
        let (hex, r, g, b) = style.accent;
        updated.accent_color = ThemeColor::fixed(hex, r, g, b);
        updated.font_family = style.font_family.to_string();
        updated.chapter_font_size = style.chapter_font_size;
        updated.body_font_size = style.body_font_size;
    } else {
        tracing::debug!(preset = preset_name, "unknown preset, styling left unchanged");
    }

    updated
}

/// Return a copy of `theme` with one colour slot replaced by `hex`.
///
/// Fails with [`ArchiveError::ThemeHexMalformed`] unless `hex` is `#RRGGBB`.
pub fn update_theme_color(theme: &GlobalTheme, slot: ColorSlot, hex: &str) -> Result<GlobalTheme> {
    let color = ThemeColor::from_hex(hex)?;
    let mut updated = theme.clone();
    match slot {
        ColorSlot::PrimaryColor => updated.primary_color = color,
        ColorSlot::AccentColor => updated.accent_color = color,
    }
    Ok(updated)
}
