// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark catalog — static overlay styles keyed by watermark kind.

use serde::{Deserialize, Serialize};

/// Overlay applied uniformly to every page of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatermarkKind {
    #[default]
    None,
    Draft,
    Confidential,
    Approved,
}

/// Text and fill opacity of a watermark overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkStyle {
    pub text: &'static str,
    pub opacity: f32,
}

const WATERMARK_OPACITY: f32 = 0.3;

static DRAFT: WatermarkStyle = WatermarkStyle {
    text: "DRAFT",
    opacity: WATERMARK_OPACITY,
};
static CONFIDENTIAL: WatermarkStyle = WatermarkStyle {
    text: "CONFIDENTIAL",
    opacity: WATERMARK_OPACITY,
};
static APPROVED: WatermarkStyle = WatermarkStyle {
    text: "APPROVED",
    opacity: WATERMARK_OPACITY,
};

impl WatermarkKind {
    /// Style for this kind; `None` for [`WatermarkKind::None`], which means
    /// no overlay at all.
    pub fn style(self) -> Option<&'static WatermarkStyle> {
        match self {
            Self::None => None,
            Self::Draft => Some(&DRAFT),
            Self::Confidential => Some(&CONFIDENTIAL),
            Self::Approved => Some(&APPROVED),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Draft => "DRAFT",
            Self::Confidential => "CONFIDENTIAL",
            Self::Approved => "APPROVED",
        }
    }
}

impl std::str::FromStr for WatermarkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "DRAFT" => Ok(Self::Draft),
            "CONFIDENTIAL" => Ok(Self::Confidential),
            "APPROVED" => Ok(Self::Approved),
            other => Err(format!("unknown watermark kind: {other}")),
        }
    }
}
