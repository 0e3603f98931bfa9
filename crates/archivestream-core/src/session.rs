// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Archive session — the mutable aggregate a front end edits between exports.
//
// Derived views (such as the search-filtered item list) are plain functions of
// the current state and are recomputed on every call.

use crate::config::ExportConfig;
use crate::error::Result;
use crate::history::HistoryLedger;
use crate::theme::{self, ColorSlot, GlobalTheme};
use crate::types::{ImageMode, ItemId, SourceItem};
use crate::watermark::WatermarkKind;

/// Ordered document set plus the styling choices for its next export.
#[derive(Debug, Clone)]
pub struct ArchiveSession {
    /// Items in display order; this order is the output page order.
    pub items: Vec<SourceItem>,
    pub search_query: String,
    pub watermark: WatermarkKind,
    pub theme: GlobalTheme,
    /// When false, images are embedded with the archival resample transform
    /// only; when true, the aggressive shrink transform is used.
    pub compress_enabled: bool,
    pub history: HistoryLedger,
}

impl Default for ArchiveSession {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            search_query: String::new(),
            watermark: WatermarkKind::None,
            theme: GlobalTheme::default(),
            compress_enabled: false,
            history: HistoryLedger::new(),
        }
    }
}

impl ArchiveSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items whose name contains the search query, case-insensitively.
    pub fn filtered_items(&self) -> Vec<&SourceItem> {
        let needle = self.search_query.to_lowercase();
        self.items
            .iter()
            .filter(|item| item.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn push(&mut self, item: SourceItem) {
        self.items.push(item);
    }

    /// Remove an item by id, returning it if present.
    pub fn remove(&mut self, id: &ItemId) -> Option<SourceItem> {
        let index = self.items.iter().position(|item| &item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Move the item at `from` so that it ends up at index `to`.
    ///
    /// Out-of-range indices leave the order untouched and return `false`.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        true
    }

    pub fn apply_preset(&mut self, preset_name: &str) {
        self.theme = theme::apply_preset(&self.theme, preset_name);
    }

    /// Change one theme colour. On malformed input the theme is unchanged.
    pub fn set_color(&mut self, slot: ColorSlot, hex: &str) -> Result<()> {
        self.theme = theme::update_theme_color(&self.theme, slot, hex)?;
        Ok(())
    }

    /// Configuration for exporting the session as it stands.
    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            image_mode: if self.compress_enabled {
                ImageMode::Shrink
            } else {
                ImageMode::Resample
            },
            watermark: self.watermark,
            theme: self.theme.clone(),
            ..ExportConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(names: &[&str]) -> ArchiveSession {
        let mut session = ArchiveSession::new();
        for name in names {
            session.push(SourceItem::chapter(*name, None));
        }
        session
    }

    fn names(session: &ArchiveSession) -> Vec<&str> {
        session.items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn filter_is_case_insensitive_and_recomputed() {
        let mut session = session_with(&["Annual Report", "Invoice", "report appendix"]);
        session.search_query = "REPORT".into();
        assert_eq!(session.filtered_items().len(), 2);

        session.search_query.clear();
        assert_eq!(session.filtered_items().len(), 3);
    }

    #[test]
    fn move_item_reorders() {
        let mut session = session_with(&["a", "b", "c"]);
        assert!(session.move_item(0, 2));
        assert_eq!(names(&session), ["b", "c", "a"]);
        assert!(!session.move_item(5, 0));
        assert_eq!(names(&session), ["b", "c", "a"]);
    }

    #[test]
    fn remove_by_id() {
        let mut session = session_with(&["a", "b"]);
        let id = session.items[0].id.clone();
        assert_eq!(session.remove(&id).map(|i| i.name), Some("a".to_string()));
        assert!(session.remove(&id).is_none());
    }

    #[test]
    fn bad_colour_keeps_theme() {
        let mut session = ArchiveSession::new();
        session.apply_preset("midnight");
        let before = session.theme.clone();
        assert!(session.set_color(ColorSlot::AccentColor, "lime").is_err());
        assert_eq!(session.theme, before);
    }

    #[test]
    fn export_config_reflects_session() {
        let mut session = ArchiveSession::new();
        session.compress_enabled = true;
        session.watermark = WatermarkKind::Approved;
        session.apply_preset("atelier");

        let config = session.export_config();
        assert_eq!(config.image_mode, ImageMode::Shrink);
        assert_eq!(config.watermark, WatermarkKind::Approved);
        assert_eq!(config.theme.font_family, "TimesRoman");
    }
}
