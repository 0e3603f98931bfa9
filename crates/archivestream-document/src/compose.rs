// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Composer — runs one export from an ordered list of source items to a single
// stamped PDF and its history record.
//
// Stages: Idle -> Resolving -> Optimizing -> Merging -> Stamping -> Done, or
// Failed from any stage. Image optimization runs on the blocking pool and
// merging starts only after every optimization task has joined.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tokio::task::{self, JoinSet};
use tracing::{debug, info, instrument, warn};

use archivestream_core::config::ExportConfig;
use archivestream_core::error::{ArchiveError, ItemFailure, Result};
use archivestream_core::history::{ExportHistoryItem, HistoryLedger, HistoryPersistence};
use archivestream_core::theme::GlobalTheme;
use archivestream_core::types::{ImageMode, ImageSizeMode, SourceContent, SourceItem};

use crate::image::{ImageOptimizer, OptimizedImage};
use crate::pdf::assembler::OutputDocument;
use crate::pdf::reader::SourcePdf;
use crate::pdf::stamp::{apply_watermark, stamp_metadata};
use crate::pdf::writer::ChapterWriter;
use crate::selection::PageSelection;

/// Where an export currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    #[default]
    Idle,
    Resolving,
    Optimizing,
    Merging,
    Stamping,
    Done,
    Failed,
}

/// Snapshot published on the progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ExportProgress {
    pub stage: ExportStage,
    /// 0.0 to 1.0, never decreasing within one export.
    pub fraction: f32,
}

/// Result of a successful export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub bytes: Vec<u8>,
    pub record: ExportHistoryItem,
    pub page_count: usize,
    /// Hex SHA-256 of `bytes`.
    pub sha256: String,
    /// Non-fatal problems, e.g. history persistence being unavailable.
    pub warnings: Vec<String>,
}

/// Output file name: the theme's custom name (with `.pdf` appended when
/// missing) or `ArchiveStream_<UTC timestamp>.pdf`.
pub fn output_file_name(theme: &GlobalTheme, at: DateTime<Utc>) -> String {
    match theme.custom_file_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            if name.to_ascii_lowercase().ends_with(".pdf") {
                name.to_string()
            } else {
                format!("{name}.pdf")
            }
        }
        _ => format!("ArchiveStream_{}.pdf", at.format("%Y%m%dT%H%M%SZ")),
    }
}

/// Reject custom output names that would escape the output directory.
fn check_file_name(theme: &GlobalTheme) -> Result<()> {
    match theme.custom_file_name.as_deref() {
        Some(name) if name.contains(['/', '\\', '\0']) => Err(ArchiveError::InvalidFileName(name.to_string())),
        _ => Ok(()),
    }
}

/// A source item after resolution, before merging.
enum Prepared {
    Pages {
        source: SourcePdf,
        selection: PageSelection,
    },
    Image {
        size_mode: ImageSizeMode,
    },
    Chapter {
        title: String,
        description: Option<String>,
    },
}

/// Clears the busy and cancel flags when an export ends, however it ends.
struct BusyGuard<'a> {
    busy: &'a AtomicBool,
    cancelled: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.cancelled.store(false, Ordering::SeqCst);
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Runs exports one at a time.
pub struct Composer {
    config: ExportConfig,
    ledger: HistoryLedger,
    persistence: Option<Arc<dyn HistoryPersistence>>,
    busy: AtomicBool,
    cancelled: Arc<AtomicBool>,
    progress: watch::Sender<ExportProgress>,
    #[cfg(test)]
    published: std::sync::Mutex<Vec<ExportProgress>>,
}

impl Composer {
    pub fn new(config: ExportConfig) -> Self {
        let (progress, _) = watch::channel(ExportProgress::default());
        Self {
            config,
            ledger: HistoryLedger::new(),
            persistence: None,
            busy: AtomicBool::new(false),
            cancelled: Arc::new(AtomicBool::new(false)),
            progress,
            #[cfg(test)]
            published: std::sync::Mutex::default(),
        }
    }

    /// Append records to `ledger` (shared with the caller) instead of a
    /// private one.
    pub fn with_ledger(mut self, ledger: HistoryLedger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Hand every record to `persistence` after it is appended.
    pub fn with_persistence(mut self, persistence: Arc<dyn HistoryPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ExportConfig) {
        self.config = config;
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Observe progress of the running (or last) export.
    pub fn subscribe(&self) -> watch::Receiver<ExportProgress> {
        self.progress.subscribe()
    }

    /// Ask the running export to stop at its next checkpoint. A request made
    /// while idle applies to the next export.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Handle that cancels exports from another task.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Compose `items`, in order, into one PDF.
    #[instrument(skip_all, fields(items = items.len(), watermark = self.config.watermark.as_str()))]
    pub async fn export(&self, items: &[SourceItem]) -> Result<ExportOutcome> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("export requested while another is running");
            return Err(ArchiveError::ExportInProgress);
        }
        let _guard = BusyGuard {
            busy: &self.busy,
            cancelled: &self.cancelled,
        };

        self.progress.send_replace(ExportProgress::default());
        let result = self.run(items).await;
        if let Err(err) = &result {
            warn!(%err, "export failed");
            self.progress.send_replace(ExportProgress {
                stage: ExportStage::Failed,
                fraction: 0.0,
            });
        }
        result
    }

    async fn run(&self, items: &[SourceItem]) -> Result<ExportOutcome> {
        let total = items.len().max(1) as f32;

        // -- Resolving ---------------------------------------------------------
        self.advance(ExportStage::Resolving, 0.0);
        check_file_name(&self.config.theme)?;
        let mut prepared = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            self.checkpoint()?;
            prepared.push(resolve_item(item)?);
            self.advance(ExportStage::Resolving, 0.1 * (index + 1) as f32 / total);
        }

        // -- Optimizing --------------------------------------------------------
        self.advance(ExportStage::Optimizing, 0.1);
        let mut images = self.optimize_images(items).await?;

        // -- Merging -----------------------------------------------------------
        self.advance(ExportStage::Merging, 0.6);
        let paper = self.config.paper_size;
        let writer = ChapterWriter::new(paper);
        let mut output = OutputDocument::new();
        for (index, slot) in prepared.into_iter().enumerate() {
            self.checkpoint()?;
            match slot {
                Prepared::Pages { source, selection } => {
                    output.append_selection(&source, &selection).map_err(|err| {
                        ArchiveError::PdfError(format!("{}: {err}", items[index].name))
                    })?;
                }
                Prepared::Image { size_mode } => {
                    let image = images.remove(&index).ok_or_else(|| {
                        ArchiveError::RenderSurfaceUnavailable(format!(
                            "{}: optimized image missing",
                            items[index].name
                        ))
                    })?;
                    output.append_image(&image, size_mode, paper)?;
                }
                Prepared::Chapter { title, description } => {
                    let page = writer.chapter_page(&title, description.as_deref(), &self.config.theme);
                    output.append_pdf(&page)?;
                }
            }
            self.advance(ExportStage::Merging, 0.6 + 0.3 * (index + 1) as f32 / total);
        }

        // -- Stamping ----------------------------------------------------------
        self.checkpoint()?;
        self.advance(ExportStage::Stamping, 0.95);
        let page_ids = output.page_ids().to_vec();
        if let Some(style) = self.config.watermark.style() {
            apply_watermark(output.document_mut(), &page_ids, style)?;
        }
        stamp_metadata(output.document_mut(), self.config.image_mode == ImageMode::Shrink);
        let bytes = output.to_bytes()?;

        // -- Done --------------------------------------------------------------
        let now = Utc::now();
        let name = output_file_name(&self.config.theme, now);
        let record = ExportHistoryItem::new(name.clone(), now, name);
        let sha256 = hex::encode(Sha256::digest(&bytes));

        self.ledger.append(record.clone());
        let mut warnings = Vec::new();
        if let Some(persistence) = &self.persistence
            && let Err(err) = persistence.persist(&record)
        {
            warn!(%err, name = %record.name, "history record not persisted");
            warnings.push(format!("history not saved: {err}"));
        }

        self.advance(ExportStage::Done, 1.0);
        info!(
            name = %record.name,
            pages = page_ids.len(),
            bytes = bytes.len(),
            sha256 = %sha256,
            "export complete"
        );

        Ok(ExportOutcome {
            bytes,
            record,
            page_count: page_ids.len(),
            sha256,
            warnings,
        })
    }

    /// Optimize every image item concurrently. Returns optimized images keyed
    /// by item index, or every failure at once.
    async fn optimize_images(&self, items: &[SourceItem]) -> Result<HashMap<usize, OptimizedImage>> {
        let mode = self.config.image_mode;
        let max_width = self.config.max_width;
        let quality = self.config.effective_quality();

        let mut tasks = JoinSet::new();
        let mut task_items = HashMap::new();
        for (index, item) in items.iter().enumerate() {
            if let SourceContent::Image {
                bytes, mime_type, ..
            } = &item.content
            {
                let (bytes, mime_type) = (bytes.clone(), mime_type.clone());
                let handle = tasks.spawn_blocking(move || match mode {
                    ImageMode::Resample => ImageOptimizer::resample_with_quality(&bytes, &mime_type, quality),
                    ImageMode::Shrink => ImageOptimizer::shrink(&bytes, &mime_type, max_width, quality),
                });
                task_items.insert(handle.id(), index);
            }
        }

        self.collect_images(items, tasks, &task_items).await
    }

    /// Join every optimization task. `task_items` maps each task to the
    /// index of the item it works on.
    async fn collect_images(
        &self,
        items: &[SourceItem],
        mut tasks: JoinSet<Result<OptimizedImage>>,
        task_items: &HashMap<task::Id, usize>,
    ) -> Result<HashMap<usize, OptimizedImage>> {
        let pending = tasks.len().max(1) as f32;
        let mut images = HashMap::new();
        let mut failures: Vec<(usize, ItemFailure)> = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            if self.cancelled.load(Ordering::SeqCst) {
                tasks.abort_all();
                return Err(ArchiveError::Cancelled);
            }
            let (id, result) = match joined {
                Ok((id, result)) => (id, result.map_err(|err| err.to_string())),
                Err(join_err) => {
                    warn!(%join_err, "image optimization task did not complete");
                    (
                        join_err.id(),
                        Err(format!("optimization task did not complete: {join_err}")),
                    )
                }
            };
            let index = *task_items.get(&id).ok_or_else(|| {
                ArchiveError::RenderSurfaceUnavailable(format!("optimization task {id} has no item"))
            })?;
            match result {
                Ok(image) => {
                    images.insert(index, image);
                }
                Err(reason) => failures.push((index, failure(&items[index], &reason))),
            }
            let done = (images.len() + failures.len()) as f32;
            self.advance(ExportStage::Optimizing, 0.1 + 0.5 * done / pending);
        }

        if !failures.is_empty() {
            failures.sort_by_key(|(index, _)| *index);
            return Err(ArchiveError::ExportFailed {
                failures: failures.into_iter().map(|(_, f)| f).collect(),
            });
        }

        debug!(optimized = images.len(), "all images optimized");
        Ok(images)
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            debug!("cancellation observed");
            return Err(ArchiveError::Cancelled);
        }
        Ok(())
    }

    /// Publish progress, never moving the fraction backwards.
    fn advance(&self, stage: ExportStage, fraction: f32) {
        self.progress.send_modify(|progress| {
            progress.stage = stage;
            progress.fraction = progress.fraction.max(fraction.clamp(0.0, 1.0));
        });
        #[cfg(test)]
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(*self.progress.borrow());
    }
}

fn failure(item: &SourceItem, reason: &str) -> ItemFailure {
    ItemFailure {
        item_id: item.id.to_string(),
        item_name: item.name.clone(),
        reason: reason.to_string(),
    }
}

/// Parse paged sources and resolve their selections.
fn resolve_item(item: &SourceItem) -> Result<Prepared> {
    let prepared = match &item.content {
        SourceContent::Pdf {
            bytes,
            page_count,
            selection,
        }
        | SourceContent::Word {
            pdf_bytes: bytes,
            page_count,
            selection,
        } => {
            let source = SourcePdf::from_bytes(bytes)
                .map_err(|err| ArchiveError::PdfError(format!("{}: {err}", item.name)))?;
            let actual = source.page_count();
            let page_count = match *page_count {
                Some(claimed) if claimed > actual => {
                    warn!(item = %item.name, claimed, actual, "page count exceeds document, clamping");
                    actual
                }
                Some(claimed) => claimed,
                None => actual,
            };
            let selection = PageSelection::resolve(selection.expression(), page_count);
            debug!(item = %item.name, page_count, selected = selection.len(), "selection resolved");
            Prepared::Pages { source, selection }
        }
        SourceContent::Image { size_mode, .. } => Prepared::Image {
            size_mode: *size_mode,
        },
        SourceContent::Chapter { title, description } => Prepared::Chapter {
            title: title.clone(),
            description: description.clone(),
        },
    };
    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use archivestream_core::theme::{apply_preset, default_theme};
    use archivestream_core::types::PageSelectionSpec;
    use archivestream_core::watermark::WatermarkKind;
    use lopdf::{Document, Object};

    use crate::pdf::test_support::{numbered_pdf, page_text, solid_png};

    fn brutalist_draft() -> ExportConfig {
        ExportConfig {
            watermark: WatermarkKind::Draft,
            theme: apply_preset(&default_theme(), "brutalist"),
            ..ExportConfig::default()
        }
    }

    fn end_to_end_items() -> Vec<SourceItem> {
        vec![
            SourceItem::chapter("Part I", Some("Correspondence".to_string())),
            SourceItem::pdf("letters.pdf", numbered_pdf(5), Some(5))
                .with_selection(PageSelectionSpec::Custom("2-3".to_string())),
            SourceItem::image("photo.png", solid_png(640, 480), "image/png"),
        ]
    }

    #[derive(Default)]
    struct RecordingStore {
        records: Mutex<Vec<ExportHistoryItem>>,
    }

    impl HistoryPersistence for RecordingStore {
        fn persist(&self, record: &ExportHistoryItem) -> Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct OfflineStore;

    impl HistoryPersistence for OfflineStore {
        fn persist(&self, _record: &ExportHistoryItem) -> Result<()> {
            Err(ArchiveError::PersistenceUnavailable("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn end_to_end_export() {
        let started = Utc::now();
        let composer = Composer::new(brutalist_draft());
        let outcome = composer.export(&end_to_end_items()).await.unwrap();

        assert_eq!(outcome.page_count, 4);
        let doc = Document::load_mem(&outcome.bytes).unwrap();
        let pages: Vec<_> = doc.get_pages().into_values().collect();
        assert_eq!(pages.len(), 4);

        let chapter = page_text(&doc, pages[0]);
        assert!(chapter.contains("(Part I)"));
        assert!(chapter.contains("(Correspondence)"));
        assert!(chapter.contains("0 0 0 rg"), "brutalist primary fill");
        assert!(chapter.contains("1 0.24313726 0 rg"), "brutalist accent fill");

        assert!(page_text(&doc, pages[1]).contains("Source page 2"));
        assert!(page_text(&doc, pages[2]).contains("Source page 3"));

        let image_page = doc.get_dictionary(pages[3]).unwrap();
        let resources = image_page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(image.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");

        for page_id in &pages {
            assert!(page_text(&doc, *page_id).contains("(DRAFT)"));
        }
        let opacity_set = doc.objects.values().any(|object| match object {
            Object::Dictionary(dict) => {
                dict.get(b"Type").and_then(Object::as_name).ok() == Some(b"ExtGState".as_slice())
                    && dict.get(b"ca").and_then(Object::as_float).ok() == Some(0.3)
            }
            _ => false,
        });
        assert!(opacity_set);

        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        assert_eq!(
            info.get(b"Producer").unwrap().as_str().unwrap(),
            b"ArchiveStream (Atelier Engine)"
        );

        assert_eq!(composer.ledger().len(), 1);
        let record = composer.ledger().latest().unwrap();
        assert!(record.timestamp().unwrap() >= started);
        assert_eq!(record, outcome.record);
        assert_eq!(outcome.sha256.len(), 64);

        let progress = *composer.subscribe().borrow();
        assert_eq!(progress.stage, ExportStage::Done);
        assert_eq!(progress.fraction, 1.0);
        assert!(!composer.is_busy());
    }

    #[tokio::test]
    async fn failing_images_are_all_reported() {
        let composer = Composer::new(ExportConfig::default());
        let items = vec![
            SourceItem::image("broken-a.png", b"nope".to_vec(), "image/png").with_id("a"),
            SourceItem::pdf("fine.pdf", numbered_pdf(1), None),
            SourceItem::image("broken-b.jpg", vec![0xff, 0xd8, 0x00], "image/jpeg").with_id("b"),
        ];

        let err = composer.export(&items).await.unwrap_err();
        let ArchiveError::ExportFailed { failures } = err else {
            panic!("expected ExportFailed");
        };
        let ids: Vec<_> = failures.iter().map(|f| f.item_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        assert!(composer.ledger().is_empty());
        let progress = *composer.subscribe().borrow();
        assert_eq!(progress.stage, ExportStage::Failed);
        assert_eq!(progress.fraction, 0.0);
    }

    #[tokio::test]
    async fn progress_never_moves_backwards() {
        let composer = Composer::new(ExportConfig::default());
        let items = vec![
            SourceItem::chapter("Intro", None),
            SourceItem::image("a.png", solid_png(64, 48), "image/png"),
            SourceItem::pdf("b.pdf", numbered_pdf(2), None),
            SourceItem::image("c.png", solid_png(32, 32), "image/png"),
        ];
        composer.export(&items).await.unwrap();

        let published = composer.published.lock().unwrap().clone();
        assert!(published.windows(2).all(|w| w[0].fraction <= w[1].fraction));
        assert!(published.windows(2).all(|w| w[0].stage as u8 <= w[1].stage as u8));
        for stage in [
            ExportStage::Resolving,
            ExportStage::Optimizing,
            ExportStage::Merging,
            ExportStage::Stamping,
            ExportStage::Done,
        ] {
            assert!(published.iter().any(|p| p.stage == stage), "{stage:?} not published");
        }
        let mut fractions: Vec<f32> = published.iter().map(|p| p.fraction).collect();
        fractions.dedup();
        assert!(fractions.len() > 5, "intermediate progress missing: {fractions:?}");
        assert_eq!(published.last().map(|p| p.fraction), Some(1.0));
    }

    #[tokio::test]
    async fn shrink_mode_caps_embedded_width() {
        let config = ExportConfig {
            image_mode: ImageMode::Shrink,
            ..ExportConfig::default()
        };
        let max_width = config.max_width;
        let composer = Composer::new(config);
        let items = vec![SourceItem::image("panorama.png", solid_png(3200, 400), "image/png")];
        let outcome = composer.export(&items).await.unwrap();

        let doc = Document::load_mem(&outcome.bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let resources = doc.get_dictionary(page_id).unwrap().get(b"Resources").unwrap().as_dict().unwrap();
        let image_id = resources
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Im0")
            .unwrap()
            .as_reference()
            .unwrap();
        let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), i64::from(max_width));
        assert_eq!(image.dict.get(b"Height").unwrap().as_i64().unwrap(), 200);
    }

    #[tokio::test]
    async fn panicked_optimization_names_its_item() {
        let composer = Composer::new(ExportConfig::default());
        let items = vec![
            SourceItem::image("fine.png", solid_png(8, 8), "image/png").with_id("fine"),
            SourceItem::image("crash.png", solid_png(8, 8), "image/png").with_id("crash"),
        ];

        let mut tasks = JoinSet::new();
        let mut task_items = HashMap::new();
        let png = solid_png(8, 8);
        let handle = tasks.spawn_blocking(move || ImageOptimizer::resample(&png, "image/png"));
        task_items.insert(handle.id(), 0);
        let handle = tasks.spawn_blocking(|| -> Result<OptimizedImage> { panic!("decoder crashed") });
        task_items.insert(handle.id(), 1);

        let err = composer.collect_images(&items, tasks, &task_items).await.unwrap_err();
        let ArchiveError::ExportFailed { failures } = err else {
            panic!("expected ExportFailed");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].item_id, "crash");
        assert_eq!(failures[0].item_name, "crash.png");
    }

    #[tokio::test]
    async fn oversized_page_count_is_clamped() {
        let composer = Composer::new(ExportConfig::default());
        let items = vec![SourceItem::pdf("short.pdf", numbered_pdf(3), Some(4_000_000_000))];
        let outcome = composer.export(&items).await.unwrap();
        assert_eq!(outcome.page_count, 3);
    }

    #[tokio::test]
    async fn custom_name_with_path_separator_is_rejected() {
        let mut config = ExportConfig::default();
        config.theme.custom_file_name = Some("../escape".to_string());
        let composer = Composer::new(config);
        let err = composer.export(&[SourceItem::chapter("One", None)]).await.unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidFileName(_)));
        assert!(composer.ledger().is_empty());
    }

    #[tokio::test]
    async fn busy_composer_rejects_second_export() {
        let composer = Composer::new(ExportConfig::default());
        composer.busy.store(true, Ordering::SeqCst);
        let err = composer.export(&[]).await.unwrap_err();
        assert!(matches!(err, ArchiveError::ExportInProgress));
        // The rejected call must not release the running export's flag.
        assert!(composer.is_busy());
    }

    #[tokio::test]
    async fn cancellation_stops_export_and_resets() {
        let composer = Composer::new(ExportConfig::default());
        composer.cancel();
        let items = vec![SourceItem::pdf("a.pdf", numbered_pdf(2), None)];
        assert!(matches!(composer.export(&items).await, Err(ArchiveError::Cancelled)));

        // The flag is consumed; the next export runs normally.
        let outcome = composer.export(&items).await.unwrap();
        assert_eq!(outcome.page_count, 2);
    }

    #[tokio::test]
    async fn missing_page_count_uses_document_count() {
        let composer = Composer::new(ExportConfig::default());
        let items = vec![
            SourceItem::word("report.docx", numbered_pdf(3), None)
                .with_selection(PageSelectionSpec::Custom("2-99".to_string())),
        ];
        let outcome = composer.export(&items).await.unwrap();
        assert_eq!(outcome.page_count, 2);
    }

    #[tokio::test]
    async fn persistence_success_and_failure() {
        let store = Arc::new(RecordingStore::default());
        let composer = Composer::new(ExportConfig::default()).with_persistence(store.clone());
        let items = vec![SourceItem::chapter("Only", None)];
        let outcome = composer.export(&items).await.unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(store.records.lock().unwrap().as_slice(), &[outcome.record.clone()]);

        let offline = Composer::new(ExportConfig::default()).with_persistence(Arc::new(OfflineStore));
        let outcome = offline.export(&items).await.unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(offline.ledger().len(), 1);
    }

    #[tokio::test]
    async fn shared_ledger_collects_every_export() {
        let ledger = HistoryLedger::new();
        let composer = Composer::new(ExportConfig::default()).with_ledger(ledger.clone());
        let items = vec![SourceItem::chapter("One", None)];
        composer.export(&items).await.unwrap();
        composer.export(&items).await.unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn output_names() {
        let at = DateTime::parse_from_rfc3339("2026-05-04T03:02:01Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut theme = default_theme();
        assert_eq!(output_file_name(&theme, at), "ArchiveStream_20260504T030201Z.pdf");

        theme.custom_file_name = Some("minutes".to_string());
        assert_eq!(output_file_name(&theme, at), "minutes.pdf");
        theme.custom_file_name = Some("Minutes.PDF".to_string());
        assert_eq!(output_file_name(&theme, at), "Minutes.PDF");
        theme.custom_file_name = Some("   ".to_string());
        assert!(output_file_name(&theme, at).starts_with("ArchiveStream_"));
    }
}
