// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output assembly — a single `lopdf` document that pages are appended to in
// order, from source PDFs, generated chapter pages, and optimized images.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, instrument};

use archivestream_core::error::{ArchiveError, Result};
use archivestream_core::types::{ImageSizeMode, PaperSize};

use crate::image::OptimizedImage;
use crate::pdf::reader::{PageCopier, SourcePdf};
use crate::selection::PageSelection;

/// Margin around placed images, in millimetres.
const IMAGE_MARGIN_MM: f32 = 15.0;
/// Resolution used to give raster images a physical size.
const IMAGE_DPI: f32 = 150.0;

/// Where an image lands on its page, in points from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Compute the centred placement of a `px_width` x `px_height` image on a
/// `page_width` x `page_height` page.
pub fn image_placement(
    px_width: u32,
    px_height: u32,
    mode: ImageSizeMode,
    page_width: f32,
    page_height: f32,
) -> Placement {
    let margin = IMAGE_MARGIN_MM * 72.0 / 25.4;
    let usable_w = (page_width - 2.0 * margin).max(1.0);
    let usable_h = (page_height - 2.0 * margin).max(1.0);

    let native_w = px_width.max(1) as f32 / IMAGE_DPI * 72.0;
    let native_h = px_height.max(1) as f32 / IMAGE_DPI * 72.0;
    let aspect = native_w / native_h;

    let (width, height) = match mode {
        ImageSizeMode::Original => {
            let scale = (usable_w / native_w).min(usable_h / native_h).min(1.0);
            (native_w * scale, native_h * scale)
        }
        ImageSizeMode::Fit => {
            let scale = (usable_w / native_w).min(usable_h / native_h);
            (native_w * scale, native_h * scale)
        }
        ImageSizeMode::Custom { width, height } => {
            let (w, h) = match (width, height) {
                (Some(w), Some(h)) => (w, h),
                (Some(w), None) => (w, w / aspect),
                (None, Some(h)) => (h * aspect, h),
                (None, None) => (native_w, native_h),
            };
            let (w, h) = (w.max(1.0), h.max(1.0));
            let scale = (usable_w / w).min(usable_h / h).min(1.0);
            (w * scale, h * scale)
        }
    };

    Placement {
        x: (page_width - width) / 2.0,
        y: (page_height - height) / 2.0,
        width,
        height,
    }
}

/// The document being assembled.
pub struct OutputDocument {
    document: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDocument {
    /// Start an empty document with a catalog and an empty page tree.
    pub fn new() -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        Self {
            document,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Page object ids in output order.
    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Append the selected pages of `source`, in ascending page order.
    #[instrument(skip_all, fields(selected = selection.len()))]
    pub fn append_selection(&mut self, source: &SourcePdf, selection: &PageSelection) -> Result<usize> {
        let page_ids = source.selected_page_ids(selection)?;
        let mut copier = PageCopier::new(source.document());
        for page_id in &page_ids {
            let new_id = copier.copy_page(&mut self.document, *page_id)?;
            self.link_page(new_id)?;
        }
        debug!(appended = page_ids.len(), total = self.page_count(), "source pages appended");
        Ok(page_ids.len())
    }

    /// Append every page of a complete PDF (e.g. a generated chapter page).
    pub fn append_pdf(&mut self, bytes: &[u8]) -> Result<usize> {
        let source = SourcePdf::from_bytes(bytes)?;
        let selection = PageSelection::resolve("all", source.page_count());
        self.append_selection(&source, &selection)
    }

    /// Append one page showing `image`, embedded as its JPEG bytes.
    #[instrument(skip_all, fields(width = image.width, height = image.height))]
    pub fn append_image(&mut self, image: &OptimizedImage, mode: ImageSizeMode, paper: PaperSize) -> Result<()> {
        let (page_w, page_h) = paper.dimensions_pt();
        let placement = image_placement(image.width, image.height, mode, page_w, page_h);

        let xobject = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.width),
                "Height" => i64::from(image.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            image.bytes.clone(),
        )
        .with_compression(false);
        let image_id = self.document.add_object(xobject);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        placement.width.into(),
                        0.into(),
                        0.into(),
                        placement.height.into(),
                        placement.x.into(),
                        placement.y.into(),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|err| ArchiveError::PdfError(format!("failed to encode image page: {err}")))?;
        let content_id = self.document.add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Real(page_w), Object::Real(page_h)],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "Contents" => content_id,
        });
        self.link_page(page_id)?;

        debug!(?placement, "image page appended");
        Ok(())
    }

    /// Serialise the document.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            ArchiveError::PdfError(format!("failed to serialise output PDF: {err}"))
        })?;
        Ok(output)
    }

    /// Add a page to the end of the page tree.
    fn link_page(&mut self, page_id: ObjectId) -> Result<()> {
        let pages = self
            .document
            .get_object_mut(self.pages_id)
            .and_then(Object::as_dict_mut)
            .map_err(|err| ArchiveError::PdfError(format!("page tree missing: {err}")))?;

        if let Ok(Object::Array(kids)) = pages.get_mut(b"Kids") {
            kids.push(Object::Reference(page_id));
        }
        if let Ok(Object::Integer(count)) = pages.get_mut(b"Count") {
            *count += 1;
        }

        if let Ok(Object::Dictionary(page)) = self.document.get_object_mut(page_id) {
            page.set("Parent", Object::Reference(self.pages_id));
        }
        self.page_ids.push(page_id);
        Ok(())
    }
}
