// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page stamping — watermark overlays and document metadata, applied to the
// assembled output in place.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, instrument};

use archivestream_core::error::{ArchiveError, Result};
use archivestream_core::watermark::WatermarkStyle;

/// Resource names used by the overlay.
const GS_NAME: &str = "GSwm";
const FONT_NAME: &str = "FWm";

/// Fallback page size (A4) when a page carries no usable `/MediaBox`.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 595.28, 841.89];

/// Fixed `/Info` entries written on every export.
pub const METADATA: [(&str, &str); 5] = [
    ("Title", "ArchiveStream Unified Document"),
    ("Author", "ArchiveStream Workstation"),
    ("Subject", "Consolidated Digital Archive"),
    ("Producer", "ArchiveStream (Atelier Engine)"),
    ("Creator", "ArchiveStream Cloud Bridge"),
];

/// Draw `style` diagonally across the centre of every page in `page_ids`.
///
/// Existing page content is wrapped in `q`/`Q` so its graphics state cannot
/// leak into the overlay.
#[instrument(skip(doc, page_ids), fields(pages = page_ids.len(), text = style.text))]
pub fn apply_watermark(doc: &mut Document, page_ids: &[ObjectId], style: &WatermarkStyle) -> Result<()> {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => style.opacity,
        "CA" => style.opacity,
    });
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

    for &page_id in page_ids {
        let media_box = media_box(doc, page_id);
        let overlay = overlay_content(style.text, media_box)?;
        let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

        let resources = page_resources(doc, page_id, font_id, gs_id)?;
        let mut contents = vec![Object::Reference(save_id)];
        contents.extend(content_streams(doc, page_id)?);
        contents.push(Object::Reference(overlay_id));

        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|err| ArchiveError::PdfError(format!("cannot stamp page {page_id:?}: {err}")))?;

        page.set("Contents", Object::Array(contents));
        page.set("Resources", Object::Dictionary(resources));
    }

    debug!("watermark applied");
    Ok(())
}

/// Write the fixed metadata into the trailer's `/Info` dictionary.
///
/// `should_optimize` is accepted for compatibility and has no effect.
pub fn stamp_metadata(doc: &mut Document, should_optimize: bool) {
    let mut info = Dictionary::new();
    for (key, value) in METADATA {
        info.set(key, Object::string_literal(value));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);
    debug!(should_optimize, "metadata stamped");
}

fn overlay_content(text: &str, media_box: [f32; 4]) -> Result<Vec<u8>> {
    let [x0, y0, x1, y1] = media_box;
    let (width, height) = ((x1 - x0).abs(), (y1 - y0).abs());
    let (cx, cy) = (x0.min(x1) + width / 2.0, y0.min(y1) + height / 2.0);

    // Helvetica-Bold capitals average about 0.7 em.
    let glyphs = text.chars().count().max(1) as f32;
    let size = (width.min(height) * 0.9 / (0.7 * glyphs)).clamp(24.0, 120.0);
    let text_width = 0.7 * size * glyphs;

    let angle = std::f32::consts::FRAC_PI_4;
    let (sin, cos) = angle.sin_cos();

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(GS_NAME.as_bytes().to_vec())]),
            Operation::new("rg", vec![Object::Real(0.5), Object::Real(0.5), Object::Real(0.5)]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(FONT_NAME.as_bytes().to_vec()), size.into()]),
            Operation::new(
                "Tm",
                vec![cos.into(), sin.into(), (-sin).into(), cos.into(), cx.into(), cy.into()],
            ),
            Operation::new("Td", vec![(-text_width / 2.0).into(), (-size / 3.0).into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };
    let mut bytes = b"\nQ\n".to_vec();
    bytes.extend(
        content
            .encode()
            .map_err(|err| ArchiveError::PdfError(format!("failed to encode watermark: {err}")))?,
    );
    Ok(bytes)
}

fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return DEFAULT_MEDIA_BOX;
    };
    let array = match page.get(b"MediaBox") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => return DEFAULT_MEDIA_BOX,
        },
        _ => return DEFAULT_MEDIA_BOX,
    };
    let numbers: Vec<f32> = array.iter().filter_map(|n| n.as_float().ok()).collect();
    match numbers.as_slice() {
        [a, b, c, d] => [*a, *b, *c, *d],
        _ => DEFAULT_MEDIA_BOX,
    }
}

/// References to the streams that currently make up the page's content.
///
/// `/Contents` may name a single stream or an array of streams, either of
/// which may sit behind an indirect reference.
fn content_streams(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|err| ArchiveError::PdfError(format!("cannot read page {page_id:?}: {err}")))?;

    match page.get(b"Contents") {
        Err(_) | Ok(Object::Null) => Ok(Vec::new()),
        Ok(Object::Array(items)) => Ok(items.clone()),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Stream(_)) => Ok(vec![Object::Reference(*id)]),
            Ok(Object::Array(items)) => Ok(items.clone()),
            Ok(_) => Err(ArchiveError::PdfError(format!(
                "page {page_id:?}: /Contents {id:?} is neither a stream nor an array"
            ))),
            Err(err) => Err(ArchiveError::PdfError(format!(
                "page {page_id:?}: /Contents {id:?} cannot be resolved: {err}"
            ))),
        },
        Ok(_) => Err(ArchiveError::PdfError(format!(
            "page {page_id:?}: /Contents must be a stream reference or an array"
        ))),
    }
}

/// The page's resource dictionary, resolved to an inline copy, with the
/// overlay's font and graphics state added.
fn page_resources(doc: &Document, page_id: ObjectId, font_id: ObjectId, gs_id: ObjectId) -> Result<Dictionary> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|err| ArchiveError::PdfError(format!("cannot read page {page_id:?}: {err}")))?;

    let mut resources = resolve_dictionary(doc, page.get(b"Resources").ok());

    let mut fonts = resolve_dictionary(doc, resources.get(b"Font").ok());
    fonts.set(FONT_NAME, font_id);
    resources.set("Font", fonts);

    let mut states = resolve_dictionary(doc, resources.get(b"ExtGState").ok());
    states.set(GS_NAME, gs_id);
    resources.set("ExtGState", states);

    Ok(resources)
}

fn resolve_dictionary(doc: &Document, object: Option<&Object>) -> Dictionary {
    match object {
        Some(Object::Dictionary(dict)) => dict.clone(),
        Some(Object::Reference(id)) => doc.get_dictionary(*id).cloned().unwrap_or_default(),
        _ => Dictionary::new(),
    }
}
