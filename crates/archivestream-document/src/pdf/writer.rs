// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Chapter page writer — generate themed divider pages using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: a page is a `PdfPage` holding a
// `Vec<Op>` operation list, serialised via `PdfDocument::save()`.

use archivestream_core::theme::{GlobalTheme, ThemeColor};
use archivestream_core::types::PaperSize;
use printpdf::{
    BuiltinFont, Color, LinePoint, Mm, Op, PaintMode, PdfDocument, PdfPage, PdfSaveOptions,
    PdfWarnMsg, Point, Polygon, PolygonRing, Pt, Rgb, TextItem, WindingOrder,
};
use tracing::{debug, instrument};

/// Page margin for chapter text, in millimetres.
const MARGIN_MM: f32 = 25.0;

/// Renders chapter divider pages in the colours and fonts of a theme.
pub struct ChapterWriter {
    paper_size: PaperSize,
}

impl ChapterWriter {
    pub fn new(paper_size: PaperSize) -> Self {
        Self { paper_size }
    }

    /// Create a single-page PDF for a chapter.
    ///
    /// The page is filled with the theme's primary colour. The title is set in
    /// the accent colour at the chapter font size, followed by the optional
    /// description at the body size. A QR URL, when the theme has one, is
    /// printed as a footer.
    #[instrument(skip(self, description, theme), fields(preset = %theme.preset))]
    pub fn chapter_page(&self, title: &str, description: Option<&str>, theme: &GlobalTheme) -> Vec<u8> {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        let (page_w, page_h) = (Mm(w_mm as f32), Mm(h_mm as f32));
        let (width_pt, height_pt) = self.paper_size.dimensions_pt();
        let margin_pt = Mm(MARGIN_MM).into_pt().0;
        let usable_width_pt = width_pt - 2.0 * margin_pt;

        let font = builtin_font(&theme.font_family);
        let title_font = bold_variant(font);

        let mut ops = vec![
            Op::SetFillColor {
                col: fill_color(&theme.primary_color),
            },
            Op::DrawPolygon {
                polygon: rectangle(width_pt, height_pt),
            },
            Op::SetFillColor {
                col: fill_color(&theme.accent_color),
            },
        ];

        let title_lines = wrap_text(title, chars_per_line(usable_width_pt, theme.chapter_font_size));
        let title_leading = theme.chapter_font_size * 1.2;
        let mut cursor_y = height_pt * 0.62;
        for line in &title_lines {
            push_text(&mut ops, line, margin_pt, cursor_y, theme.chapter_font_size, title_font);
            cursor_y -= title_leading;
        }

        if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
            cursor_y -= theme.line_height;
            let max_chars = chars_per_line(usable_width_pt, theme.body_font_size);
            for line in wrap_text(description, max_chars) {
                if cursor_y < margin_pt * 2.0 {
                    break;
                }
                push_text(&mut ops, &line, margin_pt, cursor_y, theme.body_font_size, font);
                cursor_y -= theme.line_height;
            }
        }

        if let Some(url) = theme.qr_url.as_deref().filter(|u| !u.is_empty()) {
            push_text(&mut ops, url, margin_pt, margin_pt, theme.body_font_size * 0.8, font);
        }

        debug!(title_lines = title_lines.len(), ops = ops.len(), "chapter page laid out");

        let mut doc = PdfDocument::new(title);
        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        doc.save(&PdfSaveOptions::default(), &mut warnings)
    }
}

fn push_text(ops: &mut Vec<Op>, text: &str, x: f32, y: f32, size: f32, font: BuiltinFont) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(y) },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(text.to_string())],
        font,
    });
    ops.push(Op::EndTextSection);
}

fn fill_color(color: &ThemeColor) -> Color {
    let (r, g, b) = color.as_unit_rgb();
    Color::Rgb(Rgb {
        r,
        g,
        b,
        icc_profile: None,
    })
}

/// Full-page filled rectangle.
fn rectangle(width: f32, height: f32) -> Polygon {
    let corner = |x: f32, y: f32| LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    };
    Polygon {
        rings: vec![PolygonRing {
            points: vec![
                corner(0.0, 0.0),
                corner(width, 0.0),
                corner(width, height),
                corner(0.0, height),
            ],
        }],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    }
}

/// Map a theme font family to one of the PDF base-14 fonts.
fn builtin_font(family: &str) -> BuiltinFont {
    match family.to_ascii_lowercase().replace([' ', '-'], "").as_str() {
        "timesroman" | "times" | "serif" => BuiltinFont::TimesRoman,
        "courier" | "mono" | "monospace" => BuiltinFont::Courier,
        _ => BuiltinFont::Helvetica,
    }
}

fn bold_variant(font: BuiltinFont) -> BuiltinFont {
    match font {
        BuiltinFont::TimesRoman => BuiltinFont::TimesBold,
        BuiltinFont::Courier => BuiltinFont::CourierBold,
        _ => BuiltinFont::HelveticaBold,
    }
}

/// Approximate characters per line. Average base-14 glyph width is roughly
/// half the font size.
fn chars_per_line(usable_width_pt: f32, font_size: f32) -> usize {
    ((usable_width_pt / (0.5 * font_size.max(1.0))) as usize).max(1)
}

/// Wrap a multi-line string so that no line exceeds `max_width` characters.
///
/// Splits on existing newlines first, then word-wraps each paragraph. Words
/// longer than `max_width` are force-broken.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for paragraph in text.split('\n') {
        let mut current_line = String::new();

        for word in paragraph.split_whitespace() {
            let mut remaining: Vec<char> = word.chars().collect();
            while remaining.len() > max_width {
                if !current_line.is_empty() {
                    result.push(std::mem::take(&mut current_line));
                }
                let rest = remaining.split_off(max_width);
                result.push(remaining.into_iter().collect());
                remaining = rest;
            }
            let word: String = remaining.into_iter().collect();
            if word.is_empty() {
                continue;
            }

            if current_line.is_empty() {
                current_line = word;
            } else if current_line.chars().count() + 1 + word.chars().count() <= max_width {
                current_line.push(' ');
                current_line.push_str(&word);
            } else {
                result.push(std::mem::replace(&mut current_line, word));
            }
        }

        result.push(current_line);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivestream_core::theme::{apply_preset, default_theme};
    use lopdf::Document;

    #[test]
    fn chapter_page_is_a_single_page_pdf() {
        let writer = ChapterWriter::new(PaperSize::A4);
        let theme = apply_preset(&default_theme(), "midnight");
        let bytes = writer.chapter_page("Volume One", Some("Letters, 1920-1931"), &theme);

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn theme_fonts_map_to_base_fonts() {
        assert!(matches!(builtin_font("TimesRoman"), BuiltinFont::TimesRoman));
        assert!(matches!(builtin_font("courier"), BuiltinFont::Courier));
        assert!(matches!(builtin_font("Comic Sans"), BuiltinFont::Helvetica));
        assert!(matches!(bold_variant(BuiltinFont::Courier), BuiltinFont::CourierBold));
    }

    #[test]
    fn wrap_respects_width_and_paragraphs() {
        let lines = wrap_text("the quick brown fox\njumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
        assert!(wrap_text("abcdefghijklmnop", 5).iter().all(|l| l.chars().count() <= 5));
    }
}
