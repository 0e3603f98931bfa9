// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image optimizer — resample (archival) and shrink (size) transforms that
// re-encode raster images as JPEG before they are embedded in the output.
//
// Both transforms only ever scale down, keep the aspect ratio, and round
// target dimensions half away from zero. The encoded buffer always has exactly
// the computed dimensions.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba};
use tracing::{debug, info, instrument};

use archivestream_core::config::{DEFAULT_MAX_WIDTH, RESAMPLE_QUALITY, SHRINK_QUALITY};
use archivestream_core::error::{ArchiveError, Result};

/// Long-edge cap of the resample transform (~150 DPI on an A4 page).
pub const RESAMPLE_MAX_DIMENSION: u32 = 1200;

/// A re-encoded JPEG ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Encoder quality used (0.0–1.0).
    pub quality: f32,
    /// Size of the source payload in bytes.
    pub original_len: usize,
}

impl OptimizedImage {
    /// Fraction of the original size saved. Negative when the output grew.
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_len == 0 {
            return 0.0;
        }
        1.0 - self.bytes.len() as f64 / self.original_len as f64
    }
}

/// Target size for the resample transform.
pub fn resample_dimensions(width: u32, height: u32) -> (u32, u32) {
    let long_edge = width.max(height).max(1);
    let scale = (f64::from(RESAMPLE_MAX_DIMENSION) / f64::from(long_edge)).min(1.0);
    (scale_dimension(width, scale), scale_dimension(height, scale))
}

/// Target size for the shrink transform.
pub fn shrink_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || max_width == 0 {
        return (width, height);
    }
    let ratio = f64::from(max_width) / f64::from(width);
    (max_width, scale_dimension(height, ratio))
}

fn scale_dimension(value: u32, scale: f64) -> u32 {
    // f64::round rounds half away from zero.
    ((f64::from(value) * scale).round() as u32).max(1)
}

/// Stateless entry points for the two image transforms.
pub struct ImageOptimizer;

impl ImageOptimizer {
    /// Archival transform: cap the long edge at 1200 px, encode at quality 0.7.
    pub fn resample(data: &[u8], mime_type: &str) -> Result<OptimizedImage> {
        Self::resample_with_quality(data, mime_type, RESAMPLE_QUALITY)
    }

    /// Resample with an explicit encoder quality.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn resample_with_quality(data: &[u8], mime_type: &str, quality: f32) -> Result<OptimizedImage> {
        let image = decode(data, mime_type)?;
        let (width, height) = resample_dimensions(image.width(), image.height());
        finish(image, width, height, quality, data.len())
    }

    /// Size transform with the default width cap (1600) and quality (0.75).
    pub fn shrink_default(data: &[u8], mime_type: &str) -> Result<OptimizedImage> {
        Self::shrink(data, mime_type, DEFAULT_MAX_WIDTH, SHRINK_QUALITY)
    }

    /// Size transform: cap the width at `max_width`, encode at `quality`.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn shrink(data: &[u8], mime_type: &str, max_width: u32, quality: f32) -> Result<OptimizedImage> {
        let image = decode(data, mime_type)?;
        let (width, height) = shrink_dimensions(image.width(), image.height(), max_width);
        if width == image.width() {
            debug!(width, "image width within limits, no resizing needed");
        }
        finish(image, width, height, quality, data.len())
    }
}

/// Decode using the declared MIME type, falling back to content sniffing when
/// the declaration is unknown or wrong.
fn decode(data: &[u8], mime_type: &str) -> Result<DynamicImage> {
    let decoded = match ImageFormat::from_mime_type(mime_type) {
        Some(format) => {
            image::load_from_memory_with_format(data, format).or_else(|_| image::load_from_memory(data))
        }
        None => image::load_from_memory(data),
    };
    let image = decoded
        .map_err(|err| ArchiveError::ImageDecode(format!("{mime_type}: {err}")))?;

    debug!(
        width = image.width(),
        height = image.height(),
        mime_type,
        "image decoded"
    );
    Ok(image)
}

fn finish(
    image: DynamicImage,
    width: u32,
    height: u32,
    quality: f32,
    original_len: usize,
) -> Result<OptimizedImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ArchiveError::RenderSurfaceUnavailable(
            "image has no pixels".to_string(),
        ));
    }

    let resized = if (width, height) == (image.width(), image.height()) {
        image
    } else {
        debug!(
            from_w = image.width(),
            from_h = image.height(),
            to_w = width,
            to_h = height,
            "resizing image"
        );
        image.resize_exact(width, height, FilterType::Triangle)
    };

    let quality = quality.clamp(0.0, 1.0);
    let bytes = encode_jpeg(&flatten_onto_white(&resized), quality)?;

    let optimized = OptimizedImage {
        bytes,
        width,
        height,
        quality,
        original_len,
    };

    let reduction_pct = (optimized.reduction_ratio() * 100.0).round();
    info!(
        original_kb = original_len / 1024,
        new_kb = optimized.bytes.len() / 1024,
        reduction_pct,
        width,
        height,
        "image optimized"
    );
    if reduction_pct < 0.0 {
        debug!(growth_pct = -reduction_pct, "output is larger than the source");
    }

    Ok(optimized)
}

/// Composite any alpha channel over white; JPEG has no transparency.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    image.write_with_encoder(encoder).map_err(|err| {
        ArchiveError::RenderSurfaceUnavailable(format!("JPEG encoding failed: {err}"))
    })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    /// Encode a gradient test image of the given size as PNG.
    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128u8, 255u8])
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn decoded_dims(bytes: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn resample_caps_long_edge() {
        let out = ImageOptimizer::resample(&png(2400, 900), "image/png").unwrap();
        assert_eq!((out.width, out.height), (1200, 450));
        assert_eq!(decoded_dims(&out.bytes), (1200, 450));
        assert_eq!(out.quality, 0.7);
    }

    #[test]
    fn resample_caps_portrait_long_edge() {
        let out = ImageOptimizer::resample(&png(500, 1500), "image/png").unwrap();
        assert_eq!((out.width, out.height), (400, 1200));
        let source_ratio = 500.0 / 1500.0;
        let out_ratio = out.width as f64 / out.height as f64;
        assert!((out_ratio - source_ratio).abs() / source_ratio < 0.01);
    }

    #[test]
    fn resample_keeps_small_images() {
        let out = ImageOptimizer::resample(&png(640, 480), "image/png").unwrap();
        assert_eq!(decoded_dims(&out.bytes), (640, 480));
    }

    #[test]
    fn resample_dimensions_round_half_away_from_zero() {
        // 1201 x 601 -> scale 1200/1201; 601 * scale = 600.4996 -> 600
        assert_eq!(resample_dimensions(1201, 601), (1200, 600));
        // 2400 x 1001 -> 500.5 -> 501
        assert_eq!(resample_dimensions(2400, 1001), (1200, 501));
        assert_eq!(resample_dimensions(5000, 1), (1200, 1));
    }

    #[test]
    fn shrink_caps_width() {
        let out = ImageOptimizer::shrink(&png(2000, 500), "image/png", 1600, 0.75).unwrap();
        assert_eq!((out.width, out.height), (1600, 400));
        assert_eq!(decoded_dims(&out.bytes), (1600, 400));
        assert_eq!(out.quality, 0.75);
    }

    #[test]
    fn shrink_keeps_narrow_images() {
        let out = ImageOptimizer::shrink_default(&png(800, 2000), "image/png").unwrap();
        assert_eq!(decoded_dims(&out.bytes), (800, 2000));
    }

    #[test]
    fn shrink_dimensions_are_proportional() {
        assert_eq!(shrink_dimensions(3000, 1999, 1600), (1600, 1066));
        assert_eq!(shrink_dimensions(1600, 900, 1600), (1600, 900));
    }

    #[test]
    fn wrong_mime_falls_back_to_sniffing() {
        let out = ImageOptimizer::resample(&png(10, 10), "image/jpeg").unwrap();
        assert_eq!((out.width, out.height), (10, 10));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = ImageOptimizer::resample(b"not an image", "image/png").unwrap_err();
        assert!(matches!(err, ArchiveError::ImageDecode(_)));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let img = ImageBuffer::from_pixel(4, 4, Rgba([0u8, 0, 0, 0]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(img));
        assert_eq!(*flat.get_pixel(0, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn reduction_ratio_is_informational() {
        let out = OptimizedImage {
            bytes: vec![0; 150],
            width: 1,
            height: 1,
            quality: 0.75,
            original_len: 100,
        };
        assert!(out.reduction_ratio() < 0.0);
    }
}
