// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoded rasters and the codec capability behind the transcoder.
//
// `RasterCodec` is the seam between the pipeline and whatever library turns
// bytes into pixels. `ImageCrateCodec` implements it with the `image` crate.

use std::io::Cursor;

use bildwerk_core::error::{ConversionError, Result};
use bildwerk_core::{CanonicalFormat, FormatRegistry};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tracing::{debug, instrument, warn};

/// A decoded pixel buffer, independent of any file encoding.
#[derive(Debug, Clone)]
pub struct RasterImage {
    image: DynamicImage,
}

impl RasterImage {
    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Composite over an opaque white background, dropping alpha.
    pub fn flatten_onto_white(&self) -> RgbImage {
        let rgba = self.image.to_rgba8();
        RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
            let alpha = a as u32;
            let blend = |channel: u8| -> u8 {
                ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
            };
            Rgb([blend(r), blend(g), blend(b)])
        })
    }
}

/// Decode/encode capability used by the [`Transcoder`](super::Transcoder).
pub trait RasterCodec: Send + Sync {
    /// Decode encoded bytes. `declared` is the format the asset claimed to be;
    /// implementations may use it as a hint but must not trust it.
    fn decode(&self, bytes: &[u8], declared: Option<CanonicalFormat>) -> Result<RasterImage>;

    /// Encode `image` as `format`. `quality` is in [0, 1] and is ignored by
    /// lossless encoders.
    fn encode(&self, image: &RasterImage, format: CanonicalFormat, quality: f32) -> Result<Vec<u8>>;
}

/// [`RasterCodec`] backed by the `image` crate.
///
/// Decodes JPG, PNG, WebP and GIF (first frame only). Encodes JPG (lossy,
/// quality honoured), PNG and WebP (both lossless).
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateCodec;

impl RasterCodec for ImageCrateCodec {
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    fn decode(&self, bytes: &[u8], declared: Option<CanonicalFormat>) -> Result<RasterImage> {
        let sniffed = FormatRegistry::sniff(bytes);
        if let (Some(declared), Some(actual)) = (declared, sniffed) {
            if declared != actual {
                warn!(%declared, %actual, "declared format does not match content");
            }
        }
        if let Some(actual) = sniffed.filter(|f| !f.decodes_locally()) {
            return Err(ConversionError::DecodeError(format!(
                "{actual} content cannot be decoded locally"
            )));
        }

        let img = image::load_from_memory(bytes).map_err(|err| {
            ConversionError::DecodeError(format!("failed to decode image: {err}"))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Image decoded from bytes"
        );
        Ok(RasterImage::from_dynamic(img))
    }

    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn encode(&self, image: &RasterImage, format: CanonicalFormat, quality: f32) -> Result<Vec<u8>> {
        match format {
            CanonicalFormat::Jpg => encode_jpeg(image, quality),
            CanonicalFormat::Png => encode_to_format(image.as_dynamic(), ImageFormat::Png),
            CanonicalFormat::Webp => {
                // The WebP encoder only takes 8-bit RGB(A).
                let eight_bit = if image.has_alpha() {
                    DynamicImage::ImageRgba8(image.as_dynamic().to_rgba8())
                } else {
                    DynamicImage::ImageRgb8(image.as_dynamic().to_rgb8())
                };
                encode_to_format(&eight_bit, ImageFormat::WebP)
            }
            other => Err(ConversionError::EncoderMissing(other)),
        }
    }
}

/// Map quality in [0, 1] onto the JPEG encoder's 1..=100 scale.
fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
}

fn encode_jpeg(image: &RasterImage, quality: f32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let rgb = image.as_dynamic().to_rgb8();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality));
    rgb.write_with_encoder(encoder)
        .map_err(|err| ConversionError::EncodeError(format!("JPEG encoding failed: {err}")))?;
    Ok(buffer)
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    image.write_to(&mut cursor, format).map_err(|err| {
        ConversionError::EncodeError(format!("{format:?} encoding failed: {err}"))
    })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    fn encoded_png(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, pixel));
        encode_to_format(&img, ImageFormat::Png).unwrap()
    }

    #[test]
    fn flatten_composites_over_white() {
        let img = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        let flat = RasterImage::from_dynamic(DynamicImage::ImageRgba8(img)).flatten_onto_white();
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn half_transparent_red_blends_to_pink() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 128]));
        let flat = RasterImage::from_dynamic(DynamicImage::ImageRgba8(img)).flatten_onto_white();
        let Rgb([r, g, b]) = *flat.get_pixel(0, 0);
        assert_eq!(r, 255);
        assert!((126..=128).contains(&g));
        assert_eq!(g, b);
    }

    #[test]
    fn decode_reports_dimensions() {
        let bytes = encoded_png(7, 3, Rgba([1, 2, 3, 255]));
        let raster = ImageCrateCodec.decode(&bytes, Some(CanonicalFormat::Png)).unwrap();
        assert_eq!(raster.dimensions(), (7, 3));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = ImageCrateCodec.decode(b"not an image at all", None).unwrap_err();
        assert!(matches!(err, ConversionError::DecodeError(_)));
    }

    #[test]
    fn decode_refuses_heif_containers() {
        let err = ImageCrateCodec
            .decode(b"\x00\x00\x00\x18ftypheic\x00\x00\x00\x00", Some(CanonicalFormat::Heic))
            .unwrap_err();
        assert!(matches!(err, ConversionError::DecodeError(_)));
    }

    #[test]
    fn gif_has_no_encoder() {
        let raster = ImageCrateCodec
            .decode(&encoded_png(2, 2, Rgba([0, 0, 0, 255])), None)
            .unwrap();
        let err = ImageCrateCodec.encode(&raster, CanonicalFormat::Gif, 0.9).unwrap_err();
        assert!(matches!(err, ConversionError::EncoderMissing(CanonicalFormat::Gif)));
    }

    #[test]
    fn jpeg_quality_mapping() {
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(0.9), 90);
        assert_eq!(jpeg_quality(1.5), 100);
    }
}
