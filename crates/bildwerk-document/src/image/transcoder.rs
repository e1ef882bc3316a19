// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transcoder — decode a raster and re-encode it to a target format and quality.
//
// Dimensions are preserved exactly: nothing here resizes. Targets without an
// alpha channel (JPG) get transparent regions painted white before encoding.

use std::sync::Arc;

use bildwerk_core::CanonicalFormat;
use bildwerk_core::error::{ConversionError, Result};
use image::DynamicImage;
use tracing::{debug, info, instrument};

use super::raster::{ImageCrateCodec, RasterCodec, RasterImage};

/// Local raster re-encoder over a pluggable [`RasterCodec`].
#[derive(Clone)]
pub struct Transcoder {
    codec: Arc<dyn RasterCodec>,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new(Arc::new(ImageCrateCodec))
    }
}

impl Transcoder {
    pub fn new(codec: Arc<dyn RasterCodec>) -> Self {
        Self { codec }
    }

    /// Decode raster bytes into pixels.
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len(), declared = ?declared))]
    pub fn decode(&self, bytes: &[u8], declared: Option<CanonicalFormat>) -> Result<RasterImage> {
        self.codec.decode(bytes, declared)
    }

    /// Encode pixels as `target`.
    ///
    /// Fails with `EncoderMissing` for targets with no local encoder. Quality
    /// is clamped to [0, 1].
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height(), %target))]
    pub fn encode(&self, image: &RasterImage, target: CanonicalFormat, quality: f32) -> Result<Vec<u8>> {
        if !target.has_local_encoder() {
            return Err(ConversionError::EncoderMissing(target));
        }
        let quality = quality.clamp(0.0, 1.0);

        let encoded = if !target.supports_alpha() && image.has_alpha() {
            debug!("flattening transparency onto white");
            let flat = RasterImage::from_dynamic(DynamicImage::ImageRgb8(image.flatten_onto_white()));
            self.codec.encode(&flat, target, quality)?
        } else {
            self.codec.encode(image, target, quality)?
        };

        debug!(output_len = encoded.len(), quality, "encode complete");
        Ok(encoded)
    }

    /// Decode then encode in one step.
    pub fn transcode(
        &self,
        bytes: &[u8],
        declared: Option<CanonicalFormat>,
        target: CanonicalFormat,
        quality: f32,
    ) -> Result<Vec<u8>> {
        let image = self.decode(bytes, declared)?;
        info!(
            width = image.width(),
            height = image.height(),
            %target,
            "Transcoding image"
        );
        self.encode(&image, target, quality)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgba, RgbaImage};

    use super::*;

    /// Gradient with a transparent stripe so every encoder has real work.
    fn sample(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            let alpha = if x % 4 == 0 { 0 } else { 255 };
            Rgba([(x * 13) as u8, (y * 7) as u8, 90, alpha])
        }))
    }

    fn encode_with_image_crate(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    #[test]
    fn dimensions_survive_every_local_pair() {
        let transcoder = Transcoder::default();
        let image = sample(13, 9);
        let sources = [
            (CanonicalFormat::Png, ImageFormat::Png),
            (CanonicalFormat::Jpg, ImageFormat::Jpeg),
            (CanonicalFormat::Webp, ImageFormat::WebP),
            (CanonicalFormat::Gif, ImageFormat::Gif),
        ];

        for (source, image_format) in sources {
            let prepared = match image_format {
                ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
                _ => image.clone(),
            };
            let bytes = encode_with_image_crate(&prepared, image_format);

            for target in [CanonicalFormat::Jpg, CanonicalFormat::Png, CanonicalFormat::Webp] {
                let out = transcoder.transcode(&bytes, Some(source), target, 0.8).unwrap();
                let back = transcoder.decode(&out, Some(target)).unwrap();
                assert_eq!(back.dimensions(), (13, 9), "{source} -> {target}");
            }
        }
    }

    #[test]
    fn png_to_jpeg_at_quality_point_nine() {
        let transcoder = Transcoder::default();
        let png = encode_with_image_crate(&sample(10, 10), ImageFormat::Png);

        let jpeg = transcoder
            .transcode(&png, Some(CanonicalFormat::Png), CanonicalFormat::Jpg, 0.9)
            .unwrap();

        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 10));
    }

    #[test]
    fn transparent_regions_become_white_in_jpeg() {
        let transcoder = Transcoder::default();
        let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0])));
        let raster = RasterImage::from_dynamic(clear);

        let jpeg = transcoder.encode(&raster, CanonicalFormat::Jpg, 1.0).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        let image::Rgb([r, g, b]) = *decoded.get_pixel(4, 4);
        assert!(r > 245 && g > 245 && b > 245, "got {r},{g},{b}");
    }

    #[test]
    fn png_keeps_transparency() {
        let transcoder = Transcoder::default();
        let raster = RasterImage::from_dynamic(sample(8, 2));
        let png = transcoder.encode(&raster, CanonicalFormat::Png, 0.5).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn lossless_targets_ignore_quality() {
        let transcoder = Transcoder::default();
        let raster = RasterImage::from_dynamic(sample(6, 6));
        let low = transcoder.encode(&raster, CanonicalFormat::Png, 0.1).unwrap();
        let high = transcoder.encode(&raster, CanonicalFormat::Png, 1.0).unwrap();
        assert_eq!(low, high);
    }

    #[test]
    fn targets_without_encoder_are_rejected() {
        let transcoder = Transcoder::default();
        let raster = RasterImage::from_dynamic(sample(2, 2));
        for target in [CanonicalFormat::Gif, CanonicalFormat::Heic, CanonicalFormat::Pdf] {
            let err = transcoder.encode(&raster, target, 0.9).unwrap_err();
            assert!(matches!(err, ConversionError::EncoderMissing(t) if t == target));
        }
    }
}
