// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Converter — single entry point for conversion jobs.
//
// A job is validated completely (asset count, size, format pair) before any
// bytes are decoded. Single-asset raster targets go through the transcoder
// or, for HEIC/HEIF, the fallback chain. PDF targets decode every asset in
// input order and hand the pixels to the page compositor. Any failing asset
// fails the whole job.

use std::sync::Arc;

use bildwerk_codec::{CodecRegistry, CommandCodecLoader};
use bildwerk_core::error::{ConversionError, Result};
use bildwerk_core::{
    CanonicalFormat, ConversionRequest, ConversionResult, ConverterConfig, FormatRegistry, JobId,
    SourceAsset,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::fallback::FallbackChain;
use crate::image::raster::RasterImage;
use crate::image::transcoder::Transcoder;
use crate::pdf::compositor::PageCompositor;

/// Fallback base name for single-asset output when no filename is known.
const UNNAMED_IMAGE_BASE: &str = "image";
/// Document filename when the first asset has no filename.
const UNNAMED_DOCUMENT: &str = "images.pdf";

/// Runs conversion jobs against an injected codec registry.
pub struct Converter {
    config: ConverterConfig,
    registry: Arc<CodecRegistry>,
    transcoder: Transcoder,
}

impl Converter {
    pub fn new(config: ConverterConfig, registry: Arc<CodecRegistry>, transcoder: Transcoder) -> Self {
        Self {
            config,
            registry,
            transcoder,
        }
    }

    /// Converter with the `image`-crate transcoder and a subprocess HEIF
    /// codec located by `config.heif_codec`.
    pub fn with_defaults(config: ConverterConfig) -> Self {
        let loader = CommandCodecLoader::new(config.heif_codec.probe_args.clone());
        let registry = Arc::new(CodecRegistry::new(Arc::new(loader)));
        Self::new(config, registry, Transcoder::default())
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// The codec registry, shared by every job this converter runs.
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    /// Run one conversion job to completion.
    #[instrument(skip(self, request), fields(target = %request.target, assets = request.assets.len()))]
    pub async fn convert(&self, request: &ConversionRequest) -> Result<ConversionResult> {
        let sources = self.validate(request)?;
        let job_id = JobId::new();
        let quality = self.config.effective_quality(request.quality, request.compress);
        info!(%job_id, quality, "Starting conversion");

        let (bytes, filename, page_count) = if request.is_document_assembly() {
            let (bytes, pages) = self.assemble(request, &sources, quality).await?;
            (bytes, document_filename(&request.assets[0]), Some(pages))
        } else {
            let asset = &request.assets[0];
            let bytes = self
                .convert_single(asset, sources[0], request.target, quality)
                .await?;
            (bytes, converted_filename(asset, request.target), None)
        };

        let sha256 = hex::encode(Sha256::digest(&bytes));
        info!(%job_id, output_len = bytes.len(), %filename, "Conversion complete");

        Ok(ConversionResult {
            job_id,
            format: request.target,
            mime_type: request.target.mime_type(),
            filename,
            page_count,
            sha256,
            completed_at: Utc::now(),
            bytes,
        })
    }

    /// Check the whole request before any decoding and return each asset's
    /// classified format, in input order.
    fn validate(&self, request: &ConversionRequest) -> Result<Vec<CanonicalFormat>> {
        if request.assets.is_empty() {
            return Err(ConversionError::NoValidInput("no assets supplied".into()));
        }
        if request.assets.len() > 1 && !request.is_document_assembly() {
            return Err(ConversionError::UnsupportedFormat(format!(
                "{} assets cannot be combined into one {} image",
                request.assets.len(),
                request.target
            )));
        }

        let limit = self.config.max_asset_bytes;
        request
            .assets
            .iter()
            .map(|asset| {
                if asset.len() > limit {
                    return Err(ConversionError::SizeLimitExceeded {
                        name: asset.display_name().to_string(),
                        size: asset.len(),
                        limit,
                    });
                }

                let source = FormatRegistry::classify(asset).ok_or_else(|| {
                    ConversionError::UnsupportedFormat(format!(
                        "cannot tell what kind of file {} is",
                        asset.display_name()
                    ))
                })?;

                if !FormatRegistry::is_allowed_pair(source, request.target) {
                    return Err(ConversionError::UnsupportedFormat(format!(
                        "{source} to {} is not a supported conversion",
                        request.target
                    )));
                }

                debug!(name = asset.display_name(), %source, "asset validated");
                Ok(source)
            })
            .collect()
    }

    async fn convert_single(
        &self,
        asset: &SourceAsset,
        source: CanonicalFormat,
        target: CanonicalFormat,
        quality: f32,
    ) -> Result<Vec<u8>> {
        if FormatRegistry::requires_external_codec(source) {
            let mut chain = FallbackChain::new(
                &self.registry,
                &self.transcoder,
                &self.config.heif_codec.resource,
            );
            let output = chain.run(asset.bytes(), target, quality).await?;
            debug!(route = ?output.route, "fallback chain finished");
            return Ok(output.bytes);
        }

        let image = self.transcoder.decode(asset.bytes(), Some(source))?;
        tokio::task::yield_now().await;
        self.transcoder.encode(&image, target, quality)
    }

    async fn decode_asset(&self, asset: &SourceAsset, source: CanonicalFormat) -> Result<RasterImage> {
        if FormatRegistry::requires_external_codec(source) {
            let mut chain = FallbackChain::new(
                &self.registry,
                &self.transcoder,
                &self.config.heif_codec.resource,
            );
            return chain.decode(asset.bytes()).await;
        }
        self.transcoder.decode(asset.bytes(), Some(source))
    }

    /// Decode every asset in order, then compose with page images at
    /// `quality`. Returns the PDF and its page count.
    async fn assemble(
        &self,
        request: &ConversionRequest,
        sources: &[CanonicalFormat],
        quality: f32,
    ) -> Result<(Vec<u8>, usize)> {
        let mut images = Vec::with_capacity(request.assets.len());
        for (index, (asset, source)) in request.assets.iter().zip(sources).enumerate() {
            let image = self.decode_asset(asset, *source).await.map_err(|err| {
                warn!(page = index + 1, name = asset.display_name(), error = %err, "asset failed, abandoning document");
                err
            })?;
            debug!(page = index + 1, width = image.width(), height = image.height(), "asset decoded");
            images.push(image);
            tokio::task::yield_now().await;
        }

        let mode = request.page_mode.unwrap_or(self.config.default_page_mode);
        let margin = request.margin_pt.unwrap_or(self.config.page_margin_pt);

        let mut compositor = PageCompositor::new();
        if let Some(base) = request.assets[0].base_name() {
            compositor.set_title(base);
        }
        let bytes = compositor.compose(&images, mode, margin, quality)?;
        Ok((bytes, images.len()))
    }
}

/// `<base>-converted.<ext>` for raster output.
fn converted_filename(asset: &SourceAsset, target: CanonicalFormat) -> String {
    let base = asset
        .base_name()
        .unwrap_or_else(|| UNNAMED_IMAGE_BASE.to_string());
    format!("{base}-converted.{}", target.extension())
}

/// `<base-of-first-asset>.pdf`, or a generic name.
fn document_filename(first: &SourceAsset) -> String {
    match first.base_name() {
        Some(base) => format!("{base}.pdf"),
        None => UNNAMED_DOCUMENT.to_string(),
    }
}
