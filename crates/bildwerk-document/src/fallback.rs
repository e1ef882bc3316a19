// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fallback chain for formats the local transcoder cannot decode (HEIC/HEIF).
//
//   NotStarted -> TryingExternalCodec -> Succeeded
//                                     -> FallingBackToTranscode -> Succeeded | Failed
//                                     -> Failed
//
// Only `ExternalCodecError::AlreadyDecodable` moves the chain to the local
// transcoder. Acquisition failures and genuine codec failures end it.

use bildwerk_codec::{CodecRegistry, ExternalCodecError};
use bildwerk_core::CanonicalFormat;
use bildwerk_core::error::{ConversionError, Result};
use tracing::{debug, info, instrument, warn};

use crate::image::raster::RasterImage;
use crate::image::transcoder::Transcoder;

/// Progress of one chain run, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStage {
    NotStarted,
    TryingExternalCodec,
    FallingBackToTranscode,
    Succeeded,
    Failed,
}

/// Which path produced the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackRoute {
    ExternalCodec,
    LocalTranscode,
}

/// Encoded output of [`FallbackChain::run`].
#[derive(Debug, Clone)]
pub struct FallbackOutput {
    pub bytes: Vec<u8>,
    pub route: FallbackRoute,
}

/// One pass over the chain for one asset.
pub struct FallbackChain<'a> {
    registry: &'a CodecRegistry,
    transcoder: &'a Transcoder,
    resource_id: &'a str,
    stage: FallbackStage,
}

impl<'a> FallbackChain<'a> {
    pub fn new(registry: &'a CodecRegistry, transcoder: &'a Transcoder, resource_id: &'a str) -> Self {
        Self {
            registry,
            transcoder,
            resource_id,
            stage: FallbackStage::NotStarted,
        }
    }

    pub fn stage(&self) -> FallbackStage {
        self.stage
    }

    fn advance(&mut self, next: FallbackStage) {
        debug!(from = ?self.stage, to = ?next, "fallback chain transition");
        self.stage = next;
    }

    fn fail(&mut self, err: ConversionError) -> ConversionError {
        warn!(error = %err, "fallback chain failed");
        self.advance(FallbackStage::Failed);
        err
    }

    /// Convert `bytes` to `target` at `quality`.
    ///
    /// When the codec cannot write `target` itself it decodes to a lossless
    /// PNG intermediate which is then re-encoded locally.
    #[instrument(skip(self, bytes), fields(resource = self.resource_id, bytes_len = bytes.len(), %target))]
    pub async fn run(
        &mut self,
        bytes: &[u8],
        target: CanonicalFormat,
        quality: f32,
    ) -> Result<FallbackOutput> {
        self.advance(FallbackStage::TryingExternalCodec);
        let codec = match self.registry.acquire(self.resource_id).await {
            Ok(codec) => codec,
            Err(err) => return Err(self.fail(err)),
        };

        let direct = codec.output_formats().contains(&target);
        let (codec_target, codec_quality) = if direct {
            (target, quality)
        } else {
            (CanonicalFormat::Png, 1.0)
        };

        match codec.transcode(bytes, codec_target, codec_quality).await {
            Ok(out) => {
                let out = if direct {
                    out
                } else {
                    debug!("re-encoding codec intermediate locally");
                    match self
                        .transcoder
                        .transcode(&out, Some(CanonicalFormat::Png), target, quality)
                    {
                        Ok(out) => out,
                        Err(err) => return Err(self.fail(err)),
                    }
                };
                self.advance(FallbackStage::Succeeded);
                info!(codec = codec.name(), output_len = out.len(), "converted with external codec");
                Ok(FallbackOutput {
                    bytes: out,
                    route: FallbackRoute::ExternalCodec,
                })
            }
            Err(ExternalCodecError::AlreadyDecodable) => {
                self.advance(FallbackStage::FallingBackToTranscode);
                info!("asset is already decodable, transcoding locally");
                match self.transcoder.transcode(bytes, None, target, quality) {
                    Ok(out) => {
                        self.advance(FallbackStage::Succeeded);
                        Ok(FallbackOutput {
                            bytes: out,
                            route: FallbackRoute::LocalTranscode,
                        })
                    }
                    Err(err) => Err(self.fail(err)),
                }
            }
            Err(ExternalCodecError::Failed(reason)) => {
                Err(self.fail(ConversionError::DecodeError(reason)))
            }
        }
    }

    /// Decode `bytes` to pixels, for document assembly.
    ///
    /// The codec writes a lossless PNG which is decoded locally; an
    /// already-decodable asset is decoded straight from its original bytes.
    #[instrument(skip(self, bytes), fields(resource = self.resource_id, bytes_len = bytes.len()))]
    pub async fn decode(&mut self, bytes: &[u8]) -> Result<RasterImage> {
        self.advance(FallbackStage::TryingExternalCodec);
        let codec = match self.registry.acquire(self.resource_id).await {
            Ok(codec) => codec,
            Err(err) => return Err(self.fail(err)),
        };

        let (source, declared) = match codec.transcode(bytes, CanonicalFormat::Png, 1.0).await {
            Ok(png) => (png, Some(CanonicalFormat::Png)),
            Err(ExternalCodecError::AlreadyDecodable) => {
                self.advance(FallbackStage::FallingBackToTranscode);
                info!("asset is already decodable, decoding locally");
                (bytes.to_vec(), None)
            }
            Err(ExternalCodecError::Failed(reason)) => {
                return Err(self.fail(ConversionError::DecodeError(reason)));
            }
        };

        match self.transcoder.decode(&source, declared) {
            Ok(image) => {
                self.advance(FallbackStage::Succeeded);
                Ok(image)
            }
            Err(err) => Err(self.fail(err)),
        }
    }
}
