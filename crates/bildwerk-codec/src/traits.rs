// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability traits for external codecs and the loaders that acquire them.

use std::sync::Arc;

use async_trait::async_trait;
use bildwerk_core::CanonicalFormat;
use thiserror::Error;

/// Failure reported by an external codec while converting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExternalCodecError {
    /// The bytes are already in a format the local transcoder can decode,
    /// whatever the asset's declared format. Recoverable: the caller should
    /// transcode the original bytes locally.
    #[error("input is already in a directly decodable format")]
    AlreadyDecodable,

    /// Any genuine failure. Not recoverable.
    #[error("{0}")]
    Failed(String),
}

/// An acquired decode capability for one or more camera-native formats.
#[async_trait]
pub trait ExternalCodec: Send + Sync {
    /// Short name for logs (e.g. "heif-convert").
    fn name(&self) -> &str;

    /// Formats `transcode` can write. Other targets go through a PNG
    /// intermediate re-encoded locally.
    fn output_formats(&self) -> &'static [CanonicalFormat] {
        &[CanonicalFormat::Jpg, CanonicalFormat::Png]
    }

    /// Decode `bytes` and re-encode them as `target` at `quality` (0..=1).
    async fn transcode(
        &self,
        bytes: &[u8],
        target: CanonicalFormat,
        quality: f32,
    ) -> Result<Vec<u8>, ExternalCodecError>;
}

/// Why an acquisition attempt did not produce a usable codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecLoadError {
    /// The acquisition step itself failed.
    #[error("acquisition failed: {0}")]
    Acquisition(String),

    /// Acquisition nominally succeeded but the expected capability is absent.
    #[error("capability missing: {0}")]
    MissingCapability(String),
}

/// Performs the one-time acquisition of a codec from a resource locator.
#[async_trait]
pub trait CodecLoader: Send + Sync {
    async fn load(&self, resource_id: &str) -> Result<Arc<dyn ExternalCodec>, CodecLoadError>;
}
