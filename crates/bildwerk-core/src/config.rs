// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Converter configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::types::PageMode;

/// Per-asset size ceiling used when nothing else is configured (20 MiB).
pub const DEFAULT_MAX_ASSET_BYTES: u64 = 20 * 1024 * 1024;

/// How to reach an external codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Resource locator: program name on `PATH`, or an absolute path.
    pub resource: String,
    /// Arguments passed when probing that the codec is usable.
    pub probe_args: Vec<String>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            resource: "heif-convert".into(),
            probe_args: vec!["--version".into()],
        }
    }
}

/// Settings applied to every conversion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Assets larger than this are rejected before decoding.
    pub max_asset_bytes: u64,
    /// Quality used when a request does not specify one.
    pub default_quality: f32,
    /// Minimum quality when a request turns compression off.
    pub uncompressed_quality_floor: f32,
    /// Margin around the content box in fixed page mode, in points.
    pub page_margin_pt: f32,
    /// Page mode used when a request does not specify one.
    pub default_page_mode: PageMode,
    /// External HEIC/HEIF codec.
    pub heif_codec: CodecConfig,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_asset_bytes: DEFAULT_MAX_ASSET_BYTES,
            default_quality: 0.9,
            uncompressed_quality_floor: 0.95,
            page_margin_pt: 40.0,
            default_page_mode: PageMode::default(),
            heif_codec: CodecConfig::default(),
        }
    }
}

impl ConverterConfig {
    /// Load configuration from a JSON file. A missing file yields defaults;
    /// a present but malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        info!(path = %path.display(), "loaded converter config");
        Ok(config)
    }

    /// Write configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Resolve the quality actually used for a request.
    ///
    /// Missing or non-finite values fall back to `default_quality`; the
    /// result is clamped to [0, 1]. With compression off, quality is raised
    /// to at least `uncompressed_quality_floor`.
    pub fn effective_quality(&self, requested: Option<f32>, compress: bool) -> f32 {
        let base = requested
            .filter(|q| q.is_finite())
            .unwrap_or(self.default_quality)
            .clamp(0.0, 1.0);
        if compress {
            base
        } else {
            base.max(self.uncompressed_quality_floor).clamp(0.0, 1.0)
        }
    }
}
