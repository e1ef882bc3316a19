// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bildwerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CanonicalFormat;

/// Top-level error type for all conversion operations. Every error is
/// terminal for the request that raised it.
#[derive(Debug, Error)]
pub enum ConversionError {
    // -- Validation (raised before any decode) --
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{name} is {size} bytes, over the {limit} byte limit")]
    SizeLimitExceeded { name: String, size: u64, limit: u64 },

    #[error("no valid input: {0}")]
    NoValidInput(String),

    // -- Codec acquisition --
    #[error("external codec '{resource}' is unavailable: {reason}")]
    CodecUnavailable { resource: String, reason: String },

    // -- Raster work --
    #[error("decoding failed: {0}")]
    DecodeError(String),

    #[error("no encoder available for {0} output")]
    EncoderMissing(CanonicalFormat),

    #[error("encoding failed: {0}")]
    EncodeError(String),

    // -- Storage / configuration --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stable tag for each failure class, for presentation layers to switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    SizeLimitExceeded,
    CodecUnavailable,
    DecodeError,
    EncodeError,
    NoValidInput,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::SizeLimitExceeded => "size_limit_exceeded",
            Self::CodecUnavailable => "codec_unavailable",
            Self::DecodeError => "decode_error",
            Self::EncodeError => "encode_error",
            Self::NoValidInput => "no_valid_input",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::SizeLimitExceeded { .. } => ErrorKind::SizeLimitExceeded,
            Self::NoValidInput(_) => ErrorKind::NoValidInput,
            Self::CodecUnavailable { .. } => ErrorKind::CodecUnavailable,
            Self::DecodeError(_) => ErrorKind::DecodeError,
            Self::EncoderMissing(_) | Self::EncodeError(_) => ErrorKind::EncodeError,
            Self::Io(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ConversionError>;
