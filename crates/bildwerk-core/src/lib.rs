// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bildwerk — Core types, format registry and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod formats;
pub mod human_errors;
pub mod types;

pub use config::{CodecConfig, ConverterConfig};
pub use error::{ConversionError, ErrorKind};
pub use formats::FormatRegistry;
pub use types::*;
