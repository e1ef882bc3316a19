// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bildwerk-document — The conversion pipeline.
//
// Provides raster decode/encode (JPG, PNG, WebP, GIF input), the HEIC/HEIF
// fallback chain over an external codec, multi-page PDF assembly with page
// geometry policy, PDF inspection, and the `Converter` entry point that ties
// them together.

pub mod convert;
pub mod fallback;
pub mod image;
pub mod pdf;

// Re-export the primary structs so callers can use `bildwerk_document::Converter` etc.
pub use convert::Converter;
pub use fallback::{FallbackChain, FallbackOutput, FallbackRoute, FallbackStage};
pub use crate::image::raster::{ImageCrateCodec, RasterCodec, RasterImage};
pub use crate::image::transcoder::Transcoder;
pub use pdf::compositor::{PageCompositor, PageGeometry};
pub use pdf::inspector::PdfInspector;
