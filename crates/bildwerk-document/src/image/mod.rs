// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoded rasters, the codec capability seam, and the transcoder.

pub mod raster;
pub mod transcoder;

pub use raster::{ImageCrateCodec, RasterCodec, RasterImage};
pub use transcoder::Transcoder;
