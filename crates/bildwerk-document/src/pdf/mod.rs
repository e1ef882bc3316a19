// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — assembling images into documents and inspecting the result.

pub mod compositor;
pub mod inspector;

pub use compositor::{PageCompositor, PageGeometry};
pub use inspector::PdfInspector;
