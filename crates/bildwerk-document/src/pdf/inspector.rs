// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF inspector — read page count and page geometry with `lopdf`.

use bildwerk_core::error::{ConversionError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument};

/// Read-only view of an existing PDF.
pub struct PdfInspector {
    document: Document,
}

impl PdfInspector {
    /// Parse a PDF already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            ConversionError::DecodeError(format!("failed to load PDF from memory: {err}"))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Width and height of every page in points, in page order.
    ///
    /// The MediaBox is looked up on the page and then up its /Parent chain,
    /// since page tree nodes may supply it by inheritance.
    pub fn page_sizes(&self) -> Result<Vec<(f32, f32)>> {
        self.document
            .get_pages()
            .into_iter()
            .map(|(number, page_id)| {
                let media_box = self.inherited_media_box(page_id).ok_or_else(|| {
                    ConversionError::DecodeError(format!("page {number} has no MediaBox"))
                })?;
                media_box_size(&self.document, media_box).ok_or_else(|| {
                    ConversionError::DecodeError(format!("page {number} has a malformed MediaBox"))
                })
            })
            .collect()
    }

    fn inherited_media_box(&self, page_id: ObjectId) -> Option<&Object> {
        let mut node: &Dictionary = self.document.get_dictionary(page_id).ok()?;
        // Bounded walk so a cyclic /Parent chain cannot loop forever.
        for _ in 0..64 {
            if let Ok(media_box) = node.get(b"MediaBox") {
                return Some(media_box);
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.document.get_dictionary(parent).ok()?;
        }
        None
    }
}

fn media_box_size(document: &Document, media_box: &Object) -> Option<(f32, f32)> {
    let (_, resolved) = document.dereference(media_box).ok()?;
    let values = resolved
        .as_array()
        .ok()?
        .iter()
        .map(|v| document.dereference(v).ok().and_then(|(_, v)| v.as_float().ok()))
        .collect::<Option<Vec<f32>>>()?;
    match values.as_slice() {
        [llx, lly, urx, ury] => Some(((urx - llx).abs(), (ury - lly).abs())),
        _ => None,
    }
}
