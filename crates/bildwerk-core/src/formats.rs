// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format registry — canonical format identification and capability lookup.
//
// Classification trusts what the host environment declared (MIME first, then
// filename extension). Content sniffing is separate: it reports what the
// bytes actually are, which may disagree with the declaration.

use tracing::debug;

use crate::types::{CanonicalFormat, SourceAsset};

/// ISO-BMFF major brands written by HEIC encoders.
const HEIC_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"hevm", b"hevs",
];

/// ISO-BMFF major brands for generic HEIF image containers.
const HEIF_BRANDS: &[&[u8; 4]] = &[b"mif1", b"msf1", b"heif"];

/// Stateless lookup of formats and the conversion paths between them.
pub struct FormatRegistry;

impl FormatRegistry {
    /// Classify an asset from its declared metadata.
    ///
    /// A recognised MIME type wins. An absent or unrecognised MIME falls
    /// through to the filename extension. `None` means unknown.
    pub fn classify(asset: &SourceAsset) -> Option<CanonicalFormat> {
        if let Some(format) = asset.declared_mime().and_then(CanonicalFormat::from_mime) {
            return Some(format);
        }

        let by_extension = asset
            .extension()
            .and_then(|ext| CanonicalFormat::from_extension(&ext));

        debug!(
            name = asset.display_name(),
            mime = asset.declared_mime().unwrap_or(""),
            format = ?by_extension,
            "classified by extension"
        );
        by_extension
    }

    /// Identify encoded bytes by their magic numbers.
    pub fn sniff(bytes: &[u8]) -> Option<CanonicalFormat> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(CanonicalFormat::Jpg);
        }
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(CanonicalFormat::Png);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(CanonicalFormat::Gif);
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(CanonicalFormat::Webp);
        }
        if bytes.starts_with(b"%PDF-") {
            return Some(CanonicalFormat::Pdf);
        }
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            let brand = &bytes[8..12];
            if HEIC_BRANDS.iter().any(|b| &b[..] == brand) {
                return Some(CanonicalFormat::Heic);
            }
            if HEIF_BRANDS.iter().any(|b| &b[..] == brand) {
                return Some(CanonicalFormat::Heif);
            }
        }
        None
    }

    /// Whether a defined transcoding path exists from `source` to `target`.
    ///
    /// Raster sources may go to any raster format with a local encoder, or
    /// into a PDF. PDF sources have no path (page export is not available),
    /// and formats without an encoder (gif, heic, heif) are never targets.
    pub fn is_allowed_pair(source: CanonicalFormat, target: CanonicalFormat) -> bool {
        if !source.is_raster() {
            return false;
        }
        target == CanonicalFormat::Pdf || target.has_local_encoder()
    }

    /// Whether `format` needs the external codec path.
    pub fn requires_external_codec(format: CanonicalFormat) -> bool {
        format.requires_external_codec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(mime: Option<&str>, name: Option<&str>) -> SourceAsset {
        let mut asset = SourceAsset::new(vec![0u8; 4]);
        if let Some(mime) = mime {
            asset = asset.with_mime(mime);
        }
        if let Some(name) = name {
            asset = asset.with_filename(name);
        }
        asset
    }

    #[test]
    fn mime_takes_priority_over_extension() {
        let a = asset(Some("image/png"), Some("photo.heic"));
        assert_eq!(FormatRegistry::classify(&a), Some(CanonicalFormat::Png));
    }

    #[test]
    fn extension_used_without_mime() {
        let a = asset(None, Some("IMG_0001.HEIC"));
        assert_eq!(FormatRegistry::classify(&a), Some(CanonicalFormat::Heic));
        let b = asset(None, Some("scan.jpeg"));
        assert_eq!(FormatRegistry::classify(&b), Some(CanonicalFormat::Jpg));
    }

    #[test]
    fn unrecognised_mime_falls_through_to_extension() {
        let a = asset(Some("application/octet-stream"), Some("x.webp"));
        assert_eq!(FormatRegistry::classify(&a), Some(CanonicalFormat::Webp));
    }

    #[test]
    fn unknown_extension_and_no_mime_is_unknown() {
        assert_eq!(FormatRegistry::classify(&asset(None, Some("notes.bmp"))), None);
        assert_eq!(FormatRegistry::classify(&asset(None, Some("README"))), None);
        assert_eq!(FormatRegistry::classify(&asset(None, None)), None);
    }

    #[test]
    fn sniffs_magic_numbers() {
        assert_eq!(
            FormatRegistry::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]),
            Some(CanonicalFormat::Jpg)
        );
        assert_eq!(FormatRegistry::sniff(b"GIF89a...."), Some(CanonicalFormat::Gif));
        assert_eq!(
            FormatRegistry::sniff(b"RIFF\x10\x00\x00\x00WEBPVP8 "),
            Some(CanonicalFormat::Webp)
        );
        assert_eq!(FormatRegistry::sniff(b"%PDF-1.7\n"), Some(CanonicalFormat::Pdf));
        assert_eq!(
            FormatRegistry::sniff(b"\x00\x00\x00\x18ftypheic\x00\x00\x00\x00"),
            Some(CanonicalFormat::Heic)
        );
        assert_eq!(
            FormatRegistry::sniff(b"\x00\x00\x00\x18ftypmif1\x00\x00\x00\x00"),
            Some(CanonicalFormat::Heif)
        );
        assert_eq!(
            FormatRegistry::sniff(b"\x00\x00\x00\x18ftypavif\x00\x00\x00\x00"),
            None
        );
        assert_eq!(FormatRegistry::sniff(b""), None);
    }

    #[test]
    fn pair_rules() {
        use CanonicalFormat::*;
        assert!(FormatRegistry::is_allowed_pair(Heic, Jpg));
        assert!(FormatRegistry::is_allowed_pair(Png, Webp));
        assert!(FormatRegistry::is_allowed_pair(Gif, Pdf));
        assert!(FormatRegistry::is_allowed_pair(Webp, Png));
        assert!(!FormatRegistry::is_allowed_pair(Png, Gif));
        assert!(!FormatRegistry::is_allowed_pair(Jpg, Heic));
        assert!(!FormatRegistry::is_allowed_pair(Pdf, Png));
        assert!(!FormatRegistry::is_allowed_pair(Pdf, Pdf));
    }
}
