// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bildwerk conversion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of formats the pipeline recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalFormat {
    Heic,
    Heif,
    Jpg,
    Png,
    Webp,
    Gif,
    Pdf,
}

impl CanonicalFormat {
    /// Every recognised format, in declaration order.
    pub const ALL: [CanonicalFormat; 7] = [
        Self::Heic,
        Self::Heif,
        Self::Jpg,
        Self::Png,
        Self::Webp,
        Self::Gif,
        Self::Pdf,
    ];

    /// MIME type string used for output labelling.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Heic => "image/heic",
            Self::Heif => "image/heif",
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
            Self::Pdf => "application/pdf",
        }
    }

    /// Canonical file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Heic => "heic",
            Self::Heif => "heif",
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Pdf => "pdf",
        }
    }

    /// Infer a format from a MIME type. Parameters (`; charset=...`) and
    /// case are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/heic" | "image/heic-sequence" => Some(Self::Heic),
            "image/heif" | "image/heif-sequence" => Some(Self::Heif),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            "application/pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Infer a format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "heic" => Some(Self::Heic),
            "heif" => Some(Self::Heif),
            "jpg" | "jpeg" | "jpe" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Whether this is a raster image format (everything except PDF).
    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::Pdf)
    }

    /// Camera-native formats that need an external codec to decode.
    pub fn requires_external_codec(&self) -> bool {
        matches!(self, Self::Heic | Self::Heif)
    }

    /// Raster formats the local transcoder can decode without help.
    pub fn decodes_locally(&self) -> bool {
        matches!(self, Self::Jpg | Self::Png | Self::Webp | Self::Gif)
    }

    /// Raster formats the local transcoder can encode.
    pub fn has_local_encoder(&self) -> bool {
        matches!(self, Self::Jpg | Self::Png | Self::Webp)
    }

    /// Whether encoded output can carry an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, Self::Jpg | Self::Pdf)
    }
}

impl std::fmt::Display for CanonicalFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for CanonicalFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| format!("unknown format '{s}'"))
    }
}

/// One user-supplied file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    bytes: Vec<u8>,
    declared_mime: Option<String>,
    filename: Option<String>,
}

impl SourceAsset {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            declared_mime: None,
            filename: None,
        }
    }

    /// Attach the MIME type the host environment reported for the file.
    /// Empty strings are treated as "not declared".
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        self.declared_mime = if mime.trim().is_empty() {
            None
        } else {
            Some(mime)
        };
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        self.filename = if filename.is_empty() {
            None
        } else {
            Some(filename)
        };
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn declared_mime(&self) -> Option<&str> {
        self.declared_mime.as_deref()
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Lower-cased extension of the filename, if it has one.
    pub fn extension(&self) -> Option<String> {
        let name = self.filename.as_deref()?;
        let leaf = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let (stem, ext) = leaf.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Filename with its last extension removed (`holiday.photo.heic` →
    /// `holiday.photo`). Directory components are dropped.
    pub fn base_name(&self) -> Option<String> {
        let name = self.filename.as_deref()?;
        let leaf = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let base = match leaf.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => leaf,
        };
        if base.is_empty() {
            None
        } else {
            Some(base.to_string())
        }
    }

    /// Name used in log lines and error messages.
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("<unnamed>")
    }
}

/// Fixed page sizes for document assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    A4,
    Letter,
}

impl PageSize {
    /// Portrait dimensions in PDF points (width, height).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match self {
            Self::A4 => (595.28, 841.89),
            Self::Letter => (612.0, 792.0),
        }
    }
}

/// How pages are sized when assembling a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageMode {
    /// Every page has the same fixed size; images are shrunk to fit the
    /// content box and centred.
    Fixed(PageSize),
    /// Each page takes the pixel dimensions of its image, one point per pixel.
    FitToImage,
}

impl Default for PageMode {
    fn default() -> Self {
        Self::Fixed(PageSize::A4)
    }
}

impl std::str::FromStr for PageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a4" => Ok(Self::Fixed(PageSize::A4)),
            "letter" => Ok(Self::Fixed(PageSize::Letter)),
            "fit" | "fit-image" | "fit-to-image" => Ok(Self::FitToImage),
            other => Err(format!("unknown page size '{other}'")),
        }
    }
}

/// A request to convert one or more assets to a target format.
///
/// Unset options fall back to the converter's configuration.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub target: CanonicalFormat,
    /// Requested quality in [0, 1].
    pub quality: Option<f32>,
    /// When false, quality is raised to the configured floor.
    pub compress: bool,
    pub page_mode: Option<PageMode>,
    /// Margin around the content box in fixed page mode, in points.
    pub margin_pt: Option<f32>,
    pub assets: Vec<SourceAsset>,
}

impl ConversionRequest {
    pub fn new(target: CanonicalFormat, assets: Vec<SourceAsset>) -> Self {
        Self {
            target,
            quality: None,
            compress: true,
            page_mode: None,
            margin_pt: None,
            assets,
        }
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_page_mode(mut self, mode: PageMode) -> Self {
        self.page_mode = Some(mode);
        self
    }

    pub fn with_margin(mut self, margin_pt: f32) -> Self {
        self.margin_pt = Some(margin_pt);
        self
    }

    /// Whether this request assembles images into a document.
    pub fn is_document_assembly(&self) -> bool {
        self.target == CanonicalFormat::Pdf
    }
}

/// Output of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub job_id: JobId,
    pub bytes: Vec<u8>,
    pub format: CanonicalFormat,
    pub mime_type: &'static str,
    pub filename: String,
    /// Number of pages, for document output.
    pub page_count: Option<usize>,
    /// SHA-256 of `bytes`, lowercase hex.
    pub sha256: String,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_parameters_and_aliases() {
        assert_eq!(
            CanonicalFormat::from_mime("image/JPEG; q=1"),
            Some(CanonicalFormat::Jpg)
        );
        assert_eq!(
            CanonicalFormat::from_mime("image/pjpeg"),
            Some(CanonicalFormat::Jpg)
        );
        assert_eq!(
            CanonicalFormat::from_mime("image/heic-sequence"),
            Some(CanonicalFormat::Heic)
        );
        assert_eq!(CanonicalFormat::from_mime("image/bmp"), None);
    }

    #[test]
    fn base_name_strips_last_extension() {
        let asset = SourceAsset::new(vec![1]).with_filename("trip/holiday.photo.HEIC");
        assert_eq!(asset.base_name().as_deref(), Some("holiday.photo"));
        assert_eq!(asset.extension().as_deref(), Some("heic"));

        let dotfile = SourceAsset::new(vec![1]).with_filename(".hidden");
        assert_eq!(dotfile.extension(), None);
        assert_eq!(dotfile.base_name().as_deref(), Some(".hidden"));

        let unnamed = SourceAsset::new(vec![1]);
        assert_eq!(unnamed.base_name(), None);
    }

    #[test]
    fn empty_mime_is_not_declared() {
        let asset = SourceAsset::new(vec![]).with_mime("  ");
        assert_eq!(asset.declared_mime(), None);
    }

    #[test]
    fn page_mode_parsing() {
        assert_eq!("letter".parse::<PageMode>(), Ok(PageMode::Fixed(PageSize::Letter)));
        assert_eq!("fit-image".parse::<PageMode>(), Ok(PageMode::FitToImage));
        assert!("a3".parse::<PageMode>().is_err());
    }
}
