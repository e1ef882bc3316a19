// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the presentation layer.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how the UI presents it.

use crate::error::{ConversionError, ErrorKind};
use crate::types::CanonicalFormat;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something outside the file went wrong; trying again may work.
    Transient,
    /// The user can fix it (pick another file, target, or size).
    ActionRequired,
    /// The file itself cannot be converted.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Stable tag, mirrored from [`ConversionError::kind`].
    pub kind: ErrorKind,
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same request might succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `ConversionError` into a `HumanError`.
pub fn humanize_error(err: &ConversionError) -> HumanError {
    let kind = err.kind();
    match err {
        ConversionError::UnsupportedFormat(detail) => HumanError {
            kind,
            message: "This file type can't be converted here.".into(),
            suggestion: format!(
                "Choose a HEIC, HEIF, JPG, PNG, WebP or GIF image and a JPG, PNG, WebP or PDF target. ({detail})"
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ConversionError::SizeLimitExceeded { name, limit, .. } => HumanError {
            kind,
            message: format!("\"{name}\" is too large."),
            suggestion: format!(
                "Files up to {} MB are supported. Try a smaller or more compressed file.",
                limit / (1024 * 1024)
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ConversionError::NoValidInput(_) => HumanError {
            kind,
            message: "No images to convert.".into(),
            suggestion: "Select at least one image file, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ConversionError::CodecUnavailable { .. } => HumanError {
            kind,
            message: "HEIC support isn't available right now.".into(),
            suggestion: "The HEIC decoder could not be loaded. Check it is installed, then try again."
                .into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ConversionError::DecodeError(_) => HumanError {
            kind,
            message: "There's a problem with this image.".into(),
            suggestion: "The file may be damaged or not really the type its name says. Try opening it in another app and saving it as JPG or PNG.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ConversionError::EncoderMissing(format) => HumanError {
            kind,
            message: format!("Saving as {} isn't supported.", format.extension().to_uppercase()),
            suggestion: format!("Choose {} as the target format instead.", alternatives(*format)),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ConversionError::EncodeError(_) => HumanError {
            kind,
            message: "The converted image couldn't be created.".into(),
            suggestion: "Try a different target format, or lower the quality setting.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ConversionError::Io(_) | ConversionError::Serialization(_) => HumanError {
            kind,
            message: "Something went wrong reading or writing a file.".into(),
            suggestion: format!("Check the file and settings, then try again. ({err})"),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Target formats that do have an encoder, excluding `missing`.
fn alternatives(missing: CanonicalFormat) -> String {
    let names: Vec<&str> = CanonicalFormat::ALL
        .iter()
        .filter(|f| f.has_local_encoder() && **f != missing)
        .map(|f| f.extension())
        .collect();
    names.join(", ").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_encoder_suggests_other_targets() {
        let human = humanize_error(&ConversionError::EncoderMissing(CanonicalFormat::Gif));
        assert_eq!(human.kind, ErrorKind::EncodeError);
        assert!(human.suggestion.contains("JPG"));
        assert!(human.suggestion.contains("PNG"));
        assert!(!human.suggestion.contains("GIF"));
    }

    #[test]
    fn size_limit_reports_megabytes() {
        let human = humanize_error(&ConversionError::SizeLimitExceeded {
            name: "big.png".into(),
            size: 30 * 1024 * 1024,
            limit: 20 * 1024 * 1024,
        });
        assert!(human.message.contains("big.png"));
        assert!(human.suggestion.contains("20 MB"));
        assert!(!human.retriable);
    }

    #[test]
    fn codec_unavailable_is_retriable() {
        let human = humanize_error(&ConversionError::CodecUnavailable {
            resource: "heif-convert".into(),
            reason: "not found".into(),
        });
        assert!(human.retriable);
        assert_eq!(human.severity, Severity::Transient);
    }
}
