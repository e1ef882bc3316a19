// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subprocess-backed external codec.
//
// The resource locator is an executable (e.g. libheif's `heif-convert`).
// Acquisition probes it once; conversion runs it against temporary files:
//
//     <program> -q <0..100> <input> <output.jpg|output.png>

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use bildwerk_core::{CanonicalFormat, FormatRegistry};
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::traits::{CodecLoadError, CodecLoader, ExternalCodec, ExternalCodecError};

/// Acquires [`CommandCodec`]s by probing the named executable.
pub struct CommandCodecLoader {
    probe_args: Vec<String>,
}

impl CommandCodecLoader {
    pub fn new(probe_args: Vec<String>) -> Self {
        Self { probe_args }
    }
}

#[async_trait]
impl CodecLoader for CommandCodecLoader {
    /// Spawn failures are acquisition errors; a probe that runs but exits
    /// non-zero means the program is not the capability we expected.
    #[instrument(skip(self))]
    async fn load(&self, resource_id: &str) -> Result<Arc<dyn ExternalCodec>, CodecLoadError> {
        let output = Command::new(resource_id)
            .args(&self.probe_args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| {
                CodecLoadError::Acquisition(format!("cannot run {resource_id}: {err}"))
            })?;

        if !output.status.success() {
            return Err(CodecLoadError::MissingCapability(format!(
                "{resource_id} probe exited with {}",
                output.status
            )));
        }

        info!(program = resource_id, "external codec probed");
        Ok(Arc::new(CommandCodec::new(resource_id)))
    }
}

/// Converts HEIC/HEIF by running an external program.
pub struct CommandCodec {
    program: String,
}

impl CommandCodec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ExternalCodec for CommandCodec {
    fn name(&self) -> &str {
        &self.program
    }

    #[instrument(skip(self, bytes), fields(program = %self.program, bytes_len = bytes.len()))]
    async fn transcode(
        &self,
        bytes: &[u8],
        target: CanonicalFormat,
        quality: f32,
    ) -> Result<Vec<u8>, ExternalCodecError> {
        // Files labelled HEIC are sometimes plain JPEG/PNG underneath.
        if let Some(actual) = FormatRegistry::sniff(bytes).filter(|f| f.decodes_locally()) {
            debug!(actual = %actual, "input is not a HEIF container");
            return Err(ExternalCodecError::AlreadyDecodable);
        }

        if !matches!(target, CanonicalFormat::Jpg | CanonicalFormat::Png) {
            return Err(ExternalCodecError::Failed(format!(
                "{} cannot write {target}",
                self.program
            )));
        }

        let dir = tempfile::tempdir()
            .map_err(|err| ExternalCodecError::Failed(format!("temp dir: {err}")))?;
        let input = dir.path().join("input.heic");
        let output = dir.path().join(format!("output.{}", target.extension()));

        tokio::fs::write(&input, bytes)
            .await
            .map_err(|err| ExternalCodecError::Failed(format!("writing input: {err}")))?;

        let quality_pct = (quality.clamp(0.0, 1.0) * 100.0).round() as u32;
        let run = Command::new(&self.program)
            .arg("-q")
            .arg(quality_pct.to_string())
            .arg(&input)
            .arg(&output)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| ExternalCodecError::Failed(format!("cannot run {}: {err}", self.program)))?;

        if !run.status.success() {
            let stderr = String::from_utf8_lossy(&run.stderr);
            return Err(ExternalCodecError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                run.status,
                stderr.trim()
            )));
        }

        let encoded = tokio::fs::read(&output)
            .await
            .map_err(|err| ExternalCodecError::Failed(format!("reading output: {err}")))?;
        debug!(output_len = encoded.len(), quality_pct, "external transcode complete");
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEIC_HEADER: &[u8] = b"\x00\x00\x00\x18ftypheic\x00\x00\x00\x00mif1heic";

    #[tokio::test]
    async fn jpeg_bytes_signal_already_decodable() {
        let codec = CommandCodec::new("definitely-not-installed-bildwerk");
        let jpeg_header = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

        let err = codec
            .transcode(&jpeg_header, CanonicalFormat::Jpg, 0.9)
            .await
            .unwrap_err();
        assert_eq!(err, ExternalCodecError::AlreadyDecodable);
    }

    #[tokio::test]
    async fn unsupported_target_fails() {
        let codec = CommandCodec::new("definitely-not-installed-bildwerk");
        let err = codec
            .transcode(HEIC_HEADER, CanonicalFormat::Webp, 0.9)
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalCodecError::Failed(_)));
    }

    #[tokio::test]
    async fn missing_program_is_an_acquisition_error() {
        let loader = CommandCodecLoader::new(vec!["--version".into()]);
        let err = loader.load("definitely-not-installed-bildwerk").await.err().unwrap();
        assert!(matches!(err, CodecLoadError::Acquisition(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_probe_means_capability_missing() {
        let loader = CommandCodecLoader::new(Vec::new());
        let err = loader.load("false").await.err().unwrap();
        assert!(matches!(err, CodecLoadError::MissingCapability(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_program_is_a_genuine_failure() {
        let loader = CommandCodecLoader::new(Vec::new());
        let codec = loader.load("true").await.unwrap();
        // `true` exits 0 without writing output, so reading it back fails.
        let err = codec
            .transcode(HEIC_HEADER, CanonicalFormat::Jpg, 0.9)
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalCodecError::Failed(_)));

        let failing = CommandCodec::new("false");
        let err = failing
            .transcode(HEIC_HEADER, CanonicalFormat::Png, 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalCodecError::Failed(_)));
    }
}
