// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bildwerk — local image and document converter.
//
// Entry point. Initialises logging, loads configuration, and maps command-line
// arguments onto conversion requests.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bildwerk_core::human_errors::humanize_error;
use bildwerk_core::{CanonicalFormat, ConversionRequest, ConverterConfig, PageMode, SourceAsset};
use bildwerk_document::{Converter, PdfInspector};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Convert HEIC, HEIF, JPG, PNG, WebP and GIF images, or combine them into a PDF.
#[derive(Parser, Debug)]
#[command(name = "bildwerk", version, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "BILDWERK_VERBOSE")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one image to another format, or several images into one PDF.
    Convert(ConvertArgs),
    /// Print the page count and page sizes of a PDF.
    Inspect {
        /// PDF file to inspect.
        file: PathBuf,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Input files. Several files are only allowed with `--to pdf`.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Target format: jpg, png, webp or pdf.
    #[arg(long)]
    to: CanonicalFormat,

    /// Output quality between 0 and 1.
    #[arg(short, long)]
    quality: Option<f32>,

    /// Page size for PDF output: a4, letter or fit.
    #[arg(long)]
    page_size: Option<PageMode>,

    /// Margin around each image on fixed-size pages, in points.
    #[arg(long)]
    margin: Option<f32>,

    /// Keep quality high instead of favouring small files.
    #[arg(long)]
    no_compress: bool,

    /// JSON configuration file.
    #[arg(long, env = "BILDWERK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory to write the result into.
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Convert(args) => convert(args).await,
        Command::Inspect { file, json } => inspect(&file, json).await,
    }
}

async fn convert(args: ConvertArgs) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => ConverterConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConverterConfig::default(),
    };

    let mut assets = Vec::with_capacity(args.files.len());
    for path in &args.files {
        assets.push(read_asset(path).await?);
    }

    let mut request = ConversionRequest::new(args.to, assets).with_compress(!args.no_compress);
    if let Some(quality) = args.quality {
        request = request.with_quality(quality);
    }
    if let Some(mode) = args.page_size {
        request = request.with_page_mode(mode);
    }
    if let Some(margin) = args.margin {
        request = request.with_margin(margin);
    }

    let converter = Converter::with_defaults(config);
    let result = match converter.convert(&request).await {
        Ok(result) => result,
        Err(err) => {
            let human = humanize_error(&err);
            tracing::debug!(kind = %human.kind, error = %err, "conversion failed");
            let resource = &converter.config().heif_codec.resource;
            if let Some(load_err) = converter.registry().last_error(resource) {
                tracing::debug!(%resource, error = %load_err, "codec acquisition failure");
            }
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            return Ok(ExitCode::FAILURE);
        }
    };

    tokio::fs::create_dir_all(&args.out)
        .await
        .with_context(|| format!("Failed to create {}", args.out.display()))?;
    let target = args.out.join(&result.filename);
    tokio::fs::write(&target, &result.bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    match result.page_count {
        Some(pages) => println!(
            "{} ({pages} pages, {} bytes, sha256 {})",
            target.display(),
            result.bytes.len(),
            result.sha256
        ),
        None => println!(
            "{} ({} bytes, sha256 {})",
            target.display(),
            result.bytes.len(),
            result.sha256
        ),
    }
    Ok(ExitCode::SUCCESS)
}

async fn inspect(path: &Path, json: bool) -> Result<ExitCode> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let inspector = match PdfInspector::from_bytes(&bytes) {
        Ok(inspector) => inspector,
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            return Ok(ExitCode::FAILURE);
        }
    };
    let sizes = inspector
        .page_sizes()
        .with_context(|| format!("Failed to read page sizes from {}", path.display()))?;

    if json {
        let report = serde_json::json!({
            "file": path.display().to_string(),
            "pages": inspector.page_count(),
            "page_sizes_pt": sizes,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        println!("File:   {}", path.display());
        println!("Pages:  {}", inspector.page_count());
        for (index, (width, height)) in sizes.iter().enumerate() {
            println!("  {:>3}: {width:.2} x {height:.2} pt", index + 1);
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn read_asset(path: &Path) -> Result<SourceAsset> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut asset = SourceAsset::new(bytes);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        asset = asset.with_filename(name);
    }
    Ok(asset)
}
