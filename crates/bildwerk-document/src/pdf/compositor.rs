// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page compositor — assemble ordered rasters into one multi-page PDF using
// `printpdf` 0.8.
//
// Page N of the output holds image N of the input. Images are placed at 72 dpi
// so one pixel is one point before scaling. Transparent regions are painted
// white. Page images are stored as JPEG (DCTDecode) at the job's quality.

use bildwerk_core::PageMode;
use bildwerk_core::error::{ConversionError, Result};
use printpdf::{
    ImageCompression, ImageOptimizationOptions, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions,
    PdfWarnMsg, Pt, RawImage, RawImageData, RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use crate::image::raster::RasterImage;

/// Placement of one image on its page, in PDF points. The origin is the
/// bottom-left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub x_pt: f32,
    pub y_pt: f32,
    pub render_width_pt: f32,
    pub render_height_pt: f32,
    /// Factor applied to the image's natural size (1 pt per pixel).
    pub scale: f32,
}

impl PageGeometry {
    pub fn is_landscape(&self) -> bool {
        self.page_width_pt > self.page_height_pt
    }
}

/// Builds multi-page PDFs from decoded rasters.
#[derive(Debug, Default)]
pub struct PageCompositor {
    /// Title metadata embedded in the PDF /Info dictionary.
    title: Option<String>,
}

impl PageCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Compute where an image of `width`×`height` pixels lands on its page.
    ///
    /// Fixed mode shrinks the image uniformly to fit the content box (the
    /// page minus `margin_pt` on every side), never enlarging it, and centres
    /// it. Fit-to-image mode makes the page exactly the image's size with no
    /// margin. Negative or non-finite margins count as zero; margins that
    /// would leave no content box are capped.
    pub fn layout(mode: PageMode, margin_pt: f32, width: u32, height: u32) -> PageGeometry {
        let (img_w, img_h) = (width as f32, height as f32);

        match mode {
            PageMode::FitToImage => PageGeometry {
                page_width_pt: img_w,
                page_height_pt: img_h,
                x_pt: 0.0,
                y_pt: 0.0,
                render_width_pt: img_w,
                render_height_pt: img_h,
                scale: 1.0,
            },
            PageMode::Fixed(size) => {
                let (page_w, page_h) = size.dimensions_pt();
                let margin = clamp_margin(margin_pt, page_w.min(page_h));
                let content_w = page_w - 2.0 * margin;
                let content_h = page_h - 2.0 * margin;

                let ratio = (content_w / img_w).min(content_h / img_h).min(1.0);
                let render_w = img_w * ratio;
                let render_h = img_h * ratio;

                PageGeometry {
                    page_width_pt: page_w,
                    page_height_pt: page_h,
                    x_pt: margin + (content_w - render_w) / 2.0,
                    y_pt: margin + (content_h - render_h) / 2.0,
                    render_width_pt: render_w,
                    render_height_pt: render_h,
                    scale: ratio,
                }
            }
        }
    }

    /// Assemble `images` into a PDF, one page per image in input order.
    ///
    /// Each page image is JPEG-encoded at `quality` (0.0 to 1.0), so lower
    /// values give smaller documents. Pages keep their full pixel resolution.
    ///
    /// Fails with `NoValidInput` for an empty sequence and `DecodeError` for
    /// an image with a zero dimension.
    #[instrument(skip(self, images), fields(pages = images.len()))]
    pub fn compose(
        &self,
        images: &[RasterImage],
        mode: PageMode,
        margin_pt: f32,
        quality: f32,
    ) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(ConversionError::NoValidInput(
                "no images to assemble into a document".into(),
            ));
        }

        let title = self.title.as_deref().unwrap_or("Bildwerk Document");
        info!(title, "Composing PDF");

        let mut doc = PdfDocument::new(title);
        let mut pages: Vec<PdfPage> = Vec::with_capacity(images.len());

        for (index, image) in images.iter().enumerate() {
            let (width, height) = image.dimensions();
            if width == 0 || height == 0 {
                return Err(ConversionError::DecodeError(format!(
                    "image {} has no pixels ({width}x{height})",
                    index + 1
                )));
            }

            let geometry = Self::layout(mode, margin_pt, width, height);
            let raw = RawImage {
                pixels: RawImageData::U8(image.flatten_onto_white().into_raw()),
                width: width as usize,
                height: height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(geometry.x_pt)),
                    translate_y: Some(Pt(geometry.y_pt)),
                    scale_x: Some(geometry.scale),
                    scale_y: Some(geometry.scale),
                    dpi: Some(72.0),
                    rotate: None,
                },
            }];

            debug!(
                page = index + 1,
                width,
                height,
                scale = geometry.scale,
                landscape = geometry.is_landscape(),
                "Image placed on page"
            );
            pages.push(PdfPage::new(
                pt_to_mm(geometry.page_width_pt),
                pt_to_mm(geometry.page_height_pt),
                ops,
            ));
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let options = save_options(quality);
        let output = doc.save(&options, &mut warnings);
        debug!(output_len = output.len(), warnings = warnings.len(), "PDF serialised");

        Ok(output)
    }
}

/// printpdf options that store every page image as a JPEG at `quality`.
/// Resizing and greyscale detection stay off so pages match their source.
fn save_options(quality: f32) -> PdfSaveOptions {
    let quality = if quality.is_finite() {
        quality.clamp(0.0, 1.0)
    } else {
        1.0
    };
    PdfSaveOptions {
        image_optimization: Some(ImageOptimizationOptions {
            quality: Some(quality),
            max_image_size: None,
            dither_greyscale: Some(false),
            convert_to_greyscale: Some(false),
            auto_optimize: Some(false),
            format: Some(ImageCompression::Jpeg),
        }),
        ..PdfSaveOptions::default()
    }
}

fn clamp_margin(margin_pt: f32, min_page_side: f32) -> f32 {
    if !margin_pt.is_finite() {
        return 0.0;
    }
    margin_pt.clamp(0.0, (min_page_side / 2.0 - 1.0).max(0.0))
}

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}
