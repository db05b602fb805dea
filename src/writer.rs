//! Serializes a laid-out page sequence into a PDF byte stream.
//!
//! Layout space uses a top-left origin with y growing downwards; PDF uses a
//! bottom-left origin.  The translation between the two lives in [`pdf_y`]
//! so the convention is tested in one place instead of being spread through
//! the emission code.  Emission is atomic: any failure discards the
//! document and no partial bytes are returned.

use std::collections::HashMap;
use std::io::BufWriter;

use image::DynamicImage;
use printpdf::{IndirectFontRef, PdfDocument};

use crate::error::SerializationError;
use crate::fonts::FontRegistry;
use crate::images::{ColorMode, PreparedImage};
use crate::layout::{Layout, PlacedElement};
use crate::model::{PageSpec, POINTS_PER_INCH};

const MM_PER_INCH: f64 = 25.4;

// Prepared images are resized so one pixel covers one point; embedding at
// 72 dpi keeps that mapping without a second scaling step.
const EMBED_DPI: f64 = 72.0;

/// Converts a top-edge offset in layout space to the PDF y coordinate of an
/// element's bottom edge.
///
/// `top_pt` is the distance from the top of the page to the element's top;
/// `height_pt` is the element's height.  The result measures from the page
/// bottom, as PDF expects.
pub fn pdf_y(page_height_pt: f64, top_pt: f64, height_pt: f64) -> f64 {
    page_height_pt - top_pt - height_pt
}

fn pt_to_mm(value: f64) -> printpdf::Mm {
    printpdf::Mm(value / POINTS_PER_INCH * MM_PER_INCH)
}

/// Serializes `layout` into a single PDF byte stream.
///
/// Fonts referenced by the placed text are embedded as standard built-in
/// faces; prepared images are embedded as XObjects in their normalized
/// color mode.  Unknown fonts and unexpected color modes fail the whole
/// request with a [`SerializationError`].
pub fn write(
    layout: &Layout,
    prepared: &[PreparedImage],
    page: &PageSpec,
    registry: &FontRegistry,
    title: &str,
) -> Result<Vec<u8>, SerializationError> {
    let width = pt_to_mm(page.width_pt());
    let height = pt_to_mm(page.height_pt());
    let page_height_pt = page.height_pt();

    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, "content");

    let mut fonts: HashMap<(String, bool, bool), IndirectFontRef> = HashMap::new();

    for (page_index, laid_page) in layout.pages.iter().enumerate() {
        let layer = if page_index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_ref, layer_ref) = doc.add_page(width, height, "content");
            doc.get_page(page_ref).get_layer(layer_ref)
        };

        for element in &laid_page.elements {
            match element {
                PlacedElement::Text(text) => {
                    let face = registry.resolve(&text.font)?;
                    let key = (
                        text.font.family().to_ascii_lowercase(),
                        text.font.is_bold(),
                        text.font.is_italic(),
                    );
                    let font_ref = match fonts.get(&key) {
                        Some(font_ref) => font_ref.clone(),
                        None => {
                            let font_ref = doc.add_builtin_font(face.builtin()).map_err(|err| {
                                SerializationError::Backend {
                                    message: err.to_string(),
                                }
                            })?;
                            fonts.insert(key, font_ref.clone());
                            font_ref
                        }
                    };

                    // use_text positions the baseline, so the line's top
                    // offset shifts down by the face ascent.
                    let baseline_top = text.y + face.ascent(text.size);
                    let y = pdf_y(page_height_pt, baseline_top, 0.0);
                    layer.use_text(
                        text.text.clone(),
                        text.size,
                        pt_to_mm(text.x),
                        pt_to_mm(y),
                        &font_ref,
                    );
                }
                PlacedElement::Image(placed) => {
                    let source = &prepared[placed.image];
                    let encodable = match source.color() {
                        ColorMode::Rgb => matches!(source.pixels(), DynamicImage::ImageRgb8(_)),
                        ColorMode::Gray => matches!(source.pixels(), DynamicImage::ImageLuma8(_)),
                    };
                    if !encodable {
                        return Err(SerializationError::UnsupportedColorMode {
                            index: placed.image,
                        });
                    }

                    let embedded = printpdf::Image::from_dynamic_image(source.pixels());
                    let y = pdf_y(page_height_pt, placed.y, placed.height);
                    embedded.add_to_layer(
                        layer.clone(),
                        Some(pt_to_mm(placed.x)),
                        Some(pt_to_mm(y)),
                        None,
                        Some(placed.width / source.width_pt()),
                        Some(placed.height / source.height_pt()),
                        Some(EMBED_DPI),
                    );
                }
            }
        }
    }

    let mut bytes = Vec::new();
    doc.save(&mut BufWriter::new(&mut bytes))
        .map_err(|err| SerializationError::Backend {
            message: err.to_string(),
        })?;
    Ok(bytes)
}
