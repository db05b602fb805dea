//! Image preprocessing: raw bytes in, embeddable pixel buffers out.
//!
//! Decoding is delegated to the [`image`] crate.  Before the full decode the
//! byte stream's dimensions are probed so decompression-bomb inputs are
//! rejected against the configured pixel ceiling without materializing the
//! pixel data.  Alpha channels are flattened against an opaque white
//! background because PDF image XObjects carry no transparency in the form
//! the writer emits.
//!
//! The preprocessor performs no disk or network I/O and holds no state; a
//! [`PreparedImage`] lives only until the writer consumes it.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageBuffer};

use crate::error::ImageError;
use crate::model::PlacementMode;

/// Color model of a prepared pixel buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    /// 8-bit RGB.
    Rgb,
    /// 8-bit grayscale.
    Gray,
}

/// An image normalized and resized for embedding.
#[derive(Debug)]
pub struct PreparedImage {
    pixels: DynamicImage,
    color: ColorMode,
    box_width_pt: f64,
    box_height_pt: f64,
}

impl PreparedImage {
    /// Returns the normalized pixel buffer.
    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    /// Returns the resolved color mode.
    pub fn color(&self) -> ColorMode {
        self.color
    }

    /// Final width in pixels.
    pub fn width_px(&self) -> u32 {
        self.pixels.width()
    }

    /// Final height in pixels.
    pub fn height_px(&self) -> u32 {
        self.pixels.height()
    }

    /// Width of the target box in points.
    pub fn box_width_pt(&self) -> f64 {
        self.box_width_pt
    }

    /// Height of the target box in points.
    pub fn box_height_pt(&self) -> f64 {
        self.box_height_pt
    }

    /// Final width in points.  Pixels map 1:1 to points at 72 dpi.
    pub fn width_pt(&self) -> f64 {
        f64::from(self.width_px())
    }

    /// Final height in points.
    pub fn height_pt(&self) -> f64 {
        f64::from(self.height_px())
    }
}

/// Decodes, normalizes and resizes one image block's bytes.
///
/// `index` is the block's position in the document and only feeds error
/// reports.  The target box is given in points and converted to pixels at
/// 72 dpi, so the prepared buffer embeds without further scaling.
pub fn prepare(
    index: usize,
    bytes: &[u8],
    box_width_pt: f64,
    box_height_pt: f64,
    placement: PlacementMode,
    max_pixels: u64,
) -> Result<PreparedImage, ImageError> {
    let (width, height) = probe_dimensions(index, bytes)?;
    if u64::from(width) * u64::from(height) > max_pixels {
        return Err(ImageError::TooLarge {
            index,
            width,
            height,
            max_pixels,
        });
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|source| ImageError::UnsupportedFormat { index, source })?;

    let (flattened, color) = flatten(decoded);

    let box_width_px = (box_width_pt.round().max(1.0)) as u32;
    let box_height_px = (box_height_pt.round().max(1.0)) as u32;

    let resized = match placement {
        PlacementMode::Fit => flattened.resize(box_width_px, box_height_px, FilterType::Triangle),
        PlacementMode::Fill => {
            flattened.resize_to_fill(box_width_px, box_height_px, FilterType::Triangle)
        }
        PlacementMode::Stretch => {
            flattened.resize_exact(box_width_px, box_height_px, FilterType::Triangle)
        }
    };

    Ok(PreparedImage {
        pixels: resized,
        color,
        box_width_pt,
        box_height_pt,
    })
}

/// Reads the pixel dimensions from the stream header without a full decode.
fn probe_dimensions(index: usize, bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    let reader = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| ImageError::UnsupportedFormat {
            index,
            source: image::ImageError::IoError(err),
        })?;
    reader
        .into_dimensions()
        .map_err(|source| ImageError::UnsupportedFormat { index, source })
}

/// Resolves the output color model and flattens any alpha channel over white.
fn flatten(decoded: DynamicImage) -> (DynamicImage, ColorMode) {
    match decoded.color() {
        ColorType::L8 | ColorType::L16 => (DynamicImage::ImageLuma8(decoded.to_luma8()), ColorMode::Gray),
        ColorType::La8 | ColorType::La16 => {
            let rgba = decoded.to_rgba8();
            let gray = ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
                let px = rgba.get_pixel(x, y);
                let value = composite_over_white(px[0], px[3]);
                image::Luma([value])
            });
            (DynamicImage::ImageLuma8(gray), ColorMode::Gray)
        }
        color if color.has_alpha() => {
            let rgba = decoded.to_rgba8();
            let rgb = ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
                let px = rgba.get_pixel(x, y);
                image::Rgb([
                    composite_over_white(px[0], px[3]),
                    composite_over_white(px[1], px[3]),
                    composite_over_white(px[2], px[3]),
                ])
            });
            (DynamicImage::ImageRgb8(rgb), ColorMode::Rgb)
        }
        _ => (DynamicImage::ImageRgb8(decoded.to_rgb8()), ColorMode::Rgb),
    }
}

/// Alpha-composites a single channel value over a white background.
fn composite_over_white(channel: u8, alpha: u8) -> u8 {
    let a = f64::from(alpha) / 255.0;
    let value = f64::from(channel) * a + 255.0 * (1.0 - a);
    value.round().clamp(0.0, 255.0) as u8
}
