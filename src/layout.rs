//! The layout engine: flows validated blocks across pages.
//!
//! Layout space is measured in points with a top-left origin and the y axis
//! growing downwards; the writer owns the translation into PDF coordinates.
//! [`paginate`] is a pure function of its inputs — identical documents,
//! prepared images and options always yield an identical page sequence.
//!
//! Page-break rules:
//!
//! - an element that fits exactly at the remaining-space boundary stays on
//!   the current page;
//! - a text block that does not fit the remaining space moves to a fresh
//!   page intact when it can, and is otherwise split at line boundaries
//!   (never mid-line);
//! - a single line or image taller than the whole content area is placed
//!   clipped and recorded as an overflow warning rather than failing.

use log::warn;

use crate::error::{OverflowWarning, SerializationError};
use crate::fonts::{Face, FontDescriptor, FontRegistry};
use crate::images::PreparedImage;
use crate::model::{Alignment, Block, Document};

// Tolerance for boundary comparisons so exact fits never trigger a break.
const EPSILON: f64 = 1e-6;

/// Options that shape pagination independently of the document.
#[derive(Clone, Copy, Debug)]
pub struct LayoutOptions {
    /// Vertical gap inserted between consecutive blocks on a page, in points.
    pub block_spacing_pt: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            block_spacing_pt: 8.0,
        }
    }
}

/// One wrapped line of text at an absolute position.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedText {
    /// Distance from the left page edge to the line start, in points.
    pub x: f64,
    /// Distance from the top page edge to the top of the line box, in points.
    pub y: f64,
    /// The line content, without a trailing newline.
    pub text: String,
    /// Font of the originating block.
    pub font: FontDescriptor,
    /// Font size in points.
    pub size: f64,
}

/// One prepared image at an absolute position.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedImage {
    /// Distance from the left page edge to the image's left edge, in points.
    pub x: f64,
    /// Distance from the top page edge to the image's top edge, in points.
    pub y: f64,
    /// Drawn width in points.
    pub width: f64,
    /// Drawn height in points.
    pub height: f64,
    /// Index into the prepared-image sequence handed to [`paginate`].
    pub image: usize,
}

/// An element placed on a page.
#[derive(Clone, Debug, PartialEq)]
pub enum PlacedElement {
    /// A single line of text.
    Text(PlacedText),
    /// A prepared image.
    Image(PlacedImage),
}

/// One physical output page with absolutely-positioned elements.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    /// Elements in placement order.
    pub elements: Vec<PlacedElement>,
}

/// The full pagination result.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    /// Pages in order; never empty for a valid document.
    pub pages: Vec<Page>,
    /// Non-fatal clipping reports collected during pagination.
    pub warnings: Vec<OverflowWarning>,
}

impl Layout {
    /// Number of produced pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

struct Cursor {
    pages: Vec<Page>,
    current: Vec<PlacedElement>,
    y: f64,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: 0.0,
        }
    }

    fn page_number(&self) -> usize {
        self.pages.len() + 1
    }

    fn break_page(&mut self) {
        let number = self.page_number();
        self.pages.push(Page {
            number,
            elements: std::mem::take(&mut self.current),
        });
        self.y = 0.0;
    }

    fn finish(mut self) -> Vec<Page> {
        self.break_page();
        self.pages
    }
}

/// Flows the document's blocks into a deterministic page sequence.
///
/// `prepared` must contain one entry per image block, in block order; the
/// pipeline guarantees this by preprocessing before layout.  Font
/// resolution failures surface as the writer's embedding error since they
/// describe the same defect.
pub fn paginate(
    document: &Document,
    prepared: &[PreparedImage],
    registry: &FontRegistry,
    options: &LayoutOptions,
) -> Result<Layout, SerializationError> {
    let page = document.page();
    let content_width = page.content_width_pt();
    let content_height = page.content_height_pt();
    let margin = page.margin_pt();

    let mut cursor = Cursor::new();
    let mut warnings = Vec::new();
    let mut next_image = 0;

    for (block_index, block) in document.blocks().iter().enumerate() {
        // Spacing only separates blocks that share a page.
        if !cursor.current.is_empty() {
            cursor.y += options.block_spacing_pt;
        }

        match block {
            Block::Text(text) => {
                let face = registry.resolve(text.font())?;
                let lines = wrap(&face, text.size(), text.content(), content_width);
                let line_height = face.line_height(text.size());
                let block_height = lines.len() as f64 * line_height;

                // Move the whole block to a fresh page when it fits there;
                // otherwise it will split at line boundaries below.
                if block_height > content_height - cursor.y + EPSILON
                    && block_height <= content_height + EPSILON
                    && !cursor.current.is_empty()
                {
                    cursor.break_page();
                }

                for line in lines {
                    if line_height > content_height - cursor.y + EPSILON {
                        if line_height > content_height + EPSILON && cursor.current.is_empty() {
                            // Already on a fresh page; clip instead of looping.
                            report_overflow(
                                &mut warnings,
                                block_index,
                                cursor.page_number(),
                                line_height,
                                content_height,
                            );
                        } else {
                            cursor.break_page();
                            if line_height > content_height + EPSILON {
                                report_overflow(
                                    &mut warnings,
                                    block_index,
                                    cursor.page_number(),
                                    line_height,
                                    content_height,
                                );
                            }
                        }
                    }

                    let line_width = face.text_width(&line, text.size());
                    let x_offset = match text.alignment() {
                        Alignment::Left => 0.0,
                        Alignment::Center => ((content_width - line_width) / 2.0).max(0.0),
                        Alignment::Right => (content_width - line_width).max(0.0),
                    };

                    cursor.current.push(PlacedElement::Text(PlacedText {
                        x: margin + x_offset,
                        y: margin + cursor.y,
                        text: line,
                        font: text.font().clone(),
                        size: text.size(),
                    }));
                    cursor.y += line_height;
                }
            }
            Block::Image(_) => {
                let image = &prepared[next_image];
                let image_index = next_image;
                next_image += 1;

                let box_width = image.box_width_pt();
                let box_height = image.box_height_pt();

                if box_height > content_height - cursor.y + EPSILON {
                    if box_height > content_height + EPSILON {
                        if !cursor.current.is_empty() {
                            cursor.break_page();
                        }
                        report_overflow(
                            &mut warnings,
                            block_index,
                            cursor.page_number(),
                            box_height,
                            content_height,
                        );
                    } else {
                        cursor.break_page();
                    }
                }

                // Fit placements are centred inside the target box; fill and
                // stretch fill it exactly, so the offsets collapse to zero.
                let width = image.width_pt();
                let height = image.height_pt();
                let x_offset = ((box_width - width) / 2.0).max(0.0);
                let y_offset = ((box_height - height) / 2.0).max(0.0);

                cursor.current.push(PlacedElement::Image(PlacedImage {
                    x: margin + x_offset,
                    y: margin + cursor.y + y_offset,
                    width,
                    height,
                    image: image_index,
                }));
                cursor.y += box_height;
            }
        }
    }

    Ok(Layout {
        pages: cursor.finish(),
        warnings,
    })
}

fn report_overflow(
    warnings: &mut Vec<OverflowWarning>,
    block: usize,
    page: usize,
    element_height: f64,
    content_height: f64,
) {
    warn!(
        "block {} clipped on page {}: element height {:.2}pt exceeds content height {:.2}pt",
        block, page, element_height, content_height
    );
    warnings.push(OverflowWarning {
        block,
        page,
        element_height,
        content_height,
    });
}

/// Greedy word-wrap of `content` at `max_width` points.
///
/// Explicit newlines force breaks and blank source lines survive as empty
/// output lines.  A single word wider than the content area is broken at
/// character boundaries so no line ever exceeds the available width.
fn wrap(face: &Face, size: f64, content: &str, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in content.split('\n') {
        let raw_line = raw_line.trim_end();
        if raw_line.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate_width = if current.is_empty() {
                face.text_width(word, size)
            } else {
                face.text_width(&current, size)
                    + face.text_width(" ", size)
                    + face.text_width(word, size)
            };

            if candidate_width <= max_width + EPSILON {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if face.text_width(word, size) <= max_width + EPSILON {
                current.push_str(word);
            } else {
                current = break_word(face, size, word, max_width, &mut lines);
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

/// Splits an over-wide word into character chunks that fit `max_width`.
///
/// Returns the trailing chunk so following words can continue the line.
fn break_word(
    face: &Face,
    size: f64,
    word: &str,
    max_width: f64,
    lines: &mut Vec<String>,
) -> String {
    let mut chunk = String::new();
    for ch in word.chars() {
        let mut candidate = chunk.clone();
        candidate.push(ch);
        if !chunk.is_empty() && face.text_width(&candidate, size) > max_width + EPSILON {
            lines.push(std::mem::take(&mut chunk));
            chunk.push(ch);
        } else {
            chunk = candidate;
        }
    }
    chunk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::prepare;
    use crate::model::{Block, ImageBlock, PageSpec, PlacementMode, TextBlock};
    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};

    fn letter_page() -> PageSpec {
        PageSpec::new(612.0, 792.0).with_margin(36.0)
    }

    fn short_lines(count: usize) -> String {
        (0..count)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let buffer = RgbaImage::from_pixel(width, height, Rgba([40, 80, 120, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(buffer)
            .write_to(&mut bytes, ImageOutputFormat::Png)
            .expect("png encoding succeeds");
        bytes
    }

    fn paginate_unwrapped(document: &Document, prepared: &[crate::images::PreparedImage]) -> Layout {
        paginate(
            document,
            prepared,
            &FontRegistry::new(),
            &LayoutOptions::default(),
        )
        .expect("pagination succeeds")
    }

    fn collect_text(layout: &Layout) -> Vec<String> {
        layout
            .pages
            .iter()
            .flat_map(|page| page.elements.iter())
            .filter_map(|element| match element {
                PlacedElement::Text(text) => Some(text.text.clone()),
                PlacedElement::Image(_) => None,
            })
            .collect()
    }

    #[test]
    fn ten_short_lines_fit_one_page() {
        let document =
            Document::new(letter_page()).with_block(Block::Text(TextBlock::new(short_lines(10))));
        let layout = paginate_unwrapped(&document, &[]);
        assert_eq!(layout.page_count(), 1);
        assert!(layout.warnings.is_empty());
    }

    #[test]
    fn two_hundred_short_lines_span_pages_and_reconstruct() {
        let content = short_lines(200);
        let document =
            Document::new(letter_page()).with_block(Block::Text(TextBlock::new(content.clone())));
        let layout = paginate_unwrapped(&document, &[]);

        assert!(layout.page_count() > 1, "expected multiple pages");
        assert_eq!(collect_text(&layout).join("\n"), content);
    }

    #[test]
    fn pagination_is_deterministic() {
        let document = Document::new(letter_page())
            .with_block(Block::text(short_lines(120)))
            .with_block(Block::text("trailer"));
        let first = paginate_unwrapped(&document, &[]);
        let second = paginate_unwrapped(&document, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn exact_fit_does_not_break_the_page() {
        // Content height is 720pt; at 12pt size each line is 14.4pt, so 50
        // lines fill the page exactly and must stay on one page.
        let document =
            Document::new(letter_page()).with_block(Block::Text(TextBlock::new(short_lines(50))));
        let layout = paginate_unwrapped(&document, &[]);
        assert_eq!(layout.page_count(), 1);
    }

    #[test]
    fn small_block_moves_to_next_page_intact() {
        let document = Document::new(letter_page())
            .with_block(Block::text(short_lines(48)))
            .with_block(Block::text("alpha\nbeta\ngamma"));
        let layout = paginate_unwrapped(&document, &[]);

        assert_eq!(layout.page_count(), 2);
        let second_page: Vec<_> = layout.pages[1]
            .elements
            .iter()
            .filter_map(|element| match element {
                PlacedElement::Text(text) => Some(text.text.as_str()),
                PlacedElement::Image(_) => None,
            })
            .collect();
        assert_eq!(second_page, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn image_breaks_to_next_page_when_it_does_not_fit() {
        let bytes = png_bytes(200, 200);
        let prepared = vec![
            prepare(1, &bytes, 200.0, 400.0, PlacementMode::Stretch, u64::MAX).unwrap(),
        ];
        let document = Document::new(letter_page())
            .with_block(Block::text(short_lines(40)))
            .with_block(Block::Image(
                ImageBlock::new(bytes, 200.0, 400.0).with_placement(PlacementMode::Stretch),
            ));
        let layout = paginate_unwrapped(&document, &prepared);

        assert_eq!(layout.page_count(), 2);
        match &layout.pages[1].elements[0] {
            PlacedElement::Image(image) => {
                assert_eq!(image.y, 36.0);
                assert_eq!(image.height, 400.0);
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn fit_image_is_centred_in_its_box() {
        let bytes = png_bytes(400, 200);
        let prepared =
            vec![prepare(0, &bytes, 100.0, 100.0, PlacementMode::Fit, u64::MAX).unwrap()];
        let document = Document::new(letter_page()).with_block(Block::Image(ImageBlock::new(
            bytes, 100.0, 100.0,
        )));
        let layout = paginate_unwrapped(&document, &prepared);

        match &layout.pages[0].elements[0] {
            PlacedElement::Image(image) => {
                // 400x200 fit into 100x100 scales to 100x50, centred
                // vertically inside the box.
                assert_eq!(image.width, 100.0);
                assert_eq!(image.height, 50.0);
                assert_eq!(image.x, 36.0);
                assert_eq!(image.y, 36.0 + 25.0);
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn over_tall_image_is_clipped_with_a_warning() {
        let bytes = png_bytes(100, 100);
        let prepared =
            vec![prepare(0, &bytes, 100.0, 900.0, PlacementMode::Stretch, u64::MAX).unwrap()];
        let document = Document::new(letter_page()).with_block(Block::Image(
            ImageBlock::new(bytes, 100.0, 900.0).with_placement(PlacementMode::Stretch),
        ));
        let layout = paginate_unwrapped(&document, &prepared);

        assert_eq!(layout.page_count(), 1);
        assert_eq!(layout.warnings.len(), 1);
        assert_eq!(layout.warnings[0].block, 0);
        assert_eq!(layout.warnings[0].page, 1);
    }

    #[test]
    fn over_tall_text_line_is_clipped_with_a_warning() {
        // At 700pt the single line is 840pt tall, above the 720pt content
        // height of a US-Letter page with 36pt margins.
        let document = Document::new(letter_page())
            .with_block(Block::Text(TextBlock::new("X").with_size(700.0)));
        let layout = paginate_unwrapped(&document, &[]);

        assert_eq!(layout.page_count(), 1);
        assert_eq!(layout.warnings.len(), 1);
        assert_eq!(layout.warnings[0].block, 0);
        assert_eq!(layout.warnings[0].page, 1);
        assert!(layout.warnings[0].element_height > layout.warnings[0].content_height);
        assert!(matches!(
            layout.pages[0].elements.as_slice(),
            [PlacedElement::Text(_)]
        ));
    }

    #[test]
    fn long_words_are_broken_at_character_boundaries() {
        let registry = FontRegistry::new();
        let face = registry.resolve(&FontDescriptor::default()).unwrap();
        let lines = wrap(&face, 12.0, &"x".repeat(400), 100.0);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(face.text_width(line, 12.0) <= 100.0 + EPSILON);
        }
        assert_eq!(lines.concat(), "x".repeat(400));
    }

    #[test]
    fn alignment_shifts_line_origin() {
        let page = letter_page();
        let document = Document::new(page)
            .with_block(Block::Text(
                TextBlock::new("hi").with_alignment(Alignment::Right),
            ))
            .with_block(Block::Text(
                TextBlock::new("hi").with_alignment(Alignment::Center),
            ));
        let layout = paginate_unwrapped(&document, &[]);

        let positions: Vec<f64> = collect_positions(&layout);
        // Right-aligned line starts further right than the centred one, and
        // both start beyond the left margin.
        assert!(positions[0] > positions[1]);
        assert!(positions[1] > 36.0);
    }

    fn collect_positions(layout: &Layout) -> Vec<f64> {
        layout
            .pages
            .iter()
            .flat_map(|page| page.elements.iter())
            .filter_map(|element| match element {
                PlacedElement::Text(text) => Some(text.x),
                PlacedElement::Image(_) => None,
            })
            .collect()
    }
}
