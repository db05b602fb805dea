//! Data structures describing the logical content of a rendering request.
//!
//! The types in this module form the validated content model handed to the
//! pipeline: a [`Document`] is an ordered block sequence plus a [`PageSpec`].
//! They intentionally avoid referencing the layout or writer layers so the
//! values can be produced by frontends, persisted, or exchanged over the
//! network; [`DocumentRequest`] is the serde-friendly transport form with
//! base64 image payloads, matching the service's JSON conventions.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::fonts::FontDescriptor;

/// Number of points per inch; 72 by PDF convention.
pub const POINTS_PER_INCH: f64 = 72.0;

const MM_PER_INCH: f64 = 25.4;

/// Measurement unit for [`PageSpec`] dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// PostScript points (1/72 inch).
    #[default]
    Point,
    /// Millimetres.
    Millimeter,
}

impl Unit {
    /// Converts `value` in this unit to points.
    pub fn to_points(self, value: f64) -> f64 {
        match self {
            Unit::Point => value,
            Unit::Millimeter => value / MM_PER_INCH * POINTS_PER_INCH,
        }
    }
}

/// Physical page geometry: dimensions and uniform margins in a [`Unit`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    width: f64,
    height: f64,
    #[serde(default)]
    margin: f64,
    #[serde(default)]
    unit: Unit,
}

impl Default for PageSpec {
    /// US-Letter (612 x 792 pt) with half-inch margins.
    fn default() -> Self {
        Self::new(612.0, 792.0).with_margin(36.0)
    }
}

impl PageSpec {
    /// Creates a page spec with the given dimensions in points and no margins.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            margin: 0.0,
            unit: Unit::Point,
        }
    }

    /// Sets the uniform margin and returns the updated spec.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Sets the measurement unit and returns the updated spec.
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Page width in points.
    pub fn width_pt(&self) -> f64 {
        self.unit.to_points(self.width)
    }

    /// Page height in points.
    pub fn height_pt(&self) -> f64 {
        self.unit.to_points(self.height)
    }

    /// Uniform margin in points.
    pub fn margin_pt(&self) -> f64 {
        self.unit.to_points(self.margin)
    }

    /// Width of the content area (page width minus both margins) in points.
    pub fn content_width_pt(&self) -> f64 {
        self.width_pt() - 2.0 * self.margin_pt()
    }

    /// Height of the content area (page height minus both margins) in points.
    pub fn content_height_pt(&self) -> f64 {
        self.height_pt() - 2.0 * self.margin_pt()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ValidationError::InvalidPageSize {
                width: self.width,
                height: self.height,
            });
        }
        if self.margin < 0.0 || self.margin >= self.width / 2.0 || self.margin >= self.height / 2.0 {
            return Err(ValidationError::InfeasibleMargins {
                margin: self.margin,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Horizontal alignment of wrapped text lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Left aligned content.
    #[default]
    Left,
    /// Center aligned content.
    Center,
    /// Right aligned content.
    Right,
}

/// Policy governing how an image is scaled into its target box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMode {
    /// Uniform scale so the image is fully contained in the box, centered.
    #[default]
    Fit,
    /// Uniform scale so the image covers the box, cropping overflow.
    Fill,
    /// Independent per-axis scale to exactly the box, ignoring aspect ratio.
    Stretch,
}

/// A paragraph of text with its font, size and alignment.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    content: String,
    font: FontDescriptor,
    size: f64,
    alignment: Alignment,
}

impl TextBlock {
    /// Creates a text block with the default font at 12 pt, left aligned.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            font: FontDescriptor::default(),
            size: 12.0,
            alignment: Alignment::Left,
        }
    }

    /// Returns the raw text content.  Embedded newlines force line breaks.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the font descriptor.
    pub fn font(&self) -> &FontDescriptor {
        &self.font
    }

    /// Returns the font size in points.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Returns the configured alignment.
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Sets the font descriptor and returns the updated block.
    pub fn with_font(mut self, font: FontDescriptor) -> Self {
        self.font = font;
        self
    }

    /// Sets the font size in points and returns the updated block.
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    /// Sets the alignment and returns the updated block.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }
}

/// An image with its raw source bytes and a target box in points.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    bytes: Vec<u8>,
    width_pt: f64,
    height_pt: f64,
    placement: PlacementMode,
}

impl ImageBlock {
    /// Creates an image block targeting a `width x height` point box.
    pub fn new(bytes: impl Into<Vec<u8>>, width_pt: f64, height_pt: f64) -> Self {
        Self {
            bytes: bytes.into(),
            width_pt,
            height_pt,
            placement: PlacementMode::Fit,
        }
    }

    /// Returns the undecoded source bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the target box width in points.
    pub fn width_pt(&self) -> f64 {
        self.width_pt
    }

    /// Returns the target box height in points.
    pub fn height_pt(&self) -> f64 {
        self.height_pt
    }

    /// Returns the placement mode.
    pub fn placement(&self) -> PlacementMode {
        self.placement
    }

    /// Sets the placement mode and returns the updated block.
    pub fn with_placement(mut self, placement: PlacementMode) -> Self {
        self.placement = placement;
        self
    }
}

/// One content unit to be placed in a document.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Paragraph content.
    Text(TextBlock),
    /// Raster image content.
    Image(ImageBlock),
}

impl Block {
    /// Convenience helper for building a text block.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(TextBlock::new(content))
    }

    /// Convenience helper for building an image block.
    pub fn image(bytes: impl Into<Vec<u8>>, width_pt: f64, height_pt: f64) -> Self {
        Self::Image(ImageBlock::new(bytes, width_pt, height_pt))
    }
}

/// Validated, in-memory representation of a rendering request.
///
/// Owned exclusively by one request and immutable once constructed; the
/// block insertion order is the rendering order.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    page: PageSpec,
    blocks: Vec<Block>,
}

impl Document {
    /// Creates an empty document over the given page spec.
    ///
    /// An empty document fails [`Document::validate`]; callers are expected
    /// to append at least one block.
    pub fn new(page: PageSpec) -> Self {
        Self {
            page,
            blocks: Vec::new(),
        }
    }

    /// Returns the page spec.
    pub fn page(&self) -> &PageSpec {
        &self.page
    }

    /// Returns the blocks in rendering order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Appends a block and returns the updated document.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Extends the document with multiple blocks and returns the updated
    /// instance.
    pub fn with_blocks<I>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        self.blocks.extend(blocks);
        self
    }

    /// Checks the content model invariants.
    ///
    /// Run by the pipeline before any preprocessing; rejects empty block
    /// sequences, whitespace-only text, absent image bytes, non-positive
    /// page dimensions or image targets, infeasible margins and
    /// non-positive font sizes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.page.validate()?;

        if self.blocks.is_empty() {
            return Err(ValidationError::EmptyDocument);
        }

        for (index, block) in self.blocks.iter().enumerate() {
            match block {
                Block::Text(text) => {
                    if text.content().trim().is_empty() {
                        return Err(ValidationError::EmptyText { index });
                    }
                    if text.size() <= 0.0 {
                        return Err(ValidationError::InvalidFontSize {
                            index,
                            size: text.size(),
                        });
                    }
                }
                Block::Image(image) => {
                    if image.bytes().is_empty() {
                        return Err(ValidationError::EmptyImage { index });
                    }
                    if image.width_pt() <= 0.0 || image.height_pt() <= 0.0 {
                        return Err(ValidationError::InvalidImageTarget {
                            index,
                            width: image.width_pt(),
                            height: image.height_pt(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Transport form of a [`Block`], as received from the service boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockRequest {
    /// A paragraph of text.
    Text {
        /// Raw text content.
        content: String,
        /// Font family name; defaults to Helvetica.
        #[serde(default)]
        font_family: Option<String>,
        /// Bold face flag.
        #[serde(default)]
        bold: bool,
        /// Italic face flag.
        #[serde(default)]
        italic: bool,
        /// Font size in points; defaults to 12.
        #[serde(default = "default_font_size")]
        size: f64,
        /// Horizontal alignment.
        #[serde(default)]
        alignment: Alignment,
    },
    /// A base64-encoded raster image.
    Image {
        /// Base64 payload, with or without a `data:image/...;base64,` prefix.
        image_base64: String,
        /// Target box width in points.
        width: f64,
        /// Target box height in points.
        height: f64,
        /// Placement mode.
        #[serde(default)]
        placement: PlacementMode,
    },
}

fn default_font_size() -> f64 {
    12.0
}

/// Transport form of a rendering request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentRequest {
    /// Page geometry; defaults to US-Letter with half-inch margins.
    #[serde(default)]
    pub page: PageSpec,
    /// Content blocks in rendering order.
    pub blocks: Vec<BlockRequest>,
}

/// Strips an optional `data:image/...;base64,` prefix from a payload.
fn strip_data_uri(payload: &str) -> &str {
    if payload.starts_with("data:image") {
        match payload.split_once(',') {
            Some((_, rest)) => rest,
            None => payload,
        }
    } else {
        payload
    }
}

impl TryFrom<DocumentRequest> for Document {
    type Error = ValidationError;

    /// Materializes and validates a document from its transport form.
    fn try_from(request: DocumentRequest) -> Result<Self, Self::Error> {
        let mut document = Document::new(request.page);

        for (index, block) in request.blocks.into_iter().enumerate() {
            let block = match block {
                BlockRequest::Text {
                    content,
                    font_family,
                    bold,
                    italic,
                    size,
                    alignment,
                } => {
                    let family =
                        font_family.unwrap_or_else(|| crate::fonts::DEFAULT_FONT_FAMILY_NAME.into());
                    Block::Text(
                        TextBlock::new(content)
                            .with_font(
                                FontDescriptor::new(family)
                                    .with_bold(bold)
                                    .with_italic(italic),
                            )
                            .with_size(size)
                            .with_alignment(alignment),
                    )
                }
                BlockRequest::Image {
                    image_base64,
                    width,
                    height,
                    placement,
                } => {
                    let bytes = BASE64
                        .decode(strip_data_uri(image_base64.trim()))
                        .map_err(|_| ValidationError::InvalidBase64 { index })?;
                    Block::Image(ImageBlock::new(bytes, width, height).with_placement(placement))
                }
            };
            document = document.with_block(block);
        }

        document.validate()?;
        Ok(document)
    }
}
