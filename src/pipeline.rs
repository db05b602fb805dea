//! Request orchestration: validation, preprocessing, layout and emission.
//!
//! Each request walks the stage machine `Received → Validated →
//! Preprocessing → LayingOut → Writing → Completed`; any fatal error moves
//! it to `Failed` and nothing is resumable.  The pipeline holds no mutable
//! process-wide state — a [`Renderer`] is a plain config value and
//! [`Renderer::render`] is a pure function of the document, so concurrent
//! requests need no locking.

use log::{debug, info};

use crate::error::{OverflowWarning, RenderError, Stage};
use crate::fonts::FontRegistry;
use crate::images::{self, PreparedImage};
use crate::layout::{self, LayoutOptions};
use crate::model::{Block, Document};
use crate::writer;

/// Default ceiling on decoded pixel area (width x height), roughly four
/// 4096 x 4096 frames.
pub const DEFAULT_MAX_IMAGE_PIXELS: u64 = 64 * 1024 * 1024;

/// Per-request configuration carried by the [`Renderer`].
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Ceiling on decoded pixel area; larger images fail preprocessing.
    pub max_image_pixels: u64,
    /// Vertical gap between consecutive blocks on a page, in points.
    pub block_spacing_pt: f64,
    /// Title written into the PDF metadata.
    pub title: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_image_pixels: DEFAULT_MAX_IMAGE_PIXELS,
            block_spacing_pt: LayoutOptions::default().block_spacing_pt,
            title: "document".into(),
        }
    }
}

/// Terminal artifact of a rendering request.
#[derive(Clone, Debug)]
pub struct RenderedDocument {
    /// The complete PDF byte stream.
    pub bytes: Vec<u8>,
    /// Number of produced pages.
    pub page_count: usize,
    /// Non-fatal clipping reports collected during layout.
    pub warnings: Vec<OverflowWarning>,
}

impl RenderedDocument {
    /// Length of the PDF byte stream.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

/// The rendering pipeline entry point.
#[derive(Clone, Debug, Default)]
pub struct Renderer {
    config: RenderConfig,
    fonts: FontRegistry,
}

impl Renderer {
    /// Creates a renderer with the given configuration.
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            fonts: FontRegistry::new(),
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders a document into PDF bytes.
    ///
    /// The document is re-validated here so callers constructing one
    /// programmatically get the same guarantees as the request path.  On
    /// failure no partial output is returned.
    pub fn render(&self, document: &Document) -> Result<RenderedDocument, RenderError> {
        self.run(document).map_err(|err| {
            enter(Stage::Failed);
            info!("render failed at stage {}: {}", err.stage().as_str(), err);
            err
        })
    }

    fn run(&self, document: &Document) -> Result<RenderedDocument, RenderError> {
        enter(Stage::Received);

        document.validate()?;
        enter(Stage::Validated);

        enter(Stage::Preprocessing);
        let prepared = self.preprocess(document)?;

        enter(Stage::LayingOut);
        let options = LayoutOptions {
            block_spacing_pt: self.config.block_spacing_pt,
        };
        let layout = layout::paginate(document, &prepared, &self.fonts, &options)?;

        enter(Stage::Writing);
        let bytes = writer::write(
            &layout,
            &prepared,
            document.page(),
            &self.fonts,
            &self.config.title,
        )?;

        enter(Stage::Completed);
        info!(
            "rendered {} page(s), {} bytes, {} warning(s)",
            layout.page_count(),
            bytes.len(),
            layout.warnings.len()
        );

        Ok(RenderedDocument {
            bytes,
            page_count: layout.page_count(),
            warnings: layout.warnings,
        })
    }

    /// Decodes and normalizes every image block, in block order.
    fn preprocess(&self, document: &Document) -> Result<Vec<PreparedImage>, RenderError> {
        let mut prepared = Vec::new();
        for (index, block) in document.blocks().iter().enumerate() {
            if let Block::Image(image) = block {
                prepared.push(images::prepare(
                    index,
                    image.bytes(),
                    image.width_pt(),
                    image.height_pt(),
                    image.placement(),
                    self.config.max_image_pixels,
                )?);
            }
        }
        Ok(prepared)
    }
}

fn enter(stage: Stage) {
    debug!("stage {}", stage.as_str());
}

/// In-process liveness predicate.
///
/// True when the pipeline can resolve its default font face, which is the
/// only capability a fresh request depends on besides its own input.  This
/// replaces the round-trip health probe with a same-process check.
pub fn liveness() -> bool {
    FontRegistry::new().default_face_available()
}
