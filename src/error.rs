//! Error taxonomy for the rendering pipeline.
//!
//! Fatal failures are split by the component that raised them so the service
//! boundary can map each kind to a response status: [`ValidationError`] and
//! [`ImageError`] are input faults, [`SerializationError`] is an engine
//! fault.  [`OverflowWarning`] values are non-fatal and travel on the
//! rendered result instead of aborting the request.

use thiserror::Error;

/// Rejections produced while materializing a [`Document`](crate::model::Document).
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationError {
    /// The block sequence was empty.
    #[error("document contains no blocks")]
    EmptyDocument,
    /// A text block contained only whitespace.
    #[error("text block {index} is empty after trimming")]
    EmptyText {
        /// Position of the offending block in the document.
        index: usize,
    },
    /// An image block carried no source bytes.
    #[error("image block {index} has no source bytes")]
    EmptyImage {
        /// Position of the offending block in the document.
        index: usize,
    },
    /// An image block requested a non-positive target box.
    #[error("image block {index} has a non-positive target box ({width} x {height})")]
    InvalidImageTarget {
        /// Position of the offending block in the document.
        index: usize,
        /// Requested target width in points.
        width: f64,
        /// Requested target height in points.
        height: f64,
    },
    /// A text block requested a non-positive font size.
    #[error("text block {index} has a non-positive font size ({size})")]
    InvalidFontSize {
        /// Position of the offending block in the document.
        index: usize,
        /// Requested font size in points.
        size: f64,
    },
    /// Page dimensions were zero or negative.
    #[error("page dimensions must be positive ({width} x {height})")]
    InvalidPageSize {
        /// Page width in the page spec's unit.
        width: f64,
        /// Page height in the page spec's unit.
        height: f64,
    },
    /// Margins were negative or exceeded half the corresponding page
    /// dimension, leaving no usable content area.
    #[error("margins of {margin} leave no content area on a {width} x {height} page")]
    InfeasibleMargins {
        /// Margin in the page spec's unit.
        margin: f64,
        /// Page width in the page spec's unit.
        width: f64,
        /// Page height in the page spec's unit.
        height: f64,
    },
    /// An image payload was not valid base64.
    #[error("image block {index} carries an undecodable base64 payload")]
    InvalidBase64 {
        /// Position of the offending block in the request.
        index: usize,
    },
}

/// Failures raised by the image preprocessor.
#[derive(Debug, Error)]
pub enum ImageError {
    /// No supported codec could decode the byte stream.
    #[error("unsupported image format in block {index}: {source}")]
    UnsupportedFormat {
        /// Position of the offending block in the document.
        index: usize,
        /// Decoder error reported by the codec layer.
        #[source]
        source: image::ImageError,
    },
    /// The decoded pixel area exceeds the configured ceiling.
    #[error(
        "image in block {index} is too large: {width} x {height} px exceeds \
         the {max_pixels} pixel ceiling"
    )]
    TooLarge {
        /// Position of the offending block in the document.
        index: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// Configured pixel-area ceiling.
        max_pixels: u64,
    },
}

/// Failures raised while emitting the final PDF byte stream.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SerializationError {
    /// A referenced font family is not available for embedding.
    #[error("font family '{family}' cannot be embedded")]
    UnknownFont {
        /// The requested family name.
        family: String,
    },
    /// A prepared image reached the writer in a color mode it cannot encode.
    #[error("prepared image {index} uses an unsupported color mode")]
    UnsupportedColorMode {
        /// Index of the prepared image.
        index: usize,
    },
    /// The underlying PDF backend reported a write failure.
    #[error("PDF emission failed: {message}")]
    Backend {
        /// Backend error description.
        message: String,
    },
}

/// Pipeline stages, in request order.
///
/// Every request walks `Received` through `Completed`; `Failed` is reachable
/// from each non-terminal stage and carries no resumable state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Request accepted, nothing checked yet.
    Received,
    /// Content model validated.
    Validated,
    /// Image preprocessing in progress.
    Preprocessing,
    /// Layout engine in progress.
    LayingOut,
    /// PDF emission in progress.
    Writing,
    /// Rendering finished successfully.
    Completed,
    /// Rendering aborted.
    Failed,
}

impl Stage {
    /// Stable lowercase label used in log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Preprocessing => "preprocessing",
            Stage::LayingOut => "laying_out",
            Stage::Writing => "writing",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }
}

/// Umbrella error returned by [`Renderer::render`](crate::pipeline::Renderer::render).
#[derive(Debug, Error)]
pub enum RenderError {
    /// The content model was rejected.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// An image could not be prepared for embedding.
    #[error("image preprocessing failed: {0}")]
    Image(#[from] ImageError),
    /// The PDF writer could not serialize the page sequence.
    #[error("serialization failed: {0}")]
    Serialization(#[from] SerializationError),
}

impl RenderError {
    /// The pipeline stage at which this failure occurred.
    pub fn stage(&self) -> Stage {
        match self {
            RenderError::Validation(_) => Stage::Validated,
            RenderError::Image(_) => Stage::Preprocessing,
            RenderError::Serialization(_) => Stage::Writing,
        }
    }
}

/// Non-fatal report that an element was clipped against the page.
///
/// Recorded when a single wrapped line or a prepared image is taller than
/// the whole content area; rendering continues with the element clipped at
/// the bottom content edge.
#[derive(Clone, Debug, PartialEq)]
pub struct OverflowWarning {
    /// Index of the source block in the document.
    pub block: usize,
    /// 1-based page on which the clipped element was placed.
    pub page: usize,
    /// Height of the element in points.
    pub element_height: f64,
    /// Height of the page content area in points.
    pub content_height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_reports_failing_stage() {
        let err = RenderError::from(ValidationError::EmptyDocument);
        assert_eq!(err.stage(), Stage::Validated);

        let err = RenderError::from(SerializationError::Backend {
            message: "boom".into(),
        });
        assert_eq!(err.stage(), Stage::Writing);
    }

    #[test]
    fn stage_labels_are_stable() {
        assert_eq!(Stage::LayingOut.as_str(), "laying_out");
        assert_eq!(Stage::Failed.as_str(), "failed");
    }
}
