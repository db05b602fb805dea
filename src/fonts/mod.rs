//! Font registry and measurement for the layout engine.
//!
//! The pipeline embeds the PDF standard built-in faces, so no font files are
//! shipped or loaded from disk.  Measurement uses the published AFM advance
//! widths (thousandths of an em) for the Helvetica family; the Courier
//! family is monospaced at 600 units.  Glyphs outside the tabulated ASCII
//! range fall back to the face's default width, which keeps wrapping
//! deterministic for arbitrary input.

use printpdf::BuiltinFont;

use crate::error::SerializationError;

/// Name of the family used when a request does not specify one.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Helvetica";

/// Factor applied to the font size to obtain the baseline-to-baseline
/// distance of wrapped lines.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Selects a face from the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontDescriptor {
    family: String,
    bold: bool,
    italic: bool,
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_FAMILY_NAME)
    }
}

impl FontDescriptor {
    /// Creates a descriptor for the regular face of `family`.
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            bold: false,
            italic: false,
        }
    }

    /// Returns the requested family name.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Returns whether the bold face is requested.
    pub fn is_bold(&self) -> bool {
        self.bold
    }

    /// Returns whether the italic (oblique) face is requested.
    pub fn is_italic(&self) -> bool {
        self.italic
    }

    /// Sets the bold flag and returns the updated descriptor.
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Sets the italic flag and returns the updated descriptor.
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    /// Convenience shorthand that selects the bold face.
    pub fn bold(self) -> Self {
        self.with_bold(true)
    }

    /// Convenience shorthand that selects the italic face.
    pub fn italic(self) -> Self {
        self.with_italic(true)
    }
}

/// Advance-width metrics for one face, in thousandths of an em.
#[derive(Debug)]
struct WidthTable {
    /// Widths for code points 0x20..=0x7E.
    ascii: &'static [u16; 95],
    /// Width assumed for glyphs outside the table.
    default: u16,
}

impl WidthTable {
    fn advance(&self, ch: char) -> u16 {
        let code = ch as u32;
        if (0x20..=0x7E).contains(&code) {
            self.ascii[(code - 0x20) as usize]
        } else {
            self.default
        }
    }
}

// Helvetica AFM advance widths, 0x20..=0x7E.
static HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722, 722,
    667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222,
    500, 222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334,
    584,
];

// Helvetica-Bold AFM advance widths, 0x20..=0x7E.  The oblique faces share
// the upright widths per the AFM data, so two tables cover all four faces.
static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722, 722, 667,
    611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556,
    278, 889, 611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

// Courier is monospaced: every glyph advances 600 units.
static COURIER_WIDTHS: [u16; 95] = [600; 95];

static HELVETICA: WidthTable = WidthTable {
    ascii: &HELVETICA_WIDTHS,
    default: 556,
};

static HELVETICA_BOLD: WidthTable = WidthTable {
    ascii: &HELVETICA_BOLD_WIDTHS,
    default: 611,
};

static COURIER: WidthTable = WidthTable {
    ascii: &COURIER_WIDTHS,
    default: 600,
};

/// One resolved face: measurement metrics plus the built-in font to embed.
#[derive(Debug)]
pub struct Face {
    builtin: BuiltinFont,
    widths: &'static WidthTable,
    ascent: u16,
}

impl Face {
    /// The built-in font that the writer embeds for this face.
    pub fn builtin(&self) -> BuiltinFont {
        self.builtin.clone()
    }

    /// Advance width of `text` at `size` points.
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        let units: u64 = text
            .chars()
            .map(|ch| u64::from(self.widths.advance(ch)))
            .sum();
        units as f64 * size / 1000.0
    }

    /// Baseline-to-baseline distance at `size` points.
    pub fn line_height(&self, size: f64) -> f64 {
        size * LINE_HEIGHT_FACTOR
    }

    /// Distance from the top of the line box down to the baseline.
    pub fn ascent(&self, size: f64) -> f64 {
        f64::from(self.ascent) * size / 1000.0
    }
}

/// Resolves [`FontDescriptor`] values to embeddable faces.
///
/// The registry is stateless; construction is free and resolution never
/// allocates.  Unknown families fail with the same typed error the writer
/// reports for unembeddable fonts, surfaced before layout starts.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontRegistry;

impl FontRegistry {
    /// Creates a registry over the built-in faces.
    pub fn new() -> Self {
        Self
    }

    /// Resolves a descriptor to its face.
    pub fn resolve(&self, descriptor: &FontDescriptor) -> Result<Face, SerializationError> {
        let family = descriptor.family().trim();
        if family.eq_ignore_ascii_case("helvetica") {
            let builtin = match (descriptor.is_bold(), descriptor.is_italic()) {
                (false, false) => BuiltinFont::Helvetica,
                (true, false) => BuiltinFont::HelveticaBold,
                (false, true) => BuiltinFont::HelveticaOblique,
                (true, true) => BuiltinFont::HelveticaBoldOblique,
            };
            let widths = if descriptor.is_bold() {
                &HELVETICA_BOLD
            } else {
                &HELVETICA
            };
            Ok(Face {
                builtin,
                widths,
                ascent: 718,
            })
        } else if family.eq_ignore_ascii_case("courier") {
            let builtin = match (descriptor.is_bold(), descriptor.is_italic()) {
                (false, false) => BuiltinFont::Courier,
                (true, false) => BuiltinFont::CourierBold,
                (false, true) => BuiltinFont::CourierOblique,
                (true, true) => BuiltinFont::CourierBoldOblique,
            };
            Ok(Face {
                builtin,
                widths: &COURIER,
                ascent: 629,
            })
        } else {
            Err(SerializationError::UnknownFont {
                family: descriptor.family().to_string(),
            })
        }
    }

    /// Indicates whether the default face resolves.
    ///
    /// Used by the in-process liveness predicate.
    pub fn default_face_available(&self) -> bool {
        self.resolve(&FontDescriptor::default()).is_ok()
    }
}
