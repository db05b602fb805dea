use pdf_compose::model::{
    Block, BlockRequest, Document, DocumentRequest, ImageBlock, PageSpec, PlacementMode,
};
use pdf_compose::pipeline::{RenderConfig, Renderer};
use sha2::{Digest, Sha256};

fn letter_page() -> PageSpec {
    PageSpec::new(612.0, 792.0).with_margin(36.0)
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let buffer = image::RgbaImage::from_pixel(width, height, image::Rgba([90, 140, 60, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(buffer)
        .write_to(&mut bytes, image::ImageOutputFormat::Png)
        .expect("png encoding succeeds");
    bytes
}

fn numbered_lines(count: usize) -> String {
    (0..count)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Blanks the volatile metadata printpdf stamps into every document
/// (timestamps, document IDs, producer) so byte streams from repeated
/// renders can be compared by hash.
fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() && data[cursor] != terminator {
                    if terminator == b')' || !data[cursor].is_ascii_whitespace() {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while offset + start.len() < data.len() {
            let Some(start_pos) = data[offset..]
                .windows(start.len())
                .position(|window| window == start)
            else {
                break;
            };
            let content_start = offset + start_pos + start.len();
            let Some(end_pos) = data[content_start..]
                .windows(end.len())
                .position(|window| window == end)
            else {
                break;
            };
            for byte in &mut data[content_start..content_start + end_pos] {
                if !byte.is_ascii_whitespace() {
                    *byte = b'0';
                }
            }
            offset = content_start + end_pos + end.len();
        }
    }

    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    scrub_segment(&mut normalized, b"/Producer(", b')');
    scrub_xml(&mut normalized, b"<xmp:CreateDate>", b"</xmp:CreateDate>");
    scrub_xml(&mut normalized, b"<xmp:ModifyDate>", b"</xmp:ModifyDate>");
    scrub_xml(
        &mut normalized,
        b"<xmp:MetadataDate>",
        b"</xmp:MetadataDate>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:DocumentID>",
        b"</xmpMM:DocumentID>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:InstanceID>",
        b"</xmpMM:InstanceID>",
    );
    scrub_xml(&mut normalized, b"<xmpMM:VersionID>", b"</xmpMM:VersionID>");
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(scrub_pdf(bytes)).into()
}

fn sample_document() -> Document {
    Document::new(letter_page())
        .with_block(Block::text(numbered_lines(12)))
        .with_block(Block::Image(
            ImageBlock::new(png_bytes(120, 80), 120.0, 80.0)
                .with_placement(PlacementMode::Stretch),
        ))
        .with_block(Block::text("closing paragraph"))
}

#[test]
fn renders_non_empty_output() {
    let rendered = Renderer::default()
        .render(&sample_document())
        .expect("render succeeds");

    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert_eq!(rendered.page_count, 1);
    assert!(rendered.warnings.is_empty());
}

#[test]
fn rendering_is_deterministic() {
    let renderer = Renderer::default();
    let document = sample_document();

    let first = renderer.render(&document).expect("first render succeeds");
    let second = renderer.render(&document).expect("second render succeeds");

    assert_eq!(first.bytes.len(), second.bytes.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&first.bytes),
        normalized_hash(&second.bytes),
        "renders must be identical after metadata normalization"
    );
}

#[test]
fn long_text_spans_multiple_pages() {
    let renderer = Renderer::default();

    let short = Document::new(letter_page()).with_block(Block::text(numbered_lines(10)));
    let rendered = renderer.render(&short).expect("short render succeeds");
    assert_eq!(rendered.page_count, 1);

    let long = Document::new(letter_page()).with_block(Block::text(numbered_lines(200)));
    let rendered = renderer.render(&long).expect("long render succeeds");
    assert!(rendered.page_count > 1);
}

#[test]
fn over_tall_text_line_renders_clipped_with_a_warning() {
    use pdf_compose::model::TextBlock;

    let document = Document::new(letter_page())
        .with_block(Block::Text(TextBlock::new("X").with_size(700.0)));
    let rendered = Renderer::default()
        .render(&document)
        .expect("clipped render still succeeds");

    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert_eq!(rendered.page_count, 1);
    assert_eq!(rendered.warnings.len(), 1);
    assert_eq!(rendered.warnings[0].block, 0);
}

#[test]
fn oversized_image_fails_and_produces_no_output() {
    let renderer = Renderer::new(RenderConfig {
        max_image_pixels: 100,
        ..RenderConfig::default()
    });
    let document = Document::new(letter_page()).with_block(Block::Image(ImageBlock::new(
        png_bytes(64, 64),
        50.0,
        50.0,
    )));

    assert!(renderer.render(&document).is_err());
}

#[test]
fn json_request_renders_end_to_end() {
    let payload = base64_png();
    let request = DocumentRequest {
        page: letter_page(),
        blocks: vec![
            BlockRequest::Text {
                content: "Report header".into(),
                font_family: Some("Helvetica".into()),
                bold: true,
                italic: false,
                size: 18.0,
                alignment: pdf_compose::model::Alignment::Center,
            },
            BlockRequest::Image {
                image_base64: format!("data:image/png;base64,{payload}"),
                width: 100.0,
                height: 100.0,
                placement: PlacementMode::Fill,
            },
        ],
    };

    let document = Document::try_from(request).expect("request materializes");
    let rendered = Renderer::default().render(&document).expect("render succeeds");

    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert_eq!(rendered.page_count, 1);
}

fn base64_png() -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    STANDARD.encode(png_bytes(200, 100))
}
