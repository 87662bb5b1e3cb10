//! Single-column PDF writer for recipe cards.
//!
//! Layout: a centered bold title, an optional square image and the body in
//! Times 11pt, flowing onto further A4 pages as needed. Text is written with
//! the standard Times fonts in WinAnsi encoding, so no fonts are embedded.


mod metrics;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, Stream, dictionary};
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::markdown::{strip_markdown, transliterate};
use metrics::{Font, text_width};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 10.0 * MM;
const BOTTOM_MARGIN: f32 = 20.0 * MM;
const MM: f32 = 72.0 / 25.4;

const TITLE_SIZE: f32 = 16.0;
const TITLE_LINE_HEIGHT: f32 = 10.0 * MM;
const BODY_SIZE: f32 = 11.0;
const BODY_LINE_HEIGHT: f32 = 8.0 * MM;
const IMAGE_SIZE: f32 = 80.0 * MM;

/// Largest image download accepted
const MAX_IMAGE_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Image download failed with HTTP status {status}")]
    ImageFetch { status: u16 },
    #[error("Image download failed: {0}")]
    ImageDownload(String),
    #[error("Image could not be decoded: {0}")]
    ImageDecode(String),
    #[error("PDF layout failed: {0}")]
    Layout(String),
}

impl From<lopdf::Error> for PdfError {
    #[inline]
    fn from(e: lopdf::Error) -> Self {
        Self::Layout(e.to_string())
    }
}

/// Renders recipe PDFs, downloading the recipe image over HTTP
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    agent: ureq::Agent,
}

impl PdfRenderer {
    #[inline]
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }

    /// Render a recipe card.
    ///
    /// When `image_url` is given the image must download and decode, otherwise
    /// the whole render fails. The body has its markdown stripped first.
    #[inline]
    pub fn render(
        &self,
        name: Option<&str>,
        image_url: Option<&str>,
        body: &str,
    ) -> Result<Vec<u8>, PdfError> {
        let image = image_url.map(|url| self.fetch_image(url)).transpose()?;

        let mut builder = PdfBuilder::new();
        builder.title(name.unwrap_or("Recipe"));
        builder.space(5.0 * MM);
        if let Some(image) = &image {
            builder.image(image, IMAGE_SIZE, IMAGE_SIZE);
            builder.space(2.0 * MM);
        }
        builder.paragraph(&strip_markdown(body));
        builder.finish()
    }

    fn fetch_image(&self, url: &str) -> Result<RgbImage, PdfError> {
        debug!("Downloading recipe image from {}", url);

        let bytes = match self.agent.get(url).call() {
            Ok(mut response) => response
                .body_mut()
                .with_config()
                .limit(MAX_IMAGE_BYTES)
                .read_to_vec()
                .map_err(|e| PdfError::ImageDownload(e.to_string()))?,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(PdfError::ImageFetch { status });
            }
            Err(e) => return Err(PdfError::ImageDownload(e.to_string())),
        };

        decode_image(&bytes)
    }
}

#[inline]
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, PdfError> {
    image::load_from_memory(bytes)
        .map(|image| image.to_rgb8())
        .map_err(|e| PdfError::ImageDecode(e.to_string()))
}

struct EncodedImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Incremental single-column layout over A4 pages.
///
/// The cursor measures distance from the top edge in points.
pub struct PdfBuilder {
    pages: Vec<Vec<Operation>>,
    images: Vec<EncodedImage>,
    cursor: f32,
    encode_error: Option<String>,
}

impl Default for PdfBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    #[inline]
    pub fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            images: Vec::new(),
            cursor: MARGIN,
            encode_error: None,
        }
    }

    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[inline]
    pub fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = MARGIN;
    }

    /// Advance the cursor by `points`
    #[inline]
    pub fn space(&mut self, points: f32) {
        self.cursor += points;
    }

    /// Centered bold title, wrapped when wider than the text column
    #[inline]
    pub fn title(&mut self, text: &str) {
        let encoded = transliterate(text);
        for line in wrap(&encoded, Font::TimesBold, TITLE_SIZE, column_width()) {
            self.ensure_room(TITLE_LINE_HEIGHT);
            let width = text_width(&line, Font::TimesBold, TITLE_SIZE);
            let x = MARGIN + (column_width() - width).max(0.0) / 2.0;
            self.text_line(line, Font::TimesBold, TITLE_SIZE, x, TITLE_LINE_HEIGHT);
        }
    }

    /// Body text in Times 11pt. Newlines are kept, long lines wrap at word
    /// boundaries.
    #[inline]
    pub fn paragraph(&mut self, text: &str) {
        let encoded = transliterate(text);
        for source_line in encoded.split(|b| *b == b'\n') {
            let wrapped = wrap(source_line, Font::TimesRoman, BODY_SIZE, column_width());
            if wrapped.is_empty() {
                self.ensure_room(BODY_LINE_HEIGHT);
                self.cursor += BODY_LINE_HEIGHT;
                continue;
            }
            for line in wrapped {
                self.ensure_room(BODY_LINE_HEIGHT);
                self.text_line(line, Font::TimesRoman, BODY_SIZE, MARGIN, BODY_LINE_HEIGHT);
            }
        }
    }

    /// Place an image at the left margin, scaled to `width` x `height` points
    #[inline]
    pub fn image(&mut self, image: &RgbImage, width: f32, height: f32) {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        let data = match encoder
            .write_all(image.as_raw())
            .and_then(|()| encoder.finish())
        {
            Ok(data) => data,
            Err(e) => {
                self.encode_error = Some(format!("image compression failed: {e}"));
                return;
            }
        };

        self.ensure_room(height);

        let name = format!("Im{}", self.images.len());
        self.images.push(EncodedImage {
            width: image.width(),
            height: image.height(),
            data,
        });

        let bottom = PAGE_HEIGHT - self.cursor - height;
        let operations = self.current_page();
        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new(
            "cm",
            vec![
                Object::Real(width),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(height),
                Object::Real(MARGIN),
                Object::Real(bottom),
            ],
        ));
        operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        operations.push(Operation::new("Q", vec![]));

        self.cursor += height;
    }

    /// Serialize the document
    #[inline]
    pub fn finish(self) -> Result<Vec<u8>, PdfError> {
        if let Some(e) = self.encode_error {
            return Err(PdfError::Layout(e));
        }

        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let bold_id = doc.add_object(font_dictionary(Font::TimesBold));
        let roman_id = doc.add_object(font_dictionary(Font::TimesRoman));

        let mut xobjects = Dictionary::new();
        for (i, image) in self.images.into_iter().enumerate() {
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(image.width),
                    "Height" => i64::from(image.height),
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                image.data,
            );
            let image_id = doc.add_object(stream);
            xobjects.set(format!("Im{i}"), image_id);
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                Font::TimesBold.resource_name() => bold_id,
                Font::TimesRoman.resource_name() => roman_id,
            },
            "XObject" => xobjects,
        });

        let mut kids = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let page_count = i64::try_from(kids.len())
            .map_err(|e| PdfError::Layout(format!("too many pages: {e}")))?;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(PAGE_WIDTH),
                    Object::Real(PAGE_HEIGHT),
                ],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| PdfError::Layout(e.to_string()))?;
        Ok(bytes)
    }

    fn current_page(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn ensure_room(&mut self, height: f32) {
        if self.cursor + height > PAGE_HEIGHT - BOTTOM_MARGIN && self.cursor > MARGIN {
            self.new_page();
        }
    }

    /// Write one line in a cell of `line_height`, text vertically centered
    fn text_line(&mut self, line: Vec<u8>, font: Font, size: f32, x: f32, line_height: f32) {
        let baseline = self.cursor + line_height / 2.0 + 0.3 * size;
        let y = PAGE_HEIGHT - baseline;

        let operations = self.current_page();
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(font.resource_name().as_bytes().to_vec()),
                Object::Real(size),
            ],
        ));
        operations.push(Operation::new("Td", vec![Object::Real(x), Object::Real(y)]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(line)]));
        operations.push(Operation::new("ET", vec![]));

        self.cursor += line_height;
    }
}

fn column_width() -> f32 {
    PAGE_WIDTH - 2.0 * MARGIN
}

fn font_dictionary(font: Font) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Greedy word wrap of WinAnsi bytes. Words wider than the column are split
/// between characters. An all-blank line yields no output lines.
fn wrap(line: &[u8], font: Font, size: f32, max_width: f32) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut current: Vec<u8> = Vec::new();

    for word in line.split(|b| *b == b' ').filter(|w| !w.is_empty()) {
        let candidate_width = if current.is_empty() {
            text_width(word, font, size)
        } else {
            text_width(&current, font, size)
                + text_width(b" ", font, size)
                + text_width(word, font, size)
        };

        if candidate_width <= max_width {
            if !current.is_empty() {
                current.push(b' ');
            }
            current.extend_from_slice(word);
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if text_width(word, font, size) <= max_width {
            current.extend_from_slice(word);
            continue;
        }

        for &byte in word {
            let overflows =
                text_width(&current, font, size) + text_width(&[byte], font, size) > max_width;
            if !current.is_empty() && overflows {
                lines.push(std::mem::take(&mut current));
            }
            current.push(byte);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
