//! Minimal PDF 1.4 writer: summary lines on the first page followed by
//! chart images at a fixed width, flowing down the pages in order.

use std::io::Write;

use encoding_rs::WINDOWS_1252;
use flate2::{Compression, write::ZlibEncoder};

use super::png::{self, ColorType};
use crate::{charts::ChartImage, error::Result};

const MM: f64 = 72.0 / 25.4;
const PAGE_WIDTH: f64 = 595.0;
const PAGE_HEIGHT: f64 = 842.0;
const MARGIN: f64 = 10.0 * MM;
const LINE_HEIGHT: f64 = 10.0 * MM;
const FONT_SIZE: f64 = 12.0;
const IMAGE_WIDTH: f64 = 180.0 * MM;
const IMAGE_GAP: f64 = 5.0 * MM;

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FONT_ID: usize = 3;

/// Object table; ids are 1-based and objects may be filled in after they
/// are referenced.
#[derive(Default)]
struct PdfObjects {
    objects: Vec<Vec<u8>>,
}

impl PdfObjects {
    fn reserve(&mut self) -> usize {
        self.objects.push(Vec::new());
        self.objects.len()
    }

    fn set(&mut self, id: usize, body: Vec<u8>) {
        self.objects[id - 1] = body;
    }

    fn push(&mut self, body: Vec<u8>) -> usize {
        let id = self.reserve();
        self.set(id, body);
        id
    }

    fn stream(dictionary: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!("<< {dictionary} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        body
    }

    fn into_bytes(self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_all(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n")?;
        let mut offsets = Vec::with_capacity(self.objects.len());
        for (idx, body) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            writeln!(out, "{} 0 obj", idx + 1)?;
            out.write_all(body)?;
            out.write_all(b"\nendobj\n")?;
        }
        let xref = out.len();
        writeln!(out, "xref\n0 {}", self.objects.len() + 1)?;
        out.write_all(b"0000000000 65535 f \n")?;
        for offset in offsets {
            writeln!(out, "{offset:010} 00000 n ")?;
        }
        writeln!(
            out,
            "trailer\n<< /Size {} /Root {CATALOG_ID} 0 R >>\nstartxref\n{xref}\n%%EOF",
            self.objects.len() + 1
        )?;
        Ok(out)
    }
}

/// WinAnsi bytes for a PDF literal string; characters outside the code
/// page become `?`.
fn pdf_string(text: &str) -> String {
    let mut literal = String::from("(");
    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let (encoded, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        let bytes: &[u8] = if unmappable { b"?" } else { &encoded };
        for &byte in bytes {
            match byte {
                b'(' | b')' | b'\\' => {
                    literal.push('\\');
                    literal.push(byte as char);
                }
                0x20..=0x7E => literal.push(byte as char),
                other => literal.push_str(&format!("\\{other:03o}")),
            }
        }
    }
    literal.push(')');
    literal
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

struct Page {
    content: Vec<u8>,
    images: Vec<(usize, usize)>,
}

impl Page {
    fn new() -> Self {
        Self {
            content: Vec::new(),
            images: Vec::new(),
        }
    }
}

pub fn write_pdf(lines: &[String], images: &[ChartImage]) -> Result<Vec<u8>> {
    let mut objects = PdfObjects::default();
    let catalog = objects.reserve();
    let pages_id = objects.reserve();
    let font = objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );
    debug_assert_eq!((catalog, pages_id, font), (CATALOG_ID, PAGES_ID, FONT_ID));

    let mut pages = vec![Page::new()];
    let top = PAGE_HEIGHT - MARGIN;
    let mut cursor = top;

    for line in lines {
        let baseline = cursor - LINE_HEIGHT / 2.0 - FONT_SIZE / 3.0;
        if let Some(page) = pages.last_mut() {
            writeln!(
                page.content,
                "BT /F1 {FONT_SIZE} Tf {MARGIN:.2} {baseline:.2} Td {} Tj ET",
                pdf_string(line)
            )?;
        }
        cursor -= LINE_HEIGHT;
    }

    let max_height = top - MARGIN;
    for (idx, image) in images.iter().enumerate() {
        let decoded = png::parse(&image.png)?;
        let mut width = IMAGE_WIDTH;
        let mut height = width * decoded.height as f64 / decoded.width as f64;
        if height > max_height {
            width *= max_height / height;
            height = max_height;
        }
        if cursor - height < MARGIN {
            pages.push(Page::new());
            cursor = top;
        }

        let color_space = match decoded.color {
            ColorType::Rgb => "/DeviceRGB",
            ColorType::Gray => "/DeviceGray",
        };
        let colors = decoded.color.components();
        let dictionary = format!(
            "/Type /XObject /Subtype /Image /Width {w} /Height {h} /ColorSpace {color_space} /BitsPerComponent 8 /Filter /FlateDecode /DecodeParms << /Predictor 15 /Colors {colors} /BitsPerComponent 8 /Columns {w} >>",
            w = decoded.width,
            h = decoded.height,
        );
        let xobject = objects.push(PdfObjects::stream(&dictionary, &decoded.data));

        let y = cursor - height;
        if let Some(page) = pages.last_mut() {
            writeln!(
                page.content,
                "q {width:.2} 0 0 {height:.2} {MARGIN:.2} {y:.2} cm /Im{idx} Do Q"
            )?;
            page.images.push((idx, xobject));
        }
        cursor = y - IMAGE_GAP;
    }

    let mut kids = Vec::with_capacity(pages.len());
    for page in &pages {
        let content = objects.push(PdfObjects::stream(
            "/Filter /FlateDecode",
            &deflate(&page.content)?,
        ));
        let xobjects = page
            .images
            .iter()
            .map(|(idx, id)| format!("/Im{idx} {id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        let page_id = objects.push(
            format!(
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] /Resources << /Font << /F1 {FONT_ID} 0 R >> /XObject << {xobjects} >> >> /Contents {content} 0 R >>"
            )
            .into_bytes(),
        );
        kids.push(format!("{page_id} 0 R"));
    }

    objects.set(
        PAGES_ID,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            kids.len()
        )
        .into_bytes(),
    );
    objects.set(
        CATALOG_ID,
        format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>").into_bytes(),
    );
    objects.into_bytes()
}
