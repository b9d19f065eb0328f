//! Just enough PNG reading to size images and embed their compressed
//! pixel data in other documents without re-encoding.

use crate::error::{Error, Result};

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Gray,
    Rgb,
}

impl ColorType {
    pub fn components(self) -> u8 {
        match self {
            ColorType::Gray => 1,
            ColorType::Rgb => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngImage {
    pub width: u32,
    pub height: u32,
    pub color: ColorType,
    /// Concatenated IDAT payload: a zlib stream of filtered scanlines.
    pub data: Vec<u8>,
}

fn unsupported(message: impl ToString) -> Error {
    Error::export("png", message)
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Parses an 8-bit, non-interlaced grayscale or RGB PNG.
pub fn parse(bytes: &[u8]) -> Result<PngImage> {
    if !bytes.starts_with(&SIGNATURE) {
        return Err(unsupported("not a PNG image"));
    }
    let mut header = None;
    let mut data = Vec::new();
    let mut pos = SIGNATURE.len();
    while pos + 8 <= bytes.len() {
        let length = read_u32(bytes, pos).ok_or_else(|| unsupported("truncated chunk"))? as usize;
        let kind = &bytes[pos + 4..pos + 8];
        let body = bytes
            .get(pos + 8..pos + 8 + length)
            .ok_or_else(|| unsupported("truncated chunk"))?;
        match kind {
            b"IHDR" => header = Some(body.to_vec()),
            b"IDAT" => data.extend_from_slice(body),
            b"IEND" => break,
            _ => {}
        }
        // length + type + body + crc
        pos += 12 + length;
    }

    let header = header.ok_or_else(|| unsupported("missing IHDR chunk"))?;
    if header.len() < 13 {
        return Err(unsupported("short IHDR chunk"));
    }
    let width = read_u32(&header, 0).unwrap_or_default();
    let height = read_u32(&header, 4).unwrap_or_default();
    let (bit_depth, color_type, interlace) = (header[8], header[9], header[12]);
    if width == 0 || height == 0 {
        return Err(unsupported("zero-sized image"));
    }
    if bit_depth != 8 {
        return Err(unsupported(format!("unsupported bit depth {bit_depth}")));
    }
    if interlace != 0 {
        return Err(unsupported("interlaced images are not supported"));
    }
    let color = match color_type {
        0 => ColorType::Gray,
        2 => ColorType::Rgb,
        other => return Err(unsupported(format!("unsupported color type {other}"))),
    };
    if data.is_empty() {
        return Err(unsupported("missing image data"));
    }
    Ok(PngImage {
        width,
        height,
        color,
        data,
    })
}

#[cfg(test)]
pub(crate) fn encode_test_png(width: u32, height: u32, color_type: u8) -> Vec<u8> {
    use flate2::{Compression, Crc, write::ZlibEncoder};
    use std::io::Write;

    let components = if color_type == 2 { 3 } else { 1 };
    let mut raw = Vec::new();
    for y in 0..height {
        raw.push(0);
        for x in 0..width * components {
            raw.push(((x + y) * 40 % 256) as u8);
        }
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).unwrap();
    let idat = encoder.finish().unwrap();

    let mut png = SIGNATURE.to_vec();
    let mut chunk = |kind: &[u8], body: &[u8]| {
        png.extend_from_slice(&(body.len() as u32).to_be_bytes());
        png.extend_from_slice(kind);
        png.extend_from_slice(body);
        let mut crc = Crc::new();
        crc.update(kind);
        crc.update(body);
        png.extend_from_slice(&crc.sum().to_be_bytes());
    };
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[8, color_type, 0, 0, 0]);
    chunk(b"IHDR", &ihdr);
    chunk(b"IDAT", &idat);
    chunk(b"IEND", &[]);
    png
}
