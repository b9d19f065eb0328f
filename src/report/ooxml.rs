use std::io::{Cursor, Write};

use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::error::{Error, Result};

pub(crate) const XML_DECLARATION: &str =
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// In-memory OOXML package (a zip archive of XML parts and media).
pub(crate) struct Package {
    format: &'static str,
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl Package {
    pub(crate) fn new(format: &'static str) -> Self {
        Self {
            format,
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    pub(crate) fn add(&mut self, name: &str, contents: &[u8]) -> Result<()> {
        self.writer
            .start_file(name, self.options)
            .map_err(|err| Error::export(self.format, format!("{name}: {err}")))?;
        self.writer
            .write_all(contents)
            .map_err(|err| Error::export(self.format, format!("{name}: {err}")))
    }

    pub(crate) fn add_xml(&mut self, name: &str, body: &str) -> Result<()> {
        let mut part = String::with_capacity(XML_DECLARATION.len() + body.len() + 1);
        part.push_str(XML_DECLARATION);
        part.push('\n');
        part.push_str(body);
        self.add(name, part.as_bytes())
    }

    pub(crate) fn finish(self) -> Result<Vec<u8>> {
        let format = self.format;
        self.writer
            .finish()
            .map(Cursor::into_inner)
            .map_err(|err| Error::export(format, err))
    }
}

pub(crate) fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // Control characters other than tab and newlines are not valid XML 1.0.
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_drops_control_characters() {
        assert_eq!(escape_xml("A&B <\"x\">\u{1}"), "A&amp;B &lt;&quot;x&quot;&gt;");
    }
}
