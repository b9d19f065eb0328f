//! I/O helpers for reading tabular input files.
//!
//! - **Format detection**: `.csv`/`.tsv`/`.txt` are delimited text, `.xlsx`,
//!   `.xlsm`, `.xlsb`, `.xls` and `.ods` are spreadsheets.
//! - **Delimiter resolution**: extension-based (`.tsv` → tab) with manual
//!   override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **stdin**: the `-` path convention routes delimited input through stdin.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use encoding_rs::{Encoding, UTF_8};

use crate::error::{Error, Result};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited,
    Spreadsheet,
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn detect_input_format(path: &Path) -> Result<InputFormat> {
    if is_dash(path) {
        return Ok(InputFormat::Delimited);
    }
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "tsv" | "txt" => Ok(InputFormat::Delimited),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(InputFormat::Spreadsheet),
        other => Err(Error::ingestion(
            path,
            format!("unsupported file extension '{other}' (expected csv, tsv, xlsx or xls)"),
        )),
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes()).ok_or_else(|| {
            Error::ingestion(Path::new("-"), format!("unknown encoding '{value}'"))
        }),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).map_err(|err| Error::ingestion(path, err))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    // `decode` sniffs and strips a leading byte order mark.
    let (text, _, had_errors) = encoding.decode(bytes);
    (!had_errors).then(|| text.into_owned())
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> std::result::Result<Vec<String>, String> {
    record
        .iter()
        .map(|field| {
            decode_bytes(field, encoding)
                .ok_or_else(|| format!("failed to decode text with encoding {}", encoding.name()))
        })
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> std::result::Result<Vec<String>, String>
where
    R: Read,
{
    let headers = reader.byte_headers().map_err(|err| err.to_string())?.clone();
    decode_record(&headers, encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn input_format_follows_extension() {
        assert_eq!(
            detect_input_format(&PathBuf::from("sales.CSV")).unwrap(),
            InputFormat::Delimited
        );
        assert_eq!(
            detect_input_format(&PathBuf::from("sales.xlsx")).unwrap(),
            InputFormat::Spreadsheet
        );
        assert!(matches!(
            detect_input_format(&PathBuf::from("sales.parquet")),
            Err(Error::Ingestion { .. })
        ));
    }

    #[test]
    fn delimiter_defaults_by_extension() {
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("a.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("a.csv"), Some(b';')), b';');
    }

    #[test]
    fn encoding_labels_resolve() {
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(
            resolve_encoding(Some("latin1")).unwrap().name(),
            "windows-1252"
        );
        assert!(resolve_encoding(Some("klingon")).is_err());
    }
}
