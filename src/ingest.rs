//! Loading a [`RawTable`] from delimited text or a spreadsheet workbook.

use std::path::Path;

use calamine::{Data, DataType, Reader, open_workbook_auto};
use log::{debug, info};

use crate::{
    data::{RawCell, RawTable},
    error::{Error, Result},
    io_utils::{self, InputFormat},
};

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: Option<String>,
    /// Worksheet name or 0-based index. Defaults to the first sheet.
    pub sheet: Option<String>,
}

pub fn load_table(path: &Path, options: &LoadOptions) -> Result<RawTable> {
    let table = match io_utils::detect_input_format(path)? {
        InputFormat::Delimited => load_delimited(path, options)?,
        InputFormat::Spreadsheet => load_spreadsheet(path, options.sheet.as_deref())?,
    };
    if table.headers().is_empty() {
        return Err(Error::ingestion(path, "no columns found"));
    }
    info!(
        "Loaded {} row(s) x {} column(s) from {:?}",
        table.row_count(),
        table.headers().len(),
        path
    );
    Ok(table)
}

fn load_delimited(path: &Path, options: &LoadOptions) -> Result<RawTable> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    let encoding = io_utils::resolve_encoding(options.encoding.as_deref())?;
    debug!(
        "Reading delimited input {:?} (delimiter {:?}, encoding {})",
        path,
        delimiter as char,
        encoding.name()
    );
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .map_err(|message| Error::ingestion(path, message))?;
    let headers = if headers.iter().all(|h| h.trim().is_empty()) {
        Vec::new()
    } else {
        unique_headers(headers)
    };

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record =
            record.map_err(|err| Error::ingestion(path, format!("row {}: {err}", row_idx + 2)))?;
        let decoded = io_utils::decode_record(&record, encoding)
            .map_err(|message| Error::ingestion(path, format!("row {}: {message}", row_idx + 2)))?;
        if decoded.iter().all(|field| field.is_empty()) {
            continue;
        }
        rows.push(
            decoded
                .into_iter()
                .map(|field| {
                    if field.is_empty() {
                        RawCell::Empty
                    } else {
                        RawCell::Text(field)
                    }
                })
                .collect(),
        );
    }
    Ok(RawTable::new(headers, rows))
}

fn load_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).map_err(|err| Error::ingestion(path, err))?;
    if workbook.sheet_names().is_empty() {
        return Err(Error::ingestion(path, "workbook has no worksheets"));
    }
    let range = match sheet {
        Some(selection) => match selection.parse::<usize>() {
            Ok(idx) => workbook
                .worksheet_range_at(idx)
                .ok_or_else(|| Error::ingestion(path, format!("no sheet at index {idx}")))?
                .map_err(|err| Error::ingestion(path, err))?,
            Err(_) => workbook
                .worksheet_range(selection)
                .map_err(|err| Error::ingestion(path, err))?,
        },
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::ingestion(path, "no first sheet"))?
            .map_err(|err| Error::ingestion(path, err))?,
    };

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(RawTable::default());
    };
    let headers = unique_headers(
        header_row
            .iter()
            .map(|cell| cell.as_string().unwrap_or_else(|| cell.to_string()))
            .collect(),
    );
    let body = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect::<Vec<_>>())
        .filter(|row| !row.iter().all(RawCell::is_empty))
        .collect();
    Ok(RawTable::new(headers, body))
}

fn spreadsheet_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) if s.is_empty() => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::Bool(b) => RawCell::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(RawCell::DateTime)
            .unwrap_or(RawCell::Empty),
        Data::Error(_) => RawCell::Empty,
        other => RawCell::Text(other.to_string()),
    }
}

/// Fills blank headers with positional names and suffixes duplicates with
/// `.1`, `.2`, ... so every column stays addressable by name.
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for (idx, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("column_{}", idx + 1)
        } else {
            header
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        seen.push(candidate);
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_headers_renames_blanks_and_duplicates() {
        let headers = unique_headers(vec![
            "Date".into(),
            "".into(),
            "Date".into(),
            "Date".into(),
        ]);
        assert_eq!(headers, ["Date", "column_2", "Date.1", "Date.2"]);
    }

    #[test]
    fn spreadsheet_cells_keep_native_types() {
        assert_eq!(spreadsheet_cell(&Data::Float(2.5)), RawCell::Number(2.5));
        assert_eq!(spreadsheet_cell(&Data::Int(3)), RawCell::Number(3.0));
        assert_eq!(spreadsheet_cell(&Data::String(String::new())), RawCell::Empty);
        assert_eq!(
            spreadsheet_cell(&Data::String("X".into())),
            RawCell::Text("X".into())
        );
    }
}
