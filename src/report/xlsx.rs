//! Single-sheet workbook writer for the filtered table.

use std::{borrow::Cow, collections::HashMap, fmt::Write as _};

use super::ooxml::{Package, escape_xml};
use crate::{
    error::Result,
    schema::{FilteredTable, NormalizedRow, NormalizedTable},
};

pub const SHEET_NAME: &str = "Analysis";

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#;

enum Cell<'a> {
    Empty,
    Text(Cow<'a, str>),
    Number(f64),
}

impl Cell<'_> {
    fn number(value: Option<f64>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }
}

#[derive(Default)]
struct SharedStrings {
    index: HashMap<String, usize>,
    values: Vec<String>,
    references: usize,
}

impl SharedStrings {
    fn intern(&mut self, value: &str) -> usize {
        self.references += 1;
        if let Some(&idx) = self.index.get(value) {
            return idx;
        }
        let idx = self.values.len();
        self.values.push(value.to_string());
        self.index.insert(value.to_string(), idx);
        idx
    }

    fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
            self.references,
            self.values.len()
        );
        for value in &self.values {
            let _ = write!(xml, r#"<si><t xml:space="preserve">{}</t></si>"#, escape_xml(value));
        }
        xml.push_str("</sst>");
        xml
    }
}

/// Spreadsheet column letters for a zero-based index (`0 -> A`, `26 -> AA`).
pub fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn row_cells(row: &NormalizedRow) -> [Cell<'_>; 6] {
    [
        row.date
            .map_or(Cell::Empty, |date| Cell::Text(date.format("%Y-%m-%d").to_string().into())),
        Cell::number(row.revenue),
        Cell::number(row.margin),
        Cell::Text(row.product.as_str().into()),
        Cell::number(row.insurer_share),
        Cell::Text(row.distributor.as_str().into()),
    ]
}

fn write_row(xml: &mut String, strings: &mut SharedStrings, row_number: usize, cells: &[Cell<'_>]) {
    let _ = write!(xml, r#"<row r="{row_number}">"#);
    for (col, cell) in cells.iter().enumerate() {
        let reference = format!("{}{row_number}", column_letters(col));
        match cell {
            Cell::Empty => {}
            Cell::Text(text) => {
                let idx = strings.intern(text);
                let _ = write!(xml, r#"<c r="{reference}" t="s"><v>{idx}</v></c>"#);
            }
            Cell::Number(value) => {
                let _ = write!(xml, r#"<c r="{reference}"><v>{value}</v></c>"#);
            }
        }
    }
    xml.push_str("</row>");
}

fn worksheet(table: &FilteredTable, strings: &mut SharedStrings) -> String {
    let mut xml = String::from(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    let headers = NormalizedTable::headers().map(|name| Cell::Text(name.into()));
    write_row(&mut xml, strings, 1, &headers);
    for (offset, row) in table.rows().iter().enumerate() {
        write_row(&mut xml, strings, offset + 2, &row_cells(row));
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Writes the table as a workbook with one sheet: a header row of the six
/// semantic column names and one row per record, null cells left empty.
pub fn write_workbook(table: &FilteredTable) -> Result<Vec<u8>> {
    let mut strings = SharedStrings::default();
    let sheet = worksheet(table, &mut strings);
    let workbook = format!(
        r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{SHEET_NAME}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    );

    let mut package = Package::new("xlsx");
    package.add_xml("[Content_Types].xml", CONTENT_TYPES)?;
    package.add_xml("_rels/.rels", ROOT_RELS)?;
    package.add_xml("xl/workbook.xml", &workbook)?;
    package.add_xml("xl/_rels/workbook.xml.rels", WORKBOOK_RELS)?;
    package.add_xml("xl/styles.xml", STYLES)?;
    package.add_xml("xl/worksheets/sheet1.xml", &sheet)?;
    package.add_xml("xl/sharedStrings.xml", &strings.to_xml())?;
    package.finish()
}
