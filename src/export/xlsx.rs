//! XLSX writer
//!
//! Writes a single-sheet SpreadsheetML package: the zip container comes
//! from `zip`, the sheet and workbook parts are produced with `quick-xml`.
//! Strings are stored inline (`t="inlineStr"`), so no shared-strings part
//! is needed.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{record_cells, Cell, ExportError, COLUMNS};
use crate::model::Reservation;

/// Path of the only worksheet inside the package
pub const SHEET_PART: &str = "xl/worksheets/sheet1.xml";

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Write the reservations as an XLSX package and return the writer
pub fn write_xlsx<W: Write + Seek>(
    list: &[Reservation],
    sheet_name: &str,
    writer: W,
) -> Result<W, ExportError> {
    let sheet = sheet_xml(list)?;
    let workbook = workbook_xml(&clean_sheet_name(sheet_name))?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);

    let parts: [(&str, &[u8]); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("xl/workbook.xml", &workbook),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
        (SHEET_PART, &sheet),
    ];

    for (name, bytes) in parts {
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
    }

    Ok(zip.finish()?)
}

fn workbook_xml(sheet_name: &str) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(
        BytesStart::new("workbook")
            .with_attributes([("xmlns", SPREADSHEET_NS), ("xmlns:r", RELATIONSHIPS_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("sheets")))?;
    writer.write_event(Event::Empty(BytesStart::new("sheet").with_attributes([
        ("name", sheet_name),
        ("sheetId", "1"),
        ("r:id", "rId1"),
    ])))?;
    writer.write_event(Event::End(BytesEnd::new("sheets")))?;
    writer.write_event(Event::End(BytesEnd::new("workbook")))?;
    Ok(writer.into_inner())
}

fn sheet_xml(list: &[Reservation]) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(
        BytesStart::new("worksheet").with_attributes([("xmlns", SPREADSHEET_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    let header: Vec<Cell> = COLUMNS.iter().map(|c| Cell::Text(c.to_string())).collect();
    write_row(&mut writer, 1, &header)?;

    for (idx, reservation) in list.iter().enumerate() {
        write_row(&mut writer, idx + 2, &record_cells(reservation))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner())
}

fn write_row(writer: &mut Writer<Vec<u8>>, row: usize, cells: &[Cell]) -> Result<(), ExportError> {
    let row_ref = row.to_string();
    writer.write_event(Event::Start(
        BytesStart::new("row").with_attributes([("r", row_ref.as_str())]),
    ))?;

    for (col, cell) in cells.iter().enumerate() {
        let cell_ref = format!("{}{}", column_name(col), row);
        match cell {
            Cell::Number(n) => {
                writer.write_event(Event::Start(
                    BytesStart::new("c").with_attributes([("r", cell_ref.as_str())]),
                ))?;
                writer.write_event(Event::Start(BytesStart::new("v")))?;
                writer.write_event(Event::Text(BytesText::new(&n.to_string())))?;
                writer.write_event(Event::End(BytesEnd::new("v")))?;
            }
            Cell::Text(text) => {
                writer.write_event(Event::Start(BytesStart::new("c").with_attributes([
                    ("r", cell_ref.as_str()),
                    ("t", "inlineStr"),
                ])))?;
                writer.write_event(Event::Start(BytesStart::new("is")))?;
                writer.write_event(Event::Start(BytesStart::new("t")))?;
                writer.write_event(Event::Text(BytesText::new(&xml_safe(text))))?;
                writer.write_event(Event::End(BytesEnd::new("t")))?;
                writer.write_event(Event::End(BytesEnd::new("is")))?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new("c")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

/// Spreadsheet column letters: 0 -> A, 25 -> Z, 26 -> AA
pub fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// Drop characters XML 1.0 cannot carry
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Sheet names are limited to 31 characters and may not contain []:*?/\
fn clean_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}
