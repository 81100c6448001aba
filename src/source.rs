//! Reading raw tabular input (CSV text or an Excel workbook) into a grid of
//! string cells. No interpretation happens here beyond text decoding.

use crate::error::LoadError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use encoding_rs::EUC_KR;
use std::io::Cursor;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Sniff the payload: zip (xlsx/ods) and OLE (xls) containers go through
    /// the workbook reader, everything else is treated as CSV text.
    ///
    /// `sheet` selects a worksheet by name; `None` takes the first sheet.
    pub fn from_bytes(bytes: &[u8], sheet: Option<&str>) -> Result<Self, LoadError> {
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
            Self::from_workbook(bytes, sheet)
        } else {
            Self::from_csv_text(&decode_text(bytes)?)
        }
    }

    pub fn from_csv_text(text: &str) -> Result<Self, LoadError> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(text.as_bytes());
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(LoadError::Empty);
        }
        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    pub fn from_workbook(bytes: &[u8], sheet: Option<&str>) -> Result<Self, LoadError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;

        let sheet_names = workbook.sheet_names().to_vec();
        let sheet_name = match sheet {
            Some(wanted) => sheet_names
                .iter()
                .find(|n| n.trim() == wanted.trim())
                .cloned()
                .ok_or_else(|| LoadError::MissingSheet(wanted.to_string()))?,
            None => sheet_names.first().cloned().ok_or(LoadError::Empty)?,
        };
        debug!(sheet = %sheet_name, "reading worksheet");

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;
        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or(LoadError::Empty)?
            .iter()
            .map(cell_to_string)
            .collect();
        let rows = rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        Ok(Self { headers, rows })
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

/// Decode CSV bytes. A UTF-8 BOM or valid UTF-8 wins; otherwise the bytes
/// are decoded strictly as CP949 (the Windows superset of EUC-KR that Korean
/// spreadsheet exports use).
pub fn decode_text(bytes: &[u8]) -> Result<String, LoadError> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return std::str::from_utf8(rest)
            .map(str::to_string)
            .map_err(|_| LoadError::Encoding);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }
    EUC_KR
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or(LoadError::Encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::YearMonth;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="개요" sheetId="1" r:id="rId1"/><sheet name="용도별판매량" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

    fn worksheet(rows: &[&[&str]]) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        for (i, row) in rows.iter().enumerate() {
            xml.push_str(&format!(r#"<row r="{}">"#, i + 1));
            for (j, cell) in row.iter().enumerate() {
                let at = format!("{}{}", (b'A' + j as u8) as char, i + 1);
                if cell.parse::<f64>().is_ok() {
                    xml.push_str(&format!(r#"<c r="{at}"><v>{cell}</v></c>"#));
                } else {
                    xml.push_str(&format!(
                        r#"<c r="{at}" t="inlineStr"><is><t>{cell}</t></is></c>"#
                    ));
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }

    /// Two-sheet xlsx: an overview sheet first, the sales sheet second.
    fn sample_xlsx() -> Vec<u8> {
        let overview = worksheet(&[&["note"], &["overview only"]]);
        let sales = worksheet(&[
            &["연", "월", "취사용"],
            &["2015", "1", "1234.5"],
            &["201512", "12", "7"],
        ]);
        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/worksheets/sheet1.xml", overview.as_str()),
            ("xl/worksheets/sheet2.xml", sales.as_str()),
        ];

        let options = FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in parts {
            writer.start_file(name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn spreadsheet_cells_render_as_plain_text() {
        assert_eq!(cell_to_string(&Data::Float(201501.0)), "201501");
        assert_eq!(
            YearMonth::parse(&cell_to_string(&Data::Float(201501.0))),
            YearMonth::new(2015, 1)
        );
        assert_eq!(cell_to_string(&Data::Float(1234.5)), "1234.5");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("중구".to_string())), "중구");
    }

    #[test]
    fn workbook_sheet_is_selected_by_name() {
        let bytes = sample_xlsx();
        let table = RawTable::from_bytes(&bytes, Some(" 용도별판매량 ")).unwrap();
        assert_eq!(table.headers, vec!["연", "월", "취사용"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["2015", "1", "1234.5"]);
        assert_eq!(table.rows[1][0], "201512");

        let first = RawTable::from_bytes(&bytes, None).unwrap();
        assert_eq!(first.headers, vec!["note"]);
    }

    #[test]
    fn unknown_sheet_name_is_reported() {
        let err = RawTable::from_bytes(&sample_xlsx(), Some("판매량")).unwrap_err();
        assert!(matches!(err, LoadError::MissingSheet(name) if name == "판매량"));
    }

    #[test]
    fn decodes_cp949_bytes() {
        let (encoded, _, had_errors) = EUC_KR.encode("년월,시군구\n201501,중구\n");
        assert!(!had_errors);
        let text = decode_text(&encoded).unwrap();
        assert!(text.starts_with("년월,시군구"));
    }

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("년월\n201501\n".as_bytes());
        assert_eq!(decode_text(&bytes).unwrap(), "년월\n201501\n");
    }

    #[test]
    fn rejects_undecodable_bytes() {
        assert!(matches!(decode_text(&[0xFF, 0xFF, 0x80]), Err(LoadError::Encoding)));
    }

    #[test]
    fn reads_ragged_csv_rows() {
        let table = RawTable::from_csv_text("a,b,c\n1,2,3\n4,5\n").unwrap();
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["4", "5"]);
    }

    #[test]
    fn headerless_input_is_an_error() {
        assert!(matches!(RawTable::from_csv_text(""), Err(LoadError::Empty)));
    }
}
