//! Reads `.xlsx`/`.xls` uploads into plain string grids.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::error::{AppError, AppResult};
use crate::models::OrderType;

/// A non-blank sheet row with its absolute 1-based row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub number: u32,
    pub cells: Vec<String>,
}

impl GridRow {
    /// Trimmed cell text at `column`, empty when the row is shorter.
    pub fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map(|c| c.trim()).unwrap_or("")
    }
}

/// One worksheet as trimmed strings, blank rows removed.
#[derive(Debug, Clone)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<GridRow>,
}

/// Parse every worksheet of a workbook payload; the format is sniffed from the bytes.
pub fn read_workbook(bytes: &[u8]) -> AppResult<Vec<SheetGrid>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| AppError::Workbook(format!("Failed to read sheet '{}': {}", name, e)))?;

        // Ranges start at the first used cell; keep absolute positions so row
        // numbers and column letters match what the user sees.
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows = Vec::new();
        for (i, row) in range.rows().enumerate() {
            let mut cells = vec![String::new(); start_col as usize];
            cells.extend(row.iter().map(cell_to_string));
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }
            rows.push(GridRow {
                number: start_row + i as u32 + 1,
                cells,
            });
        }

        sheets.push(SheetGrid { name, rows });
    }

    Ok(sheets)
}

/// Render a calamine cell the way users typed it.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => naive.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format_number(dt.as_f64()),
        },
        other => other.to_string().trim().to_string(),
    }
}

fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Pick the worksheet for an order type by name keyword.
pub fn find_sheet(sheets: &[SheetGrid], order_type: OrderType) -> Option<&SheetGrid> {
    let keywords = order_type.sheet_keywords();
    // Exact template names take priority over loose matches like "平台".
    keywords.iter().find_map(|keyword| {
        sheets
            .iter()
            .find(|s| s.name.trim().to_lowercase().contains(keyword))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn build_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("平台面单").unwrap();
        sheet.write_string(0, 0, "  GSP订单号 ").unwrap();
        sheet.write_string(0, 1, "件数").unwrap();
        sheet.write_string(2, 0, "SH1001").unwrap();
        sheet.write_number(2, 1, 5.0).unwrap();
        sheet.write_number(2, 2, 10.5).unwrap();

        let other = workbook.add_worksheet();
        other.set_name("Factory Orders").unwrap();
        other.write_string(3, 2, "offset").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_read_workbook_trims_and_skips_blank_rows() {
        let sheets = read_workbook(&build_workbook()).unwrap();
        assert_eq!(sheets.len(), 2);

        let platform = &sheets[0];
        assert_eq!(platform.name, "平台面单");
        assert_eq!(platform.rows.len(), 2);
        assert_eq!(platform.rows[0].number, 1);
        assert_eq!(platform.rows[0].cell(0), "GSP订单号");
        assert_eq!(platform.rows[1].number, 3);
        assert_eq!(platform.rows[1].cell(1), "5");
        assert_eq!(platform.rows[1].cell(2), "10.5");
        assert_eq!(platform.rows[1].cell(9), "");
    }

    #[test]
    fn test_read_workbook_keeps_absolute_positions() {
        let sheets = read_workbook(&build_workbook()).unwrap();
        let factory = &sheets[1];
        assert_eq!(factory.rows.len(), 1);
        assert_eq!(factory.rows[0].number, 4);
        assert_eq!(factory.rows[0].cell(2), "offset");
    }

    #[test]
    fn test_find_sheet_by_keyword() {
        let sheets = read_workbook(&build_workbook()).unwrap();
        assert_eq!(
            find_sheet(&sheets, OrderType::Platform).map(|s| s.name.as_str()),
            Some("平台面单")
        );
        assert_eq!(
            find_sheet(&sheets, OrderType::Factory).map(|s| s.name.as_str()),
            Some("Factory Orders")
        );
    }

    #[test]
    fn test_rejects_non_workbook_bytes() {
        let err = read_workbook(b"not a zip file").unwrap_err();
        assert!(matches!(err, AppError::Workbook(_)));
    }

    #[test]
    fn test_rejects_truncated_legacy_workbook() {
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        bytes.extend_from_slice(&[0u8; 64]);
        let err = read_workbook(&bytes).unwrap_err();
        assert!(matches!(err, AppError::Workbook(_)));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(30.0), "30");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(0.25), "0.25");
    }
}
