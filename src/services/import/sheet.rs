//! Per-sheet import: header detection, row validation and the duplicate scan.

use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;
use tracing::warn;

use crate::config::ImportSettings;
use crate::db::orders::similar_order_exists;
use crate::models::OrderType;

use super::columns::{Field, locate_header};
use super::format::{ErrorKind, FieldError};
use super::row::{OrderDraft, RowContext, SheetRow, validate_row};
use super::workbook::SheetGrid;

const DUPLICATE_FIELD: &str = "记录";
const MISSING_COLUMN: &str = "缺少列";

/// A draft and the sheet row it came from.
#[derive(Debug, Clone)]
pub struct SheetDraft {
    pub row: u32,
    pub draft: OrderDraft,
}

/// Result of validating one sheet.
#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub sheet: String,
    pub order_type: OrderType,
    pub drafts: Vec<SheetDraft>,
    /// Blocking problems (structural and field errors)
    pub errors: Vec<FieldError>,
}

impl ParsedSheet {
    fn empty(sheet: &str, order_type: OrderType) -> Self {
        Self {
            sheet: sheet.to_string(),
            order_type,
            drafts: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Validate every data row of a sheet. Missing required columns abort the
/// sheet before any row is looked at.
pub fn parse_sheet(
    grid: &SheetGrid,
    order_type: OrderType,
    settings: &ImportSettings,
    now: DateTime<Utc>,
) -> ParsedSheet {
    let mut parsed = ParsedSheet::empty(&grid.name, order_type);
    if grid.rows.is_empty() {
        return parsed;
    }

    let layout = locate_header(&grid.rows, order_type);
    if !layout.missing.is_empty() {
        parsed.errors = layout
            .missing
            .iter()
            .map(|field: &Field| {
                FieldError::new(
                    &grid.name,
                    layout.header_row_number,
                    field.label(),
                    ErrorKind::Custom,
                    MISSING_COLUMN,
                )
            })
            .collect();
        return parsed;
    }

    for row in grid.rows.iter().skip(layout.data_start()) {
        let ctx = RowContext {
            sheet: &grid.name,
            row: row.number,
            order_type,
            default_address: &settings.default_address,
            warehouse_codes: settings.warehouse_codes.as_ref(),
            now,
        };
        match validate_row(&SheetRow::new(row, &layout.columns), &ctx) {
            Ok(draft) => parsed.drafts.push(SheetDraft {
                row: row.number,
                draft,
            }),
            Err(errors) => parsed.errors.extend(errors),
        }
    }

    parsed
}

/// Compare valid drafts against stored orders. Returns warnings only: one
/// `duplicate` entry listing every similar row, plus a `duplicate_check`
/// entry per row whose lookup failed.
pub async fn find_duplicates<C: ConnectionTrait>(conn: &C, parsed: &ParsedSheet) -> Vec<FieldError> {
    let mut warnings = Vec::new();
    let mut duplicate_rows = Vec::new();

    for item in &parsed.drafts {
        match similar_order_exists(conn, &item.draft.duplicate_key()).await {
            Ok(true) => duplicate_rows.push(item.row),
            Ok(false) => {}
            Err(e) => {
                warn!("Duplicate check failed for {} row {}: {}", parsed.sheet, item.row, e);
                warnings.push(FieldError::new(
                    &parsed.sheet,
                    item.row,
                    DUPLICATE_FIELD,
                    ErrorKind::DuplicateCheck,
                    format!("检查重复时出错: {}", e),
                ));
            }
        }
    }

    if let Some(first) = duplicate_rows.first() {
        let rows: Vec<String> = duplicate_rows.iter().map(|r| r.to_string()).collect();
        warnings.push(FieldError::new(
            &parsed.sheet,
            *first,
            DUPLICATE_FIELD,
            ErrorKind::Duplicate,
            format!(
                "{}[第{}行]已有类似记录，请检查!",
                parsed.sheet,
                rows.join(",")
            ),
        ));
    }

    warnings
}
