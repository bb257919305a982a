//! Spreadsheet import of platform and factory orders.
//!
//! The pipeline reads the workbook, validates both sheets completely, rejects
//! the whole file when any row is invalid, and otherwise writes every order in
//! one transaction. Duplicate detection only produces warnings.

pub mod columns;
pub mod format;
pub mod row;
pub mod sheet;
pub mod upsert;
pub mod workbook;

use chrono::{SubsecRound, Utc};
use tracing::info;

use crate::config::ImportSettings;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{ImportResponse, OrderType};
use crate::services::storage::Storage;

pub use columns::Field;
pub use format::{ErrorKind, FieldError, format_errors};
pub use row::{DuplicateKey, FieldValues, OrderDraft, RowContext, validate_row};

const NOTHING_TO_IMPORT: &str = "Excel 中未找到可导入的数据";

/// Import a workbook on behalf of `user_id`.
pub async fn import_workbook(
    db: &DbPool,
    storage: &Storage,
    settings: &ImportSettings,
    bytes: &[u8],
    user_id: &str,
) -> AppResult<ImportResponse> {
    let sheets = workbook::read_workbook(bytes)?;
    // Whole seconds so a re-import of the same file finds the same identity.
    let now = Utc::now().trunc_subsecs(0);

    let mut parsed = Vec::new();
    for order_type in [OrderType::Platform, OrderType::Factory] {
        if let Some(grid) = workbook::find_sheet(&sheets, order_type) {
            parsed.push(sheet::parse_sheet(grid, order_type, settings, now));
        }
    }

    let errors: Vec<FieldError> = parsed.iter().flat_map(|p| p.errors.iter().cloned()).collect();
    let drafts: Vec<OrderDraft> = parsed
        .iter()
        .flat_map(|p| p.drafts.iter().map(|d| d.draft.clone()))
        .collect();

    if drafts.is_empty() && errors.is_empty() {
        return Err(AppError::InvalidInput(NOTHING_TO_IMPORT.to_string()));
    }
    if !errors.is_empty() {
        info!("Import rejected with {} validation errors", errors.len());
        return Err(AppError::Validation(format_errors(&errors)));
    }

    let mut warnings = Vec::new();
    for sheet in &parsed {
        warnings.extend(sheet::find_duplicates(db.connection(), sheet).await);
    }

    let summary = upsert::upsert_orders(db, &drafts, user_id).await?;
    for blob in &summary.released {
        storage.delete_quietly(blob).await;
    }

    Ok(ImportResponse {
        message: format!("成功导入{}条订单", drafts.len()),
        imported: drafts.len(),
        created: summary.created,
        updated: summary.updated,
        warnings: format_errors(&warnings),
    })
}
