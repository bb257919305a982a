//! Write validated drafts: update-or-insert by identity, then auto-link materials.

use sea_orm::{DatabaseTransaction, TransactionTrait};
use tracing::{debug, info, warn};

use crate::db::DbPool;
use crate::db::attachments::link_material;
use crate::db::materials::find_link_candidate;
use crate::db::orders::{find_by_identity, insert_order, update_order};
use crate::entity::order_info;
use crate::error::{AppError, AppResult};
use crate::models::FileType;
use crate::services::storage::BlobRef;

use super::row::OrderDraft;

/// What a batch write did.
#[derive(Debug, Default)]
pub struct UpsertSummary {
    pub created: usize,
    pub updated: usize,
    /// Blobs of replaced attachments, to delete after commit.
    pub released: Vec<BlobRef>,
}

/// Write every draft in one transaction.
///
/// An order is identified by (order no, type, creation time); a match is
/// updated in place, anything else is inserted.
pub async fn upsert_orders(
    db: &DbPool,
    drafts: &[OrderDraft],
    user_id: &str,
) -> AppResult<UpsertSummary> {
    let mut summary = UpsertSummary::default();

    let txn = db
        .connection()
        .begin()
        .await
        .map_err(|e| AppError::Database(format!("Failed to start transaction: {}", e)))?;

    for draft in drafts {
        let existing = find_by_identity(
            &txn,
            &draft.gsp_order_no,
            draft.order_type,
            draft.order_created_at,
        )
        .await?;

        let order = match existing {
            Some(existing) => {
                summary.updated += 1;
                update_order(&txn, existing, draft, user_id).await?
            }
            None => {
                summary.created += 1;
                insert_order(&txn, draft, user_id).await?
            }
        };

        if let Some(blob) = auto_link(&txn, &order, draft.material_key(), user_id).await {
            summary.released.push(blob);
        }
    }

    txn.commit()
        .await
        .map_err(|e| AppError::Database(format!("Failed to commit import: {}", e)))?;

    info!(
        "Upserted {} orders ({} created, {} updated)",
        drafts.len(),
        summary.created,
        summary.updated
    );
    Ok(summary)
}

/// Link the library material matching `key` to the order. Runs in a savepoint
/// so a failure leaves the surrounding import intact; failures are only logged.
async fn auto_link(
    txn: &DatabaseTransaction,
    order: &order_info::Model,
    key: &str,
    user_id: &str,
) -> Option<BlobRef> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let savepoint = match txn.begin().await {
        Ok(sp) => sp,
        Err(e) => {
            warn!("Auto-link skipped for order {}: {}", order.gsp_order_no, e);
            return None;
        }
    };

    let result = async {
        let Some(material) = find_link_candidate(&savepoint, key).await? else {
            debug!("No material matches key={} for order {}", key, order.id);
            return Ok(None);
        };
        let (_, released) =
            link_material(&savepoint, order.id, &material, FileType::MaterialImage, user_id).await?;
        debug!("Linked material {} to order {}", material.id, order.id);
        AppResult::Ok(released)
    }
    .await;

    match result {
        Ok(released) => match savepoint.commit().await {
            Ok(()) => released,
            Err(e) => {
                warn!("Auto-link failed for order {}: {}", order.gsp_order_no, e);
                None
            }
        },
        Err(e) => {
            warn!("Auto-link failed for order {}: {}", order.gsp_order_no, e);
            if let Err(e) = savepoint.rollback().await {
                warn!("Failed to roll back auto-link savepoint: {}", e);
            }
            None
        }
    }
}
