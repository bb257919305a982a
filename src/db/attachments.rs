//! Database operations for order attachments.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::material_asset;
use crate::entity::order_attachment::{self as attachment, ActiveModel, Entity as Attachment};
use crate::error::{AppError, AppResult};
use crate::models::FileType;
use crate::services::storage::BlobRef;

use super::DbPool;

/// File fields written onto an attachment row.
#[derive(Debug, Clone)]
pub struct AttachmentFile {
    pub file_type: FileType,
    pub file_name: String,
    pub file_path: String,
    pub file_ext: String,
    pub file_size: i64,
    pub checksum: String,
    pub storage: String,
    pub uploader_id: String,
    pub material_id: Option<Uuid>,
    pub owns_blob: bool,
}

impl AttachmentFile {
    /// File fields of a link to a library material. The blob stays owned by
    /// the material.
    pub fn linked(material: &material_asset::Model, file_type: FileType, uploader_id: &str) -> Self {
        Self {
            file_type,
            file_name: material.file_name.clone(),
            file_path: material.file_path.clone(),
            file_ext: crate::services::storage::split_file_name(&material.file_name).1,
            file_size: material.file_size,
            checksum: String::new(),
            storage: material.storage.clone(),
            uploader_id: uploader_id.to_string(),
            material_id: Some(material.id),
            owns_blob: false,
        }
    }
}

/// Blob an attachment row is responsible for, if any.
pub fn owned_blob(model: &attachment::Model) -> Option<BlobRef> {
    (model.owns_blob && !model.file_path.is_empty()).then(|| BlobRef {
        storage: model.storage.clone(),
        key: model.file_path.clone(),
    })
}

fn apply_file(active: &mut ActiveModel, file: &AttachmentFile) {
    active.file_type = Set(file.file_type.as_str().to_string());
    active.file_name = Set(file.file_name.clone());
    active.file_path = Set(file.file_path.clone());
    active.file_ext = Set(file.file_ext.clone());
    active.file_size = Set(file.file_size);
    active.checksum = Set(file.checksum.clone());
    active.storage = Set(file.storage.clone());
    active.uploader_id = Set(file.uploader_id.clone());
    active.material_id = Set(file.material_id);
    active.owns_blob = Set(file.owns_blob);
}

/// Find the attachment of an order in one role.
pub async fn find_by_role<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    file_type: FileType,
) -> AppResult<Option<attachment::Model>> {
    let result = Attachment::find()
        .filter(attachment::Column::OrderId.eq(order_id))
        .filter(attachment::Column::FileType.eq(file_type.as_str()))
        .one(conn)
        .await?;
    Ok(result)
}

/// Overwrite the order's attachment in this role, or create it.
///
/// Returns the stored row and the blob the previous row owned, which the
/// caller deletes once the transaction has committed.
pub async fn replace_or_create<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    file: &AttachmentFile,
) -> AppResult<(attachment::Model, Option<BlobRef>)> {
    let now = Utc::now();

    match find_by_role(conn, order_id, file.file_type).await? {
        Some(existing) => {
            let released = owned_blob(&existing).filter(|blob| {
                !(blob.key == file.file_path && blob.storage == file.storage)
            });
            let mut active: ActiveModel = existing.into();
            apply_file(&mut active, file);
            active.updated_at = Set(now);
            let model = active
                .update(conn)
                .await
                .map_err(|e| AppError::Database(format!("Failed to replace attachment: {}", e)))?;
            Ok((model, released))
        }
        None => {
            let mut active = ActiveModel {
                id: Set(Uuid::now_v7()),
                order_id: Set(order_id),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            apply_file(&mut active, file);
            let model = active
                .insert(conn)
                .await
                .map_err(|e| AppError::Database(format!("Failed to create attachment: {}", e)))?;
            Ok((model, None))
        }
    }
}

/// Link a library material to an order. Linking the material already linked
/// in that role leaves the row untouched.
pub async fn link_material<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    material: &material_asset::Model,
    file_type: FileType,
    uploader_id: &str,
) -> AppResult<(attachment::Model, Option<BlobRef>)> {
    if let Some(existing) = find_by_role(conn, order_id, file_type).await?
        && existing.material_id == Some(material.id)
        && !existing.owns_blob
    {
        return Ok((existing, None));
    }
    let file = AttachmentFile::linked(material, file_type, uploader_id);
    replace_or_create(conn, order_id, &file).await
}

/// Delete every attachment of an order, returning the blobs they owned.
pub async fn delete_for_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<BlobRef>> {
    let rows = Attachment::find()
        .filter(attachment::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;
    let released = rows.iter().filter_map(owned_blob).collect();

    Attachment::delete_many()
        .filter(attachment::Column::OrderId.eq(order_id))
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to delete attachments: {}", e)))?;

    Ok(released)
}

impl DbPool {
    /// List an order's attachments in upload order.
    pub async fn list_attachments(&self, order_id: Uuid) -> AppResult<Vec<attachment::Model>> {
        let rows = Attachment::find()
            .filter(attachment::Column::OrderId.eq(order_id))
            .order_by_asc(attachment::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list attachments: {}", e)))?;
        Ok(rows)
    }

    /// Get one attachment of an order.
    pub async fn get_attachment(
        &self,
        order_id: Uuid,
        attachment_id: Uuid,
    ) -> AppResult<Option<attachment::Model>> {
        let result = Attachment::find_by_id(attachment_id)
            .filter(attachment::Column::OrderId.eq(order_id))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get attachment: {}", e)))?;
        Ok(result)
    }

    /// Delete an attachment row.
    pub async fn delete_attachment(&self, attachment_id: Uuid) -> AppResult<()> {
        Attachment::delete_by_id(attachment_id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete attachment: {}", e)))?;
        Ok(())
    }

    /// Number of attachments referencing a material.
    pub async fn count_material_references(&self, material_id: Uuid) -> AppResult<u64> {
        let count = Attachment::find()
            .filter(attachment::Column::MaterialId.eq(material_id))
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count attachments: {}", e)))?;
        Ok(count)
    }
}
