//! Database operations for material folders.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::material_folder::{self as folder, ActiveModel, Entity as Folder};
use crate::error::{AppError, AppResult};

use super::DbPool;

/// Folder new materials land in when none is given.
pub const DEFAULT_FOLDER_NAME: &str = "默认文件夹";

/// Path of a folder below `parent_path` (or at the root).
pub fn child_path(parent_path: Option<&str>, name: &str) -> String {
    match parent_path {
        Some(parent) if !parent.is_empty() => format!("{}/{}", parent, name),
        _ => name.to_string(),
    }
}

/// Insert a folder.
pub async fn insert_folder<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    parent: Option<&folder::Model>,
) -> AppResult<folder::Model> {
    let now = Utc::now();
    let active = ActiveModel {
        id: Set(Uuid::now_v7()),
        name: Set(name.to_string()),
        parent_id: Set(parent.map(|p| p.id)),
        path: Set(child_path(parent.map(|p| p.path.as_str()), name)),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    active
        .insert(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create folder: {}", e)))
}

/// Get or create the root-level default folder.
pub async fn ensure_default_folder<C: ConnectionTrait>(conn: &C) -> AppResult<folder::Model> {
    let existing = Folder::find()
        .filter(folder::Column::DeletedAt.is_null())
        .filter(folder::Column::ParentId.is_null())
        .filter(folder::Column::Name.eq(DEFAULT_FOLDER_NAME))
        .one(conn)
        .await?;
    match existing {
        Some(folder) => Ok(folder),
        None => insert_folder(conn, DEFAULT_FOLDER_NAME, None).await,
    }
}

impl DbPool {
    /// Get a live folder.
    pub async fn get_folder(&self, id: Uuid) -> AppResult<Option<folder::Model>> {
        let result = Folder::find_by_id(id)
            .filter(folder::Column::DeletedAt.is_null())
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get folder: {}", e)))?;
        Ok(result)
    }

    /// All live folders ordered by path.
    pub async fn list_folders(&self) -> AppResult<Vec<folder::Model>> {
        let rows = Folder::find()
            .filter(folder::Column::DeletedAt.is_null())
            .order_by_asc(folder::Column::Path)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list folders: {}", e)))?;
        Ok(rows)
    }

    /// Number of live direct children of a folder.
    pub async fn count_child_folders(&self, id: Uuid) -> AppResult<u64> {
        let count = Folder::find()
            .filter(folder::Column::DeletedAt.is_null())
            .filter(folder::Column::ParentId.eq(id))
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count folders: {}", e)))?;
        Ok(count)
    }

    /// Whether another live folder named `name` already sits under `parent_id`.
    pub async fn sibling_name_taken(
        &self,
        parent_id: Option<Uuid>,
        name: &str,
        except: Option<Uuid>,
    ) -> AppResult<bool> {
        let mut select = Folder::find()
            .filter(folder::Column::DeletedAt.is_null())
            .filter(folder::Column::Name.eq(name));
        select = match parent_id {
            Some(id) => select.filter(folder::Column::ParentId.eq(id)),
            None => select.filter(folder::Column::ParentId.is_null()),
        };
        if let Some(id) = except {
            select = select.filter(folder::Column::Id.ne(id));
        }
        let count = select
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to check folder name: {}", e)))?;
        Ok(count > 0)
    }

    /// Rename and/or move a folder. Every descendant path starting with the
    /// old path is rewritten in the same transaction.
    pub async fn relocate_folder(
        &self,
        existing: folder::Model,
        name: String,
        parent: Option<folder::Model>,
    ) -> AppResult<folder::Model> {
        let old_path = existing.path.clone();
        let new_path = child_path(parent.as_ref().map(|p| p.path.as_str()), &name);
        let now = Utc::now();

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to start transaction: {}", e)))?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(name);
        active.parent_id = Set(parent.map(|p| p.id));
        active.path = Set(new_path.clone());
        active.updated_at = Set(now);
        let updated = active
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update folder: {}", e)))?;

        if new_path != old_path {
            let old_prefix = format!("{}/", old_path);
            let descendants = Folder::find()
                .filter(folder::Column::DeletedAt.is_null())
                .filter(folder::Column::Path.starts_with(old_prefix.as_str()))
                .all(&txn)
                .await?;
            for child in descendants {
                // LIKE treats `_` in folder names as a wildcard.
                let Some(rest) = child.path.strip_prefix(old_prefix.as_str()) else {
                    continue;
                };
                let path = format!("{}/{}", new_path, rest);
                let mut active: ActiveModel = child.into();
                active.path = Set(path);
                active.updated_at = Set(now);
                active.update(&txn).await.map_err(|e| {
                    AppError::Database(format!("Failed to update folder path: {}", e))
                })?;
            }
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;

        Ok(updated)
    }

    /// Remove a folder row.
    pub async fn delete_folder(&self, id: Uuid) -> AppResult<()> {
        Folder::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete folder: {}", e)))?;
        Ok(())
    }
}
