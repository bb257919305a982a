//! Database operations for the material library.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::material_asset::{self as material, ActiveModel, Entity as Material};
use crate::entity::order_attachment::{self as attachment, Entity as Attachment};
use crate::error::{AppError, AppResult};
use crate::models::FileType;
use crate::services::materials::{dimensions_label, shape_of};

use super::DbPool;
use super::orders::lower_eq;

/// Fields of a new material asset.
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub code: String,
    pub file_name: String,
    pub title: String,
    pub width: i32,
    pub height: i32,
    pub format: String,
    pub file_size: i64,
    pub storage: String,
    pub file_path: String,
    pub folder_id: Option<Uuid>,
    pub created_by: String,
}

/// Filters of `GET /materials`.
#[derive(Debug, Clone, Default)]
pub struct MaterialFilter {
    pub keyword: Option<String>,
    pub folder_id: Option<Uuid>,
    pub shape: Option<String>,
    pub format: Option<String>,
    pub created_by: Option<String>,
}

fn live() -> Condition {
    Condition::all().add(material::Column::DeletedAt.is_null())
}

fn visible_to(created_by: Option<&str>) -> Condition {
    let mut cond = live();
    if let Some(user) = created_by {
        cond = cond.add(material::Column::CreatedBy.eq(user));
    }
    cond
}

/// Insert a material; dimensions and shape are derived from width/height.
pub async fn insert_material<C: ConnectionTrait>(
    conn: &C,
    new: NewMaterial,
) -> AppResult<material::Model> {
    let now = Utc::now();
    let active = ActiveModel {
        id: Set(Uuid::now_v7()),
        dimensions: Set(dimensions_label(new.width, new.height)),
        shape: Set(shape_of(new.width, new.height).to_string()),
        code: Set(new.code),
        file_name: Set(new.file_name),
        title: Set(new.title),
        width: Set(new.width),
        height: Set(new.height),
        format: Set(new.format),
        file_size: Set(new.file_size),
        storage: Set(new.storage),
        file_path: Set(new.file_path),
        folder_id: Set(new.folder_id),
        updated_by: Set(new.created_by.clone()),
        created_by: Set(new.created_by),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    active
        .insert(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert material: {}", e)))
}

/// Find a live material by exact code or exact file name.
pub async fn find_by_code_or_file_name<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    file_name: &str,
) -> AppResult<Option<material::Model>> {
    let result = Material::find()
        .filter(live())
        .filter(
            Condition::any()
                .add(material::Column::Code.eq(code))
                .add(material::Column::FileName.eq(file_name)),
        )
        .order_by_desc(material::Column::Id)
        .one(conn)
        .await?;
    Ok(result)
}

/// Find the material an order should be linked to automatically.
///
/// `key` matches the title or the file name case-insensitively, or the file
/// name with any extension.
pub async fn find_link_candidate<C: ConnectionTrait>(
    conn: &C,
    key: &str,
) -> AppResult<Option<material::Model>> {
    use sea_orm::sea_query::{Expr, ExprTrait, Func};

    let key = key.trim().to_lowercase();
    if key.is_empty() {
        return Ok(None);
    }
    let file_name_prefix = format!("{}.%", key);

    let result = Material::find()
        .filter(live())
        .filter(
            Condition::any()
                .add(lower_eq(Material, material::Column::Title, &key))
                .add(lower_eq(Material, material::Column::FileName, &key))
                .add(
                    Expr::expr(Func::lower(Expr::col((Material, material::Column::FileName))))
                        .like(file_name_prefix),
                ),
        )
        .order_by_desc(material::Column::Id)
        .one(conn)
        .await?;
    Ok(result)
}

/// Count of distinct orders whose material image references each material.
pub async fn order_counts<C: ConnectionTrait>(
    conn: &C,
    material_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, i64>> {
    if material_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = Attachment::find()
        .filter(attachment::Column::MaterialId.is_in(material_ids.to_vec()))
        .filter(attachment::Column::FileType.eq(FileType::MaterialImage.as_str()))
        .all(conn)
        .await?;

    let mut orders: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
    for row in rows {
        if let Some(material_id) = row.material_id {
            orders.entry(material_id).or_default().insert(row.order_id);
        }
    }

    Ok(orders
        .into_iter()
        .map(|(id, set)| (id, set.len() as i64))
        .collect())
}

impl DbPool {
    /// Get a live material, optionally restricted to one creator.
    pub async fn get_material(
        &self,
        id: Uuid,
        created_by: Option<&str>,
    ) -> AppResult<Option<material::Model>> {
        let result = Material::find_by_id(id)
            .filter(visible_to(created_by))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get material: {}", e)))?;
        Ok(result)
    }

    /// Whether another material already uses `code`.
    pub async fn material_code_taken(&self, code: &str, except: Option<Uuid>) -> AppResult<bool> {
        let mut select = Material::find().filter(material::Column::Code.eq(code));
        if let Some(id) = except {
            select = select.filter(material::Column::Id.ne(id));
        }
        let count = select
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to check material code: {}", e)))?;
        Ok(count > 0)
    }

    /// List materials with filters and pagination, newest first.
    pub async fn list_materials(
        &self,
        filter: &MaterialFilter,
        page_index: u64,
        page_size: u64,
    ) -> AppResult<(Vec<material::Model>, u64)> {
        let mut cond = visible_to(filter.created_by.as_deref());

        if let Some(keyword) = filter.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            cond = cond.add(
                Condition::any()
                    .add(material::Column::Code.contains(keyword))
                    .add(material::Column::FileName.contains(keyword))
                    .add(material::Column::Title.contains(keyword)),
            );
        }
        if let Some(folder_id) = filter.folder_id {
            cond = cond.add(material::Column::FolderId.eq(folder_id));
        }
        if let Some(shape) = filter.shape.as_deref().filter(|s| !s.is_empty()) {
            cond = cond.add(material::Column::Shape.eq(shape));
        }
        if let Some(format) = filter.format.as_deref().filter(|f| !f.is_empty()) {
            cond = cond.add(material::Column::Format.eq(format.trim_start_matches('.').to_lowercase()));
        }

        let paginator = Material::find()
            .filter(cond)
            .order_by_desc(material::Column::Id)
            .paginate(self.connection(), page_size);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| AppError::Database(format!("Failed to count materials: {}", e)))?;
        let rows = paginator
            .fetch_page(page_index)
            .await
            .map_err(|e| AppError::Database(format!("Failed to list materials: {}", e)))?;

        Ok((rows, total))
    }

    /// Persist changed material fields.
    pub async fn update_material(&self, active: ActiveModel) -> AppResult<material::Model> {
        active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update material: {}", e)))
    }

    /// Remove a material row.
    pub async fn delete_material(&self, id: Uuid) -> AppResult<()> {
        Material::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete material: {}", e)))?;
        Ok(())
    }

    /// Number of live materials filed in a folder.
    pub async fn count_materials_in_folder(&self, folder_id: Uuid) -> AppResult<u64> {
        let count = Material::find()
            .filter(live())
            .filter(material::Column::FolderId.eq(folder_id))
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count materials: {}", e)))?;
        Ok(count)
    }
}
