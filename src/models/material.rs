//! Material library DTOs (assets and folders).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{material_asset, material_folder};

/// Material asset with its derived usage count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MaterialResponse {
    pub id: Uuid,
    pub code: String,
    pub file_name: String,
    pub title: String,
    pub width: i32,
    pub height: i32,
    pub dimensions: String,
    pub format: String,
    pub file_size: i64,
    pub storage: String,
    pub file_path: String,
    pub folder_id: Option<Uuid>,
    pub shape: String,
    /// Distinct orders whose material image points at this asset.
    pub order_count: i64,
    pub url: String,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaterialResponse {
    pub fn from_model(m: material_asset::Model, order_count: i64, url: String) -> Self {
        Self {
            id: m.id,
            code: m.code,
            file_name: m.file_name,
            title: m.title,
            width: m.width,
            height: m.height,
            dimensions: m.dimensions,
            format: m.format,
            file_size: m.file_size,
            storage: m.storage,
            file_path: m.file_path,
            folder_id: m.folder_id,
            shape: m.shape,
            order_count,
            url,
            created_by: m.created_by,
            updated_by: m.updated_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Body of `POST /materials` (metadata only; the blob is already stored).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateMaterialRequest {
    pub code: Option<String>,
    pub file_name: String,
    pub title: Option<String>,
    pub width: i32,
    pub height: i32,
    pub format: Option<String>,
    pub file_size: i64,
    pub storage: Option<String>,
    pub file_path: String,
    pub folder_id: Option<Uuid>,
}

/// Body of `PUT /materials/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateMaterialRequest {
    pub code: Option<String>,
    pub title: Option<String>,
    pub file_name: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub format: Option<String>,
    pub folder_id: Option<Uuid>,
}

/// Query parameters for `GET /materials`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListMaterialsQuery {
    /// Matches code, file name or title.
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub folder_id: Option<Uuid>,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
}

/// Paginated material list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MaterialListResponse {
    pub data: Vec<MaterialResponse>,
    pub pagination: super::Pagination,
}

/// Folder node. `children` is only populated in tree listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FolderResponse {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schema(no_recursion)]
    pub children: Vec<FolderResponse>,
}

impl From<material_folder::Model> for FolderResponse {
    fn from(m: material_folder::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            parent_id: m.parent_id,
            path: m.path,
            created_at: m.created_at,
            updated_at: m.updated_at,
            children: Vec::new(),
        }
    }
}

/// Body of `POST /material-folders`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateFolderRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Body of `PUT /material-folders/{id}`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateFolderRequest {
    pub name: Option<String>,
    /// Moving to the root is expressed with `move_to_root: true`.
    pub parent_id: Option<Uuid>,
    pub move_to_root: bool,
}

/// Query parameters for `GET /material-folders`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListFoldersQuery {
    /// `1` or `true` returns a flat list ordered by path.
    #[serde(default)]
    pub flat: Option<String>,
}

impl ListFoldersQuery {
    pub fn is_flat(&self) -> bool {
        matches!(self.flat.as_deref(), Some("1") | Some("true"))
    }
}
