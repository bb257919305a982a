//! Material library: shapes, codes, uploads and the sync from order uploads.

use chrono::Utc;
use sea_orm::{ConnectionTrait, Set};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db::DbPool;
use crate::db::folders::ensure_default_folder;
use crate::db::materials::{
    MaterialFilter, NewMaterial, find_by_code_or_file_name, insert_material, order_counts,
};
use crate::entity::{material_asset, order_info};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateMaterialRequest, DownloadResponse, ListMaterialsQuery, MaterialListResponse,
    MaterialResponse, PageRequest, Pagination, UpdateMaterialRequest,
};
use crate::services::UploadedFile;
use crate::services::storage::{
    BlobRef, Storage, content_type_for_extension, material_key, split_file_name,
};

/// Extensions accepted by the material upload.
pub const IMAGE_FORMATS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

const IMAGE_ONLY: &str = "素材仅支持上传图片文件 (jpg/jpeg/png/gif/bmp/webp)";

/// Shape bucket of an image from its aspect ratio (rounded to 3 decimals).
pub fn shape_of(width: i32, height: i32) -> &'static str {
    if width <= 0 || height <= 0 {
        return "";
    }
    let ratio = (f64::from(width) / f64::from(height) * 1000.0).round() / 1000.0;
    if ratio >= 5.0 {
        "超横形"
    } else if ratio >= 1.0 / 0.9 {
        "横向形"
    } else if ratio >= 1.0 / 1.1 {
        "似方形"
    } else if ratio >= 1.0 / 1.8 {
        "竖向形"
    } else {
        "超竖形"
    }
}

/// `"{w} x {h}"`, empty when a side is not positive.
pub fn dimensions_label(width: i32, height: i32) -> String {
    if width <= 0 || height <= 0 {
        return String::new();
    }
    format!("{} x {}", width, height)
}

/// `MAT{YYYYMMDDTHHMMSS}{8 uppercase hex}`
pub fn generate_code() -> String {
    let suffix: [u8; 4] = rand::random();
    format!(
        "MAT{}{}",
        Utc::now().format("%Y%m%dT%H%M%S"),
        hex::encode_upper(suffix)
    )
}

/// Pixel size of an image, `None` when it cannot be decoded.
pub fn image_dimensions(data: &[u8]) -> Option<(i32, i32)> {
    let size = imagesize::blob_size(data).ok()?;
    let width = i32::try_from(size.width).ok()?;
    let height = i32::try_from(size.height).ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

/// Whether an upload looks like an image, by declared type or extension.
pub fn is_image(file: &UploadedFile) -> bool {
    let declared = file
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.to_lowercase().starts_with("image/"));
    let ext = file.extension();
    declared || IMAGE_FORMATS.contains(&ext.trim_start_matches('.'))
}

fn title_or_stem(title: Option<&str>, file_name: &str) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => title.to_string(),
        None => {
            let (stem, _) = split_file_name(file_name);
            if stem.is_empty() {
                file_name.to_string()
            } else {
                stem
            }
        }
    }
}

fn normalize_format(format: &str) -> String {
    format.trim().trim_start_matches('.').to_lowercase()
}

async fn to_response(
    db: &DbPool,
    storage: &Storage,
    models: Vec<material_asset::Model>,
) -> AppResult<Vec<MaterialResponse>> {
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let counts = order_counts(db.connection(), &ids).await?;
    Ok(models
        .into_iter()
        .map(|m| {
            let count = counts.get(&m.id).copied().unwrap_or(0);
            let url = storage.public_url(&m.storage, &m.file_path);
            MaterialResponse::from_model(m, count, url)
        })
        .collect())
}

async fn single_response(
    db: &DbPool,
    storage: &Storage,
    model: material_asset::Model,
) -> AppResult<MaterialResponse> {
    to_response(db, storage, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Material".to_string()))
}

/// Load a material the caller may see.
pub async fn load_material(
    db: &DbPool,
    id: Uuid,
    user: &CurrentUser,
) -> AppResult<material_asset::Model> {
    db.get_material(id, user.scope())
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))
}

async fn check_folder(db: &DbPool, folder_id: Option<Uuid>) -> AppResult<()> {
    if let Some(id) = folder_id
        && db.get_folder(id).await?.is_none()
    {
        return Err(AppError::InvalidInput("归属文件夹不存在".to_string()));
    }
    Ok(())
}

async fn resolve_code(db: &DbPool, requested: Option<&str>) -> AppResult<String> {
    match requested.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            if db.material_code_taken(code, None).await? {
                return Err(AppError::InvalidInput("素材编号已存在".to_string()));
            }
            Ok(code.to_string())
        }
        None => Ok(generate_code()),
    }
}

pub async fn list_materials(
    db: &DbPool,
    storage: &Storage,
    query: &ListMaterialsQuery,
    user: &CurrentUser,
) -> AppResult<MaterialListResponse> {
    let filter = MaterialFilter {
        keyword: query.keyword.clone(),
        folder_id: query.folder_id,
        shape: query.shape.clone(),
        format: query.format.clone(),
        created_by: user.scope().map(String::from),
    };
    let page = PageRequest::new(query.page, query.page_size);
    let (rows, total) = db.list_materials(&filter, page.index(), page.page_size).await?;

    Ok(MaterialListResponse {
        data: to_response(db, storage, rows).await?,
        pagination: Pagination::new(page.page, page.page_size, total),
    })
}

pub async fn material_detail(
    db: &DbPool,
    storage: &Storage,
    id: Uuid,
    user: &CurrentUser,
) -> AppResult<MaterialResponse> {
    let model = load_material(db, id, user).await?;
    single_response(db, storage, model).await
}

/// Register a material whose blob is already stored.
pub async fn create_material(
    db: &DbPool,
    storage: &Storage,
    req: &CreateMaterialRequest,
    user: &CurrentUser,
) -> AppResult<MaterialResponse> {
    let file_name = req.file_name.trim();
    if file_name.is_empty() {
        return Err(AppError::InvalidInput("文件名不能为空".to_string()));
    }
    check_folder(db, req.folder_id).await?;
    let code = resolve_code(db, req.code.as_deref()).await?;

    let driver = match req.storage.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => crate::config::normalize_driver(name).to_string(),
        None => storage.settings().driver,
    };

    let model = insert_material(
        db.connection(),
        NewMaterial {
            code,
            file_name: file_name.to_string(),
            title: title_or_stem(req.title.as_deref(), file_name),
            width: req.width.max(0),
            height: req.height.max(0),
            format: normalize_format(req.format.as_deref().unwrap_or_default()),
            file_size: req.file_size.max(0),
            storage: driver,
            file_path: req.file_path.trim().to_string(),
            folder_id: req.folder_id,
            created_by: user.id.clone(),
        },
    )
    .await?;

    info!("Material {} ({}) created by {}", model.id, model.code, user.id);
    single_response(db, storage, model).await
}

pub async fn update_material(
    db: &DbPool,
    storage: &Storage,
    id: Uuid,
    req: &UpdateMaterialRequest,
    user: &CurrentUser,
) -> AppResult<MaterialResponse> {
    let existing = load_material(db, id, user).await?;

    let mut active: material_asset::ActiveModel = existing.clone().into();

    if let Some(code) = req.code.as_deref().map(str::trim).filter(|c| !c.is_empty())
        && code != existing.code
    {
        if db.material_code_taken(code, Some(existing.id)).await? {
            return Err(AppError::InvalidInput("素材编号已存在".to_string()));
        }
        active.code = Set(code.to_string());
    }
    if let Some(title) = req.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        active.title = Set(title.to_string());
    }
    if let Some(file_name) = req.file_name.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        active.file_name = Set(file_name.to_string());
    }
    if let Some(format) = req.format.as_deref().filter(|f| !f.trim().is_empty()) {
        active.format = Set(normalize_format(format));
    }
    if req.width.is_some() || req.height.is_some() {
        let width = req.width.unwrap_or(existing.width).max(0);
        let height = req.height.unwrap_or(existing.height).max(0);
        active.width = Set(width);
        active.height = Set(height);
        active.dimensions = Set(dimensions_label(width, height));
        active.shape = Set(shape_of(width, height).to_string());
    }
    if let Some(folder_id) = req.folder_id {
        check_folder(db, Some(folder_id)).await?;
        active.folder_id = Set(Some(folder_id));
    }
    active.updated_by = Set(user.id.clone());
    active.updated_at = Set(Utc::now());

    let model = db.update_material(active).await?;
    single_response(db, storage, model).await
}

/// Delete a material that no order references, blob first.
pub async fn delete_material(
    db: &DbPool,
    storage: &Storage,
    id: Uuid,
    user: &CurrentUser,
) -> AppResult<()> {
    let material = load_material(db, id, user).await?;

    let references = db.count_material_references(material.id).await?;
    if references > 0 {
        return Err(AppError::Conflict(format!(
            "Material is linked to {} order attachments",
            references
        )));
    }

    if !material.file_path.is_empty() {
        storage
            .driver_for(&material.storage)?
            .delete(&material.file_path)
            .await?;
    }
    db.delete_material(material.id).await?;

    info!("Material {} deleted by {}", material.id, user.id);
    Ok(())
}

/// Options of a direct material upload.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub code: Option<String>,
    pub title: Option<String>,
    pub folder_id: Option<Uuid>,
}

/// Store an uploaded image in the library.
pub async fn upload_material(
    db: &DbPool,
    storage: &Storage,
    file: UploadedFile,
    options: &UploadOptions,
    user: &CurrentUser,
) -> AppResult<MaterialResponse> {
    let format = normalize_format(&file.extension());
    if !IMAGE_FORMATS.contains(&format.as_str()) {
        return Err(AppError::InvalidInput(IMAGE_ONLY.to_string()));
    }
    let (width, height) = image_dimensions(&file.data).ok_or_else(|| {
        AppError::InvalidInput("无法识别图片尺寸，确认文件是否为有效图片".to_string())
    })?;
    check_folder(db, options.folder_id).await?;
    let code = resolve_code(db, options.code.as_deref()).await?;

    let driver = storage.driver()?;
    let key = material_key(&code, &file.file_name, Utc::now());
    let content_type = file
        .content_type
        .clone()
        .unwrap_or_else(|| content_type_for_extension(&format).to_string());
    let file_size = file.data.len() as i64;
    driver.upload(&key, file.data, Some(&content_type)).await?;

    let new = NewMaterial {
        code,
        title: title_or_stem(options.title.as_deref(), &file.file_name),
        file_name: file.file_name,
        width,
        height,
        format,
        file_size,
        storage: driver.name().to_string(),
        file_path: key.clone(),
        folder_id: options.folder_id,
        created_by: user.id.clone(),
    };

    let model = match insert_material(db.connection(), new).await {
        Ok(model) => model,
        Err(e) => {
            storage
                .delete_quietly(&BlobRef {
                    storage: driver.name().to_string(),
                    key,
                })
                .await;
            return Err(e);
        }
    };

    info!("Material {} uploaded by {}", model.code, user.id);
    single_response(db, storage, model).await
}

pub async fn download_material(
    db: &DbPool,
    storage: &Storage,
    id: Uuid,
    user: &CurrentUser,
) -> AppResult<DownloadResponse> {
    let material = load_material(db, id, user).await?;
    if material.file_path.is_empty() {
        return Err(AppError::NotFound("Material file".to_string()));
    }
    let url = storage
        .download_url(&material.storage, &material.file_path)
        .await?;
    Ok(DownloadResponse {
        url,
        file_name: material.file_name,
    })
}

/// Make sure an uploaded order image also exists in the library.
///
/// An existing asset with the same code or file name is reused; otherwise the
/// bytes are stored again under a material key so the library copy outlives
/// the attachment.
pub async fn sync_from_order_upload<C: ConnectionTrait>(
    conn: &C,
    storage: &Storage,
    order: &order_info::Model,
    file: &UploadedFile,
    user_id: &str,
) -> AppResult<material_asset::Model> {
    let stem = file.stem();
    let code = [order.item_no.trim(), stem.trim()]
        .into_iter()
        .find(|c| !c.is_empty())
        .map(String::from)
        .unwrap_or_else(generate_code);

    if let Some(existing) = find_by_code_or_file_name(conn, &code, &file.file_name).await? {
        return Ok(existing);
    }

    let folder = ensure_default_folder(conn).await?;
    let (width, height) = image_dimensions(&file.data).unwrap_or((0, 0));
    let format = normalize_format(&file.extension());

    let driver = storage.driver()?;
    let key = material_key(&code, &file.file_name, Utc::now());
    let content_type = content_type_for_extension(&format);
    driver.upload(&key, file.data.clone(), Some(content_type)).await?;

    let title = if order.product_name.trim().is_empty() {
        title_or_stem(None, &file.file_name)
    } else {
        order.product_name.trim().to_string()
    };

    let new = NewMaterial {
        code,
        file_name: file.file_name.clone(),
        title,
        width,
        height,
        format,
        file_size: file.data.len() as i64,
        storage: driver.name().to_string(),
        file_path: key.clone(),
        folder_id: Some(folder.id),
        created_by: user_id.to_string(),
    };

    match insert_material(conn, new).await {
        Ok(model) => {
            info!("Material {} synced from order {}", model.code, order.id);
            Ok(model)
        }
        Err(e) => {
            warn!("Discarding material blob {} after failed insert", key);
            storage
                .delete_quietly(&BlobRef {
                    storage: driver.name().to_string(),
                    key,
                })
                .await;
            Err(e)
        }
    }
}
