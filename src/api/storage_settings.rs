//! Runtime storage settings.

use std::path::PathBuf;

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::auth::{AdminUser, CurrentUser};
use crate::config::{StorageSettings, normalize_driver, normalize_key_prefix};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{StorageSettingsResponse, UpdateStorageSettingsRequest};
use crate::services::storage::Storage;

/// Apply the non-blank fields of a request on top of `current`.
fn merge_request(current: &StorageSettings, req: &UpdateStorageSettingsRequest) -> StorageSettings {
    let non_blank = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    let mut next = current.clone();
    if let Some(driver) = non_blank(&req.storage_driver) {
        next.driver = normalize_driver(&driver).to_string();
    }
    if let Some(path) = non_blank(&req.local_storage_path) {
        next.local_storage_path = PathBuf::from(path);
    }
    if let Some(url) = non_blank(&req.local_base_url) {
        next.local_base_url = url;
    }
    if let Some(prefix) = non_blank(&req.key_prefix) {
        next.key_prefix = normalize_key_prefix(&prefix);
    }
    next
}

#[utoipa::path(
    get,
    path = "/api/v1/storage/settings",
    tag = "Storage",
    responses(
        (status = 200, description = "Current storage settings", body = StorageSettingsResponse),
    )
)]
pub async fn get_settings(_user: CurrentUser, storage: web::Data<Storage>) -> HttpResponse {
    HttpResponse::Ok().json(StorageSettingsResponse::from(&storage.settings()))
}

/// Persist new storage settings and switch the live driver.
#[utoipa::path(
    put,
    path = "/api/v1/storage/settings",
    tag = "Storage",
    request_body = UpdateStorageSettingsRequest,
    responses(
        (status = 200, description = "Settings applied", body = StorageSettingsResponse),
        (status = 400, description = "S3 selected but not configured", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator rights required", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn update_settings(
    admin: AdminUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    body: web::Json<UpdateStorageSettingsRequest>,
) -> AppResult<HttpResponse> {
    let next = merge_request(&storage.settings(), &body);
    if next.driver == "s3" && !storage.has_s3() {
        return Err(AppError::InvalidInput(
            "S3 storage is not fully configured".to_string(),
        ));
    }

    pool.save_storage_settings(&next).await?;
    storage.apply(next)?;

    info!("Storage settings changed by {}", admin.0.id);
    Ok(HttpResponse::Ok().json(StorageSettingsResponse::from(&storage.settings())))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/storage/settings")
            .route(web::get().to(get_settings))
            .route(web::put().to(update_settings)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> StorageSettings {
        StorageSettings {
            driver: "local".to_string(),
            local_storage_path: PathBuf::from("./uploads"),
            local_base_url: "/uploads".to_string(),
            key_prefix: "orders".to_string(),
        }
    }

    #[test]
    fn test_blank_fields_keep_current_values() {
        let req = UpdateStorageSettingsRequest {
            storage_driver: Some("  ".to_string()),
            local_base_url: Some("https://cdn.example.com/files".to_string()),
            ..Default::default()
        };
        let next = merge_request(&current(), &req);
        assert_eq!(next.driver, "local");
        assert_eq!(next.local_base_url, "https://cdn.example.com/files");
        assert_eq!(next.key_prefix, "orders");
    }

    #[test]
    fn test_driver_aliases_normalize() {
        let req = UpdateStorageSettingsRequest {
            storage_driver: Some("COS".to_string()),
            ..Default::default()
        };
        assert_eq!(merge_request(&current(), &req).driver, "s3");

        let req = UpdateStorageSettingsRequest {
            storage_driver: Some("ftp".to_string()),
            ..Default::default()
        };
        assert_eq!(merge_request(&current(), &req).driver, "local");
    }
}
