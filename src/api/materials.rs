//! Material library handlers.

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use crate::api::multipart::{MultipartForm, UploadLimit};
use crate::auth::CurrentUser;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateMaterialRequest, DownloadResponse, ListMaterialsQuery, MaterialListResponse,
    MaterialResponse, UpdateMaterialRequest,
};
use crate::services::materials::{self, UploadOptions};
use crate::services::storage::Storage;

#[utoipa::path(
    get,
    path = "/api/v1/materials",
    tag = "Materials",
    params(
        ("keyword" = Option<String>, Query, description = "Matches code, file name or title"),
        ("folder_id" = Option<Uuid>, Query, description = "Folder filter"),
        ("shape" = Option<String>, Query, description = "Shape bucket"),
        ("format" = Option<String>, Query, description = "File format, e.g. png"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("page_size" = Option<u64>, Query, description = "Page size (default 10, max 200)"),
    ),
    responses(
        (status = 200, description = "Materials", body = MaterialListResponse),
    )
)]
pub async fn list_materials(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    query: web::Query<ListMaterialsQuery>,
) -> AppResult<HttpResponse> {
    let response = materials::list_materials(&pool, &storage, &query, &user).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}",
    tag = "Materials",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material", body = MaterialResponse),
        (status = 404, description = "Material not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_material(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let material = materials::material_detail(&pool, &storage, path.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(material))
}

/// Register metadata of an already stored blob.
#[utoipa::path(
    post,
    path = "/api/v1/materials",
    tag = "Materials",
    request_body = CreateMaterialRequest,
    responses(
        (status = 201, description = "Material created", body = MaterialResponse),
        (status = 400, description = "Invalid material", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_material(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    body: web::Json<CreateMaterialRequest>,
) -> AppResult<HttpResponse> {
    let material = materials::create_material(&pool, &storage, &body, &user).await?;
    Ok(HttpResponse::Created().json(material))
}

#[utoipa::path(
    put,
    path = "/api/v1/materials/{id}",
    tag = "Materials",
    params(("id" = Uuid, Path, description = "Material ID")),
    request_body = UpdateMaterialRequest,
    responses(
        (status = 200, description = "Material updated", body = MaterialResponse),
        (status = 400, description = "Invalid change", body = crate::error::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn update_material(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateMaterialRequest>,
) -> AppResult<HttpResponse> {
    let material =
        materials::update_material(&pool, &storage, path.into_inner(), &body, &user).await?;
    Ok(HttpResponse::Ok().json(material))
}

/// Delete a material no order references.
#[utoipa::path(
    delete,
    path = "/api/v1/materials/{id}",
    tag = "Materials",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 204, description = "Material deleted"),
        (status = 404, description = "Material not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Material still linked to orders", body = crate::error::ErrorResponse),
    )
)]
pub async fn delete_material(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    materials::delete_material(&pool, &storage, path.into_inner(), &user).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Upload an image into the library.
#[utoipa::path(
    post,
    path = "/api/v1/materials/upload",
    tag = "Materials",
    request_body(content_type = "multipart/form-data", description = "Field `file`, optional `code`, `title`, `folder_id`"),
    responses(
        (status = 201, description = "Material stored", body = MaterialResponse),
        (status = 400, description = "Not a supported image", body = crate::error::ErrorResponse),
    )
)]
pub async fn upload_material(
    req: HttpRequest,
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = MultipartForm::read(payload, UploadLimit::from_request(&req)).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::InvalidInput("未选择上传文件".to_string()))?;
    let folder_id = form
        .text("folder_id")
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|_| AppError::InvalidInput("Invalid folder_id".to_string()))?;
    let options = UploadOptions {
        code: form.text("code").map(String::from),
        title: form.text("title").map(String::from),
        folder_id,
    };

    let material = materials::upload_material(&pool, &storage, file, &options, &user).await?;
    Ok(HttpResponse::Created().json(material))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}/download",
    tag = "Materials",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Download location", body = DownloadResponse),
        (status = 404, description = "Material not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn download_material(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let download = materials::download_material(&pool, &storage, path.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(download))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/materials/upload").route(web::post().to(upload_material)))
        .service(
            web::resource("/materials")
                .route(web::get().to(list_materials))
                .route(web::post().to(create_material)),
        )
        .service(
            web::resource("/materials/{id}")
                .route(web::get().to(get_material))
                .route(web::put().to(update_material))
                .route(web::delete().to(delete_material)),
        )
        .service(web::resource("/materials/{id}/download").route(web::get().to(download_material)));
}
