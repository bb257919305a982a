//! Order attachment handlers.

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use crate::api::multipart::{MultipartForm, UploadLimit};
use crate::auth::CurrentUser;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{AttachmentResponse, BatchUploadResponse, DownloadResponse, LinkMaterialRequest};
use crate::services::attachments;
use crate::services::storage::Storage;

/// Upload a shipping label or material image for one order.
///
/// The file name must match the order: item number for material images, order
/// number (PDF) for shipping labels. An existing attachment in the same role
/// is replaced.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/attachments",
    tag = "Attachments",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body(content_type = "multipart/form-data", description = "Fields `file_type` and `file`"),
    responses(
        (status = 200, description = "Attachment stored", body = AttachmentResponse),
        (status = 400, description = "File rejected", body = crate::error::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn upload_attachment(
    req: HttpRequest,
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = MultipartForm::read(payload, UploadLimit::from_request(&req)).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::InvalidInput("未选择上传文件".to_string()))?;

    let attachment = attachments::upload_attachment(
        &pool,
        &storage,
        path.into_inner(),
        form.text("file_type"),
        file,
        &user,
    )
    .await?;
    Ok(HttpResponse::Ok().json(attachment))
}

/// Attach many files at once, matching each to an order by its name.
#[utoipa::path(
    post,
    path = "/api/v1/orders/batch-attachments",
    tag = "Attachments",
    request_body(content_type = "multipart/form-data", description = "Repeated field `files`"),
    responses(
        (status = 200, description = "At least one file attached", body = BatchUploadResponse),
        (status = 400, description = "No file attached", body = BatchUploadResponse),
    )
)]
pub async fn batch_upload(
    req: HttpRequest,
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = MultipartForm::read(payload, UploadLimit::from_request(&req)).await?;
    let files = form.take_files("files");

    let response = attachments::batch_upload(&pool, &storage, files, &user).await?;
    if response.success.is_empty() {
        return Ok(HttpResponse::BadRequest().json(response));
    }
    Ok(HttpResponse::Ok().json(response))
}

/// Point an order at a library material without copying the blob.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/attachments/link",
    tag = "Attachments",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = LinkMaterialRequest,
    responses(
        (status = 200, description = "Material linked", body = AttachmentResponse),
        (status = 400, description = "Material does not fit the order", body = crate::error::ErrorResponse),
        (status = 404, description = "Order or material not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn link_material(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<Uuid>,
    body: web::Json<LinkMaterialRequest>,
) -> AppResult<HttpResponse> {
    let attachment =
        attachments::link_attachment(&pool, &storage, path.into_inner(), &body, &user).await?;
    Ok(HttpResponse::Ok().json(attachment))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/attachments",
    tag = "Attachments",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Attachments of the order", body = Vec<AttachmentResponse>),
        (status = 404, description = "Order not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_attachments(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let rows = attachments::list_attachments(&pool, &storage, path.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": rows })))
}

/// Resolve a download URL (presigned for remote storage).
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/attachments/{attachment_id}/download",
    tag = "Attachments",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("attachment_id" = Uuid, Path, description = "Attachment ID"),
    ),
    responses(
        (status = 200, description = "Download location", body = DownloadResponse),
        (status = 404, description = "Attachment not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn download_attachment(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (order_id, attachment_id) = path.into_inner();
    let download =
        attachments::download_attachment(&pool, &storage, order_id, attachment_id, &user).await?;
    Ok(HttpResponse::Ok().json(download))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}/attachments/{attachment_id}",
    tag = "Attachments",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("attachment_id" = Uuid, Path, description = "Attachment ID"),
    ),
    responses(
        (status = 204, description = "Attachment removed"),
        (status = 404, description = "Attachment not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn delete_attachment(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (order_id, attachment_id) = path.into_inner();
    attachments::delete_attachment(&pool, &storage, order_id, attachment_id, &user).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Must be registered before the `/orders/{id}` resource.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/orders/batch-attachments").route(web::post().to(batch_upload)))
        .service(
            web::resource("/orders/{id}/attachments")
                .route(web::get().to(list_attachments))
                .route(web::post().to(upload_attachment)),
        )
        .service(web::resource("/orders/{id}/attachments/link").route(web::post().to(link_material)))
        .service(
            web::resource("/orders/{id}/attachments/{attachment_id}/download")
                .route(web::get().to(download_attachment)),
        )
        .service(
            web::resource("/orders/{id}/attachments/{attachment_id}")
                .route(web::delete().to(delete_attachment)),
        );
}
