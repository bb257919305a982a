//! Material folder handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{CreateFolderRequest, FolderResponse, ListFoldersQuery, UpdateFolderRequest};
use crate::services::folders;

/// Folder tree, or a flat list ordered by path with `flat=1`.
#[utoipa::path(
    get,
    path = "/api/v1/material-folders",
    tag = "Folders",
    params(("flat" = Option<String>, Query, description = "`1` for a flat list")),
    responses(
        (status = 200, description = "Folders", body = Vec<FolderResponse>),
    )
)]
pub async fn list_folders(
    _user: CurrentUser,
    pool: web::Data<DbPool>,
    query: web::Query<ListFoldersQuery>,
) -> AppResult<HttpResponse> {
    let folders = folders::list_folders(&pool, &query).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": folders })))
}

#[utoipa::path(
    post,
    path = "/api/v1/material-folders",
    tag = "Folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = FolderResponse),
        (status = 400, description = "Invalid name or parent", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_folder(
    _user: CurrentUser,
    pool: web::Data<DbPool>,
    body: web::Json<CreateFolderRequest>,
) -> AppResult<HttpResponse> {
    let folder = folders::create_folder(&pool, &body).await?;
    Ok(HttpResponse::Created().json(folder))
}

/// Rename or move a folder; descendant paths follow.
#[utoipa::path(
    put,
    path = "/api/v1/material-folders/{id}",
    tag = "Folders",
    params(("id" = Uuid, Path, description = "Folder ID")),
    request_body = UpdateFolderRequest,
    responses(
        (status = 200, description = "Folder updated", body = FolderResponse),
        (status = 400, description = "Invalid move", body = crate::error::ErrorResponse),
        (status = 404, description = "Folder not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn update_folder(
    _user: CurrentUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateFolderRequest>,
) -> AppResult<HttpResponse> {
    let folder = folders::update_folder(&pool, path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(folder))
}

#[utoipa::path(
    delete,
    path = "/api/v1/material-folders/{id}",
    tag = "Folders",
    params(("id" = Uuid, Path, description = "Folder ID")),
    responses(
        (status = 204, description = "Folder deleted"),
        (status = 404, description = "Folder not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Folder not empty", body = crate::error::ErrorResponse),
    )
)]
pub async fn delete_folder(
    _user: CurrentUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    folders::delete_folder(&pool, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/material-folders")
            .route(web::get().to(list_folders))
            .route(web::post().to(create_folder)),
    )
    .service(
        web::resource("/material-folders/{id}")
            .route(web::put().to(update_folder))
            .route(web::delete().to(delete_folder)),
    );
}
