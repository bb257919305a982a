//! Order API handlers: CRUD, spreadsheet import and export.

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use crate::api::multipart::{MultipartForm, UploadLimit};
use crate::auth::CurrentUser;
use crate::config::ImportSettings;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{ImportResponse, ListOrdersQuery, OrderListResponse, OrderPayload, OrderResponse};
use crate::services::storage::{Storage, content_type_for_extension};
use crate::services::{export, import, orders};

/// List orders of one tab with filters.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    tag = "Orders",
    params(
        ("tab" = Option<String>, Query, description = "platform (default) or factory"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("page_size" = Option<u64>, Query, description = "Page size (default 10, max 200)"),
        ("time_field" = Option<String>, Query, description = "Timestamp column for start/end"),
        ("start" = Option<String>, Query, description = "Lower bound (inclusive)"),
        ("end" = Option<String>, Query, description = "Upper bound (inclusive)"),
        ("exact_field" = Option<String>, Query, description = "Column for exact_value"),
        ("exact_value" = Option<String>, Query, description = "Exact match value"),
        ("fuzzy_field" = Option<String>, Query, description = "Column for fuzzy_value"),
        ("fuzzy_value" = Option<String>, Query, description = "Substring match value"),
    ),
    responses(
        (status = 200, description = "Orders", body = OrderListResponse),
        (status = 400, description = "Unknown filter column", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing identity", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_orders(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    query: web::Query<ListOrdersQuery>,
) -> AppResult<HttpResponse> {
    let response = orders::list_orders(&pool, &query, &user).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Get one order with its attachments.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = OrderResponse),
        (status = 404, description = "Order not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_order(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let order = orders::order_detail(&pool, &storage, path.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// Create an order from JSON; validated like an imported row.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "Orders",
    request_body = OrderPayload,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_order(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    settings: web::Data<ImportSettings>,
    body: web::Json<OrderPayload>,
) -> AppResult<HttpResponse> {
    let order = orders::create_order(&pool, &settings, &body, &user).await?;
    Ok(HttpResponse::Created().json(order))
}

/// Replace the business fields of an order.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = OrderPayload,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn update_order(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    settings: web::Data<ImportSettings>,
    path: web::Path<Uuid>,
    body: web::Json<OrderPayload>,
) -> AppResult<HttpResponse> {
    let order =
        orders::update_order_fields(&pool, &settings, path.into_inner(), &body, &user).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// Soft-delete an order together with its attachments.
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Order not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn delete_order(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    orders::delete_order(&pool, &storage, path.into_inner(), &user).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Import a workbook with `平台面单` and `工厂物流` sheets.
///
/// Any invalid row rejects the whole file with one aggregated message.
#[utoipa::path(
    post,
    path = "/api/v1/orders/import",
    tag = "Orders",
    request_body(content_type = "multipart/form-data", description = "Field `file`: .xlsx workbook"),
    responses(
        (status = 200, description = "Orders imported", body = ImportResponse),
        (status = 400, description = "Validation failed or unreadable workbook", body = crate::error::ErrorResponse),
    )
)]
pub async fn import_orders(
    req: HttpRequest,
    user: CurrentUser,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    settings: web::Data<ImportSettings>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = MultipartForm::read(payload, UploadLimit::from_request(&req)).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::InvalidInput("请上传Excel文件".to_string()))?;
    if file.data.is_empty() {
        return Err(AppError::InvalidInput("请上传Excel文件".to_string()));
    }

    let response = import::import_workbook(&pool, &storage, &settings, &file.data, &user.id).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Download every visible order as a workbook.
#[utoipa::path(
    get,
    path = "/api/v1/orders/export",
    tag = "Orders",
    responses(
        (status = 200, description = "xlsx workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    )
)]
pub async fn export_orders(user: CurrentUser, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let (file_name, bytes) = export::export_orders(&pool, &user).await?;
    Ok(HttpResponse::Ok()
        .content_type(content_type_for_extension("xlsx"))
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ))
        .body(bytes))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Literal segments first so they never parse as an order id.
    cfg.service(web::resource("/orders/import").route(web::post().to(import_orders)))
        .service(web::resource("/orders/export").route(web::get().to(export_orders)))
        .service(
            web::resource("/orders")
                .route(web::get().to(list_orders))
                .route(web::post().to(create_order)),
        )
        .service(
            web::resource("/orders/{id}")
                .route(web::get().to(get_order))
                .route(web::put().to(update_order))
                .route(web::delete().to(delete_order)),
        );
}
