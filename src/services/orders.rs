//! Manual order management: list, create, update and delete.

use chrono::{DateTime, Utc};
use sea_orm::TransactionTrait;
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::config::ImportSettings;
use crate::db::DbPool;
use crate::db::attachments::delete_for_order;
use crate::db::orders::{ExactMatch, OrderFilter, insert_order, soft_delete_order, update_order};
use crate::entity::order_info::{self, Column};
use crate::error::{AppError, AppResult};
use crate::models::{
    AttachmentResponse, ListOrdersQuery, OrderListResponse, OrderPayload, OrderResponse,
    OrderType, PageRequest, Pagination, STATUS_COMPLETED,
};
use crate::services::import::row::parse_timestamp;
use crate::services::import::{
    ErrorKind, Field, FieldError, FieldValues, OrderDraft, RowContext, format_errors, validate_row,
};
use crate::services::storage::Storage;

const STATUS_LABEL: &str = "状态";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Load an order the caller may see.
pub async fn load_order(db: &DbPool, id: Uuid, user: &CurrentUser) -> AppResult<order_info::Model> {
    db.get_order(id, user.scope())
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

fn time_column(name: &str) -> AppResult<Column> {
    match name {
        "order_created_at" => Ok(Column::OrderCreatedAt),
        "payment_time" => Ok(Column::PaymentTime),
        "completed_at" => Ok(Column::CompletedAt),
        "required_sign_at" => Ok(Column::RequiredSignAt),
        "created_at" => Ok(Column::CreatedAt),
        other => Err(AppError::InvalidInput(format!("Unsupported time field: {}", other))),
    }
}

fn exact_column(name: &str) -> AppResult<Option<Column>> {
    match name {
        "gsp_order_no" => Ok(Some(Column::GspOrderNo)),
        "shop_code" => Ok(Some(Column::ShopCode)),
        "item_no" => Ok(Some(Column::ItemNo)),
        "seller_sku" => Ok(Some(Column::SellerSku)),
        "shipping_warehouse_code" => Ok(Some(Column::ShippingWarehouseCode)),
        "status" => Ok(None),
        other => Err(AppError::InvalidInput(format!("Unsupported exact field: {}", other))),
    }
}

fn fuzzy_column(name: &str) -> AppResult<Column> {
    match name {
        "gsp_order_no" => Ok(Column::GspOrderNo),
        "product_name" => Ok(Column::ProductName),
        "owner_name" => Ok(Column::OwnerName),
        "item_no" => Ok(Column::ItemNo),
        "seller_sku" => Ok(Column::SellerSku),
        "customer_full_name" => Ok(Column::CustomerFullName),
        other => Err(AppError::InvalidInput(format!("Unsupported fuzzy field: {}", other))),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bound(label: &str, value: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    value
        .map(|v| {
            parse_timestamp(v)
                .ok_or_else(|| AppError::InvalidInput(format!("Invalid {} time: {}", label, v)))
        })
        .transpose()
}

/// Translate list query parameters into a database filter.
pub fn build_filter(query: &ListOrdersQuery, user: &CurrentUser) -> AppResult<OrderFilter> {
    let order_type = OrderType::parse(query.tab.as_deref().unwrap_or_default());

    let time_range = match non_blank(&query.time_field) {
        Some(field) => {
            let start = parse_bound("start", non_blank(&query.start))?;
            let end = parse_bound("end", non_blank(&query.end))?;
            (start.is_some() || end.is_some()).then_some((time_column(field)?, start, end))
        }
        None => None,
    };

    let exact = match (non_blank(&query.exact_field), non_blank(&query.exact_value)) {
        (Some(field), Some(value)) => Some(match exact_column(field)? {
            Some(column) => ExactMatch::Text(column, value.to_string()),
            None => ExactMatch::Status(value.parse().map_err(|_| {
                AppError::InvalidInput(format!("Invalid status: {}", value))
            })?),
        }),
        _ => None,
    };

    let fuzzy = match (non_blank(&query.fuzzy_field), non_blank(&query.fuzzy_value)) {
        (Some(field), Some(value)) => Some((fuzzy_column(field)?, value.to_string())),
        _ => None,
    };

    Ok(OrderFilter {
        order_type,
        created_by: user.scope().map(String::from),
        time_range,
        exact,
        fuzzy,
    })
}

pub async fn list_orders(
    db: &DbPool,
    query: &ListOrdersQuery,
    user: &CurrentUser,
) -> AppResult<OrderListResponse> {
    let filter = build_filter(query, user)?;
    let page = PageRequest::new(query.page, query.page_size);
    let (orders, total) = db.list_orders(&filter, page.index(), page.page_size).await?;

    Ok(OrderListResponse {
        data: orders.into_iter().map(OrderResponse::from).collect(),
        pagination: Pagination::new(page.page, page.page_size, total),
    })
}

/// Order with its attachments and their public URLs.
pub async fn order_detail(
    db: &DbPool,
    storage: &Storage,
    id: Uuid,
    user: &CurrentUser,
) -> AppResult<OrderResponse> {
    let order = load_order(db, id, user).await?;
    let attachments = db.list_attachments(order.id).await?;

    let mut response = OrderResponse::from(order);
    response.attachments = attachments
        .into_iter()
        .map(|a| {
            let url = storage.public_url(&a.storage, &a.file_path);
            AttachmentResponse::from_model(a, url)
        })
        .collect();
    Ok(response)
}

/// Map a JSON payload onto the fields the row validator understands.
fn payload_fields(p: &OrderPayload) -> FieldValues {
    let mut values = FieldValues::default();
    values.set_opt(Field::OrderNo, p.gsp_order_no.as_ref());
    values.set_opt(Field::OrderCreatedAt, p.order_created_at.as_ref());
    values.set_opt(Field::PaymentTime, p.payment_time.as_ref());
    values.set_opt(Field::CompletedAt, p.completed_at.as_ref());
    values.set_opt(Field::RequiredSignAt, p.required_sign_at.as_ref());
    values.set_opt(Field::Warehouse, p.shipping_warehouse_code.as_ref());
    values.set_opt(Field::ShopCode, p.shop_code.as_ref());
    values.set_opt(Field::ProductId, p.product_id.as_ref());
    values.set_opt(Field::Owner, p.owner_name.as_ref());
    values.set_opt(Field::ProductName, p.product_name.as_ref());
    values.set_opt(Field::Spec, p.spec.as_ref());
    values.set_opt(Field::ItemNo, p.item_no.as_ref());
    values.set_opt(Field::SellerSku, p.seller_sku.as_ref());
    values.set_opt(Field::PlatformSku, p.platform_sku.as_ref());
    values.set_opt(Field::PlatformSkc, p.platform_skc.as_ref());
    values.set_opt(Field::PlatformSpu, p.platform_spu.as_ref());
    values.set_opt(Field::Price, p.product_price);
    values.set_opt(Field::ExpectedRevenue, p.expected_revenue);
    values.set_opt(Field::SpecialNote, p.special_product_note.as_ref());
    values.set_opt(Field::Currency, p.currency_code.as_ref());
    values.set_opt(Field::FulfillmentQty, p.expected_fulfillment_qty);
    values.set_opt(Field::PostalCode, p.postal_code.as_ref());
    values.set_opt(Field::Country, p.country.as_ref());
    values.set_opt(Field::Province, p.province.as_ref());
    values.set_opt(Field::City, p.city.as_ref());
    values.set_opt(Field::District, p.district.as_ref());
    values.set_opt(Field::Address1, p.address_line1.as_ref());
    values.set_opt(Field::Address2, p.address_line2.as_ref());
    values.set_opt(Field::FullName, p.customer_full_name.as_ref());
    values.set_opt(Field::LastName, p.customer_last_name.as_ref());
    values.set_opt(Field::FirstName, p.customer_first_name.as_ref());
    values.set_opt(Field::Phone, p.phone_number.as_ref());
    values.set_opt(Field::Email, p.email.as_ref());
    values.set_opt(Field::TaxNumber, p.tax_number.as_ref());
    values
}

/// Validate a manual payload with the import rules. Errors read like a
/// single row of the order type's template sheet.
pub fn draft_from_payload(
    payload: &OrderPayload,
    values: &FieldValues,
    order_type: OrderType,
    settings: &ImportSettings,
    now: DateTime<Utc>,
) -> AppResult<OrderDraft> {
    let ctx = RowContext {
        sheet: order_type.sheet_label(),
        row: 1,
        order_type,
        default_address: &settings.default_address,
        warehouse_codes: settings.warehouse_codes.as_ref(),
        now,
    };

    let mut errors = Vec::new();
    let outcome = validate_row(values, &ctx);
    if let Err(row_errors) = &outcome {
        errors.extend(row_errors.iter().cloned());
    }
    if payload.status.is_none() {
        errors.push(FieldError::new(
            ctx.sheet,
            ctx.row,
            STATUS_LABEL,
            ErrorKind::Required,
            "",
        ));
    }

    match outcome {
        Ok(mut draft) if errors.is_empty() => {
            draft.status = payload.status.unwrap_or_default();
            if let Some(count) = payload.item_count {
                draft.item_count = count;
            }
            Ok(draft)
        }
        _ => Err(AppError::Validation(format_errors(&errors))),
    }
}

pub async fn create_order(
    db: &DbPool,
    settings: &ImportSettings,
    payload: &OrderPayload,
    user: &CurrentUser,
) -> AppResult<OrderResponse> {
    let order_type = payload.order_type.unwrap_or(OrderType::Platform);
    let now = Utc::now();
    let mut draft = draft_from_payload(payload, &payload_fields(payload), order_type, settings, now)?;
    if draft.status == STATUS_COMPLETED && draft.completed_at.is_none() {
        draft.completed_at = Some(now);
    }

    let order = insert_order(db.connection(), &draft, &user.id).await?;
    info!("Order {} created by {}", order.id, user.id);
    Ok(order.into())
}

/// Replace the business fields of an order. Type, creator and creation time
/// are kept; a missing order creation time keeps the stored one.
pub async fn update_order_fields(
    db: &DbPool,
    settings: &ImportSettings,
    id: Uuid,
    payload: &OrderPayload,
    user: &CurrentUser,
) -> AppResult<OrderResponse> {
    let existing = load_order(db, id, user).await?;
    let order_type = OrderType::parse(&existing.order_type);
    let now = Utc::now();

    let mut values = payload_fields(payload);
    if non_blank(&payload.order_created_at).is_none() {
        values.set(
            Field::OrderCreatedAt,
            existing.order_created_at.format(TIMESTAMP_FORMAT).to_string(),
        );
    }

    let mut draft = draft_from_payload(payload, &values, order_type, settings, now)?;
    if draft.status == STATUS_COMPLETED {
        if draft.completed_at.is_none() {
            draft.completed_at = Some(now);
        }
    } else {
        draft.completed_at = None;
    }

    let order = update_order(db.connection(), existing, &draft, &user.id).await?;
    info!("Order {} updated by {}", order.id, user.id);
    Ok(order.into())
}

/// Soft-delete an order and drop its attachments. Blobs owned by those
/// attachments are deleted after commit; linked material blobs stay.
pub async fn delete_order(
    db: &DbPool,
    storage: &Storage,
    id: Uuid,
    user: &CurrentUser,
) -> AppResult<()> {
    let order = load_order(db, id, user).await?;

    let txn = db
        .connection()
        .begin()
        .await
        .map_err(|e| AppError::Database(format!("Failed to start transaction: {}", e)))?;
    let released = delete_for_order(&txn, order.id).await?;
    soft_delete_order(&txn, order.id).await?;
    txn.commit()
        .await
        .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;

    for blob in &released {
        storage.delete_quietly(blob).await;
    }
    info!(
        "Order {} deleted by {} ({} blobs released)",
        order.id,
        user.id,
        released.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(admin: bool) -> CurrentUser {
        CurrentUser {
            id: "u1".to_string(),
            is_admin: admin,
        }
    }

    fn settings() -> ImportSettings {
        ImportSettings {
            default_address: "默认地址".to_string(),
            warehouse_codes: None,
        }
    }

    fn valid_payload() -> OrderPayload {
        OrderPayload {
            gsp_order_no: Some("SH1001".to_string()),
            status: Some(0),
            shipping_warehouse_code: Some("WH01".to_string()),
            shop_code: Some("SHOP1".to_string()),
            owner_name: Some("张三".to_string()),
            product_name: Some("T恤".to_string()),
            spec: Some("30x40".to_string()),
            item_no: Some("ITEM123".to_string()),
            seller_sku: Some("SKU-1".to_string()),
            product_price: Some(10.0),
            expected_fulfillment_qty: Some(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_filter_scopes_non_admins() {
        let query = ListOrdersQuery {
            tab: Some("factory".to_string()),
            exact_field: Some("status".to_string()),
            exact_value: Some("1".to_string()),
            fuzzy_field: Some("product_name".to_string()),
            fuzzy_value: Some("T恤".to_string()),
            ..Default::default()
        };
        let filter = build_filter(&query, &user(false)).unwrap();
        assert_eq!(filter.order_type, OrderType::Factory);
        assert_eq!(filter.created_by.as_deref(), Some("u1"));
        assert!(matches!(filter.exact, Some(ExactMatch::Status(1))));
        assert!(matches!(filter.fuzzy, Some((Column::ProductName, _))));

        let admin = build_filter(&query, &user(true)).unwrap();
        assert_eq!(admin.created_by, None);
    }

    #[test]
    fn test_build_filter_rejects_unknown_fields() {
        let query = ListOrdersQuery {
            time_field: Some("deleted_at".to_string()),
            start: Some("2025-01-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            build_filter(&query, &user(true)),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_build_filter_open_time_range() {
        let query = ListOrdersQuery {
            time_field: Some("created_at".to_string()),
            end: Some("2025-01-31 23:59:59".to_string()),
            ..Default::default()
        };
        let filter = build_filter(&query, &user(true)).unwrap();
        let (column, start, end) = filter.time_range.unwrap();
        assert!(matches!(column, Column::CreatedAt));
        assert!(start.is_none());
        assert!(end.is_some());
    }

    #[test]
    fn test_payload_draft_uses_row_rules() {
        let payload = valid_payload();
        let draft = draft_from_payload(
            &payload,
            &payload_fields(&payload),
            OrderType::Platform,
            &settings(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(draft.spec, "30*40");
        assert_eq!(draft.expected_revenue, 50.0);
        assert_eq!(draft.item_count, 5);
        assert_eq!(draft.status, 0);
    }

    #[test]
    fn test_payload_errors_read_like_a_sheet_row() {
        let payload = OrderPayload {
            status: None,
            spec: Some("abc".to_string()),
            ..valid_payload()
        };
        let err = draft_from_payload(
            &payload,
            &payload_fields(&payload),
            OrderType::Platform,
            &settings(),
            Utc::now(),
        )
        .unwrap_err();
        match err {
            AppError::Validation(message) => {
                assert!(message.starts_with("平台面单："), "{}", message);
                assert!(message.contains("状态(1)为空"), "{}", message);
                assert!(message.contains("规格(1) 格式应为 数字*数字"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_payload_item_count_overrides() {
        let payload = OrderPayload {
            item_count: Some(9),
            ..valid_payload()
        };
        let draft = draft_from_payload(
            &payload,
            &payload_fields(&payload),
            OrderType::Platform,
            &settings(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(draft.item_count, 9);
    }
}
