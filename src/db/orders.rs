//! Database queries for orders.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::order_info::{self as order, ActiveModel, Entity as Order};
use crate::error::{AppError, AppResult};
use crate::models::OrderType;
use crate::services::import::{DuplicateKey, OrderDraft};

use super::DbPool;

/// Exact-match filter of the order list.
#[derive(Debug, Clone)]
pub enum ExactMatch {
    Text(order::Column, String),
    Status(i16),
}

/// Resolved filters of `GET /orders`.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub order_type: OrderType,
    /// Restrict to orders created by this user (non-admin callers).
    pub created_by: Option<String>,
    /// Column plus inclusive lower and upper bounds; either bound may be open.
    pub time_range: Option<(order::Column, Option<DateTime<Utc>>, Option<DateTime<Utc>>)>,
    pub exact: Option<ExactMatch>,
    pub fuzzy: Option<(order::Column, String)>,
}

fn not_deleted() -> Condition {
    Condition::all().add(order::Column::DeletedAt.is_null())
}

/// `lower(column) = value`, with `value` already lowercased.
pub(crate) fn lower_eq<E: EntityTrait>(entity: E, column: E::Column, value: &str) -> Condition {
    use sea_orm::sea_query::ExprTrait;
    Condition::all().add(Expr::expr(Func::lower(Expr::col((entity, column)))).eq(value))
}

fn visible_to(created_by: Option<&str>) -> Condition {
    let mut cond = not_deleted();
    if let Some(user) = created_by {
        cond = cond.add(order::Column::CreatedBy.eq(user));
    }
    cond
}

/// Copy every business field of a draft onto an active model.
fn apply_draft(active: &mut ActiveModel, draft: &OrderDraft) {
    active.gsp_order_no = Set(draft.gsp_order_no.clone());
    active.order_type = Set(draft.order_type.as_str().to_string());
    active.order_created_at = Set(draft.order_created_at);
    active.status = Set(draft.status);
    active.payment_time = Set(draft.payment_time);
    active.completed_at = Set(draft.completed_at);
    active.shipping_warehouse_code = Set(draft.shipping_warehouse_code.clone());
    active.required_sign_at = Set(draft.required_sign_at);
    active.shop_code = Set(draft.shop_code.clone());
    active.product_id = Set(draft.product_id.clone());
    active.owner_name = Set(draft.owner_name.clone());
    active.product_name = Set(draft.product_name.clone());
    active.spec = Set(draft.spec.clone());
    active.item_no = Set(draft.item_no.clone());
    active.seller_sku = Set(draft.seller_sku.clone());
    active.platform_sku = Set(draft.platform_sku.clone());
    active.platform_skc = Set(draft.platform_skc.clone());
    active.platform_spu = Set(draft.platform_spu.clone());
    active.product_price = Set(draft.product_price);
    active.expected_revenue = Set(draft.expected_revenue);
    active.special_product_note = Set(draft.special_product_note.clone());
    active.currency_code = Set(draft.currency_code.clone());
    active.expected_fulfillment_qty = Set(draft.expected_fulfillment_qty);
    active.item_count = Set(draft.item_count);
    active.postal_code = Set(draft.postal_code.clone());
    active.country = Set(draft.country.clone());
    active.province = Set(draft.province.clone());
    active.city = Set(draft.city.clone());
    active.district = Set(draft.district.clone());
    active.address_line1 = Set(draft.address_line1.clone());
    active.address_line2 = Set(draft.address_line2.clone());
    active.customer_full_name = Set(draft.customer_full_name.clone());
    active.customer_last_name = Set(draft.customer_last_name.clone());
    active.customer_first_name = Set(draft.customer_first_name.clone());
    active.phone_number = Set(draft.phone_number.clone());
    active.email = Set(draft.email.clone());
    active.tax_number = Set(draft.tax_number.clone());
}

/// Insert a new order from a draft.
pub async fn insert_order<C: ConnectionTrait>(
    conn: &C,
    draft: &OrderDraft,
    user_id: &str,
) -> AppResult<order::Model> {
    let now = Utc::now();
    let mut active = ActiveModel {
        id: Set(Uuid::now_v7()),
        created_by: Set(user_id.to_string()),
        updated_by: Set(user_id.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    };
    apply_draft(&mut active, draft);

    active
        .insert(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert order: {}", e)))
}

/// Overwrite the business fields of an existing order. Id, creator and
/// creation time are kept.
pub async fn update_order<C: ConnectionTrait>(
    conn: &C,
    existing: order::Model,
    draft: &OrderDraft,
    user_id: &str,
) -> AppResult<order::Model> {
    let mut active: ActiveModel = existing.into();
    apply_draft(&mut active, draft);
    active.updated_by = Set(user_id.to_string());
    active.updated_at = Set(Utc::now());

    active
        .update(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to update order: {}", e)))
}

/// Find the live order sharing the upsert identity of a draft.
pub async fn find_by_identity<C: ConnectionTrait>(
    conn: &C,
    gsp_order_no: &str,
    order_type: OrderType,
    order_created_at: DateTime<Utc>,
) -> AppResult<Option<order::Model>> {
    let result = Order::find()
        .filter(not_deleted())
        .filter(order::Column::GspOrderNo.eq(gsp_order_no))
        .filter(order::Column::OrderType.eq(order_type.as_str()))
        .filter(order::Column::OrderCreatedAt.eq(order_created_at))
        .one(conn)
        .await?;
    Ok(result)
}

/// Whether a live order with the same natural key exists.
pub async fn similar_order_exists<C: ConnectionTrait>(
    conn: &C,
    key: &DuplicateKey<'_>,
) -> AppResult<bool> {
    let mut select = Order::find()
        .filter(not_deleted())
        .filter(order::Column::OrderType.eq(key.order_type.as_str()))
        .filter(order::Column::GspOrderNo.eq(key.gsp_order_no))
        .filter(order::Column::ShopCode.eq(key.shop_code))
        .filter(order::Column::OwnerName.eq(key.owner_name))
        .filter(order::Column::Spec.eq(key.spec))
        .filter(order::Column::ItemNo.eq(key.item_no))
        .filter(order::Column::SellerSku.eq(key.seller_sku));
    if let Some(warehouse) = key.shipping_warehouse_code {
        select = select.filter(order::Column::ShippingWarehouseCode.eq(warehouse));
    }
    Ok(select.count(conn).await? > 0)
}

/// Soft-delete an order.
pub async fn soft_delete_order<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<()> {
    let now = Utc::now();
    Order::update_many()
        .col_expr(order::Column::DeletedAt, Expr::value(now))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(id))
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to delete order: {}", e)))?;
    Ok(())
}

impl DbPool {
    /// Get a live order, optionally restricted to one creator.
    pub async fn get_order(
        &self,
        id: Uuid,
        created_by: Option<&str>,
    ) -> AppResult<Option<order::Model>> {
        let result = Order::find_by_id(id)
            .filter(visible_to(created_by))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get order: {}", e)))?;
        Ok(result)
    }

    /// List orders of one type with filters and pagination, newest first.
    pub async fn list_orders(
        &self,
        filter: &OrderFilter,
        page_index: u64,
        page_size: u64,
    ) -> AppResult<(Vec<order::Model>, u64)> {
        let mut cond = visible_to(filter.created_by.as_deref())
            .add(order::Column::OrderType.eq(filter.order_type.as_str()));

        if let Some((column, start, end)) = filter.time_range {
            if let Some(start) = start {
                cond = cond.add(column.gte(start));
            }
            if let Some(end) = end {
                cond = cond.add(column.lte(end));
            }
        }
        match &filter.exact {
            Some(ExactMatch::Text(column, value)) => cond = cond.add(column.eq(value.as_str())),
            Some(ExactMatch::Status(status)) => cond = cond.add(order::Column::Status.eq(*status)),
            None => {}
        }
        if let Some((column, value)) = &filter.fuzzy {
            cond = cond.add(column.contains(value.as_str()));
        }

        let paginator = Order::find()
            .filter(cond)
            .order_by_desc(order::Column::Id)
            .paginate(self.connection(), page_size);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| AppError::Database(format!("Failed to count orders: {}", e)))?;
        let orders = paginator
            .fetch_page(page_index)
            .await
            .map_err(|e| AppError::Database(format!("Failed to list orders: {}", e)))?;

        Ok((orders, total))
    }

    /// Latest live order whose `column` equals `value` (case-insensitive).
    pub async fn latest_order_matching(
        &self,
        column: order::Column,
        value: &str,
        created_by: Option<&str>,
    ) -> AppResult<Option<order::Model>> {
        let result = Order::find()
            .filter(visible_to(created_by))
            .filter(lower_eq(Order, column, &value.trim().to_lowercase()))
            .order_by_desc(order::Column::Id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to look up order: {}", e)))?;
        Ok(result)
    }

    /// All live orders of one type for export, oldest first.
    pub async fn orders_for_export(
        &self,
        order_type: OrderType,
        created_by: Option<&str>,
    ) -> AppResult<Vec<order::Model>> {
        let orders = Order::find()
            .filter(visible_to(created_by))
            .filter(order::Column::OrderType.eq(order_type.as_str()))
            .order_by_asc(order::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to load orders for export: {}", e)))?;
        Ok(orders)
    }
}
