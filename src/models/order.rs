//! Order domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::order_info;

use super::attachment::AttachmentResponse;

/// Status value that marks an order as completed.
pub const STATUS_COMPLETED: i16 = 1;

/// Which sheet (and natural-key flavour) an order belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Platform,
    Factory,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Factory => "factory",
        }
    }

    /// Lenient parse: anything but `factory` is a platform order.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("factory") {
            Self::Factory
        } else {
            Self::Platform
        }
    }

    /// Template sheet name, also used as the prefix of validation messages.
    pub fn sheet_label(&self) -> &'static str {
        match self {
            Self::Platform => "平台面单",
            Self::Factory => "工厂物流",
        }
    }

    /// Lowercased substrings that identify this type's worksheet.
    pub fn sheet_keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Platform => &["平台面单", "platform", "平台"],
            Self::Factory => &["工厂物流", "factory", "工厂"],
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub gsp_order_no: String,
    pub order_type: OrderType,
    pub order_created_at: DateTime<Utc>,
    pub status: i16,
    pub payment_time: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub shipping_warehouse_code: String,
    pub required_sign_at: Option<DateTime<Utc>>,
    pub shop_code: String,
    pub product_id: String,
    pub owner_name: String,
    pub product_name: String,
    pub spec: String,
    pub item_no: String,
    pub seller_sku: String,
    pub platform_sku: String,
    pub platform_skc: String,
    pub platform_spu: String,
    pub product_price: f64,
    pub expected_revenue: f64,
    pub special_product_note: Option<String>,
    pub currency_code: String,
    pub expected_fulfillment_qty: i32,
    pub item_count: i32,
    pub postal_code: String,
    pub country: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub address_line1: String,
    pub address_line2: String,
    pub customer_full_name: String,
    pub customer_last_name: String,
    pub customer_first_name: String,
    pub phone_number: String,
    pub email: String,
    pub tax_number: String,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Attachments of the order, filled on detail and list responses.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentResponse>,
}

impl From<order_info::Model> for OrderResponse {
    fn from(m: order_info::Model) -> Self {
        Self {
            id: m.id,
            gsp_order_no: m.gsp_order_no,
            order_type: OrderType::parse(&m.order_type),
            order_created_at: m.order_created_at,
            status: m.status,
            payment_time: m.payment_time,
            completed_at: m.completed_at,
            shipping_warehouse_code: m.shipping_warehouse_code,
            required_sign_at: m.required_sign_at,
            shop_code: m.shop_code,
            product_id: m.product_id,
            owner_name: m.owner_name,
            product_name: m.product_name,
            spec: m.spec,
            item_no: m.item_no,
            seller_sku: m.seller_sku,
            platform_sku: m.platform_sku,
            platform_skc: m.platform_skc,
            platform_spu: m.platform_spu,
            product_price: m.product_price,
            expected_revenue: m.expected_revenue,
            special_product_note: m.special_product_note,
            currency_code: m.currency_code,
            expected_fulfillment_qty: m.expected_fulfillment_qty,
            item_count: m.item_count,
            postal_code: m.postal_code,
            country: m.country,
            province: m.province,
            city: m.city,
            district: m.district,
            address_line1: m.address_line1,
            address_line2: m.address_line2,
            customer_full_name: m.customer_full_name,
            customer_last_name: m.customer_last_name,
            customer_first_name: m.customer_first_name,
            phone_number: m.phone_number,
            email: m.email,
            tax_number: m.tax_number,
            created_by: m.created_by,
            updated_by: m.updated_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
            attachments: Vec::new(),
        }
    }
}

/// Body of `POST /orders` and `PUT /orders/{id}`.
///
/// Text fields are validated with the same rules as an imported row, so every
/// field is optional here and missing values surface as validation messages.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct OrderPayload {
    pub order_type: Option<OrderType>,
    pub gsp_order_no: Option<String>,
    pub order_created_at: Option<String>,
    pub status: Option<i16>,
    pub payment_time: Option<String>,
    pub completed_at: Option<String>,
    pub required_sign_at: Option<String>,
    pub shipping_warehouse_code: Option<String>,
    pub shop_code: Option<String>,
    pub product_id: Option<String>,
    pub owner_name: Option<String>,
    pub product_name: Option<String>,
    pub spec: Option<String>,
    pub item_no: Option<String>,
    pub seller_sku: Option<String>,
    pub platform_sku: Option<String>,
    pub platform_skc: Option<String>,
    pub platform_spu: Option<String>,
    pub product_price: Option<f64>,
    pub expected_revenue: Option<f64>,
    pub special_product_note: Option<String>,
    pub currency_code: Option<String>,
    pub expected_fulfillment_qty: Option<i32>,
    pub item_count: Option<i32>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub customer_full_name: Option<String>,
    pub customer_last_name: Option<String>,
    pub customer_first_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub tax_number: Option<String>,
}

/// Query parameters for `GET /orders`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListOrdersQuery {
    /// `platform` (default) or `factory`.
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
    /// One of order_created_at, payment_time, completed_at, required_sign_at, created_at.
    #[serde(default)]
    pub time_field: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    /// One of gsp_order_no, shop_code, item_no, seller_sku, shipping_warehouse_code, status.
    #[serde(default)]
    pub exact_field: Option<String>,
    #[serde(default)]
    pub exact_value: Option<String>,
    /// One of gsp_order_no, product_name, owner_name, item_no, seller_sku, customer_full_name.
    #[serde(default)]
    pub fuzzy_field: Option<String>,
    #[serde(default)]
    pub fuzzy_value: Option<String>,
}

/// Paginated order list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderListResponse {
    pub data: Vec<OrderResponse>,
    pub pagination: super::Pagination,
}

/// Result of a successful spreadsheet import.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportResponse {
    /// `成功导入N条订单`
    pub message: String,
    pub imported: usize,
    pub created: usize,
    pub updated: usize,
    /// Formatted duplicate warnings; empty when there were none.
    pub warnings: String,
}
