//! Order entity: one row of imported or manually entered commerce order data.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_info")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub gsp_order_no: String,
    /// `platform` or `factory`
    pub order_type: String,
    pub order_created_at: DateTimeUtc,
    /// 1 = completed
    pub status: i16,
    pub payment_time: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
    pub shipping_warehouse_code: String,
    pub required_sign_at: Option<DateTimeUtc>,
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
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_attachment::Entity")]
    Attachments,
}

impl Related<super::order_attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
