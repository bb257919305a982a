//! Workbook export in the import template layout.

use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::auth::CurrentUser;
use crate::db::DbPool;
use crate::entity::order_info;
use crate::error::AppResult;
use crate::models::OrderType;
use crate::services::import::Field;

const EXPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Columns shared by both sheets after the first two.
const SHARED_HEAD: [Field; 11] = [
    Field::ShopCode,
    Field::Owner,
    Field::ProductName,
    Field::Spec,
    Field::ItemNo,
    Field::SellerSku,
    Field::PlatformSku,
    Field::PlatformSkc,
    Field::PlatformSpu,
    Field::Price,
    Field::SpecialNote,
];

const SHARED_TAIL: [Field; 13] = [
    Field::PostalCode,
    Field::Country,
    Field::Province,
    Field::City,
    Field::District,
    Field::Address1,
    Field::Address2,
    Field::FullName,
    Field::LastName,
    Field::FirstName,
    Field::Phone,
    Field::Email,
    Field::TaxNumber,
];

/// Column layout of an exported sheet, left to right.
pub fn export_columns(order_type: OrderType) -> Vec<Field> {
    let (second, fourteenth) = match order_type {
        OrderType::Platform => (Field::Warehouse, Field::FulfillmentQty),
        OrderType::Factory => (Field::OrderCreatedAt, Field::Currency),
    };
    let mut columns = vec![Field::OrderNo, second];
    columns.extend(SHARED_HEAD);
    columns.push(fourteenth);
    columns.extend(SHARED_TAIL);
    columns
}

/// A value written into one exported cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportCell {
    Blank,
    Text(String),
    Number(f64),
}

fn text(value: &str) -> ExportCell {
    if value.is_empty() {
        ExportCell::Blank
    } else {
        ExportCell::Text(value.to_string())
    }
}

/// Cell value of `field` for one order.
pub fn export_value(order: &order_info::Model, field: Field) -> ExportCell {
    match field {
        Field::OrderNo => text(&order.gsp_order_no),
        Field::OrderCreatedAt => {
            ExportCell::Text(order.order_created_at.format(EXPORT_TIME_FORMAT).to_string())
        }
        Field::RequiredSignAt => order
            .required_sign_at
            .map(|t| ExportCell::Text(t.format(EXPORT_TIME_FORMAT).to_string()))
            .unwrap_or(ExportCell::Blank),
        Field::PaymentTime => order
            .payment_time
            .map(|t| ExportCell::Text(t.format(EXPORT_TIME_FORMAT).to_string()))
            .unwrap_or(ExportCell::Blank),
        Field::CompletedAt => order
            .completed_at
            .map(|t| ExportCell::Text(t.format(EXPORT_TIME_FORMAT).to_string()))
            .unwrap_or(ExportCell::Blank),
        Field::Warehouse => text(&order.shipping_warehouse_code),
        Field::ShopCode => text(&order.shop_code),
        Field::Owner => text(&order.owner_name),
        Field::ProductId => text(&order.product_id),
        Field::ProductName => text(&order.product_name),
        Field::Spec => text(&order.spec),
        Field::ItemNo => text(&order.item_no),
        Field::SellerSku => text(&order.seller_sku),
        Field::PlatformSku => text(&order.platform_sku),
        Field::PlatformSkc => text(&order.platform_skc),
        Field::PlatformSpu => text(&order.platform_spu),
        Field::Price if order.product_price == 0.0 => ExportCell::Blank,
        Field::Price => ExportCell::Number(order.product_price),
        Field::ExpectedRevenue => ExportCell::Number(order.expected_revenue),
        Field::SpecialNote => text(order.special_product_note.as_deref().unwrap_or_default()),
        Field::FulfillmentQty => ExportCell::Number(f64::from(order.expected_fulfillment_qty)),
        Field::Currency => text(&order.currency_code),
        Field::PostalCode => text(&order.postal_code),
        Field::Country => text(&order.country),
        Field::Province => text(&order.province),
        Field::City => text(&order.city),
        Field::District => text(&order.district),
        Field::Address1 => text(&order.address_line1),
        Field::Address2 => text(&order.address_line2),
        Field::FullName => text(&order.customer_full_name),
        Field::LastName => text(&order.customer_last_name),
        Field::FirstName => text(&order.customer_first_name),
        Field::Phone => text(&order.phone_number),
        Field::Email => text(&order.email),
        Field::TaxNumber => text(&order.tax_number),
    }
}

fn write_sheet(
    sheet: &mut Worksheet,
    order_type: OrderType,
    orders: &[order_info::Model],
) -> AppResult<()> {
    sheet.set_name(order_type.sheet_label())?;
    let columns = export_columns(order_type);

    for (col, field) in columns.iter().enumerate() {
        sheet.write_string(0, col as u16, field.label())?;
    }

    for (i, order) in orders.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, field) in columns.iter().enumerate() {
            let col = col as u16;
            match export_value(order, *field) {
                ExportCell::Blank => {}
                ExportCell::Text(value) => {
                    sheet.write_string(row, col, value)?;
                }
                ExportCell::Number(value) => {
                    sheet.write_number(row, col, value)?;
                }
            }
        }
    }
    Ok(())
}

/// Render both order sheets into an `.xlsx` buffer.
pub fn render_workbook(
    platform: &[order_info::Model],
    factory: &[order_info::Model],
) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    write_sheet(workbook.add_worksheet(), OrderType::Platform, platform)?;
    write_sheet(workbook.add_worksheet(), OrderType::Factory, factory)?;
    Ok(workbook.save_to_buffer()?)
}

/// Export every order the caller can see.
pub async fn export_orders(db: &DbPool, user: &CurrentUser) -> AppResult<(String, Vec<u8>)> {
    let platform = db
        .orders_for_export(OrderType::Platform, user.scope())
        .await?;
    let factory = db.orders_for_export(OrderType::Factory, user.scope()).await?;

    let bytes = render_workbook(&platform, &factory)?;
    let file_name = format!("orders_all_{}.xlsx", chrono::Utc::now().timestamp());

    info!(
        "Exported {} platform and {} factory orders for {}",
        platform.len(),
        factory.len(),
        user.id
    );
    Ok((file_name, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::import::workbook::read_workbook;

    #[test]
    fn test_layouts_differ_in_two_columns() {
        let platform = export_columns(OrderType::Platform);
        let factory = export_columns(OrderType::Factory);
        assert_eq!(platform.len(), 27);
        assert_eq!(factory.len(), 27);

        assert_eq!(platform[1], Field::Warehouse);
        assert_eq!(factory[1], Field::OrderCreatedAt);
        assert_eq!(platform[13], Field::FulfillmentQty);
        assert_eq!(factory[13], Field::Currency);
        assert_eq!(platform[11], Field::Price);
        assert_eq!(factory[26], Field::TaxNumber);
    }

    #[test]
    fn test_empty_export_keeps_headers() {
        let bytes = render_workbook(&[], &[]).unwrap();
        let sheets = read_workbook(&bytes).unwrap();

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "平台面单");
        assert_eq!(sheets[1].name, "工厂物流");
        assert_eq!(sheets[1].rows[0].cell(1), "订单创建时间");
        assert_eq!(sheets[1].rows[0].cell(13), "币种");
        assert_eq!(sheets[0].rows.len(), 1);
    }
}
