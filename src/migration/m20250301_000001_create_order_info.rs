//! Create order_info table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut table = Table::create();
        table
            .table(OrderInfo::Table)
            .if_not_exists()
            .col(ColumnDef::new(OrderInfo::Id).uuid().not_null().primary_key())
            .col(ColumnDef::new(OrderInfo::GspOrderNo).string().not_null())
            .col(
                ColumnDef::new(OrderInfo::OrderType)
                    .string_len(16)
                    .not_null()
                    .default("platform"),
            )
            .col(
                ColumnDef::new(OrderInfo::OrderCreatedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .col(
                ColumnDef::new(OrderInfo::Status)
                    .small_integer()
                    .not_null()
                    .default(0),
            )
            .col(ColumnDef::new(OrderInfo::PaymentTime).timestamp_with_time_zone())
            .col(ColumnDef::new(OrderInfo::CompletedAt).timestamp_with_time_zone())
            .col(ColumnDef::new(OrderInfo::RequiredSignAt).timestamp_with_time_zone());

        for column in [
            OrderInfo::ShippingWarehouseCode,
            OrderInfo::ShopCode,
            OrderInfo::ProductId,
            OrderInfo::OwnerName,
            OrderInfo::ProductName,
            OrderInfo::Spec,
            OrderInfo::ItemNo,
            OrderInfo::SellerSku,
            OrderInfo::PlatformSku,
            OrderInfo::PlatformSkc,
            OrderInfo::PlatformSpu,
            OrderInfo::PostalCode,
            OrderInfo::Country,
            OrderInfo::Province,
            OrderInfo::City,
            OrderInfo::District,
            OrderInfo::AddressLine1,
            OrderInfo::AddressLine2,
            OrderInfo::CustomerFullName,
            OrderInfo::CustomerLastName,
            OrderInfo::CustomerFirstName,
            OrderInfo::PhoneNumber,
            OrderInfo::Email,
            OrderInfo::TaxNumber,
            OrderInfo::CreatedBy,
            OrderInfo::UpdatedBy,
        ] {
            table.col(ColumnDef::new(column).string().not_null().default(""));
        }

        table
            .col(
                ColumnDef::new(OrderInfo::ProductPrice)
                    .double()
                    .not_null()
                    .default(0.0),
            )
            .col(
                ColumnDef::new(OrderInfo::ExpectedRevenue)
                    .double()
                    .not_null()
                    .default(0.0),
            )
            .col(ColumnDef::new(OrderInfo::SpecialProductNote).string())
            .col(
                ColumnDef::new(OrderInfo::CurrencyCode)
                    .string_len(8)
                    .not_null()
                    .default("CNY"),
            )
            .col(
                ColumnDef::new(OrderInfo::ExpectedFulfillmentQty)
                    .integer()
                    .not_null()
                    .default(0),
            )
            .col(
                ColumnDef::new(OrderInfo::ItemCount)
                    .integer()
                    .not_null()
                    .default(1),
            )
            .col(
                ColumnDef::new(OrderInfo::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .col(
                ColumnDef::new(OrderInfo::UpdatedAt)
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .col(ColumnDef::new(OrderInfo::DeletedAt).timestamp_with_time_zone());

        manager.create_table(table.to_owned()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_info_natural_key")
                    .table(OrderInfo::Table)
                    .col(OrderInfo::GspOrderNo)
                    .col(OrderInfo::OrderType)
                    .col(OrderInfo::OrderCreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_info_item_no")
                    .table(OrderInfo::Table)
                    .col(OrderInfo::ItemNo)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderInfo::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum OrderInfo {
    Table,
    Id,
    GspOrderNo,
    OrderType,
    OrderCreatedAt,
    Status,
    PaymentTime,
    CompletedAt,
    ShippingWarehouseCode,
    RequiredSignAt,
    ShopCode,
    ProductId,
    OwnerName,
    ProductName,
    Spec,
    ItemNo,
    SellerSku,
    PlatformSku,
    PlatformSkc,
    PlatformSpu,
    ProductPrice,
    ExpectedRevenue,
    SpecialProductNote,
    CurrencyCode,
    ExpectedFulfillmentQty,
    ItemCount,
    PostalCode,
    Country,
    Province,
    City,
    District,
    AddressLine1,
    AddressLine2,
    CustomerFullName,
    CustomerLastName,
    CustomerFirstName,
    PhoneNumber,
    Email,
    TaxNumber,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
