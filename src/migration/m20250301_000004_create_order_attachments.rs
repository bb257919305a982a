//! Create order_attachment table.

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_order_info::OrderInfo;
use super::m20250301_000003_create_material_assets::MaterialAsset;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderAttachment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderAttachment::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderAttachment::OrderId).uuid().not_null())
                    .col(
                        ColumnDef::new(OrderAttachment::FileType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderAttachment::FileName).string().not_null())
                    .col(
                        ColumnDef::new(OrderAttachment::FilePath)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrderAttachment::FileExt)
                            .string_len(16)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(OrderAttachment::FileSize)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrderAttachment::Checksum)
                            .string_len(64)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(OrderAttachment::Storage)
                            .string_len(16)
                            .not_null()
                            .default("local"),
                    )
                    .col(
                        ColumnDef::new(OrderAttachment::UploaderId)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(OrderAttachment::MaterialId).uuid())
                    .col(
                        ColumnDef::new(OrderAttachment::OwnsBlob)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(OrderAttachment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(OrderAttachment::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OrderAttachment::Table, OrderAttachment::OrderId)
                            .to(OrderInfo::Table, OrderInfo::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OrderAttachment::Table, OrderAttachment::MaterialId)
                            .to(MaterialAsset::Table, MaterialAsset::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_attachment_role")
                    .table(OrderAttachment::Table)
                    .col(OrderAttachment::OrderId)
                    .col(OrderAttachment::FileType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_attachment_material")
                    .table(OrderAttachment::Table)
                    .col(OrderAttachment::MaterialId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderAttachment::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrderAttachment {
    Table,
    Id,
    OrderId,
    FileType,
    FileName,
    FilePath,
    FileExt,
    FileSize,
    Checksum,
    Storage,
    UploaderId,
    MaterialId,
    OwnsBlob,
    CreatedAt,
    UpdatedAt,
}
