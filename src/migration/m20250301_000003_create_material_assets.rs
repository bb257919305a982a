//! Create material_asset table.

use sea_orm_migration::prelude::*;

use super::m20250301_000002_create_material_folders::MaterialFolder;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MaterialAsset::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MaterialAsset::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::Code)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MaterialAsset::FileName).string().not_null())
                    .col(
                        ColumnDef::new(MaterialAsset::Title)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::Width)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::Height)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::Dimensions)
                            .string_len(64)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::Format)
                            .string_len(16)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::FileSize)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::Storage)
                            .string_len(16)
                            .not_null()
                            .default("local"),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::FilePath)
                            .string_len(1024)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(MaterialAsset::FolderId).uuid())
                    .col(
                        ColumnDef::new(MaterialAsset::Shape)
                            .string_len(16)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::CreatedBy)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::UpdatedBy)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(MaterialAsset::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(MaterialAsset::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(MaterialAsset::Table, MaterialAsset::FolderId)
                            .to(MaterialFolder::Table, MaterialFolder::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_material_asset_folder")
                    .table(MaterialAsset::Table)
                    .col(MaterialAsset::FolderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MaterialAsset::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum MaterialAsset {
    Table,
    Id,
    Code,
    FileName,
    Title,
    Width,
    Height,
    Dimensions,
    Format,
    FileSize,
    Storage,
    FilePath,
    FolderId,
    Shape,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
