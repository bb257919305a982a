//! Create material_folder table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MaterialFolder::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MaterialFolder::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MaterialFolder::Name).string().not_null())
                    .col(ColumnDef::new(MaterialFolder::ParentId).uuid())
                    .col(ColumnDef::new(MaterialFolder::Path).string_len(1024).not_null())
                    .col(
                        ColumnDef::new(MaterialFolder::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(MaterialFolder::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(MaterialFolder::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(MaterialFolder::Table, MaterialFolder::ParentId)
                            .to(MaterialFolder::Table, MaterialFolder::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_material_folder_path")
                    .table(MaterialFolder::Table)
                    .col(MaterialFolder::Path)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MaterialFolder::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum MaterialFolder {
    Table,
    Id,
    Name,
    ParentId,
    Path,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
