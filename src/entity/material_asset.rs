//! Material asset entity: a reusable image in the shared library.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "material_asset")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub file_name: String,
    pub title: String,
    pub width: i32,
    pub height: i32,
    /// `"{width} x {height}"`
    pub dimensions: String,
    pub format: String,
    pub file_size: i64,
    pub storage: String,
    pub file_path: String,
    pub folder_id: Option<Uuid>,
    pub shape: String,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::material_folder::Entity",
        from = "Column::FolderId",
        to = "super::material_folder::Column::Id",
        on_delete = "SetNull"
    )]
    Folder,
    #[sea_orm(has_many = "super::order_attachment::Entity")]
    Attachments,
}

impl Related<super::material_folder::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Folder.def()
    }
}

impl Related<super::order_attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
