//! Order attachment entity. At most one row exists per (order, file_type).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "order_attachment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    /// `material_image` or `shipping_label`
    pub file_type: String,
    pub file_name: String,
    /// Object key inside the storage driver
    pub file_path: String,
    pub file_ext: String,
    pub file_size: i64,
    /// SHA-256 hex of the uploaded bytes; empty for material links
    pub checksum: String,
    /// Driver the blob was written with (`local` or `s3`)
    pub storage: String,
    pub uploader_id: String,
    pub material_id: Option<Uuid>,
    /// Whether deleting this row must also delete `file_path`
    pub owns_blob: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order_info::Entity",
        from = "Column::OrderId",
        to = "super::order_info::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::material_asset::Entity",
        from = "Column::MaterialId",
        to = "super::material_asset::Column::Id",
        on_delete = "SetNull"
    )]
    Material,
}

impl Related<super::order_info::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::material_asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Material.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
