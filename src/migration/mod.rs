//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_order_info;
mod m20250301_000002_create_material_folders;
mod m20250301_000003_create_material_assets;
mod m20250301_000004_create_order_attachments;
mod m20250301_000005_create_app_settings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_order_info::Migration),
            Box::new(m20250301_000002_create_material_folders::Migration),
            Box::new(m20250301_000003_create_material_assets::Migration),
            Box::new(m20250301_000004_create_order_attachments::Migration),
            Box::new(m20250301_000005_create_app_settings::Migration),
        ]
    }
}
