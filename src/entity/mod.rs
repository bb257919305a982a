//! SeaORM entity definitions.

pub mod app_setting;
pub mod material_asset;
pub mod material_folder;
pub mod order_attachment;
pub mod order_info;
