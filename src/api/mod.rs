//! API endpoint modules.

pub mod attachments;
pub mod folders;
pub mod health;
pub mod materials;
pub mod multipart;
pub mod openapi;
pub mod orders;
pub mod storage_settings;

use actix_web::web;

pub use multipart::UploadLimit;
pub use openapi::ApiDoc;

/// Mount every endpoint under the current scope (normally `/api/v1`).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure_routes)
        // Attachment routes include `/orders/batch-attachments`, which must
        // win over `/orders/{id}`.
        .configure(attachments::configure_routes)
        .configure(orders::configure_routes)
        .configure(materials::configure_routes)
        .configure(folders::configure_routes)
        .configure(storage_settings::configure_routes);
}
