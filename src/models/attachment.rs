//! Order attachment DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::order_attachment;

/// Role an attachment plays on its order. An order holds at most one per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    MaterialImage,
    ShippingLabel,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaterialImage => "material_image",
            Self::ShippingLabel => "shipping_label",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "material_image" => Some(Self::MaterialImage),
            "shipping_label" => Some(Self::ShippingLabel),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Attachment as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub file_type: String,
    pub file_name: String,
    pub file_path: String,
    pub file_ext: String,
    pub file_size: i64,
    pub checksum: String,
    pub storage: String,
    pub uploader_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_id: Option<Uuid>,
    /// False for library links; deleting the attachment keeps their blob.
    pub owns_blob: bool,
    /// Public URL of the blob; empty when the driver has none.
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttachmentResponse {
    pub fn from_model(m: order_attachment::Model, url: String) -> Self {
        Self {
            id: m.id,
            order_id: m.order_id,
            file_type: m.file_type,
            file_name: m.file_name,
            file_path: m.file_path,
            file_ext: m.file_ext,
            file_size: m.file_size,
            checksum: m.checksum,
            storage: m.storage,
            uploader_id: m.uploader_id,
            material_id: m.material_id,
            owns_blob: m.owns_blob,
            url,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Body of `POST /orders/{id}/attachments/link`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LinkMaterialRequest {
    pub material_id: Uuid,
    /// Defaults to `material_image`.
    #[serde(default)]
    pub file_type: Option<String>,
}

/// One file of a batch upload that could not be attached.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchFailure {
    pub file_name: String,
    pub reason: String,
}

/// Result of `POST /orders/batch-attachments`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchUploadResponse {
    /// `成功上传X个，失败Y个`
    pub message: String,
    pub success: Vec<AttachmentResponse>,
    pub failed: Vec<BatchFailure>,
}

/// Resolved download location of a stored blob.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DownloadResponse {
    pub url: String,
    pub file_name: String,
}
