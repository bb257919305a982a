//! Storage settings DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::StorageSettings;

/// Current runtime storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StorageSettingsResponse {
    pub storage_driver: String,
    pub local_storage_path: String,
    pub local_base_url: String,
    pub key_prefix: String,
}

impl From<&StorageSettings> for StorageSettingsResponse {
    fn from(s: &StorageSettings) -> Self {
        Self {
            storage_driver: s.driver.clone(),
            local_storage_path: s.local_storage_path.to_string_lossy().into_owned(),
            local_base_url: s.local_base_url.clone(),
            key_prefix: s.key_prefix.clone(),
        }
    }
}

/// Body of `PUT /storage/settings`. Blank fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateStorageSettingsRequest {
    pub storage_driver: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_base_url: Option<String>,
    pub key_prefix: Option<String>,
}
