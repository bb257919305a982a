//! Persisted application settings (the runtime storage configuration).

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};

use crate::config::{StorageSettings, normalize_driver, normalize_key_prefix};
use crate::entity::app_setting::{self as setting, Entity as Setting};
use crate::error::{AppError, AppResult};

use super::DbPool;

const STORAGE_GROUP: &str = "storage";

const KEY_DRIVER: &str = "storage_driver";
const KEY_LOCAL_PATH: &str = "local_storage_path";
const KEY_LOCAL_BASE_URL: &str = "local_base_url";
const KEY_PREFIX: &str = "key_prefix";

/// Overlay stored values onto `base`. Blank stored values are ignored.
pub fn merge_storage_settings(
    base: &StorageSettings,
    stored: &HashMap<String, String>,
) -> StorageSettings {
    let value = |key: &str| {
        stored
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };

    let mut merged = base.clone();
    if let Some(driver) = value(KEY_DRIVER) {
        merged.driver = normalize_driver(driver).to_string();
    }
    if let Some(path) = value(KEY_LOCAL_PATH) {
        merged.local_storage_path = PathBuf::from(path);
    }
    if let Some(url) = value(KEY_LOCAL_BASE_URL) {
        merged.local_base_url = url.to_string();
    }
    if let Some(prefix) = value(KEY_PREFIX) {
        merged.key_prefix = normalize_key_prefix(prefix);
    }
    merged
}

impl DbPool {
    /// Stored storage settings as raw key/value pairs.
    pub async fn load_storage_settings(&self) -> AppResult<HashMap<String, String>> {
        let rows = Setting::find()
            .filter(setting::Column::GroupName.eq(STORAGE_GROUP))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to load settings: {}", e)))?;
        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }

    /// Upsert every storage setting in one transaction.
    pub async fn save_storage_settings(&self, settings: &StorageSettings) -> AppResult<()> {
        let now = Utc::now();
        let entries = [
            (KEY_DRIVER, "存储驱动", settings.driver.clone()),
            (
                KEY_LOCAL_PATH,
                "本地存储路径",
                settings.local_storage_path.to_string_lossy().into_owned(),
            ),
            (KEY_LOCAL_BASE_URL, "本地访问地址", settings.local_base_url.clone()),
            (KEY_PREFIX, "对象键前缀", settings.key_prefix.clone()),
        ];

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to start transaction: {}", e)))?;

        for (key, label, value) in entries {
            let row = setting::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value),
                label: Set(label.to_string()),
                group_name: Set(STORAGE_GROUP.to_string()),
                updated_at: Set(now),
            };
            Setting::insert(row)
                .on_conflict(
                    OnConflict::column(setting::Column::Key)
                        .update_columns([
                            setting::Column::Value,
                            setting::Column::Label,
                            setting::Column::GroupName,
                            setting::Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(format!("Failed to save setting {}: {}", key, e)))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> StorageSettings {
        StorageSettings {
            driver: "local".to_string(),
            local_storage_path: PathBuf::from("./uploads"),
            local_base_url: "/uploads".to_string(),
            key_prefix: "orders".to_string(),
        }
    }

    #[test]
    fn test_merge_overrides_non_blank_values() {
        let stored = HashMap::from([
            (KEY_DRIVER.to_string(), "COS".to_string()),
            (KEY_LOCAL_PATH.to_string(), "  ".to_string()),
            (KEY_PREFIX.to_string(), "/attachments/".to_string()),
        ]);
        let merged = merge_storage_settings(&base(), &stored);
        assert_eq!(merged.driver, "s3");
        assert_eq!(merged.local_storage_path, PathBuf::from("./uploads"));
        assert_eq!(merged.local_base_url, "/uploads");
        assert_eq!(merged.key_prefix, "attachments");
    }

    #[test]
    fn test_merge_without_stored_values() {
        assert_eq!(merge_storage_settings(&base(), &HashMap::new()), base());
    }
}
