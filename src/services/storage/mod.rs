//! Blob storage: pluggable drivers plus the runtime-switchable façade.
//!
//! Every stored row remembers the driver it was written with, so blobs keep
//! resolving through [`Storage::driver_for`] after the active driver changes.

mod local;
mod s3;

use std::path::Path;
use std::sync::{Arc, LazyLock, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{error, info};

use crate::config::{StorageSettings, normalize_driver};
use crate::error::{AppError, AppResult};

pub use local::LocalDriver;
pub use s3::S3Driver;

static UNSAFE_KEY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9._-]+").expect("valid key pattern"));

const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Common interface of the storage backends.
#[async_trait]
pub trait BlobDriver: Send + Sync {
    /// Driver name recorded on stored rows.
    fn name(&self) -> &'static str;

    /// Store `data` under `key` and return its public URL (may be empty).
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> AppResult<String>;

    /// Remove the blob. Missing blobs are not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Public URL of a key without any signing.
    fn build_url(&self, key: &str) -> String;

    /// Time-limited URL for downloading a key.
    async fn presigned_download_url(&self, key: &str, ttl: Duration) -> AppResult<String>;
}

/// Blob location as recorded on a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub storage: String,
    pub key: String,
}

struct State {
    settings: StorageSettings,
    local: Arc<LocalDriver>,
}

/// Storage façade shared through `web::Data`.
pub struct Storage {
    state: RwLock<State>,
    s3: Option<Arc<S3Driver>>,
    url_ttl: Duration,
}

impl Storage {
    pub fn new(settings: StorageSettings, s3: Option<S3Driver>, url_ttl: Duration) -> Self {
        let local = Arc::new(LocalDriver::new(
            settings.local_storage_path.clone(),
            settings.local_base_url.clone(),
        ));
        Self {
            state: RwLock::new(State { settings, local }),
            s3: s3.map(Arc::new),
            url_ttl,
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> StorageSettings {
        self.read_state().settings.clone()
    }

    pub fn key_prefix(&self) -> String {
        self.read_state().settings.key_prefix.clone()
    }

    pub fn has_s3(&self) -> bool {
        self.s3.is_some()
    }

    /// Driver new blobs are written with.
    pub fn driver(&self) -> AppResult<Arc<dyn BlobDriver>> {
        let name = self.read_state().settings.driver.clone();
        self.driver_for(&name)
    }

    /// Driver a stored blob was written with.
    pub fn driver_for(&self, name: &str) -> AppResult<Arc<dyn BlobDriver>> {
        match normalize_driver(name) {
            "s3" => match &self.s3 {
                Some(s3) => Ok(s3.clone() as Arc<dyn BlobDriver>),
                None => Err(AppError::Storage(
                    "S3 storage is not configured".to_string(),
                )),
            },
            _ => Ok(self.read_state().local.clone() as Arc<dyn BlobDriver>),
        }
    }

    /// Swap in new settings. Selecting `s3` requires a configured S3 driver.
    pub fn apply(&self, settings: StorageSettings) -> AppResult<()> {
        let mut settings = settings;
        settings.driver = normalize_driver(&settings.driver).to_string();
        if settings.driver == "s3" && self.s3.is_none() {
            return Err(AppError::InvalidInput(
                "S3 storage is not fully configured".to_string(),
            ));
        }

        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.settings.local_storage_path != settings.local_storage_path
            || state.settings.local_base_url != settings.local_base_url
        {
            state.local = Arc::new(LocalDriver::new(
                settings.local_storage_path.clone(),
                settings.local_base_url.clone(),
            ));
        }
        info!(
            "Storage settings applied: driver={}, key_prefix={}",
            settings.driver, settings.key_prefix
        );
        state.settings = settings;
        Ok(())
    }

    /// Public URL of a stored blob, empty when it cannot be resolved.
    pub fn public_url(&self, storage: &str, key: &str) -> String {
        match self.driver_for(storage) {
            Ok(driver) => driver.build_url(key),
            Err(_) => String::new(),
        }
    }

    /// Download URL of a stored blob: presigned for remote drivers.
    pub async fn download_url(&self, storage: &str, key: &str) -> AppResult<String> {
        let driver = self.driver_for(storage)?;
        driver.presigned_download_url(key, self.url_ttl).await
    }

    /// Delete a blob, logging instead of failing.
    pub async fn delete_quietly(&self, blob: &BlobRef) {
        if blob.key.trim().is_empty() {
            return;
        }
        let result = match self.driver_for(&blob.storage) {
            Ok(driver) => driver.delete(&blob.key).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!("Failed to delete blob {} ({}): {}", blob.key, blob.storage, e);
        }
    }
}

/// Split a client file name into its stem and lowercased extension (with dot).
pub fn split_file_name(file_name: &str) -> (String, String) {
    // Browsers on Windows may send full paths.
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    let path = Path::new(base);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    (stem, ext)
}

/// Make a string safe for use inside an object key.
pub fn sanitize_segment(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let replaced = UNSAFE_KEY_CHARS.replace_all(&lowered, "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        let bytes: [u8; 4] = rand::random();
        hex::encode(bytes)
    } else {
        trimmed.to_string()
    }
}

/// `{prefix}/{order_id}/{timestamp}_{stem}{ext}`
pub fn attachment_key(prefix: &str, order_id: uuid::Uuid, file_name: &str, now: DateTime<Utc>) -> String {
    let (stem, ext) = split_file_name(file_name);
    format!(
        "{}/{}/{}_{}{}",
        prefix.trim_matches('/'),
        order_id,
        now.format(KEY_TIMESTAMP_FORMAT),
        sanitize_segment(&stem),
        ext
    )
}

/// `materials/{code}/{timestamp}_{stem}{ext}`
pub fn material_key(code: &str, file_name: &str, now: DateTime<Utc>) -> String {
    let (stem, ext) = split_file_name(file_name);
    format!(
        "materials/{}/{}_{}{}",
        sanitize_segment(code),
        now.format(KEY_TIMESTAMP_FORMAT),
        sanitize_segment(&stem),
        ext
    )
}

/// Get the content type for a file based on its extension (with or without dot).
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_lowercase().as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn settings(root: &Path) -> StorageSettings {
        StorageSettings {
            driver: "local".to_string(),
            local_storage_path: root.to_path_buf(),
            local_base_url: "/uploads".to_string(),
            key_prefix: "orders".to_string(),
        }
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(
            split_file_name("ITEM123.JPG"),
            ("ITEM123".to_string(), ".jpg".to_string())
        );
        assert_eq!(
            split_file_name(r"C:\fakepath\SH1001.pdf"),
            ("SH1001".to_string(), ".pdf".to_string())
        );
        assert_eq!(split_file_name("noext"), ("noext".to_string(), String::new()));
        assert_eq!(
            split_file_name("a.tar.gz"),
            ("a.tar".to_string(), ".gz".to_string())
        );
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("ITEM 123"), "item_123");
        assert_eq!(sanitize_segment("__a--b..c__"), "a--b..c");
        let random = sanitize_segment("素材图");
        assert_eq!(random.len(), 8);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_object_keys() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 8, 9, 10).unwrap();
        let order_id = uuid::Uuid::nil();
        assert_eq!(
            attachment_key("orders", order_id, "SH1001.PDF", now),
            format!("orders/{}/20250301T080910_sh1001.pdf", order_id)
        );
        assert_eq!(
            material_key("ITEM-123", "Item 123.png", now),
            "materials/item-123/20250301T080910_item_123.png"
        );
    }

    #[test]
    fn test_driver_resolution_and_apply() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(settings(dir.path()), None, Duration::from_secs(60));

        assert_eq!(storage.driver().unwrap().name(), "local");
        assert_eq!(storage.driver_for("unknown").unwrap().name(), "local");
        assert!(storage.driver_for("cos").is_err());

        let mut s3 = settings(dir.path());
        s3.driver = "s3".to_string();
        assert!(matches!(storage.apply(s3), Err(AppError::InvalidInput(_))));

        let mut moved = settings(dir.path());
        moved.local_storage_path = PathBuf::from("/srv/blobs");
        moved.key_prefix = "attachments".to_string();
        storage.apply(moved).unwrap();
        assert_eq!(storage.key_prefix(), "attachments");
        assert_eq!(
            storage.settings().local_storage_path,
            PathBuf::from("/srv/blobs")
        );
    }

    #[tokio::test]
    async fn test_delete_quietly_ignores_failures() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(settings(dir.path()), None, Duration::from_secs(60));
        storage
            .delete_quietly(&BlobRef {
                storage: "s3".to_string(),
                key: "orders/x.pdf".to_string(),
            })
            .await;
        storage
            .delete_quietly(&BlobRef {
                storage: "local".to_string(),
                key: "../outside".to_string(),
            })
            .await;
    }

    #[tokio::test]
    async fn test_public_and_download_urls_for_local() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(settings(dir.path()), None, Duration::from_secs(60));
        assert_eq!(storage.public_url("local", "a/b.pdf"), "/uploads/a/b.pdf");
        assert_eq!(storage.public_url("s3", "a/b.pdf"), "");
        assert_eq!(
            storage.download_url("local", "a/b.pdf").await.unwrap(),
            "/uploads/a/b.pdf"
        );
    }
}
