//! Filesystem blob driver.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::BlobDriver;
use crate::error::{AppError, AppResult};

/// Stores blobs below a root directory; public URLs are `base_url/key`.
#[derive(Debug, Clone)]
pub struct LocalDriver {
    root: PathBuf,
    base_url: String,
}

impl LocalDriver {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path inside the root. Absolute keys and `..` are rejected.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let inside_root = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !inside_root {
            return Err(AppError::Storage(format!(
                "Object key '{}' escapes the storage root",
                key
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobDriver for LocalDriver {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: Option<&str>) -> AppResult<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Storage(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::Storage(format!(
                "Failed to move {} into place: {}",
                path.display(),
                e
            )));
        }

        debug!("Stored {} bytes at {}", data.len(), path.display());
        Ok(self.build_url(key))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn build_url(&self, key: &str) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        if base.is_empty() || key.is_empty() {
            return String::new();
        }
        format!("{}/{}", base, key.trim_start_matches('/'))
    }

    async fn presigned_download_url(&self, key: &str, _ttl: Duration) -> AppResult<String> {
        Ok(self.build_url(key))
    }
}
