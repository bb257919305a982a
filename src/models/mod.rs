//! Domain models and DTOs for the order service.

use utoipa::ToSchema;

pub mod attachment;
pub mod material;
pub mod order;
pub mod storage;

// Re-export commonly used types
pub use attachment::{
    AttachmentResponse, BatchFailure, BatchUploadResponse, DownloadResponse, FileType,
    LinkMaterialRequest,
};
pub use material::{
    CreateFolderRequest, CreateMaterialRequest, FolderResponse, ListFoldersQuery,
    ListMaterialsQuery, MaterialListResponse, MaterialResponse, UpdateFolderRequest,
    UpdateMaterialRequest,
};
pub use order::{
    ImportResponse, ListOrdersQuery, OrderListResponse, OrderPayload, OrderResponse, OrderType,
    STATUS_COMPLETED,
};
pub use storage::{StorageSettingsResponse, UpdateStorageSettingsRequest};

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 200;

/// Resolved page/page_size pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    /// Page defaults to 1, page size to 10 and is capped at 200.
    pub fn new(page: Option<u64>, page_size: Option<u64>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let page_size = page_size
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    /// Zero-based page index for SeaORM paginators.
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}

/// Pagination metadata for responses.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    /// Create pagination metadata.
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if total == 0 || limit == 0 {
            0
        } else {
            total.div_ceil(limit)
        };

        Pagination {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_cap() {
        assert_eq!(
            PageRequest::new(None, None),
            PageRequest {
                page: 1,
                page_size: 10
            }
        );
        assert_eq!(PageRequest::new(Some(0), Some(0)).page, 1);
        assert_eq!(PageRequest::new(Some(3), Some(1000)).page_size, 200);
        assert_eq!(PageRequest::new(Some(3), Some(20)).index(), 2);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).total_pages, 2);
    }
}
