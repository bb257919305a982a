//! Business logic services.

pub mod attachments;
pub mod export;
pub mod folders;
pub mod import;
pub mod materials;
pub mod orders;
pub mod storage;

/// A file received in a multipart request, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    /// Declared content type, if the client sent one
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Lowercased extension with the leading dot, empty when there is none.
    pub fn extension(&self) -> String {
        storage::split_file_name(&self.file_name).1
    }

    /// File name without directories and extension.
    pub fn stem(&self) -> String {
        storage::split_file_name(&self.file_name).0
    }
}
