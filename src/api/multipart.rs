//! Buffering of multipart form submissions.

use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{HttpRequest, web};
use futures_util::StreamExt;

use crate::config::defaults;
use crate::error::{AppError, AppResult};
use crate::services::UploadedFile;

/// Byte cap for one multipart request, shared through `web::Data`.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

impl UploadLimit {
    pub fn from_request(req: &HttpRequest) -> Self {
        req.app_data::<web::Data<UploadLimit>>()
            .map(|limit| ***limit)
            .unwrap_or(UploadLimit(defaults::DEV_MAX_UPLOAD_SIZE))
    }
}

/// A fully read multipart form: file parts by field name plus text fields.
#[derive(Debug, Default)]
pub struct MultipartForm {
    files: Vec<(String, UploadedFile)>,
    fields: HashMap<String, String>,
}

impl MultipartForm {
    /// Read every part of the payload into memory.
    pub async fn read(mut payload: Multipart, limit: UploadLimit) -> AppResult<Self> {
        let mut form = MultipartForm::default();
        let mut total = 0usize;

        while let Some(item) = payload.next().await {
            let mut field =
                item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

            let name = field.name().unwrap_or_default().to_string();
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            let content_type = field.content_type().map(|m| m.essence_str().to_string());

            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk =
                    chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
                total += chunk.len();
                if total > limit.0 {
                    return Err(AppError::InvalidInput(format!(
                        "Upload exceeds maximum size of {} bytes",
                        limit.0
                    )));
                }
                data.extend_from_slice(&chunk);
            }

            match file_name {
                Some(file_name) => form.files.push((
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        data,
                    },
                )),
                None => {
                    let value = String::from_utf8_lossy(&data).trim().to_string();
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Non-empty text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Remove and return the first file sent under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let pos = self.files.iter().position(|(field, _)| field == name)?;
        Some(self.files.remove(pos).1)
    }

    /// Remove and return every file sent under `name` (with or without `[]`).
    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let array_name = format!("{}[]", name);
        let (taken, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition::<Vec<_>, _>(|(field, _)| field == name || *field == array_name);
        self.files = rest;
        taken.into_iter().map(|(_, file)| file).collect()
    }
}
