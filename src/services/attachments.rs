//! Order attachments: uploads, material links, batch matching and removal.

use chrono::Utc;
use sea_orm::TransactionTrait;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db::DbPool;
use crate::db::attachments::{AttachmentFile, link_material, owned_blob, replace_or_create};
use crate::entity::{order_attachment, order_info};
use crate::error::{AppError, AppResult};
use crate::models::{
    AttachmentResponse, BatchFailure, BatchUploadResponse, DownloadResponse, FileType,
    LinkMaterialRequest,
};
use crate::services::UploadedFile;
use crate::services::materials::{is_image, load_material, sync_from_order_upload};
use crate::services::orders::load_order;
use crate::services::storage::{
    BlobRef, Storage, attachment_key, content_type_for_extension, split_file_name,
};

fn matches_expected(file_name: &str, expected: &str, case_insensitive: bool) -> bool {
    let (stem, _) = split_file_name(file_name);
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name).trim();
    if case_insensitive {
        stem.eq_ignore_ascii_case(expected) || base.eq_ignore_ascii_case(expected)
    } else {
        stem == expected || base == expected
    }
}

/// Check that a file may play `file_type` on `order`.
///
/// Material images are named after the item number, shipping labels are PDFs
/// named after the order number.
pub fn check_file_contract(
    order: &order_info::Model,
    file_type: FileType,
    file_name: &str,
    case_insensitive: bool,
) -> AppResult<()> {
    match file_type {
        FileType::MaterialImage => {
            let expected = order.item_no.trim();
            if expected.is_empty() {
                return Err(AppError::InvalidInput(
                    "订单未配置货号，无法上传素材图".to_string(),
                ));
            }
            if !matches_expected(file_name, expected, case_insensitive) {
                return Err(AppError::InvalidInput(format!(
                    "素材图文件名需与订单货号完全一致（{}）",
                    expected
                )));
            }
        }
        FileType::ShippingLabel => {
            let expected = order.gsp_order_no.trim();
            if expected.is_empty() {
                return Err(AppError::InvalidInput(
                    "订单未配置订单号，无法上传面单".to_string(),
                ));
            }
            if split_file_name(file_name).1 != ".pdf" {
                return Err(AppError::InvalidInput("面单文件必须为PDF格式".to_string()));
            }
            if !matches_expected(file_name, expected, case_insensitive) {
                return Err(AppError::InvalidInput(format!(
                    "面单文件名需与订单号完全一致（{}）",
                    expected
                )));
            }
        }
    }
    Ok(())
}

fn parse_file_type(raw: Option<&str>, default: Option<FileType>) -> AppResult<FileType> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => FileType::parse(value)
            .ok_or_else(|| AppError::InvalidInput("不支持的附件类型".to_string())),
        None => default.ok_or_else(|| AppError::InvalidInput("附件类型不能为空".to_string())),
    }
}

fn to_response(storage: &Storage, model: order_attachment::Model) -> AttachmentResponse {
    let url = storage.public_url(&model.storage, &model.file_path);
    AttachmentResponse::from_model(model, url)
}

/// `POST /orders/{id}/attachments`
pub async fn upload_attachment(
    db: &DbPool,
    storage: &Storage,
    order_id: Uuid,
    file_type: Option<&str>,
    file: UploadedFile,
    user: &CurrentUser,
) -> AppResult<AttachmentResponse> {
    let file_type = parse_file_type(file_type, None)?;
    let order = load_order(db, order_id, user).await?;
    attach_upload(db, storage, &order, file_type, file, &user.id).await
}

/// Store an uploaded file as the order's attachment in `file_type`.
async fn attach_upload(
    db: &DbPool,
    storage: &Storage,
    order: &order_info::Model,
    file_type: FileType,
    file: UploadedFile,
    user_id: &str,
) -> AppResult<AttachmentResponse> {
    if file.data.is_empty() {
        return Err(AppError::InvalidInput("文件不能为空".to_string()));
    }
    check_file_contract(order, file_type, &file.file_name, false)?;
    if file_type == FileType::MaterialImage && !is_image(&file) {
        return Err(AppError::InvalidInput(
            "素材图仅支持上传图片文件".to_string(),
        ));
    }

    // `UploadedFile` holds the whole body already, so hash it in one go.
    let checksum = hex::encode(Sha256::digest(&file.data));
    let ext = file.extension();
    let content_type = file
        .content_type
        .clone()
        .unwrap_or_else(|| content_type_for_extension(&ext).to_string());

    let driver = storage.driver()?;
    let key = attachment_key(&storage.key_prefix(), order.id, &file.file_name, Utc::now());
    driver
        .upload(&key, file.data.clone(), Some(&content_type))
        .await?;
    let uploaded = BlobRef {
        storage: driver.name().to_string(),
        key: key.clone(),
    };

    let material_id = if file_type == FileType::MaterialImage {
        match sync_from_order_upload(db.connection(), storage, order, &file, user_id).await {
            Ok(material) => Some(material.id),
            Err(e) => {
                warn!("Failed to sync material for order {}: {}", order.id, e);
                None
            }
        }
    } else {
        None
    };

    let record = AttachmentFile {
        file_type,
        file_name: file.file_name.clone(),
        file_path: key,
        file_ext: ext,
        file_size: file.data.len() as i64,
        checksum,
        storage: uploaded.storage.clone(),
        uploader_id: user_id.to_string(),
        material_id,
        owns_blob: true,
    };

    let (model, released) = match save_attachment(db, order.id, &record).await {
        Ok(saved) => saved,
        Err(e) => {
            error!("Failed to save attachment for order {}: {}", order.id, e);
            storage.delete_quietly(&uploaded).await;
            return Err(e);
        }
    };

    if let Some(blob) = released {
        storage.delete_quietly(&blob).await;
    }

    info!(
        "Attachment {} ({}) stored for order {} by {}",
        model.file_name, model.file_type, order.id, user_id
    );
    Ok(to_response(storage, model))
}

async fn save_attachment(
    db: &DbPool,
    order_id: Uuid,
    record: &AttachmentFile,
) -> AppResult<(order_attachment::Model, Option<BlobRef>)> {
    let txn = db
        .connection()
        .begin()
        .await
        .map_err(|e| AppError::Database(format!("Failed to start transaction: {}", e)))?;
    let saved = replace_or_create(&txn, order_id, record).await?;
    txn.commit()
        .await
        .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;
    Ok(saved)
}

/// `POST /orders/{id}/attachments/link`
pub async fn link_attachment(
    db: &DbPool,
    storage: &Storage,
    order_id: Uuid,
    req: &LinkMaterialRequest,
    user: &CurrentUser,
) -> AppResult<AttachmentResponse> {
    let file_type = parse_file_type(req.file_type.as_deref(), Some(FileType::MaterialImage))?;
    let order = load_order(db, order_id, user).await?;
    let material = load_material(db, req.material_id, user).await?;

    check_file_contract(&order, file_type, &material.file_name, true)?;

    let txn = db
        .connection()
        .begin()
        .await
        .map_err(|e| AppError::Database(format!("Failed to start transaction: {}", e)))?;
    let (model, released) = link_material(&txn, order.id, &material, file_type, &user.id).await?;
    txn.commit()
        .await
        .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;

    if let Some(blob) = released {
        storage.delete_quietly(&blob).await;
    }

    info!(
        "Material {} linked to order {} as {} by {}",
        material.code, order.id, file_type, user.id
    );
    Ok(to_response(storage, model))
}

/// Role and order a batch file belongs to, judged by its name.
async fn match_batch_file(
    db: &DbPool,
    file: &UploadedFile,
    user: &CurrentUser,
) -> AppResult<(FileType, order_info::Model)> {
    let stem = file.stem();
    let stem = stem.trim();
    if stem.is_empty() {
        return Err(AppError::InvalidInput("文件名不能为空".to_string()));
    }

    let (file_type, column, missing) = if file.extension() == ".pdf" {
        (
            FileType::ShippingLabel,
            order_info::Column::GspOrderNo,
            "未找到订单号匹配的订单",
        )
    } else {
        (
            FileType::MaterialImage,
            order_info::Column::ItemNo,
            "未找到货号匹配的订单",
        )
    };

    let order = db
        .latest_order_matching(column, stem, user.scope())
        .await?
        .ok_or_else(|| AppError::InvalidInput(format!("{}（{}）", missing, stem)))?;
    Ok((file_type, order))
}

/// `POST /orders/batch-attachments`
///
/// Every file goes through the single-upload path; failures are collected
/// instead of aborting the batch.
pub async fn batch_upload(
    db: &DbPool,
    storage: &Storage,
    files: Vec<UploadedFile>,
    user: &CurrentUser,
) -> AppResult<BatchUploadResponse> {
    if files.is_empty() {
        return Err(AppError::InvalidInput("未选择上传文件".to_string()));
    }

    let mut success = Vec::new();
    let mut failed = Vec::new();

    for file in files {
        let file_name = file.file_name.clone();
        let result = match match_batch_file(db, &file, user).await {
            Ok((file_type, order)) => {
                attach_upload(db, storage, &order, file_type, file, &user.id).await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(attachment) => success.push(attachment),
            Err(e) => {
                warn!("Batch upload of {} failed: {}", file_name, e);
                failed.push(BatchFailure {
                    file_name,
                    reason: e.reason(),
                });
            }
        }
    }

    info!(
        "Batch upload by {}: {} succeeded, {} failed",
        user.id,
        success.len(),
        failed.len()
    );
    Ok(BatchUploadResponse {
        message: format!("成功上传{}个，失败{}个", success.len(), failed.len()),
        success,
        failed,
    })
}

pub async fn list_attachments(
    db: &DbPool,
    storage: &Storage,
    order_id: Uuid,
    user: &CurrentUser,
) -> AppResult<Vec<AttachmentResponse>> {
    let order = load_order(db, order_id, user).await?;
    let rows = db.list_attachments(order.id).await?;
    Ok(rows.into_iter().map(|m| to_response(storage, m)).collect())
}

async fn load_attachment(
    db: &DbPool,
    order_id: Uuid,
    attachment_id: Uuid,
    user: &CurrentUser,
) -> AppResult<order_attachment::Model> {
    let order = load_order(db, order_id, user).await?;
    db.get_attachment(order.id, attachment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attachment".to_string()))
}

pub async fn download_attachment(
    db: &DbPool,
    storage: &Storage,
    order_id: Uuid,
    attachment_id: Uuid,
    user: &CurrentUser,
) -> AppResult<DownloadResponse> {
    let attachment = load_attachment(db, order_id, attachment_id, user).await?;
    let url = storage
        .download_url(&attachment.storage, &attachment.file_path)
        .await?;
    Ok(DownloadResponse {
        url,
        file_name: attachment.file_name,
    })
}

/// Remove an attachment. The blob goes too unless it belongs to a material.
pub async fn delete_attachment(
    db: &DbPool,
    storage: &Storage,
    order_id: Uuid,
    attachment_id: Uuid,
    user: &CurrentUser,
) -> AppResult<()> {
    let attachment = load_attachment(db, order_id, attachment_id, user).await?;

    db.delete_attachment(attachment.id).await?;
    if let Some(blob) = owned_blob(&attachment) {
        storage.delete_quietly(&blob).await;
    }

    info!(
        "Attachment {} of order {} deleted by {}",
        attachment.id, order_id, user.id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn order(item_no: &str, order_no: &str) -> order_info::Model {
        let now = Utc::now();
        order_info::Model {
            id: Uuid::now_v7(),
            gsp_order_no: order_no.to_string(),
            order_type: "platform".to_string(),
            order_created_at: now,
            status: 0,
            payment_time: None,
            completed_at: None,
            shipping_warehouse_code: String::new(),
            required_sign_at: None,
            shop_code: String::new(),
            product_id: String::new(),
            owner_name: String::new(),
            product_name: String::new(),
            spec: String::new(),
            item_no: item_no.to_string(),
            seller_sku: String::new(),
            platform_sku: String::new(),
            platform_skc: String::new(),
            platform_spu: String::new(),
            product_price: 0.0,
            expected_revenue: 0.0,
            special_product_note: None,
            currency_code: String::new(),
            expected_fulfillment_qty: 1,
            item_count: 1,
            postal_code: String::new(),
            country: String::new(),
            province: String::new(),
            city: String::new(),
            district: String::new(),
            address_line1: String::new(),
            address_line2: String::new(),
            customer_full_name: String::new(),
            customer_last_name: String::new(),
            customer_first_name: String::new(),
            phone_number: String::new(),
            email: String::new(),
            tax_number: String::new(),
            created_by: "1".to_string(),
            updated_by: "1".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_material_image_contract() {
        let o = order("ITEM123", "SH1001");
        assert!(check_file_contract(&o, FileType::MaterialImage, "ITEM123.png", false).is_ok());
        assert!(check_file_contract(&o, FileType::MaterialImage, "ITEM123", false).is_ok());

        let err = check_file_contract(&o, FileType::MaterialImage, "item123.png", false).unwrap_err();
        assert_eq!(err.reason(), "素材图文件名需与订单货号完全一致（ITEM123）");
        assert!(check_file_contract(&o, FileType::MaterialImage, "item123.png", true).is_ok());
    }

    #[test]
    fn test_shipping_label_contract() {
        let o = order("ITEM123", "SH1001");
        assert!(check_file_contract(&o, FileType::ShippingLabel, "SH1001.pdf", false).is_ok());
        assert!(check_file_contract(&o, FileType::ShippingLabel, "SH1001.PDF", false).is_ok());

        let err = check_file_contract(&o, FileType::ShippingLabel, "SH1001.png", false).unwrap_err();
        assert_eq!(err.reason(), "面单文件必须为PDF格式");

        let err = check_file_contract(&o, FileType::ShippingLabel, "SH1002.pdf", false).unwrap_err();
        assert_eq!(err.reason(), "面单文件名需与订单号完全一致（SH1001）");
    }

    #[test]
    fn test_contract_requires_order_identifiers() {
        let o = order("", "");
        assert!(check_file_contract(&o, FileType::MaterialImage, ".png", false).is_err());
        assert!(check_file_contract(&o, FileType::ShippingLabel, ".pdf", false).is_err());
    }

    #[test]
    fn test_parse_file_type() {
        assert_eq!(
            parse_file_type(None, Some(FileType::MaterialImage)).unwrap(),
            FileType::MaterialImage
        );
        assert_eq!(
            parse_file_type(Some(" shipping_label "), None).unwrap(),
            FileType::ShippingLabel
        );
        assert_eq!(
            parse_file_type(Some("invoice"), None).unwrap_err().reason(),
            "不支持的附件类型"
        );
        assert!(parse_file_type(None, None).is_err());
    }
}
