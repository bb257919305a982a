//! Attachment upload, linking and batch matching.

use actix_web::http::Method;
use serde_json::json;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_file_name_must_match_order() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;
    let id = create_platform_order(&app, "SH2001", "ITEM200").await;
    let uri = format!("/api/v1/orders/{}/attachments", id);
    let png = png_bytes(40, 40);

    let (status, body) = send_multipart(
        &app,
        &uri,
        &[
            Part::Text("file_type", "material_image"),
            Part::File("file", "WRONG.png", &png),
        ],
    )
    .await;
    assert_eq!(status, 400);
    assert!(
        body["message"].as_str().unwrap().contains("素材图文件名需与订单货号完全一致（ITEM200）"),
        "{}",
        body
    );

    // Nothing was stored for the rejected file.
    let (_, list) = send_json(&app, Method::GET, &uri, None).await;
    assert!(list["data"].as_array().unwrap().is_empty());
    assert!(!env.blob_path(&format!("orders/{}", id)).exists());
    assert!(!env.blob_path("materials").exists());

    let (status, body) = send_multipart(
        &app,
        &uri,
        &[
            Part::Text("file_type", "shipping_label"),
            Part::File("file", "SH2001.txt", b"label"),
        ],
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("面单文件必须为PDF格式"));

    let (status, body) = send_multipart(
        &app,
        &uri,
        &[
            Part::Text("file_type", "shipping_label"),
            Part::File("file", "SH2001.pdf", b"%PDF-1.4"),
        ],
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["file_type"], "shipping_label");
    assert_eq!(body["file_ext"], ".pdf");
    assert!(env.blob_path(body["file_path"].as_str().unwrap()).exists());
}

#[actix_rt::test]
async fn test_linking_replaces_owned_upload_and_keeps_library_blob() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;
    let id = create_platform_order(&app, "SH2002", "ITEM201").await;
    let png = png_bytes(60, 40);

    let (status, uploaded) = send_multipart(
        &app,
        &format!("/api/v1/orders/{}/attachments", id),
        &[
            Part::Text("file_type", "material_image"),
            Part::File("file", "ITEM201.png", &png),
        ],
    )
    .await;
    assert_eq!(status, 200, "{}", uploaded);
    let owned_path = env.blob_path(uploaded["file_path"].as_str().unwrap());
    assert!(owned_path.exists());

    // The upload was mirrored into the library.
    let material_id = uploaded["material_id"].as_str().unwrap().to_string();
    let (status, material) =
        send_json(&app, Method::GET, &format!("/api/v1/materials/{}", material_id), None).await;
    assert_eq!(status, 200);
    assert_eq!(material["code"], "ITEM201");
    assert_eq!(material["shape"], "横向形");
    let library_path = env.blob_path(material["file_path"].as_str().unwrap());

    let (status, linked) = send_json(
        &app,
        Method::POST,
        &format!("/api/v1/orders/{}/attachments/link", id),
        Some(json!({ "material_id": material_id })),
    )
    .await;
    assert_eq!(status, 200, "{}", linked);
    assert_eq!(linked["file_path"], material["file_path"]);
    assert!(!owned_path.exists(), "replaced upload should be deleted");
    assert!(library_path.exists());

    let (_, list) = send_json(
        &app,
        Method::GET,
        &format!("/api/v1/orders/{}/attachments", id),
        None,
    )
    .await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let (status, _) = send_json(
        &app,
        Method::DELETE,
        &format!(
            "/api/v1/orders/{}/attachments/{}",
            id,
            linked["id"].as_str().unwrap()
        ),
        None,
    )
    .await;
    assert_eq!(status, 204);
    assert!(library_path.exists(), "linked blobs belong to the library");
}

#[actix_rt::test]
async fn test_batch_upload_reports_partial_success() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;
    create_platform_order(&app, "SH2003", "ITEM300").await;
    let png = png_bytes(30, 30);

    let (status, body) = send_multipart(
        &app,
        "/api/v1/orders/batch-attachments",
        &[
            Part::File("files", "ITEM300.png", &png),
            Part::File("files", "NOPE.png", &png),
        ],
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["message"], "成功上传1个，失败1个");
    assert_eq!(body["success"].as_array().unwrap().len(), 1);
    assert_eq!(body["failed"][0]["file_name"], "NOPE.png");
    assert!(
        body["failed"][0]["reason"]
            .as_str()
            .unwrap()
            .contains("未找到货号匹配的订单")
    );

    let (status, body) = send_multipart(
        &app,
        "/api/v1/orders/batch-attachments",
        &[Part::File("files", "SH9999.pdf", b"%PDF-1.4")],
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "成功上传0个，失败1个");
}

async fn upload_image<S>(app: &S, order_id: &str, file_name: &str, width: u32) -> serde_json::Value
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let png = png_bytes(width, 40);
    let (status, body) = send_multipart(
        app,
        &format!("/api/v1/orders/{}/attachments", order_id),
        &[
            Part::Text("file_type", "material_image"),
            Part::File("file", file_name, &png),
        ],
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    body
}

#[actix_rt::test]
async fn test_reupload_replaces_exactly_one_owned_blob() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;
    let id = create_platform_order(&app, "SH2004", "ITEM202").await;

    let first = upload_image(&app, &id, "ITEM202.png", 40).await;
    let first_path = env.blob_path(first["file_path"].as_str().unwrap());
    assert!(first_path.exists());

    // Key timestamps have second resolution.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let second = upload_image(&app, &id, "ITEM202.png", 80).await;
    let second_path = env.blob_path(second["file_path"].as_str().unwrap());

    assert_eq!(second["id"], first["id"], "the row is replaced in place");
    assert_eq!(second["owns_blob"], true);
    assert!(!first_path.exists());
    assert!(second_path.exists());

    let (_, list) = send_json(
        &app,
        Method::GET,
        &format!("/api/v1/orders/{}/attachments", id),
        None,
    )
    .await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_upload_over_link_keeps_library_blob() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;
    let id = create_platform_order(&app, "SH2005", "ITEM203").await;
    let png = png_bytes(50, 50);

    let (status, material) = send_multipart(
        &app,
        "/api/v1/materials/upload",
        &[Part::File("file", "ITEM203.png", &png)],
    )
    .await;
    assert_eq!(status, 201, "{}", material);
    let library_path = env.blob_path(material["file_path"].as_str().unwrap());

    let (status, linked) = send_json(
        &app,
        Method::POST,
        &format!("/api/v1/orders/{}/attachments/link", id),
        Some(json!({ "material_id": material["id"] })),
    )
    .await;
    assert_eq!(status, 200, "{}", linked);
    assert_eq!(linked["owns_blob"], false);

    let uploaded = upload_image(&app, &id, "ITEM203.png", 60).await;
    assert_eq!(uploaded["id"], linked["id"]);
    assert_eq!(uploaded["owns_blob"], true);
    assert!(library_path.exists(), "shared blobs survive a replace");
    assert!(env.blob_path(uploaded["file_path"].as_str().unwrap()).exists());

    let (_, list) = send_json(
        &app,
        Method::GET,
        &format!("/api/v1/orders/{}/attachments", id),
        None,
    )
    .await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_delete_removes_row_even_when_blob_cleanup_fails() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;
    let id = create_platform_order(&app, "SH2005", "ITEM205").await;

    let uploaded = upload_image(&app, &id, "ITEM205.png", 40).await;
    let blob_path = env.blob_path(uploaded["file_path"].as_str().unwrap());
    // A non-empty directory where the file was makes the blob delete fail.
    std::fs::remove_file(&blob_path).unwrap();
    std::fs::create_dir_all(blob_path.join("stuck")).unwrap();

    let (status, body) = send_json(
        &app,
        Method::DELETE,
        &format!(
            "/api/v1/orders/{}/attachments/{}",
            id,
            uploaded["id"].as_str().unwrap()
        ),
        None,
    )
    .await;
    assert_eq!(status, 204, "{}", body);

    let (_, list) = send_json(
        &app,
        Method::GET,
        &format!("/api/v1/orders/{}/attachments", id),
        None,
    )
    .await;
    assert_eq!(list["data"].as_array().unwrap().len(), 0);
    assert!(blob_path.exists());
}
