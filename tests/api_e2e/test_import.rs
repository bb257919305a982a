//! Spreadsheet import and export through the HTTP surface.

use actix_web::http::Method;
use actix_web::test;
use sea_orm::ConnectionTrait;
use serde_json::Value;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_reimport_updates_in_place_and_warns() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;

    let book = workbook_bytes(&[(
        "平台面单",
        vec![PLATFORM_HEADER.to_vec(), platform_row("SH1001", "ITEM123", "5")],
    )]);

    let (status, first) = send_multipart(
        &app,
        "/api/v1/orders/import",
        &[Part::File("file", "orders.xlsx", &book)],
    )
    .await;
    assert_eq!(status, 200, "first import failed: {}", first);
    assert_eq!(first["created"], 1);
    assert_eq!(first["updated"], 0);
    assert_eq!(first["warnings"], "");

    let (status, second) = send_multipart(
        &app,
        "/api/v1/orders/import",
        &[Part::File("file", "orders.xlsx", &book)],
    )
    .await;
    assert_eq!(status, 200, "re-import failed: {}", second);
    assert_eq!(second["created"], 0);
    assert_eq!(second["updated"], 1);
    assert!(
        second["warnings"].as_str().unwrap().contains("已有类似记录"),
        "expected a duplicate warning: {}",
        second
    );

    let (status, list) = send_json(&app, Method::GET, "/api/v1/orders?tab=platform", None).await;
    assert_eq!(status, 200);
    assert_eq!(list["pagination"]["total"], 1);
    assert_eq!(list["data"][0]["gsp_order_no"], "SH1001");
    assert_eq!(list["data"][0]["expected_revenue"], 50.0);
    assert_eq!(list["data"][0]["address_line1"], "默认地址");
}

#[actix_rt::test]
async fn test_factory_sheet_missing_email_rejects_whole_file() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;

    let mut factory_header = PLATFORM_HEADER.to_vec();
    factory_header.retain(|h| *h != "用户邮箱");
    let mut factory_row = platform_row("FA2001", "ITEM900", "1");
    factory_row.pop();

    let book = workbook_bytes(&[
        (
            "平台面单",
            vec![PLATFORM_HEADER.to_vec(), platform_row("SH1002", "ITEM123", "2")],
        ),
        ("工厂物流", vec![factory_header, factory_row]),
    ]);

    let (status, body) = send_multipart(
        &app,
        "/api/v1/orders/import",
        &[Part::File("file", "orders.xlsx", &book)],
    )
    .await;
    assert_eq!(status, 400, "expected rejection: {}", body);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("工厂物流"), "{}", message);
    assert!(message.contains("用户邮箱"), "{}", message);

    // Nothing from the valid platform sheet was written either.
    let (_, list) = send_json(&app, Method::GET, "/api/v1/orders?tab=platform", None).await;
    assert_eq!(list["pagination"]["total"], 0);
}

#[actix_rt::test]
async fn test_import_without_file_is_rejected() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;

    let (status, body) =
        send_multipart(&app, "/api/v1/orders/import", &[Part::Text("note", "x")]).await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("请上传Excel文件"));
}

#[actix_rt::test]
async fn test_export_returns_workbook_attachment() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;
    create_platform_order(&app, "SH3001", "ITEM301").await;

    let req = test::TestRequest::get()
        .uri("/api/v1/orders/export")
        .insert_header(("X-User-Id", TEST_USER))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let disposition = resp
        .headers()
        .get("Content-Disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("orders_all_"), "{}", disposition);

    let bytes = test::read_body(resp).await;
    // xlsx is a zip archive
    assert_eq!(&bytes[..2], b"PK");
}

#[actix_rt::test]
async fn test_orders_are_scoped_to_their_creator() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;
    let id = create_platform_order(&app, "SH4001", "ITEM401").await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/orders/{}", id))
        .insert_header(("X-User-Id", "someone-else"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/orders/{}", id))
        .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let (status, _) = send_json(&app, Method::DELETE, &format!("/api/v1/orders/{}", id), None).await;
    assert_eq!(status, 204);
    let (status, _) = send_json(&app, Method::GET, &format!("/api/v1/orders/{}", id), None).await;
    assert_eq!(status, 404);
}

async fn upload_material<S>(app: &S, file_name: &str) -> Value
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let png = png_bytes(80, 80);
    let (status, body) = send_multipart(
        app,
        "/api/v1/materials/upload",
        &[Part::File("file", file_name, &png)],
    )
    .await;
    assert_eq!(status, 201, "{}", body);
    body
}

async fn only_order_attachments<S>(app: &S, tab: &str) -> Value
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let (_, list) = send_json(app, Method::GET, &format!("/api/v1/orders?tab={}", tab), None).await;
    assert_eq!(list["pagination"]["total"], 1, "{}", list);
    let id = list["data"][0]["id"].as_str().unwrap();
    let (status, attachments) = send_json(
        app,
        Method::GET,
        &format!("/api/v1/orders/{}/attachments", id),
        None,
    )
    .await;
    assert_eq!(status, 200);
    attachments["data"].clone()
}

#[actix_rt::test]
async fn test_import_links_library_material_by_type_key() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;

    let by_item = upload_material(&app, "ITEM123.png").await;
    let by_order = upload_material(&app, "fa7001.png").await;

    let book = workbook_bytes(&[
        (
            "平台面单",
            vec![PLATFORM_HEADER.to_vec(), platform_row("SH7001", "ITEM123", "1")],
        ),
        (
            "工厂物流",
            vec![PLATFORM_HEADER.to_vec(), platform_row("FA7001", "ITEM-NONE", "1")],
        ),
    ]);
    let (status, body) = send_multipart(
        &app,
        "/api/v1/orders/import",
        &[Part::File("file", "orders.xlsx", &book)],
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["created"], 2);

    // Platform orders match on item number.
    let platform = only_order_attachments(&app, "platform").await;
    assert_eq!(platform.as_array().unwrap().len(), 1);
    assert_eq!(platform[0]["file_type"], "material_image");
    assert_eq!(platform[0]["material_id"], by_item["id"]);
    assert_eq!(platform[0]["owns_blob"], false);
    assert_eq!(platform[0]["file_path"], by_item["file_path"]);

    // Factory orders match on order number, case-insensitively.
    let factory = only_order_attachments(&app, "factory").await;
    assert_eq!(factory.as_array().unwrap().len(), 1);
    assert_eq!(factory[0]["material_id"], by_order["id"]);
    assert_eq!(factory[0]["owns_blob"], false);
}

#[actix_rt::test]
async fn test_failed_auto_link_keeps_the_import() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;
    upload_material(&app, "ITEM123.png").await;

    // Linking needs the attachment table; without it every link fails.
    env.pool
        .connection()
        .execute_unprepared("DROP TABLE order_attachment")
        .await
        .unwrap();

    let book = workbook_bytes(&[(
        "平台面单",
        vec![PLATFORM_HEADER.to_vec(), platform_row("SH7002", "ITEM123", "1")],
    )]);
    let (status, body) = send_multipart(
        &app,
        "/api/v1/orders/import",
        &[Part::File("file", "orders.xlsx", &book)],
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["created"], 1);

    let (_, list) = send_json(&app, Method::GET, "/api/v1/orders?tab=platform", None).await;
    assert_eq!(list["pagination"]["total"], 1);
    assert_eq!(list["data"][0]["gsp_order_no"], "SH7002");
}
