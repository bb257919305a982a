//! Runtime storage settings and readiness.

use actix_web::http::Method;
use actix_web::test;
use serde_json::json;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_update_requires_admin() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;

    let (status, body) = send_json(
        &app,
        Method::PUT,
        "/api/v1/storage/settings",
        Some(json!({ "key_prefix": "archive" })),
    )
    .await;
    assert_eq!(status, 403, "{}", body);
    assert_eq!(body["error"], "FORBIDDEN");

    let (status, current) = send_json(&app, Method::GET, "/api/v1/storage/settings", None).await;
    assert_eq!(status, 200);
    assert_eq!(current["key_prefix"], "orders");
}

#[actix_rt::test]
async fn test_admin_update_applies_and_persists() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;

    let req = test::TestRequest::put()
        .uri("/api/v1/storage/settings")
        .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
        .set_json(json!({ "key_prefix": "/archive/", "storage_driver": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["storage_driver"], "local");
    assert_eq!(body["key_prefix"], "archive");

    let stored = env.pool.load_storage_settings().await.unwrap();
    assert_eq!(stored.get("key_prefix").map(String::as_str), Some("archive"));

    // S3 cannot be selected without credentials.
    let req = test::TestRequest::put()
        .uri("/api/v1/storage/settings")
        .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
        .set_json(json!({ "storage_driver": "s3" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(env.storage.settings().driver, "local");
}

#[actix_rt::test]
async fn test_ready_reports_driver() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;

    let req = test::TestRequest::get().uri("/api/v1/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["storage_driver"], "local");
}
