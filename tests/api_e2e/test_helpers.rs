//! Shared helpers for the API end-to-end tests.

use std::path::PathBuf;
use std::time::Duration;

use actix_web::{App, dev::ServiceResponse, test, web};
use orderhub_lib::api::UploadLimit;
use orderhub_lib::auth::AdminKey;
use orderhub_lib::config::{ImportSettings, StorageSettings};
use orderhub_lib::db::DbPool;
use orderhub_lib::services::storage::Storage;
use rust_xlsxwriter::Workbook;
use sea_orm::{ConnectOptions, Database};
use serde_json::Value;
use tempfile::TempDir;

/// Admin key used in tests.
pub const TEST_ADMIN_KEY: &str = "test-admin-key-for-api-e2e";

/// Regular user sending requests.
pub const TEST_USER: &str = "u-1001";

const BOUNDARY: &str = "----orderhub-e2e-boundary";

pub const PLATFORM_HEADER: [&str; 24] = [
    "GSP订单号",
    "订单创建时间",
    "发货仓库",
    "店铺编号",
    "负责人",
    "商品名称",
    "规格",
    "货号",
    "卖家SKU",
    "平台SKU",
    "平台SKC",
    "平台SPU",
    "商品价格",
    "特殊产品备注",
    "预计履约件数",
    "邮编",
    "国家",
    "省份",
    "城市",
    "用户全称",
    "用户姓氏",
    "用户名字",
    "手机号",
    "用户邮箱",
];

/// One valid platform row; `qty` feeds the expected revenue.
pub fn platform_row<'a>(order_no: &'a str, item_no: &'a str, qty: &'a str) -> Vec<&'a str> {
    vec![
        order_no,
        "2025-02-01 10:00:00",
        "WH01",
        "SHOP1",
        "张三",
        "T恤",
        "30*40",
        item_no,
        "SKU-1",
        "PSKU",
        "PSKC",
        "PSPU",
        "10",
        "",
        qty,
        "100000",
        "中国",
        "广东",
        "深圳",
        "",
        "李",
        "四",
        "13800000000",
        "a@b.com",
    ]
}

/// Everything one test needs; the temp dir lives as long as the app.
pub struct TestEnv {
    pub pool: DbPool,
    pub storage: web::Data<Storage>,
    pub upload_dir: TempDir,
}

impl TestEnv {
    /// Path of a stored blob on the local driver.
    pub fn blob_path(&self, key: &str) -> PathBuf {
        self.upload_dir.path().join(key)
    }
}

/// Fresh in-memory database plus a local storage rooted in a temp dir.
pub async fn create_test_env() -> TestEnv {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let conn = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    let pool = DbPool::from_connection(conn);
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");

    let upload_dir = TempDir::new().expect("Failed to create temp dir");
    let settings = StorageSettings {
        driver: "local".to_string(),
        local_storage_path: upload_dir.path().to_path_buf(),
        local_base_url: "/uploads".to_string(),
        key_prefix: "orders".to_string(),
    };
    let storage = web::Data::new(Storage::new(settings, None, Duration::from_secs(3600)));

    TestEnv {
        pool,
        storage,
        upload_dir,
    }
}

/// Create the app under test.
pub async fn create_test_app(
    env: &TestEnv,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    let import_settings = ImportSettings {
        default_address: "默认地址".to_string(),
        warehouse_codes: None,
    };

    test::init_service(
        App::new()
            .app_data(web::Data::new(env.pool.clone()))
            .app_data(env.storage.clone())
            .app_data(web::Data::new(AdminKey::new(Some(TEST_ADMIN_KEY.to_string()))))
            .app_data(web::Data::new(import_settings))
            .app_data(web::Data::new(UploadLimit(10 * 1024 * 1024)))
            .service(web::scope("/api/v1").configure(orderhub_lib::api::configure_routes)),
    )
    .await
}

/// Part of a multipart body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// Encode parts as `multipart/form-data`; returns (content type, body).
pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Build an xlsx workbook from named sheets of string rows.
pub fn workbook_bytes(sheets: &[(&str, Vec<Vec<&str>>)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*name).expect("valid sheet name");
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                sheet
                    .write_string(r as u32, c as u16, *value)
                    .expect("write cell");
            }
        }
    }
    workbook.save_to_buffer().expect("save workbook")
}

/// PNG header with the given size; enough for dimension sniffing.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    data.extend_from_slice(&[0, 0, 0, 0]);
    data
}

async fn finish<S>(app: &S, req: actix_http::Request) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let bytes = test::read_body(resp).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

/// Send a JSON (or body-less) request as the test user.
pub async fn send_json<S>(
    app: &S,
    method: actix_web::http::Method,
    uri: &str,
    body: Option<Value>,
) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut req = test::TestRequest::default()
        .method(method)
        .uri(uri)
        .insert_header(("X-User-Id", TEST_USER));
    if let Some(body) = body {
        req = req.set_json(body);
    }
    finish(app, req.to_request()).await
}

/// Send a multipart request as the test user.
pub async fn send_multipart<S>(app: &S, uri: &str, parts: &[Part<'_>]) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let (content_type, body) = multipart_body(parts);
    let req = test::TestRequest::post()
        .uri(uri)
        .insert_header(("X-User-Id", TEST_USER))
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    finish(app, req).await
}

/// Create a platform order through the API and return its id.
pub async fn create_platform_order<S>(app: &S, order_no: &str, item_no: &str) -> String
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let (status, body) = send_json(
        app,
        actix_web::http::Method::POST,
        "/api/v1/orders",
        Some(serde_json::json!({
            "order_type": "platform",
            "gsp_order_no": order_no,
            "order_created_at": "2025-02-01 10:00:00",
            "status": 0,
            "shipping_warehouse_code": "WH01",
            "shop_code": "SHOP1",
            "owner_name": "张三",
            "product_name": "T恤",
            "spec": "30*40",
            "item_no": item_no,
            "seller_sku": "SKU-1",
            "product_price": 10.0,
            "expected_fulfillment_qty": 2,
        })),
    )
    .await;
    assert_eq!(status, 201, "Failed to create order: {}", body);
    body["id"].as_str().expect("order id").to_string()
}
