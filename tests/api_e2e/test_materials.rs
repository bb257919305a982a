//! Material library and folder tree.

use actix_web::http::Method;
use serde_json::{Value, json};

use super::test_helpers::*;

fn find_folder<'a>(folders: &'a Value, name: &str) -> &'a Value {
    folders
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == name)
        .unwrap_or_else(|| panic!("folder {} not listed in {}", name, folders))
}

#[actix_rt::test]
async fn test_referenced_material_cannot_be_deleted() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;
    let order_id = create_platform_order(&app, "SH5001", "ITEM500").await;
    let png = png_bytes(100, 300);

    let (status, material) = send_multipart(
        &app,
        "/api/v1/materials/upload",
        &[Part::File("file", "ITEM500.png", &png)],
    )
    .await;
    assert_eq!(status, 201, "{}", material);
    assert_eq!(material["dimensions"], "100 x 300");
    assert_eq!(material["shape"], "超竖形");
    assert_eq!(material["format"], "png");
    let material_id = material["id"].as_str().unwrap().to_string();
    let blob = env.blob_path(material["file_path"].as_str().unwrap());
    assert!(blob.exists());

    let (status, linked) = send_json(
        &app,
        Method::POST,
        &format!("/api/v1/orders/{}/attachments/link", order_id),
        Some(json!({ "material_id": material_id })),
    )
    .await;
    assert_eq!(status, 200, "{}", linked);

    let (status, got) =
        send_json(&app, Method::GET, &format!("/api/v1/materials/{}", material_id), None).await;
    assert_eq!(status, 200);
    assert_eq!(got["order_count"], 1);

    let (status, body) = send_json(
        &app,
        Method::DELETE,
        &format!("/api/v1/materials/{}", material_id),
        None,
    )
    .await;
    assert_eq!(status, 409, "{}", body);
    assert!(blob.exists());

    let (status, _) = send_json(
        &app,
        Method::DELETE,
        &format!(
            "/api/v1/orders/{}/attachments/{}",
            order_id,
            linked["id"].as_str().unwrap()
        ),
        None,
    )
    .await;
    assert_eq!(status, 204);

    let (status, _) = send_json(
        &app,
        Method::DELETE,
        &format!("/api/v1/materials/{}", material_id),
        None,
    )
    .await;
    assert_eq!(status, 204);
    assert!(!blob.exists());
}

#[actix_rt::test]
async fn test_upload_rejects_non_images() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;

    let (status, body) = send_multipart(
        &app,
        "/api/v1/materials/upload",
        &[Part::File("file", "notes.txt", b"hello")],
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("素材仅支持上传图片文件"));

    let (status, body) = send_multipart(
        &app,
        "/api/v1/materials/upload",
        &[Part::File("file", "broken.png", b"not really a png")],
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("无法识别图片尺寸"));
}

#[actix_rt::test]
async fn test_folder_rename_rewrites_descendant_paths() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;

    let (status, brand) = send_json(
        &app,
        Method::POST,
        "/api/v1/material-folders",
        Some(json!({ "name": "品牌" })),
    )
    .await;
    assert_eq!(status, 201, "{}", brand);
    let brand_id = brand["id"].as_str().unwrap().to_string();

    let (status, spring) = send_json(
        &app,
        Method::POST,
        "/api/v1/material-folders",
        Some(json!({ "name": "春季", "parent_id": brand_id })),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(spring["path"], "品牌/春季");
    let spring_id = spring["id"].as_str().unwrap().to_string();

    let (status, renamed) = send_json(
        &app,
        Method::PUT,
        &format!("/api/v1/material-folders/{}", brand_id),
        Some(json!({ "name": "品牌A" })),
    )
    .await;
    assert_eq!(status, 200, "{}", renamed);
    assert_eq!(renamed["path"], "品牌A");

    let (status, flat) = send_json(&app, Method::GET, "/api/v1/material-folders?flat=1", None).await;
    assert_eq!(status, 200);
    assert_eq!(find_folder(&flat["data"], "春季")["path"], "品牌A/春季");

    // Renaming to the current name leaves the subtree alone.
    let (status, _) = send_json(
        &app,
        Method::PUT,
        &format!("/api/v1/material-folders/{}", brand_id),
        Some(json!({ "name": "品牌A" })),
    )
    .await;
    assert_eq!(status, 200);
    let (_, flat) = send_json(&app, Method::GET, "/api/v1/material-folders?flat=1", None).await;
    assert_eq!(find_folder(&flat["data"], "品牌A")["path"], "品牌A");
    assert_eq!(find_folder(&flat["data"], "春季")["path"], "品牌A/春季");

    // A folder cannot move below its own descendant.
    let (status, body) = send_json(
        &app,
        Method::PUT,
        &format!("/api/v1/material-folders/{}", brand_id),
        Some(json!({ "parent_id": spring_id })),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("不能将文件夹移动到其子文件夹下"));

    let (_, tree) = send_json(&app, Method::GET, "/api/v1/material-folders", None).await;
    let root = find_folder(&tree["data"], "品牌A");
    assert_eq!(root["children"][0]["name"], "春季");

    let (status, _) = send_json(
        &app,
        Method::DELETE,
        &format!("/api/v1/material-folders/{}", brand_id),
        None,
    )
    .await;
    assert_eq!(status, 409);
}

#[actix_rt::test]
async fn test_sibling_folders_need_distinct_names() {
    let env = create_test_env().await;
    let app = create_test_app(&env).await;

    let create = |name: &'static str, parent: Option<String>| {
        json!({ "name": name, "parent_id": parent })
    };

    let (status, brand) =
        send_json(&app, Method::POST, "/api/v1/material-folders", Some(create("品牌", None))).await;
    assert_eq!(status, 201);
    let brand_id = brand["id"].as_str().unwrap().to_string();

    let (status, body) =
        send_json(&app, Method::POST, "/api/v1/material-folders", Some(create("品牌", None))).await;
    assert_eq!(status, 409, "{}", body);

    // The same name is fine under a different parent.
    let (status, nested) = send_json(
        &app,
        Method::POST,
        "/api/v1/material-folders",
        Some(create("品牌", Some(brand_id.clone()))),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(nested["path"], "品牌/品牌");

    let (status, other) =
        send_json(&app, Method::POST, "/api/v1/material-folders", Some(create("其他", None))).await;
    assert_eq!(status, 201);
    let other_id = other["id"].as_str().unwrap().to_string();
    let (status, spring) = send_json(
        &app,
        Method::POST,
        "/api/v1/material-folders",
        Some(create("春季", Some(other_id.clone()))),
    )
    .await;
    assert_eq!(status, 201);

    // Renaming onto a sibling's name is refused, so paths never collide.
    let (status, _) = send_json(
        &app,
        Method::PUT,
        &format!("/api/v1/material-folders/{}", other_id),
        Some(json!({ "name": "品牌" })),
    )
    .await;
    assert_eq!(status, 409);

    // Renaming the first root only rewrites its own subtree.
    let (status, _) = send_json(
        &app,
        Method::PUT,
        &format!("/api/v1/material-folders/{}", brand_id),
        Some(json!({ "name": "X" })),
    )
    .await;
    assert_eq!(status, 200);
    let (_, flat) = send_json(&app, Method::GET, "/api/v1/material-folders?flat=1", None).await;
    let paths: Vec<&str> = flat["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"X/品牌"), "{:?}", paths);
    assert!(paths.contains(&"其他/春季"), "{:?}", paths);
    assert_eq!(spring["path"], "其他/春季");
}
