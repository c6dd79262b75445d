mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::{Caller, TestApp, INSPECTOR};

const USER: Caller<'static> = Caller::User(INSPECTOR);

fn inc_payload(supplier: &str, item: &str) -> Value {
    json!({
        "invoice_number": 118734,
        "representative": "Carla Souza",
        "supplier": supplier,
        "item": item,
        "quantity_received": 500.0,
        "quantity_defective": 12.0,
        "defect_description": "Rosca fora de especificacao",
        "recommended_action": "Devolver lote"
    })
}

async fn create(app: &TestApp, supplier: &str, item: &str) -> Value {
    let (status, body) = app
        .post("/api/v1/incs", inc_payload(supplier, item), USER)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"].clone()
}

#[tokio::test]
async fn create_assigns_sequence_and_defaults() {
    let app = TestApp::new().await;

    let first = create(&app, "Metalurgica Exemplo", "mpr.02199").await;
    assert_eq!(first["sequence_number"], 1);
    assert_eq!(first["item"], "MPR.02199");
    assert_eq!(first["urgency"], "moderate");
    assert_eq!(first["status"], "in_progress");
    assert_eq!(first["photos"], json!([]));

    let today = Utc::now().date_naive();
    assert_eq!(first["report_date"], today.to_string());
    assert_eq!(
        first["expiration_date"],
        (today + Duration::days(20)).to_string()
    );

    let second = create(&app, "Fundicao Sul", "ABC.00001").await;
    assert_eq!(second["sequence_number"], 2);
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post("/api/v1/incs", inc_payload("Metalurgica", "MPR-02199"), USER)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut too_many_defects = inc_payload("Metalurgica", "MPR.02199");
    too_many_defects["quantity_defective"] = json!(501.0);
    let (status, _) = app.post("/api/v1/incs", too_many_defects, USER).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/incs",
            inc_payload("Metalurgica", "MPR.02199"),
            Caller::Anonymous,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_filters_and_orders_newest_first() {
    let app = TestApp::new().await;
    create(&app, "Metalurgica Exemplo", "MPR.02199").await;
    create(&app, "Fundicao Sul", "ABC.00001").await;
    create(&app, "METALURGICA EXEMPLO", "ABC.00002").await;

    let (status, body) = app.get("/api/v1/incs", USER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["items"][0]["sequence_number"], 3);

    let (_, body) = app.get("/api/v1/incs?supplier=metalurgica", USER).await;
    assert_eq!(body["data"]["total"], 2);

    let (_, body) = app.get("/api/v1/incs?item=abc.0000", USER).await;
    assert_eq!(body["data"]["total"], 2);

    let (_, body) = app.get("/api/v1/incs?page=2&per_page=2", USER).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["total_pages"], 2);
}

#[tokio::test]
async fn update_closes_and_validates_merged_quantities() {
    let app = TestApp::new().await;
    let inc = create(&app, "Metalurgica Exemplo", "MPR.02199").await;
    let uri = format!("/api/v1/incs/{}", inc["id"].as_str().unwrap());

    let (status, body) = app
        .put(&uri, json!({ "status": "closed", "urgency": "critical" }), USER)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "closed");
    assert_eq!(body["data"]["sequence_number"], 1);

    // 12 defective stay on record, so 10 received is inconsistent.
    let (status, _) = app
        .put(&uri, json!({ "quantity_received": 10.0 }), USER)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/v1/incs?status=closed", USER).await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn missing_inc_is_not_found() {
    let app = TestApp::new().await;
    let uri = format!("/api/v1/incs/{}", uuid::Uuid::new_v4());

    let (status, _) = app.get(&uri, USER).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&uri, USER).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn photos_are_stored_listed_and_removed() {
    let app = TestApp::new().await;
    let inc = create(&app, "Metalurgica Exemplo", "MPR.02199").await;
    let uri = format!("/api/v1/incs/{}/photos", inc["id"].as_str().unwrap());

    let (status, body) = app
        .upload(
            &uri,
            &[
                ("photos", "rosca.jpg", &b"\xff\xd8\xff\xe0jpeg"[..]),
                ("photos", "notas.txt", &b"not an image"[..]),
            ],
            USER,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let photos = body["data"]["photos"].as_array().unwrap().clone();
    assert_eq!(photos.len(), 1);
    let stored = photos[0].as_str().unwrap().to_string();
    assert!(stored.starts_with("uploads/"));
    assert!(stored.ends_with("_rosca.jpg"));

    let file_name = stored.trim_start_matches("uploads/");
    assert!(app.upload_dir.path().join(file_name).exists());

    let (status, body) = app
        .delete(&format!("{}?path={}", uri, stored), USER)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["photos"], json!([]));
    assert!(!app.upload_dir.path().join(file_name).exists());

    let (status, _) = app
        .delete(&format!("{}?path={}", uri, stored), USER)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_photo_files() {
    let app = TestApp::new().await;
    let inc = create(&app, "Metalurgica Exemplo", "MPR.02199").await;
    let id = inc["id"].as_str().unwrap();

    let (_, body) = app
        .upload(
            &format!("/api/v1/incs/{}/photos", id),
            &[("photos", "lote.png", &b"\x89PNG"[..])],
            USER,
        )
        .await;
    let stored = body["data"]["photos"][0].as_str().unwrap().to_string();
    let file = app
        .upload_dir
        .path()
        .join(stored.trim_start_matches("uploads/"));
    assert!(file.exists());

    let (status, _) = app.delete(&format!("/api/v1/incs/{}", id), USER).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!file.exists());

    let (status, _) = app.get(&format!("/api/v1/incs/{}", id), USER).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = TestApp::new().await;
    let inc = create(&app, "Metalurgica Exemplo", "MPR.02199").await;
    let big = vec![0u8; 128 * 1024];

    let (status, _) = app
        .upload(
            &format!("/api/v1/incs/{}/photos", inc["id"].as_str().unwrap()),
            &[("photos", "grande.jpg", big.as_slice())],
            USER,
        )
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn expired_reports_days_overdue() {
    let app = TestApp::new().await;
    create(&app, "Metalurgica Exemplo", "MPR.02199").await;
    let critical = {
        let mut payload = inc_payload("Fundicao Sul", "ABC.00001");
        payload["urgency"] = json!("critical");
        let (_, body) = app.post("/api/v1/incs", payload, USER).await;
        body["data"].clone()
    };

    let today = Utc::now().date_naive();
    let (status, body) = app
        .get(
            &format!("/api/v1/incs/expired?as_of={}", today + Duration::days(15)),
            USER,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let expired = body["data"].as_array().unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0]["inc"]["id"], critical["id"]);
    assert_eq!(expired[0]["days_overdue"], 5);

    let (_, body) = app
        .get(
            &format!("/api/v1/incs/expired?as_of={}", today + Duration::days(30)),
            USER,
        )
        .await;
    let expired = body["data"].as_array().unwrap();
    assert_eq!(expired.len(), 2);
    assert_eq!(expired[0]["days_overdue"], 20);
    assert_eq!(expired[1]["days_overdue"], 10);
}

#[tokio::test]
async fn monitor_counts_per_month() {
    let app = TestApp::new().await;
    create(&app, "Metalurgica Exemplo", "MPR.02199").await;
    create(&app, "Metalurgica Exemplo", "MPR.02200").await;
    create(&app, "Fundicao Sul", "ABC.00001").await;

    let (status, body) = app
        .get("/api/v1/incs/monitor?supplier=Metalurgica%20Exemplo", USER)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["incs"].as_array().unwrap().len(), 2);
    let month = Utc::now().date_naive().format("%Y-%m").to_string();
    assert_eq!(body["data"]["monthly_counts"][month.as_str()], 2);

    let (status, _) = app
        .get(
            "/api/v1/incs/monitor?start_date=2025-03-10&end_date=2025-03-01",
            USER,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
