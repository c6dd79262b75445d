mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{Caller, TestApp, INSPECTOR, RECEIVING_LIST};

async fn mark(app: &TestApp, notice: i64, position: usize, action: &str) -> Value {
    let (status, body) = app
        .post(
            "/api/v1/inspection/session/mark",
            json!({ "notice_number": notice, "position": position, "action": action }),
            Caller::User(INSPECTOR),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    body["data"].clone()
}

#[tokio::test]
async fn import_groups_records_by_notice() {
    let app = TestApp::new().await;

    let (status, body) = app
        .start_inspection(INSPECTOR, "recebimento.lst", RECEIVING_LIST.as_bytes())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["notices"], 2);
    assert_eq!(body["data"]["report"]["records"], 3);
    assert_eq!(body["data"]["report"]["skipped"]["too_few_fields"], 1);

    let (status, body) = app
        .get("/api/v1/inspection/session", Caller::User(INSPECTOR))
        .await;
    assert_eq!(status, StatusCode::OK);
    let session = &body["data"];
    assert_eq!(session["crm_token"], "c0ffee42");
    assert_eq!(session["progress"]["total"], 3);
    assert_eq!(session["progress"]["pending"], 3);

    let groups = session["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["notice_number"], 48213);
    assert_eq!(groups[0]["records"][0]["item_code"], "MPR.02199");
    assert_eq!(groups[0]["records"][1]["description"], "PORCA M8");
    assert_eq!(groups[1]["notice_number"], 48214);
}

#[tokio::test]
async fn full_pass_is_stored_as_a_batch() {
    let app = TestApp::new().await;
    app.start_inspection(INSPECTOR, "recebimento.lst", RECEIVING_LIST.as_bytes())
        .await;

    let first = mark(&app, 48213, 0, "inspect").await;
    assert_eq!(first["applied"], true);
    assert_eq!(first["outcome"]["applied"]["index"], 0);
    // Second record of notice 48213 is the third line of the file.
    let second = mark(&app, 48213, 1, "defer").await;
    assert_eq!(second["outcome"]["applied"]["index"], 2);
    assert_eq!(second["outcome"]["applied"]["status"], "deferred");

    let (status, body) = app
        .post(
            "/api/v1/inspection/session/finalize",
            json!({}),
            Caller::User(INSPECTOR),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains('1'));

    let last = mark(&app, 48214, 0, "inspect").await;
    assert_eq!(last["progress"]["pending"], 0);

    let (status, body) = app
        .post(
            "/api/v1/inspection/session/finalize",
            json!({}),
            Caller::User(INSPECTOR),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let batch_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["inspector_id"], INSPECTOR);
    assert_eq!(body["data"]["source_filename"], "recebimento.lst");
    assert_eq!(body["data"]["records"].as_array().unwrap().len(), 3);

    // Finalizing clears the working session.
    let (status, _) = app
        .get("/api/v1/inspection/session", Caller::User(INSPECTOR))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .get("/api/v1/inspection/batches", Caller::User(INSPECTOR))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["inspected"], 2);
    assert_eq!(body["data"]["items"][0]["deferred"], 1);

    let (status, body) = app
        .get(
            &format!("/api/v1/inspection/batches/{}", batch_id),
            Caller::User(INSPECTOR),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["crm_token"], "c0ffee42");
    assert_eq!(body["data"]["records"][2]["deferred"], true);
}

#[tokio::test]
async fn out_of_range_mark_is_ignored() {
    let app = TestApp::new().await;
    app.start_inspection(INSPECTOR, "recebimento.lst", RECEIVING_LIST.as_bytes())
        .await;

    let unknown_notice = mark(&app, 99999, 0, "inspect").await;
    assert_eq!(unknown_notice["applied"], false);
    assert_eq!(unknown_notice["outcome"], "ignored");

    let past_end = mark(&app, 48214, 1, "inspect").await;
    assert_eq!(past_end["applied"], false);
    assert_eq!(past_end["progress"]["pending"], 3);
}

#[tokio::test]
async fn import_requires_a_crm_token() {
    let app = TestApp::new().await;
    let (status, _) = app
        .upload(
            "/api/v1/inspection/import",
            &[("file", "recebimento.lst", RECEIVING_LIST.as_bytes())],
            Caller::User(INSPECTOR),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn link_without_token_is_rejected() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post(
            "/api/v1/inspection/crm-token",
            json!({ "link": "https://crm.example.com/os?id=7" }),
            Caller::User(INSPECTOR),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_extension_and_empty_lists_are_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app
        .start_inspection(INSPECTOR, "recebimento.txt", RECEIVING_LIST.as_bytes())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .start_inspection(INSPECTOR, "vazio.lst", b"CABECALHO\n\n")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("no valid records imported"));

    let (status, _) = app
        .get("/api/v1/inspection/session", Caller::User(INSPECTOR))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_import_keeps_the_running_session() {
    let app = TestApp::new().await;
    app.start_inspection(INSPECTOR, "recebimento.lst", RECEIVING_LIST.as_bytes())
        .await;
    mark(&app, 48213, 0, "inspect").await;

    let (status, _) = app
        .start_inspection(INSPECTOR, "vazio.lst", b"\n")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .get("/api/v1/inspection/session", Caller::User(INSPECTOR))
        .await;
    assert_eq!(body["data"]["progress"]["inspected"], 1);
}

#[tokio::test]
async fn sessions_are_per_inspector() {
    let app = TestApp::new().await;
    app.start_inspection(INSPECTOR, "recebimento.lst", RECEIVING_LIST.as_bytes())
        .await;

    let (status, _) = app
        .get("/api/v1/inspection/session", Caller::User("inspector-02"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn abandon_discards_the_session() {
    let app = TestApp::new().await;
    app.start_inspection(INSPECTOR, "recebimento.lst", RECEIVING_LIST.as_bytes())
        .await;

    let (status, _) = app
        .delete("/api/v1/inspection/session", Caller::User(INSPECTOR))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .delete("/api/v1/inspection/session", Caller::User(INSPECTOR))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app
        .get("/api/v1/inspection/batches", Caller::User(INSPECTOR))
        .await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn huge_page_number_returns_an_empty_page() {
    let app = TestApp::new().await;
    let (status, body) = app
        .get(
            "/api/v1/inspection/batches?page=18446744073709551615&per_page=100",
            Caller::User(INSPECTOR),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], json!([]));
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn inspection_requires_an_identity() {
    let app = TestApp::new().await;
    let (status, body) = app
        .get("/api/v1/inspection/session", Caller::Anonymous)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}
