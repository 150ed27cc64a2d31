mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::TestServer;
use redops_api::models::user::UserRole;
use redops_api::routes::results::MAX_IMPORT_ROWS;

#[tokio::test]
async fn import_skips_blank_rows_and_appends() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_lead, token) = common::create_user(&state, "lead", UserRole::TeamLead).await;
    let op_id = common::create_operation(&server, &token, "Op").await;
    let task_id = common::create_task(&server, &token, &op_id, "Scan").await;

    let resp = server
        .post(&format!("/api/tasks/{task_id}/results/import"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!([
            { "sourceIP": "10.0.0.5", "destinationIP": "10.0.0.9", "destinationPort": "445" },
            {},
            { "toolApp": "crackmapexec", "operatorName": "kim" }
        ]))
        .await;
    resp.assert_status_ok();
    let rows: Vec<serde_json::Value> = resp.json();
    assert_eq!(rows.len(), 2);
    assert!(rows[0]["id"].as_str().unwrap().starts_with("res_"));
    assert_eq!(rows[0]["taskId"], task_id.as_str());
    assert_eq!(rows[0]["sourceIP"], "10.0.0.5");
    assert_eq!(rows[1]["toolApp"], "crackmapexec");

    // A second import appends after the first batch.
    let resp = server
        .post(&format!("/api/tasks/{task_id}/results/import"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!([{ "comments": "follow-up" }]))
        .await;
    resp.assert_status_ok();
    let rows: Vec<serde_json::Value> = resp.json();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["comments"], "follow-up");

    let resp = server
        .get(&format!("/api/tasks/{task_id}/results"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<Vec<serde_json::Value>>().len(), 3);
}

#[tokio::test]
async fn import_rejects_oversized_batches_and_unknown_tasks() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_lead, token) = common::create_user(&state, "lead", UserRole::TeamLead).await;
    let op_id = common::create_operation(&server, &token, "Op").await;
    let task_id = common::create_task(&server, &token, &op_id, "Scan").await;

    let rows: Vec<serde_json::Value> = (0..=MAX_IMPORT_ROWS)
        .map(|i| serde_json::json!({ "comments": format!("row {i}") }))
        .collect();
    server
        .post(&format!("/api/tasks/{task_id}/results/import"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&rows)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/tasks/tsk_missing/results/import")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!([{ "url": "http://x" }]))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_results_reports_count() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_lead, token) = common::create_user(&state, "lead", UserRole::TeamLead).await;
    let op_id = common::create_operation(&server, &token, "Op").await;
    let task_id = common::create_task(&server, &token, &op_id, "Scan").await;

    server
        .post(&format!("/api/tasks/{task_id}/results/import"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!([{ "url": "a" }, { "url": "b" }]))
        .await
        .assert_status_ok();

    let resp = server
        .delete(&format!("/api/tasks/{task_id}/results"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["task_id"], task_id.as_str());
    assert_eq!(body["count"], 2);

    let resp = server
        .get(&format!("/api/tasks/{task_id}/results"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_ok();
    assert!(resp.json::<Vec<serde_json::Value>>().is_empty());
}

#[tokio::test]
async fn ids_of_the_wrong_kind_are_not_found() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_lead, token) = common::create_user(&state, "lead", UserRole::TeamLead).await;
    let op_id = common::create_operation(&server, &token, "Op").await;
    let task_id = common::create_task(&server, &token, &op_id, "Scan").await;

    // An operation id in the task slot, a task id in the operation slot.
    let resp = server
        .get(&format!("/api/tasks/{op_id}/results"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(resp.json::<serde_json::Value>()["error"]["code"], "NOT_FOUND");

    server
        .get(&format!("/api/operations/{task_id}/tasks"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .delete("/api/tasks/not-an-id/results")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .get(&format!("/api/tasks/{task_id}/results"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status_ok();
}
