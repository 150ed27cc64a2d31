mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::TestServer;
use redops_api::models::user::UserRole;

#[tokio::test]
async fn task_phase_defaults_to_operation_phase() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_lead, token) = common::create_user(&state, "lead", UserRole::TeamLead).await;
    let op_id = common::create_operation(&server, &token, "Op").await;

    server
        .patch(&format!("/api/operations/{op_id}/phase"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({ "phase": "discovery" }))
        .await
        .assert_status_ok();

    let resp = server
        .post(&format!("/api/operations/{op_id}/tasks"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({
            "title": "Map shares",
            "mitre_id": "T1135",
            "tools": ["tool_a", "tool_a", "tool_b"]
        }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    let task: serde_json::Value = resp.json();
    assert!(task["id"].as_str().unwrap().starts_with("tsk_"));
    assert_eq!(task["operation_id"], op_id.as_str());
    assert_eq!(task["phase"], "discovery");
    assert_eq!(task["status"], "pending");
    assert_eq!(task["mitre_id"], "T1135");
    assert_eq!(task["tools"], serde_json::json!(["tool_a", "tool_b"]));
}

#[tokio::test]
async fn create_task_validates_title_assignee_and_operation() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_lead, token) = common::create_user(&state, "lead", UserRole::TeamLead).await;
    let op_id = common::create_operation(&server, &token, "Op").await;

    let resp = server
        .post(&format!("/api/operations/{op_id}/tasks"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({ "title": "   ", "assigned_to": "usr_ghost" }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.json::<serde_json::Value>()["error"]["details"]
            .as_array()
            .unwrap()
            .len(),
        2
    );

    server
        .post("/api/operations/op_missing/tasks")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({ "title": "Orphan" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_get_and_update_tasks() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_lead, token) = common::create_user(&state, "lead", UserRole::TeamLead).await;
    let (member, _) = common::create_user(&state, "member", UserRole::Member).await;
    let op_id = common::create_operation(&server, &token, "Op").await;
    let first = common::create_task(&server, &token, &op_id, "First").await;
    let second = common::create_task(&server, &token, &op_id, "Second").await;

    let resp = server
        .get(&format!("/api/operations/{op_id}/tasks"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_ok();
    let ids: Vec<String> = resp
        .json::<Vec<serde_json::Value>>()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![first.clone(), second.clone()]);

    let resp = server
        .put(&format!("/api/operations/{op_id}/tasks/{first}"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({
            "title": "First, revised",
            "assigned_to": member.id,
            "results": "Found 3 hosts"
        }))
        .await;
    resp.assert_status_ok();
    let task: serde_json::Value = resp.json();
    assert_eq!(task["title"], "First, revised");
    assert_eq!(task["assigned_to"], member.id.as_str());
    assert_eq!(task["results"], "Found 3 hosts");

    let resp = server
        .get(&format!("/api/operations/{op_id}/tasks/{first}"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<serde_json::Value>()["title"], "First, revised");
}

#[tokio::test]
async fn task_is_scoped_to_its_operation() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_lead, token) = common::create_user(&state, "lead", UserRole::TeamLead).await;
    let op_a = common::create_operation(&server, &token, "A").await;
    let op_b = common::create_operation(&server, &token, "B").await;
    let task = common::create_task(&server, &token, &op_a, "Belongs to A").await;

    server
        .get(&format!("/api/operations/{op_b}/tasks/{task}"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete(&format!("/api/operations/{op_b}/tasks/{task}"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_status_then_delete() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_lead, token) = common::create_user(&state, "lead", UserRole::TeamLead).await;
    let op_id = common::create_operation(&server, &token, "Op").await;
    let task_id = common::create_task(&server, &token, &op_id, "Exploit").await;

    let resp = server
        .patch(&format!("/api/operations/{op_id}/tasks/{task_id}/status"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({ "status": "in_progress" }))
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<serde_json::Value>()["status"], "in_progress");

    server
        .delete(&format!("/api/operations/{op_id}/tasks/{task_id}"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get(&format!("/api/operations/{op_id}/tasks/{task_id}"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
