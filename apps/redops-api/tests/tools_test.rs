mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::TestServer;
use redops_api::models::user::UserRole;

#[tokio::test]
async fn tool_crud_round() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_user, token) = common::create_user(&state, "operator", UserRole::Member).await;

    let resp = server
        .post("/api/tools")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({
            "name": "nmap",
            "type": "reconnaissance",
            "command": "nmap",
            "arguments": { "-sV": "service detection", "-p": "ports" },
            "output_format": "xml"
        }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    let tool: serde_json::Value = resp.json();
    let tool_id = tool["id"].as_str().unwrap().to_string();
    assert!(tool_id.starts_with("tool_"));
    assert_eq!(tool["is_active"], true);
    assert_eq!(tool["arguments"]["-sV"], "service detection");

    let resp = server
        .put(&format!("/api/tools/{tool_id}"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({ "is_active": false, "description": "Port scanner" }))
        .await;
    resp.assert_status_ok();
    let tool: serde_json::Value = resp.json();
    assert_eq!(tool["is_active"], false);
    assert_eq!(tool["description"], "Port scanner");
    assert_eq!(tool["name"], "nmap");

    let resp = server
        .get("/api/tools")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<Vec<serde_json::Value>>().len(), 1);

    server
        .delete(&format!("/api/tools/{tool_id}"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get(&format!("/api/tools/{tool_id}"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_tool_requires_name_and_command() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_user, token) = common::create_user(&state, "operator", UserRole::Member).await;

    let resp = server
        .post("/api/tools")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({ "name": "", "type": "exploitation", "command": " " }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.json::<serde_json::Value>()["error"]["code"],
        "VALIDATION_ERROR"
    );

    server
        .delete("/api/tools/tool_missing")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

async fn add_tool(server: &TestServer, token: &str, name: &str, kind: &str, is_active: bool) -> String {
    let resp = server
        .post("/api/tools")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({
            "name": name,
            "type": kind,
            "command": name,
            "is_active": is_active
        }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    resp.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn tool_names(server: &TestServer, token: &str, query: &str) -> Vec<String> {
    let resp = server
        .get(&format!("/api/tools{query}"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_ok();
    resp.json::<Vec<serde_json::Value>>()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn list_tools_filters_by_type_and_active() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_user, token) = common::create_user(&state, "operator", UserRole::Member).await;

    add_tool(&server, &token, "nmap", "reconnaissance", true).await;
    add_tool(&server, &token, "amass", "reconnaissance", false).await;
    add_tool(&server, &token, "metasploit", "exploitation", true).await;

    assert_eq!(tool_names(&server, &token, "").await.len(), 3);
    assert_eq!(
        tool_names(&server, &token, "?type=reconnaissance").await,
        vec!["nmap", "amass"]
    );
    assert_eq!(
        tool_names(&server, &token, "?active=true").await,
        vec!["nmap", "metasploit"]
    );
    assert_eq!(
        tool_names(&server, &token, "?type=reconnaissance&active=false").await,
        vec!["amass"]
    );
    assert!(tool_names(&server, &token, "?type=post_exploitation")
        .await
        .is_empty());
}

#[tokio::test]
async fn patch_status_toggles_tool() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (_user, token) = common::create_user(&state, "operator", UserRole::Member).await;
    let tool_id = add_tool(&server, &token, "responder", "post_exploitation", true).await;

    let resp = server
        .patch(&format!("/api/tools/{tool_id}/status"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({ "is_active": false }))
        .await;
    resp.assert_status_ok();
    let tool: serde_json::Value = resp.json();
    assert_eq!(tool["is_active"], false);
    assert_eq!(tool["name"], "responder");

    assert!(tool_names(&server, &token, "?active=true").await.is_empty());

    server
        .patch("/api/tools/tool_missing/status")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({ "is_active": true }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
