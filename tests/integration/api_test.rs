// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{bearer, setup, test_server};
use axum::http::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_public_endpoints() {
    let ctx = setup().await;
    let server = test_server(&ctx);

    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");

    let response = server.get("/v1/version").await;
    response.assert_status_ok();
    response.assert_text(env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_protected_endpoints_require_token() {
    let ctx = setup().await;
    let server = test_server(&ctx);

    let response = server
        .post("/v1/tickets")
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .post("/v1/tickets/sweep")
        .add_header("Authorization", "Bearer wrong")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

/// 建单 → 查询 → 答复 → 关闭 全流程
#[tokio::test]
async fn test_ticket_lifecycle_over_http() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let admin = ctx.admin(900, &[category.id]).await;
    let user = ctx.user(1).await;
    let server = test_server(&ctx);

    let response = server
        .post("/v1/tickets")
        .add_header("Authorization", bearer())
        .json(&json!({
            "user_id": user.id,
            "category_id": category.id,
            "description": "My card was charged twice",
            "priority": "high"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["ticket"]["status"], "waiting_admin");
    assert_eq!(body["data"]["assigned_admin"]["id"], json!(admin.id));
    let ticket_id = body["data"]["ticket"]["id"].as_str().unwrap().to_string();

    let response = server
        .post("/v1/tickets")
        .add_header("Authorization", bearer())
        .json(&json!({
            "user_id": user.id,
            "category_id": category.id,
            "description": "Another one"
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "duplicate_open_ticket");

    let response = server
        .get(&format!("/v1/admins/{}/next-ticket", admin.id))
        .add_header("Authorization", bearer())
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["id"], json!(ticket_id));

    let response = server
        .post(&format!("/v1/tickets/{}/read", ticket_id))
        .add_header("Authorization", bearer())
        .json(&json!({ "admin_id": admin.id }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["is_read"], true);

    let response = server
        .post(&format!("/v1/tickets/{}/messages", ticket_id))
        .add_header("Authorization", bearer())
        .json(&json!({
            "sender": { "kind": "admin", "id": admin.id },
            "content": "Refund issued"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let response = server
        .post(&format!("/v1/tickets/{}/close", ticket_id))
        .add_header("Authorization", bearer())
        .json(&json!({ "closed_by": admin.id, "reason": "Resolved" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["status"], "closed");

    let response = server
        .get(&format!("/v1/tickets/{}", ticket_id))
        .add_header("Authorization", bearer())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["messages"].as_array().unwrap().len(), 2);

    let response = server
        .get(&format!("/v1/admins/{}/activity", admin.id))
        .add_header("Authorization", bearer())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["summary"]["assigned"], 1);
    assert_eq!(body["data"]["summary"]["replied"], 1);
    assert_eq!(body["data"]["summary"]["closed"], 1);
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_assign_endpoint_and_error_mapping() {
    let ctx = setup().await;
    let category = ctx.category("Empty").await;
    let user = ctx.user(1).await;
    let ticket = ctx.raw_ticket(user.id, category.id).await;
    let server = test_server(&ctx);

    // No eligible admins for automatic assignment
    let response = server
        .post(&format!("/v1/tickets/{}/assign", ticket.id))
        .add_header("Authorization", bearer())
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let admin = ctx.admin(900, &[]).await;
    let response = server
        .post(&format!("/v1/tickets/{}/assign", ticket.id))
        .add_header("Authorization", bearer())
        .json(&json!({ "admin_id": admin.id }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["action"], "assigned");
    assert_eq!(body["data"]["ticket"]["assigned_admin_id"], json!(admin.id));

    let response = server
        .get(&format!("/v1/tickets/{}", uuid::Uuid::new_v4()))
        .add_header("Authorization", bearer())
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .post(&format!("/v1/tickets/{}/close", ticket.id))
        .add_header("Authorization", bearer())
        .json(&json!({ "reason": "" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_manual_sweep_endpoint() {
    let ctx = setup().await;
    let server = test_server(&ctx);

    let response = server
        .post("/v1/tickets/sweep")
        .add_header("Authorization", bearer())
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["closed"], 0);
}

#[tokio::test]
async fn test_activity_rejects_inverted_range() {
    let ctx = setup().await;
    let admin = ctx.admin(900, &[]).await;
    let server = test_server(&ctx);

    let response = server
        .get(&format!("/v1/admins/{}/activity", admin.id))
        .add_query_param("from", "2025-02-01T00:00:00Z")
        .add_query_param("to", "2025-01-01T00:00:00Z")
        .add_header("Authorization", bearer())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_activity_log_over_range_includes_system_closes() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let admin = ctx.admin(900, &[category.id]).await;
    let assigned_owner = ctx.user(1).await;
    let closed_owner = ctx.user(2).await;
    let assigned = ctx.raw_ticket(assigned_owner.id, category.id).await;
    let closed = ctx.raw_ticket(closed_owner.id, category.id).await;
    ctx.service
        .assign_admin(assigned.id, Some(admin.id))
        .await
        .unwrap();
    ctx.service
        .close_ticket(closed.id, None, "Closed by user")
        .await
        .unwrap();
    let server = test_server(&ctx);

    let response = server
        .get("/v1/activity")
        .add_header("Authorization", bearer())
        .await;
    response.assert_status_ok();
    let entries = response.json::<Value>()["data"].as_array().unwrap().clone();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "assigned");
    assert_eq!(entries[0]["admin_id"], json!(admin.id));
    assert_eq!(entries[1]["action"], "closed");
    assert!(entries[1]["admin_id"].is_null());

    let response = server
        .get("/v1/activity")
        .add_query_param("from", "2999-01-01T00:00:00Z")
        .add_header("Authorization", bearer())
        .await;
    response.assert_status_ok();
    assert!(response.json::<Value>()["data"].as_array().unwrap().is_empty());
}
