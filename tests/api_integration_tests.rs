//! API Integration Tests
//!
//! Tests the HTTP API endpoints end to end with an in-memory database. Outbound services
//! are replaced by the fakes in `common`.

mod common;

use axum::Router;
use axum::http::{Method, StatusCode};
use common::{Completion, send, setup};
use serde_json::{Value, json};
use support_inbox_api::api;
use support_inbox_api::core::assistant::UNAVAILABLE_REPLY;

async fn create_test_app(completion: Completion) -> Router {
    let (_, provider) = setup(completion).await;
    api::router(provider)
}

async fn create_location(app: &Router, body: Value) -> Value {
    let (status, json) = send(app, Method::POST, "/api/locations", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    json["location"].clone()
}

async fn deliver(app: &Router, payload: Value) {
    let (status, json) = send(app, Method::POST, "/webhooks/ghl", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "ok": true }));
}

fn inbound(message_id: &str) -> Value {
    json!({
        "type": "InboundMessage",
        "conversationId": "C1",
        "locationId": "L1",
        "messageId": message_id,
        "direction": "inbound",
        "channel": "SMS",
        "body": "hello"
    })
}

#[tokio::test]
async fn test_health() {
    let app = create_test_app(Completion::Unconfigured).await;

    let (status, json) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_webhook_acknowledges_malformed_bodies() {
    let app = create_test_app(Completion::Unconfigured).await;

    for body in [json!("just a string"), json!([1, 2, 3]), json!({})] {
        deliver(&app, body).await;
    }

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/webhooks/ghl")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_for_unknown_location_is_acknowledged() {
    let app = create_test_app(Completion::Unconfigured).await;

    deliver(&app, inbound("M1")).await;

    let (status, _) = send(&app, Method::GET, "/api/conversations/C1/messages", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_redelivery() {
    let app = create_test_app(Completion::Unconfigured).await;
    create_location(&app, json!({ "locationId": "L1" })).await;

    deliver(&app, inbound("M1")).await;
    deliver(&app, inbound("M1")).await;

    let (status, json) = send(&app, Method::GET, "/api/conversations/C1/messages", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["conversation"]["status"], "open");
    assert_eq!(json["conversation"]["source"], "crm");
    assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    assert_eq!(json["messages"][0]["authorType"], "customer");
}

#[tokio::test]
async fn test_demo_message_without_credential() {
    let app = create_test_app(Completion::Unconfigured).await;
    create_location(&app, json!({ "locationId": "L1" })).await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/locations/L1/demo/message",
        Some(json!({ "text": "שלום" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["conversationId"].is_string());
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["authorType"], "customer");
    assert_eq!(messages[1]["authorType"], "bot");
    assert_eq!(messages[1]["text"], UNAVAILABLE_REPLY);
}

#[tokio::test]
async fn test_demo_message_rejections() {
    let app = create_test_app(Completion::Unconfigured).await;
    create_location(&app, json!({ "locationId": "L1", "demoEnabled": false })).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/locations/L1/demo/message",
        Some(json!({ "text": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/locations/missing/demo/message",
        Some(json!({ "text": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_agent_message_hands_off() {
    let app = create_test_app(Completion::Unconfigured).await;
    create_location(&app, json!({ "locationId": "L1" })).await;
    deliver(&app, inbound("M1")).await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/conversations/C1/agent-message",
        Some(json!({ "text": "I can help", "senderName": "Noa" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    let last = json["messages"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["authorType"], "human");
    assert_eq!(last["senderName"], "Noa");

    let (_, json) = send(&app, Method::GET, "/api/conversations/C1/messages", None).await;
    assert_eq!(json["conversation"]["status"], "handoff");
}

#[tokio::test]
async fn test_unknown_conversation_is_not_found() {
    let app = create_test_app(Completion::Unconfigured).await;

    for action in ["close", "reopen", "handoff", "case-code"] {
        let uri = format!("/api/conversations/missing/{action}");
        let (status, json) = send(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{action}");
        assert!(json["message"].is_string());
    }

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/conversations/missing/agent-message",
        Some(json!({ "text": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_actions() {
    let app = create_test_app(Completion::Unconfigured).await;
    create_location(&app, json!({ "locationId": "L1" })).await;
    deliver(&app, inbound("M1")).await;

    let (status, json) = send(&app, Method::POST, "/api/conversations/C1/close", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "ok": true }));
    let (_, json) = send(&app, Method::GET, "/api/conversations/C1/messages", None).await;
    assert_eq!(json["conversation"]["status"], "closed");

    send(&app, Method::POST, "/api/conversations/C1/reopen", None).await;
    let (_, json) = send(&app, Method::GET, "/api/conversations/C1/messages", None).await;
    assert_eq!(json["conversation"]["status"], "open");

    let (status, first) = send(&app, Method::POST, "/api/conversations/C1/case-code", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = send(&app, Method::POST, "/api/conversations/C1/case-code", None).await;
    assert_eq!(first["caseCode"], second["caseCode"]);
}

#[tokio::test]
async fn test_location_credential_is_masked() {
    let app = create_test_app(Completion::Unconfigured).await;
    let location = create_location(
        &app,
        json!({ "locationId": "L1", "alias": "Clinic", "ghlApiKey": "secret-key" }),
    )
    .await;

    assert_eq!(location["ghlApiKey"], "***");
    assert_eq!(location["botName"], "Rushingbot");
    assert!(location["embedCode"].as_str().unwrap().contains(location["publicKey"].as_str().unwrap()));

    let (status, json) = send(&app, Method::GET, "/api/locations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["locations"][0]["ghlApiKey"], "***");
    assert!(!json.to_string().contains("secret-key"));
}

#[tokio::test]
async fn test_location_detail_and_update() {
    let app = create_test_app(Completion::Unconfigured).await;
    create_location(&app, json!({ "locationId": "L1" })).await;

    let (status, json) = send(
        &app,
        Method::PATCH,
        "/api/locations/L1",
        Some(json!({ "botName": "Maya", "openaiTemperature": 0.7 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["location"]["botName"], "Maya");
    assert_eq!(json["location"]["ghlApiKey"], Value::Null);

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/locations/L1",
        Some(json!({ "openaiTemperature": 3.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&app, Method::GET, "/api/locations/L1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stats"]["openConversations"], 0);

    let (status, _) = send(&app, Method::GET, "/api/locations/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_widget_lookup() {
    let app = create_test_app(Completion::Unconfigured).await;
    let location = create_location(&app, json!({ "locationId": "L1", "themeColor": "#000000" })).await;
    let public_key = location["publicKey"].as_str().unwrap();

    let (status, json) = send(&app, Method::GET, &format!("/api/widget/location/{public_key}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["locationId"], "L1");
    assert_eq!(json["themeColor"], "#000000");

    let (status, _) = send(&app, Method::GET, "/api/widget/location/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_location_conversations_and_dashboard() {
    let app = create_test_app(Completion::Canned).await;
    create_location(&app, json!({ "locationId": "L1" })).await;
    deliver(&app, inbound("M1")).await;
    send(
        &app,
        Method::POST,
        "/api/locations/L1/demo/message",
        Some(json!({ "text": "hi" })),
    )
    .await;

    let (status, json) = send(&app, Method::GET, "/api/locations/L1/conversations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["conversations"].as_array().unwrap().len(), 2);

    let (status, json) = send(&app, Method::GET, "/api/dashboard/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["summary"]["locations"], 1);
    assert_eq!(json["summary"]["conversations"], 1);
    assert_eq!(json["summary"]["openConversations"], 1);
    assert_eq!(json["summary"]["messages"], 1);
}

#[tokio::test]
async fn test_integration_status() {
    let app = create_test_app(Completion::Unconfigured).await;
    create_location(&app, json!({ "locationId": "L1" })).await;

    let (status, json) = send(&app, Method::GET, "/api/locations/L1/integrations", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["completion"]["configured"], false);
    assert_eq!(json["crm"]["configured"], false);
}
