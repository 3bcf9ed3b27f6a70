//! Functional tests for the service registry endpoints

#[path = "../common/mod.rs"]
mod common;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{body_json, build_app, get, memory_app, test_settings, FailingStore, UNREACHABLE};
use service_gateway::{
    gateway::registry::ServiceRegistry,
    store::{GatewayStore, MemoryStore, ServiceStatus},
};

fn put(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_upsert_twice_leaves_one_record() {
    let (app, store) = memory_app(UNREACHABLE);

    let first = app
        .clone()
        .oneshot(put(
            "/api/services/svc-a",
            json!({"baseUrl": "http://a.internal:8080", "status": "healthy"}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(put(
            "/api/services/svc-a",
            json!({"baseUrl": "http://b.internal:9090", "status": "unhealthy"}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let json = body_json(second).await;
    assert_eq!(json["data"]["baseUrl"], "http://b.internal:9090");

    let services = store.list_services().await.unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "svc-a");
    assert_eq!(services[0].base_url, "http://b.internal:9090");
    assert_eq!(services[0].status, ServiceStatus::Unhealthy);
}

#[tokio::test]
async fn test_list_sorted_without_duplicates() {
    let store = Arc::new(MemoryStore::new());
    let registry = ServiceRegistry::new(store.clone());
    for name in ["user-service", "api-gateway", "billing", "user-service"] {
        registry
            .upsert(name, "http://localhost:1", ServiceStatus::Healthy)
            .await
            .unwrap();
    }
    let app = build_app(test_settings(UNREACHABLE), store);

    let response = app.oneshot(get("/api/services")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    let names: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["api-gateway", "billing", "user-service"]);
}

#[tokio::test]
async fn test_get_single_service() {
    let (app, _) = memory_app(UNREACHABLE);
    app.clone()
        .oneshot(put("/api/services/svc", json!({"baseUrl": "https://svc.example"})))
        .await
        .unwrap();

    let response = app.oneshot(get("/api/services/svc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "svc");
    assert_eq!(json["data"]["status"], "unknown");
    assert!(json["data"]["lastCheckedAt"].is_string());
}

#[tokio::test]
async fn test_get_missing_service_is_404() {
    let (app, _) = memory_app(UNREACHABLE);

    let response = app.oneshot(get("/api/services/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn test_invalid_base_url_is_400() {
    let (app, store) = memory_app(UNREACHABLE);

    let response = app
        .oneshot(put("/api/services/svc", json!({"baseUrl": "not a url"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);
    assert!(store.list_services().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_400_json() {
    let (app, _) = memory_app(UNREACHABLE);

    let response = app
        .oneshot(put("/api/services/svc", json!({"url": "http://x"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_list_store_down_is_500() {
    let app = build_app(test_settings(UNREACHABLE), Arc::new(FailingStore));

    let response = app.oneshot(get("/api/services")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Failed to retrieve services", "success": false})
    );
}

#[tokio::test]
async fn test_root_and_hello() {
    let (app, _) = memory_app(UNREACHABLE);

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        common::body_text(response).await,
        "API Gateway Service - Port 3000"
    );

    let response = app.oneshot(get("/hello")).await.unwrap();
    assert_eq!(
        body_json(response).await,
        json!({"message": "Hello from API Gateway!", "success": true})
    );
}
