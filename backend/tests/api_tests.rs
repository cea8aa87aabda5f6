//! HTTP API tests against the in-memory repository

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::test_config;
use rim_backend::repository::{demo, InMemoryRepository};
use rim_backend::{create_app, AppState};

async fn demo_app() -> Router {
    let repo = InMemoryRepository::new();
    demo::seed(&repo).await.unwrap();
    create_app(AppState::new(Arc::new(repo), test_config()))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": demo::DEMO_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = demo_app().await;
    let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = demo_app().await;
    let (status, body) = send(&app, Method::GET, "/api/v1/inventory-items", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) =
        send(&app, Method::GET, "/api/v1/inventory-items", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = demo_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": demo::DEMO_STAFF_EMAIL, "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn staff_read_items_but_cannot_delete_them() {
    let app = demo_app().await;
    let token = login(&app, demo::DEMO_STAFF_EMAIL).await;

    let (status, items) =
        send(&app, Method::GET, "/api/v1/inventory-items", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 5);

    let id = items[0]["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/inventory-items/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "MANAGER_ONLY");
}

#[tokio::test]
async fn registering_opens_an_empty_restaurant() {
    let app = demo_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({
            "restaurant_name": "Noodle Bar",
            "full_name": "Kim",
            "email": "kim@noodles.test",
            "password": "long-enough-password",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["user"]["role"], "manager");
    let token = body["access_token"].as_str().unwrap();

    let (status, items) =
        send(&app, Method::GET, "/api/v1/inventory-items", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(items.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn recording_stock_through_the_api() {
    let app = demo_app().await;
    let token = login(&app, demo::DEMO_STAFF_EMAIL).await;

    let (_, items) = send(&app, Method::GET, "/api/v1/inventory-items", Some(&token), None).await;
    let item = &items.as_array().unwrap()[0];

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/stock-transactions",
        Some(&token),
        Some(json!({
            "item_id": item["id"],
            "type": "in",
            "quantity": "2",
            "reason": "delivery",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["transaction"]["type"], "in");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/stock-transactions",
        Some(&token),
        Some(json!({
            "item_id": item["id"],
            "type": "out",
            "quantity": "1",
            "reason": "purchase",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "reason");
}

#[tokio::test]
async fn supplier_report_downloads_as_csv() {
    let app = demo_app().await;
    let token = login(&app, demo::DEMO_MANAGER_EMAIL).await;

    let request = Request::builder()
        .uri("/api/v1/reports/supplier-purchases?format=csv")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.starts_with("supplier,item,unit,current_stock"));
}
