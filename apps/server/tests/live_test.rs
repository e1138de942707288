mod common;

use axum::http::{header, Method, StatusCode};
use serde_json::json;

use common::{response_json, SseReader, TestApp};

async fn open_stream(app: &TestApp, uri: &str, token: &str) -> SseReader {
    let response = app.get(uri, token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));
    SseReader::new(response)
}

#[tokio::test]
async fn test_live_products_resends_after_write() {
    let app = TestApp::new().await;
    let token = app.sign_up("owner@shop.in").await;

    let mut events = open_stream(&app, "/api/live/products", &token).await;
    let (name, first) = events.next_event().await;
    assert_eq!(name, "snapshot");
    assert!(first.as_array().unwrap().is_empty());

    app.add_product(&token, "Cola", 50.0, 5).await;

    let (name, next) = events.next_event().await;
    assert_eq!(name, "snapshot");
    let products = next.as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], "Cola");
}

#[tokio::test]
async fn test_live_products_ignore_other_accounts() {
    let app = TestApp::new().await;
    let alice = app.sign_up("alice@shop.in").await;
    let bob = app.sign_up("bob@shop.in").await;

    let mut events = open_stream(&app, "/api/live/products", &alice).await;
    events.next_event().await;

    app.add_product(&bob, "Chips", 30.0, 5).await;
    app.add_product(&alice, "Cola", 50.0, 5).await;

    // Bob's write produced no snapshot, so the next one already has Cola
    let (_, next) = events.next_event().await;
    let names: Vec<&str> = next
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Cola"]);
}

#[tokio::test]
async fn test_live_sales_and_analytics_follow_checkout() {
    let app = TestApp::new().await;
    let token = app.sign_up("owner@shop.in").await;
    let cola = app.add_product(&token, "Cola", 50.0, 20).await;
    app.post("/api/pos/cart/items", json!({ "productId": cola, "quantity": 2 }), &token)
        .await;

    let mut sales = open_stream(&app, "/api/live/sales?limit=5", &token).await;
    let mut analytics = open_stream(&app, "/api/live/analytics", &token).await;

    let (_, first) = sales.next_event().await;
    assert!(first.as_array().unwrap().is_empty());
    let (_, summary) = analytics.next_event().await;
    assert_eq!(summary["saleCount"], 0);

    let response = app
        .post("/api/pos/checkout", json!({ "paymentMethod": "card" }), &token)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let listed = sales
        .next_matching("snapshot", |s| !s.as_array().unwrap().is_empty())
        .await;
    assert_eq!(listed[0]["totalCents"], 10_000);

    let summary = analytics
        .next_matching("snapshot", |s| s["saleCount"] == 1)
        .await;
    assert_eq!(summary["totalRevenueCents"], 10_000);
    assert_eq!(summary["invoiceStatus"]["paid"], 1);
}

#[tokio::test]
async fn test_live_invoices_carry_display_status() {
    let app = TestApp::new().await;
    let token = app.sign_up("owner@shop.in").await;

    let mut events = open_stream(&app, "/api/live/invoices", &token).await;
    let (_, first) = events.next_event().await;
    assert!(first.as_array().unwrap().is_empty());

    let created = app
        .post(
            "/api/invoices",
            json!({ "client": "Acme", "amount": 10, "description": "Work" }),
            &token,
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);

    let (name, next) = events.next_event().await;
    assert_eq!(name, "snapshot");
    assert_eq!(next[0]["client"], "Acme");
    assert_eq!(next[0]["displayStatus"], "Pending");
}

#[tokio::test]
async fn test_auth_events_start_signed_in() {
    let app = TestApp::new().await;
    let token = app.sign_up("owner@shop.in").await;
    let session = response_json(app.get("/api/auth/session", &token).await).await;

    let mut events = open_stream(&app, "/api/auth/events", &token).await;
    let (name, current) = events.next_event().await;
    assert_eq!(name, "auth");
    assert_eq!(current["kind"], "signed_in");
    assert_eq!(current["sessionId"], session["sessionId"]);
    assert!(current.get("userId").is_none());

    // A sign-in from another device reaches the open stream
    let signin = app
        .request(
            Method::POST,
            "/api/auth/signin",
            Some(json!({ "email": "owner@shop.in", "password": "secret123" })),
            None,
        )
        .await;
    assert_eq!(signin.status(), StatusCode::OK);

    let (name, later) = events.next_event().await;
    assert_eq!(name, "auth");
    assert_eq!(later["kind"], "signed_in");
    assert_ne!(later["sessionId"], session["sessionId"]);
}

#[tokio::test]
async fn test_live_requires_auth() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/live/products", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
