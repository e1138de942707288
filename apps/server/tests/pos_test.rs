mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{response_json, test_config, TestApp};

/// Polls the cart until it is no longer mid-checkout.
async fn settled_cart(app: &TestApp, token: &str) -> Value {
    for _ in 0..200 {
        let cart = response_json(app.get("/api/pos/cart", token).await).await;
        if cart["phase"] != "checkingOut" {
            return cart;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("cart stuck in checkout");
}

#[tokio::test]
async fn test_product_threshold_defaults_to_ten() {
    let app = TestApp::new().await;
    let token = app.sign_up("owner@shop.in").await;

    let id = app.add_product(&token, "Cola", 50.0, 5).await;

    let product = response_json(app.get(&format!("/api/products/{id}"), &token).await).await;
    assert_eq!(product["lowStockThreshold"], 10);

    let low = response_json(app.get("/api/products/low-stock", &token).await).await;
    assert_eq!(low.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_product_validation_and_category_filter() {
    let app = TestApp::new().await;
    let token = app.sign_up("owner@shop.in").await;

    let bad = app
        .post(
            "/api/products",
            json!({ "name": "Cola", "category": "Toys", "price": 10, "stock": 1 }),
            &token,
        )
        .await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(bad).await["field"], "category");

    let negative = app
        .post(
            "/api/products",
            json!({ "name": "Cola", "category": "Beverages", "price": -1, "stock": 1 }),
            &token,
        )
        .await;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    app.add_product(&token, "Cola", 50.0, 20).await;
    app.post(
        "/api/products",
        json!({ "name": "Chips", "category": "Snacks", "price": "30", "stock": "40" }),
        &token,
    )
    .await;

    let snacks = response_json(app.get("/api/products?category=Snacks", &token).await).await;
    assert_eq!(snacks.as_array().unwrap().len(), 1);
    let all = response_json(app.get("/api/products?category=All", &token).await).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_products_are_scoped_to_owner() {
    let app = TestApp::new().await;
    let alice = app.sign_up("alice@shop.in").await;
    let bob = app.sign_up("bob@shop.in").await;

    let id = app.add_product(&alice, "Cola", 50.0, 20).await;

    let response = app.get(&format!("/api/products/{id}"), &bob).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(response).await["redirect"], "/products");
}

#[tokio::test]
async fn test_checkout_without_email() {
    let app = TestApp::new().await;
    let token = app.sign_up("owner@shop.in").await;
    let cola = app.add_product(&token, "Cola", 50.0, 20).await;
    let chips = app.add_product(&token, "Chips", 30.0, 40).await;

    app.post("/api/pos/cart/items", json!({ "productId": cola, "quantity": 2 }), &token)
        .await;
    let cart = app
        .post("/api/pos/cart/items", json!({ "productId": chips }), &token)
        .await;
    let cart = response_json(cart).await;
    assert_eq!(cart["phase"], "populated");
    assert_eq!(cart["totals"]["totalCents"], 13_000);

    let response = app
        .post("/api/pos/checkout", json!({ "paymentMethod": "cash" }), &token)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = response_json(response).await;

    assert_eq!(receipt["sale"]["totalCents"], 13_000);
    assert_eq!(receipt["invoice"]["status"], "Paid");
    assert_eq!(receipt["invoice"]["client"], "Walk-in Customer");
    assert_eq!(receipt["invoice"]["description"], "POS Sale - Cola (2), Chips (1)");
    assert_eq!(receipt["email"]["status"], "not_requested");
    assert!(app.emails().is_empty());

    let cart = response_json(app.get("/api/pos/cart", &token).await).await;
    assert_eq!(cart["phase"], "empty");

    let product = response_json(app.get(&format!("/api/products/{cola}"), &token).await).await;
    assert_eq!(product["stock"], 18);

    let sales = response_json(app.get("/api/sales", &token).await).await;
    assert_eq!(sales["total"], 1);
    assert_eq!(sales["summary"]["revenueCents"], 13_000);
}

#[tokio::test]
async fn test_checkout_emails_customer() {
    let app = TestApp::new().await;
    let token = app.sign_up("owner@shop.in").await;
    let cola = app.add_product(&token, "Cola", 50.0, 20).await;

    app.post("/api/pos/cart/items", json!({ "productId": cola }), &token)
        .await;
    let response = app
        .post(
            "/api/pos/checkout",
            json!({ "paymentMethod": "card", "customer": "Ravi", "customerEmail": "ravi@mail.in" }),
            &token,
        )
        .await;
    let receipt = response_json(response).await;
    assert_eq!(receipt["email"]["status"], "sent");

    let sent = app.emails();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_email, "ravi@mail.in");
    assert_eq!(sent[0].customer_name, "Ravi");
    assert_eq!(sent[0].total_amount, "50.00");
}

#[tokio::test]
async fn test_empty_cart_checkout_is_refused() {
    let app = TestApp::new().await;
    let token = app.sign_up("owner@shop.in").await;

    let response = app.post("/api/pos/checkout", json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response_json(response).await["code"], "CART_ERROR");
}

#[tokio::test]
async fn test_oversell_refused_keeps_cart() {
    let mut config = test_config();
    config.allow_negative_stock = false;
    let app = TestApp::with_config(config).await;
    let token = app.sign_up("owner@shop.in").await;
    let cola = app.add_product(&token, "Cola", 50.0, 1).await;

    app.post("/api/pos/cart/items", json!({ "productId": cola, "quantity": 3 }), &token)
        .await;
    let response = app
        .post("/api/pos/checkout", json!({ "paymentMethod": "cash" }), &token)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let cart = response_json(app.get("/api/pos/cart", &token).await).await;
    assert_eq!(cart["phase"], "populated");
    assert_eq!(cart["totals"]["totalQuantity"], 3);

    let product = response_json(app.get(&format!("/api/products/{cola}"), &token).await).await;
    assert_eq!(product["stock"], 1);
}

#[tokio::test]
async fn test_cart_quantity_edits() {
    let app = TestApp::new().await;
    let token = app.sign_up("owner@shop.in").await;
    let cola = app.add_product(&token, "Cola", 50.0, 20).await;

    app.post("/api/pos/cart/items", json!({ "productId": cola, "quantity": 2 }), &token)
        .await;
    let cart = app
        .post(&format!("/api/pos/cart/items/{cola}/decrement"), json!({}), &token)
        .await;
    assert_eq!(response_json(cart).await["totals"]["totalQuantity"], 1);

    let cart = app
        .put(&format!("/api/pos/cart/items/{cola}"), json!({ "quantity": 0 }), &token)
        .await;
    assert_eq!(response_json(cart).await["phase"], "empty");

    let missing = app
        .request(
            Method::DELETE,
            &format!("/api/pos/cart/items/{cola}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_customer_email_is_reported_not_stored() {
    let app = TestApp::new().await;
    let token = app.sign_up("owner@shop.in").await;
    let cola = app.add_product(&token, "Cola", 50.0, 20).await;

    app.post("/api/pos/cart/items", json!({ "productId": cola }), &token)
        .await;
    let response = app
        .post(
            "/api/pos/checkout",
            json!({ "paymentMethod": "cash", "customer": "Ravi", "customerEmail": "ravi-at-mail" }),
            &token,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = response_json(response).await;

    assert_eq!(receipt["email"]["status"], "failed");
    assert_eq!(receipt["email"]["reason"], "Invalid email address format");
    assert!(receipt["invoice"]["email"].is_null());
    assert!(app.emails().is_empty());

    // The derived invoice stays editable
    let id = receipt["invoice"]["id"].as_str().unwrap();
    let edited = app
        .put(
            &format!("/api/invoices/{id}"),
            json!({
                "client": "Ravi Kumar",
                "amount": 50,
                "description": "POS Sale - Cola (1)",
                "dueDate": receipt["invoice"]["dueDate"],
            }),
            &token,
        )
        .await;
    assert_eq!(edited.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_abandoned_checkout_settles_cart() {
    for polls in 1..=12 {
        let app = TestApp::new().await;
        let token = app.sign_up("owner@shop.in").await;
        let cola = app.add_product(&token, "Cola", 50.0, 20).await;
        app.post("/api/pos/cart/items", json!({ "productId": cola, "quantity": 2 }), &token)
            .await;

        // Client goes away after a few polls of the request
        {
            let mut checkout = Box::pin(app.post("/api/pos/checkout", json!({ "paymentMethod": "cash" }), &token));
            for _ in 0..polls {
                if futures::poll!(checkout.as_mut()).is_ready() {
                    break;
                }
                tokio::task::yield_now().await;
            }
        }

        let cart = settled_cart(&app, &token).await;
        let sales = response_json(app.get("/api/sales", &token).await).await;
        match cart["phase"].as_str() {
            Some("empty") => assert_eq!(sales["total"], 1, "cleared cart without a sale ({polls} polls)"),
            Some("populated") => assert_eq!(sales["total"], 0, "sale recorded but cart kept ({polls} polls)"),
            other => panic!("unexpected cart phase {other:?}"),
        }

        // The till keeps working
        let added = app
            .post("/api/pos/cart/items", json!({ "productId": cola }), &token)
            .await;
        assert_eq!(added.status(), StatusCode::OK);
        let retry = app
            .post("/api/pos/checkout", json!({ "paymentMethod": "cash" }), &token)
            .await;
        assert_eq!(retry.status(), StatusCode::CREATED);
    }
}
