#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{self, Body, BodyDataStream};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tillbook_core::email::{EmailCredentials, EmailParams};
use tillbook_db::{Database, DbConfig};
use tillbook_server::email::{EmailError, EmailSender};
use tillbook_server::{build_router, AppState, ServerConfig};

/// Records every email instead of sending it.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<EmailParams>>,
    pub fail_with: Option<u16>,
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send(
        &self,
        _service_id: &str,
        _template_id: &str,
        params: &EmailParams,
        _public_key: &str,
    ) -> Result<(), EmailError> {
        if let Some(status) = self.fail_with {
            return Err(EmailError::Rejected {
                status,
                body: "rejected".to_string(),
            });
        }
        self.sent.lock().unwrap().push(params.clone());
        Ok(())
    }
}

/// Router over a fresh in-memory database.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    pub sender: Arc<RecordingSender>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        Self::build(config, RecordingSender::default()).await
    }

    pub async fn build(config: ServerConfig, sender: RecordingSender) -> Self {
        let db = Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database");
        let sender = Arc::new(sender);
        let state = Arc::new(AppState::with_sender(db, config, sender.clone()));
        TestApp {
            router: build_router(state.clone()),
            state,
            sender,
        }
    }

    pub fn emails(&self) -> Vec<EmailParams> {
        self.sender.sent.lock().unwrap().clone()
    }

    /// Sends a request with an optional bearer token.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
            }
            None => Body::empty(),
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.request(Method::GET, uri, None, Some(token)).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: &str) -> Response {
        self.request(Method::POST, uri, Some(body), Some(token)).await
    }

    pub async fn put(&self, uri: &str, body: Value, token: &str) -> Response {
        self.request(Method::PUT, uri, Some(body), Some(token)).await
    }

    /// Signs up a new account and returns its token.
    pub async fn sign_up(&self, email: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/auth/signup",
                Some(json!({ "email": email, "password": "secret123", "confirmPassword": "secret123" })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response_json(response).await;
        body["token"].as_str().expect("token in sign-up response").to_string()
    }

    /// Creates a product and returns its id.
    pub async fn add_product(&self, token: &str, name: &str, price: f64, stock: i64) -> String {
        let response = self
            .post(
                "/api/products",
                json!({ "name": name, "category": "Beverages", "price": price, "stock": stock }),
                token,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response_json(response).await["id"].as_str().unwrap().to_string()
    }
}

/// Test configuration with email credentials filled in.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::for_tests(":memory:");
    config.email = EmailCredentials {
        service_id: "service_test".to_string(),
        template_id: "template_test".to_string(),
        public_key: "public_test".to_string(),
    };
    config
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn response_bytes(response: Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body")
        .to_vec()
}

/// Reads server-sent events off a streaming response body.
pub struct SseReader {
    body: BodyDataStream,
    buffer: String,
}

impl SseReader {
    pub fn new(response: Response) -> Self {
        SseReader {
            body: response.into_body().into_data_stream(),
            buffer: String::new(),
        }
    }

    /// Next event as `(name, data)`; comment-only frames are skipped.
    pub async fn next_event(&mut self) -> (String, Value) {
        tokio::time::timeout(Duration::from_secs(5), self.read_event())
            .await
            .expect("timed out waiting for an event")
    }

    /// Reads events until one named `name` satisfies `accept`.
    pub async fn next_matching<F>(&mut self, name: &str, accept: F) -> Value
    where
        F: Fn(&Value) -> bool,
    {
        loop {
            let (event, data) = self.next_event().await;
            if event == name && accept(&data) {
                return data;
            }
        }
    }

    async fn read_event(&mut self) -> (String, Value) {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let frame: String = self.buffer.drain(..end + 2).collect();
                if let Some(event) = parse_frame(&frame) {
                    return event;
                }
                continue;
            }
            let chunk = self
                .body
                .next()
                .await
                .expect("event stream ended")
                .expect("event stream chunk");
            self.buffer.push_str(std::str::from_utf8(&chunk).expect("utf-8 event stream"));
        }
    }
}

fn parse_frame(frame: &str) -> Option<(String, Value)> {
    let mut name = String::from("message");
    let mut data = Vec::new();
    for line in frame.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            name = value.trim_start().to_string();
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }
    if data.is_empty() {
        return None;
    }
    let data = data.join("\n");
    let value = serde_json::from_str(&data).unwrap_or(Value::String(data));
    Some((name, value))
}
