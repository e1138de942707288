use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tillbook_core::email::EmailParams;
use tillbook_server::email::{EmailError, EmailJsClient, EmailSender};

fn params() -> EmailParams {
    EmailParams {
        to_email: "ravi@mail.in".to_string(),
        to_name: "Ravi".to_string(),
        customer_name: "Ravi".to_string(),
        invoice_id: "inv-1".to_string(),
        total_amount: "130.00".to_string(),
        invoice_url: "http://localhost:8080/print/inv-1".to_string(),
        items: "Cola x 2 = ₹100.00".to_string(),
    }
}

#[tokio::test]
async fn test_send_posts_template_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1.0/email/send"))
        .and(body_partial_json(json!({
            "service_id": "service_x",
            "template_id": "template_y",
            "user_id": "key_z",
            "template_params": { "to_email": "ravi@mail.in", "total_amount": "130.00" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let client = EmailJsClient::new(format!("{}/api/v1.0/email/send", server.uri()));
    client
        .send("service_x", "template_y", &params(), "key_z")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("The Public Key is invalid"))
        .expect(1)
        .mount(&server)
        .await;

    let client = EmailJsClient::new(server.uri());
    let err = client
        .send("service_x", "template_y", &params(), "bad")
        .await
        .unwrap_err();

    match err {
        EmailError::Rejected { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("Public Key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
