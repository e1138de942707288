//! Invoice email notifications.
//!
//! ## Delivery
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save / checkout committed                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Notifier::notify(address)                                              │
//! │       ├── no address        → NotRequested                              │
//! │       ├── precheck fails    → Failed("Email service is not configured") │
//! │       │                       Failed("Invalid email address format")    │
//! │       └── EmailSender::send → Sent | Failed(provider reason)            │
//! │                                                                         │
//! │  One attempt. The outcome rides along in the response; the save it      │
//! │  accompanies is never undone.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use tillbook_core::email::{precheck, EmailCredentials, EmailOutcome, EmailParams};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Something that can deliver a templated email.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(
        &self,
        service_id: &str,
        template_id: &str,
        params: &EmailParams,
        public_key: &str,
    ) -> Result<(), EmailError>;
}

/// EmailJS REST API client.
#[derive(Debug, Clone)]
pub struct EmailJsClient {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a EmailParams,
}

impl EmailJsClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        EmailJsClient {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl EmailSender for EmailJsClient {
    async fn send(
        &self,
        service_id: &str,
        template_id: &str,
        params: &EmailParams,
        public_key: &str,
    ) -> Result<(), EmailError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&SendRequest {
                service_id,
                template_id,
                user_id: public_key,
                template_params: params,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(EmailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Sends invoice notifications with the configured credentials.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn EmailSender>,
    credentials: EmailCredentials,
}

impl Notifier {
    pub fn new(sender: Arc<dyn EmailSender>, credentials: EmailCredentials) -> Self {
        Notifier { sender, credentials }
    }

    /// Attempts one notification. `build` receives the checked address.
    pub async fn notify<F>(&self, invoice_id: &str, address: Option<&str>, build: F) -> EmailOutcome
    where
        F: FnOnce(&str) -> EmailParams,
    {
        let Some(address) = address.map(str::trim).filter(|a| !a.is_empty()) else {
            return EmailOutcome::NotRequested;
        };

        let address = match precheck(&self.credentials, address) {
            Ok(a) => a,
            Err(e) => {
                warn!(invoice_id, reason = %e, "Invoice email not sent");
                return EmailOutcome::failed(e.to_string());
            }
        };

        let params = build(&address);
        match self
            .sender
            .send(
                &self.credentials.service_id,
                &self.credentials.template_id,
                &params,
                &self.credentials.public_key,
            )
            .await
        {
            Ok(()) => {
                info!(invoice_id, to = %address, "Invoice email sent");
                EmailOutcome::Sent
            }
            Err(e) => {
                warn!(invoice_id, to = %address, error = %e, "Invoice email failed");
                EmailOutcome::failed(e.to_string())
            }
        }
    }
}
