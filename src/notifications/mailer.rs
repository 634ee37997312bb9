use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("email provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("email transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl MailerError {
    /// Worth retrying later: network trouble, throttling or provider outages.
    pub fn is_transient(&self) -> bool {
        match self {
            MailerError::Transport(_) => true,
            MailerError::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, email: &RenderedEmail) -> Result<(), MailerError>;
}

/// Posts messages to an HTTP email API that accepts
/// `{from, to: [..], subject, html}` with a bearer key.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, from: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            from: from.into(),
        }
    }
}

#[derive(Serialize)]
struct ProviderPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &RenderedEmail) -> Result<(), MailerError> {
        let payload = ProviderPayload {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to = %email.to, subject = %email.subject, "email accepted by provider");
        Ok(())
    }
}

/// Used when no provider is configured; messages only reach the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &RenderedEmail) -> Result<(), MailerError> {
        info!(to = %email.to, subject = %email.subject, "email delivery disabled; message logged only");
        Ok(())
    }
}

pub fn build_mailer(config: &AppConfig) -> Arc<dyn Mailer> {
    match &config.email_api_url {
        Some(endpoint) => Arc::new(HttpMailer::new(
            endpoint.clone(),
            config.email_api_key.clone(),
            config.email_from.clone(),
        )),
        None => Arc::new(LogMailer),
    }
}
