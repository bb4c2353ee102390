//! Transactional email.
//!
//! Account emails are fire-and-forget: `send_welcome_email` and
//! `send_cancellation_email` spawn the delivery on the actix runtime and return
//! immediately. A failed delivery is logged and otherwise dropped; it never
//! reaches the HTTP caller and is never retried.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use serde_json::json;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl EmailMessage {
    pub fn welcome(email: &str, name: &str) -> Self {
        Self {
            to: email.to_string(),
            subject: "Welcome to Task Manager!".to_string(),
            text: format!("Welcome to the app, {}. Let me know what you think!", name),
        }
    }

    pub fn cancellation(email: &str, name: &str) -> Self {
        Self {
            to: email.to_string(),
            subject: "We're sorry to see you go".to_string(),
            text: format!(
                "We hate to see you go, {}. We'd love to hear what we could have done differently.",
                name
            ),
        }
    }
}

#[derive(Debug)]
pub enum MailError {
    Transport(String),
    Rejected { status: u16, body: String },
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MailError::Transport(msg) => write!(f, "mail transport failed: {}", msg),
            MailError::Rejected { status, body } => {
                write!(f, "mail provider rejected message ({}): {}", status, body)
            }
        }
    }
}

impl std::error::Error for MailError {}

impl From<reqwest::Error> for MailError {
    fn from(error: reqwest::Error) -> Self {
        MailError::Transport(error.to_string())
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Delivers mail through the SendGrid v3 API.
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }

    fn payload(&self, message: &EmailMessage) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from },
            "subject": message.subject,
            "content": [{ "type": "text/plain", "value": message.text }]
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let response = self
            .client
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&self.payload(&message))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Writes messages to the log instead of sending them. Used when no provider key is set.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!("Email to {} ({}): {}", message.to, message.subject, message.text);
        Ok(())
    }
}

pub fn send_welcome_email(mailer: Arc<dyn Mailer>, email: &str, name: &str) {
    dispatch(mailer, EmailMessage::welcome(email, name));
}

pub fn send_cancellation_email(mailer: Arc<dyn Mailer>, email: &str, name: &str) {
    dispatch(mailer, EmailMessage::cancellation(email, name));
}

fn dispatch(mailer: Arc<dyn Mailer>, message: EmailMessage) {
    actix_web::rt::spawn(async move {
        let recipient = message.to.clone();
        if let Err(e) = mailer.send(message).await {
            warn!("Dropping email to {}: {}", recipient, e);
        }
    });
}
