use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::models::signup_models::SignupRecord;

const SMTP_PORT: u16 = 587;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("Failed to build email: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Emails the operator about new signups. Does nothing unless SMTP settings
/// were configured and notifications enabled.
#[derive(Clone, Default)]
pub struct AdminNotifier {
    smtp: Option<SmtpConfig>,
}

impl AdminNotifier {
    pub fn new(smtp: Option<SmtpConfig>) -> Self {
        Self { smtp }
    }

    pub fn disabled() -> Self {
        Self { smtp: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.smtp.is_some()
    }

    /// Fire-and-forget: sends on a background task and only logs failures.
    pub fn notify_signup(&self, record: &SignupRecord, position: u64) {
        let Some(smtp) = self.smtp.clone() else {
            return;
        };
        let record = record.clone();
        tokio::spawn(async move {
            match send_signup_email(&smtp, &record, position).await {
                Ok(()) => tracing::debug!("Admin notified about waitlist signup #{}", position),
                Err(e) => tracing::error!("Failed to notify admin about signup #{}: {}", position, e),
            }
        });
    }
}

pub fn build_signup_message(smtp: &SmtpConfig, record: &SignupRecord, position: u64) -> Result<Message, NotifyError> {
    let body = format!(
        "New waitlist signup #{}\n\nEmail: {}\nSource: {}\nTime: {}\nIP: {}\nUser agent: {}\n",
        position,
        record.email,
        record.source,
        record.submitted_at,
        record.client_address,
        record.agent_string,
    );
    let message = Message::builder()
        .from(smtp.from.parse()?)
        .to(smtp.admin_email.parse()?)
        .subject(format!("Waitlist signup #{}", position))
        .body(body)?;
    Ok(message)
}

async fn send_signup_email(smtp: &SmtpConfig, record: &SignupRecord, position: u64) -> Result<(), NotifyError> {
    let message = build_signup_message(smtp, record, position)?;
    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.server)?
        .port(SMTP_PORT)
        .credentials(Credentials::new(smtp.username.clone(), smtp.password.clone()))
        .build();
    mailer.send(message).await?;
    Ok(())
}
