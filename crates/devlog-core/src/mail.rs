//! Outbound email
//!
//! Mail is always best effort: callers log a failed send and carry on.
//! Without SMTP settings the service runs with [`DisabledMailer`], which only
//! logs what it would have sent.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// A rendered email ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// SMTP settings
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    /// Implicit TLS (usually port 465); STARTTLS otherwise
    pub secure: bool,
    pub username: String,
    pub password: String,
    pub from: String,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| MailError::Transport(e.to_string()))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|_| MailError::InvalidAddress(config.from.clone()))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|_| MailError::InvalidAddress(message.to.clone()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                message.text,
                message.html,
            ))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        info!("Email sent to {} ({})", message.to, message.subject);
        Ok(())
    }
}

/// Used when SMTP is not configured
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        info!(
            "Email disabled, would send '{}' to {}",
            message.subject, message.to
        );
        Ok(())
    }
}

/// Build the mailer for the given settings, falling back to
/// [`DisabledMailer`] when none are given or the transport can't be built
pub fn mailer_from_config(config: Option<&MailConfig>) -> Arc<dyn Mailer> {
    match config {
        Some(config) => match SmtpMailer::new(config) {
            Ok(mailer) => {
                info!("SMTP mailer configured for {}:{}", config.host, config.port);
                Arc::new(mailer)
            }
            Err(e) => {
                warn!("SMTP mailer unavailable, email disabled: {}", e);
                Arc::new(DisabledMailer)
            }
        },
        None => {
            info!("SMTP not configured, email disabled");
            Arc::new(DisabledMailer)
        }
    }
}

/// Send and swallow failures
pub(crate) async fn send_best_effort(mailer: &dyn Mailer, message: MailMessage) {
    let to = message.to.clone();
    if let Err(e) = mailer.send(message).await {
        warn!("Failed to send email to {}: {}", to, e);
    }
}

pub mod templates {
    use super::MailMessage;

    pub fn reminder(to: &str, full_name: &str, date: &str, app_url: &str) -> MailMessage {
        let link = format!("{}/daily-log", app_url.trim_end_matches('/'));
        let text = format!(
            "Hi {name},\n\n\
             This is a friendly reminder that you haven't submitted your daily log for {date} yet.\n\n\
             Submit it here: {link}\n\n\
             The DevLog Team",
            name = full_name,
            date = date,
            link = link,
        );
        let html = format!(
            "<div style=\"font-family: sans-serif; max-width: 600px; margin: 0 auto;\">\
             <h2 style=\"color: #4f46e5;\">DevLog Reminder</h2>\
             <p>Hi {name},</p>\
             <p>This is a friendly reminder that you haven't submitted your daily log for <strong>{date}</strong> yet.</p>\
             <p><a href=\"{link}\" style=\"background: #4f46e5; color: white; padding: 10px 20px; \
             text-decoration: none; border-radius: 6px;\">Submit Daily Log</a></p>\
             <p style=\"color: #6b7280;\">The DevLog Team</p>\
             </div>",
            name = html_escape(full_name),
            date = date,
            link = link,
        );

        MailMessage {
            to: to.to_string(),
            subject: "DevLog Reminder: Don't Forget Your Daily Log!".to_string(),
            text,
            html,
        }
    }

    pub fn review(
        to: &str,
        full_name: &str,
        reviewer_name: &str,
        date: &str,
        feedback: &str,
        app_url: &str,
    ) -> MailMessage {
        let link = format!("{}/dashboard", app_url.trim_end_matches('/'));
        let text = format!(
            "Hi {name},\n\n\
             {reviewer} has reviewed your daily log for {date}.\n\n\
             Feedback:\n{feedback}\n\n\
             View it here: {link}\n\n\
             The DevLog Team",
            name = full_name,
            reviewer = reviewer_name,
            date = date,
            feedback = feedback,
            link = link,
        );
        let html = format!(
            "<div style=\"font-family: sans-serif; max-width: 600px; margin: 0 auto;\">\
             <h2 style=\"color: #4f46e5;\">Your Log Has Been Reviewed</h2>\
             <p>Hi {name},</p>\
             <p>{reviewer} has reviewed your daily log for <strong>{date}</strong>.</p>\
             <blockquote style=\"border-left: 4px solid #4f46e5; padding-left: 12px; color: #374151;\">{feedback}</blockquote>\
             <p><a href=\"{link}\">View your logs</a></p>\
             <p style=\"color: #6b7280;\">The DevLog Team</p>\
             </div>",
            name = html_escape(full_name),
            reviewer = html_escape(reviewer_name),
            date = date,
            feedback = html_escape(feedback),
            link = link,
        );

        MailMessage {
            to: to.to_string(),
            subject: format!("DevLog: Your log for {} has been reviewed", date),
            text,
            html,
        }
    }

    fn html_escape(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }
}
