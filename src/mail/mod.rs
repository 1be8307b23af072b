//! Notification emails.
//!
//! Sending never blocks or fails a request: [`notify`] hands the message to a
//! spawned task and only logs the outcome.

pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::MailConfig;

pub use smtp::SmtpMailer;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("could not build message: {0}")]
    Message(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("send timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Used when SMTP is not configured: the message is only logged
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "Email (SMTP disabled)");
        tracing::debug!("{}", email.html_body);
        Ok(())
    }
}

pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    if config.smtp_enabled() {
        Ok(Arc::new(SmtpMailer::new(config)?))
    } else {
        tracing::info!("SMTP_HOST not set, emails will be logged instead of sent");
        Ok(Arc::new(LogMailer))
    }
}

/// Send in the background; failures are logged
pub fn notify(mailer: Arc<dyn Mailer>, email: OutgoingEmail) {
    tokio::spawn(async move {
        let to = email.to.clone();
        let subject = email.subject.clone();
        match mailer.send(email).await {
            Ok(()) => tracing::info!("Email '{}' sent to {}", subject, to),
            Err(e) => tracing::error!("Failed to send email '{}' to {}: {}", subject, to, e),
        }
    });
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records messages instead of sending them
    #[derive(Debug, Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<OutgoingEmail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(email);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingMailer;
    use super::*;

    #[tokio::test]
    async fn notify_delivers_in_background() {
        let mailer = Arc::new(RecordingMailer::default());
        notify(
            mailer.clone(),
            OutgoingEmail {
                to: "ana@example.com".to_string(),
                subject: "Hola".to_string(),
                html_body: "<p>Hola</p>".to_string(),
            },
        );

        for _ in 0..50 {
            if !mailer.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.com");
    }

    #[test]
    fn log_mailer_when_smtp_missing() {
        let config = MailConfig {
            smtp_host: None,
            smtp_port: 587,
            smtp_user: None,
            smtp_password: None,
            from: "Time2Go <no-reply@time2go.local>".to_string(),
        };
        assert!(from_config(&config).is_ok());
    }
}
