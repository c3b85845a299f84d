pub mod resend;
pub mod smtp;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::MailTransportConfig;

pub use resend::ResendMailer;
pub use smtp::SmtpMailer;

/// Provider acknowledgement for an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentEmail {
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailError {
    pub message: String,
}

impl std::fmt::Display for MailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MailError {}

impl From<String> for MailError {
    fn from(message: String) -> Self {
        MailError { message }
    }
}

impl From<&str> for MailError {
    fn from(s: &str) -> Self {
        MailError {
            message: s.to_string(),
        }
    }
}

/// Outbound email transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<SentEmail, MailError>;
}

/// Build the configured transport, if any.
pub fn build_mailer(
    config: Option<&MailTransportConfig>,
    from: &str,
    timeout: Duration,
) -> Result<Option<Arc<dyn Mailer>>, String> {
    let mailer: Arc<dyn Mailer> = match config {
        None => return Ok(None),
        Some(MailTransportConfig::Smtp(smtp)) => Arc::new(SmtpMailer::new(smtp, from, timeout)?),
        Some(MailTransportConfig::Resend(resend)) => {
            Arc::new(ResendMailer::new(resend, from, timeout)?)
        }
    };
    Ok(Some(mailer))
}
