//! Match-created notifications.
//!
//! Delivery is best-effort: callers spawn sends and only log failures.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SmtpSettings;

/// Notification sending error
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Payload describing a newly created match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCreatedNotice {
    #[serde(rename = "projectId")]
    pub project_id: Uuid,
    pub country: String,
    #[serde(rename = "vendorName")]
    pub vendor_name: String,
    pub score: Decimal,
}

impl MatchCreatedNotice {
    pub fn subject(&self) -> String {
        format!(
            "New vendor match for Project {}: {}",
            self.project_id, self.vendor_name
        )
    }

    pub fn body(&self) -> String {
        format!(
            "A new match was created for project {} ({}): {} (score {}).",
            self.project_id, self.country, self.vendor_name, self.score
        )
    }
}

/// Capability for telling a client about new matches
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_match_created(
        &self,
        recipient: &str,
        notice: &MatchCreatedNotice,
    ) -> Result<(), NotifyError>;
}

/// SMTP notifier
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpNotifier {
    pub fn new(
        host: &str,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        use_tls: bool,
        from: String,
    ) -> Result<Self, NotifyError> {
        let mut builder = if use_tls {
            let tls_params = TlsParameters::new(host.to_string()).map_err(|e| {
                NotifyError::InvalidConfig(format!("TLS configuration error: {}", e))
            })?;

            // Port 465 uses implicit TLS (SMTPS), other ports use STARTTLS
            if port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                    .map_err(|e| NotifyError::InvalidConfig(format!("SMTP relay error: {}", e)))?
                    .port(port)
                    .tls(Tls::Wrapper(tls_params))
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|e| NotifyError::InvalidConfig(format!("SMTP relay error: {}", e)))?
                    .port(port)
                    .tls(Tls::Required(tls_params))
            }
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port)
        };

        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    pub fn from_settings(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        Self::new(
            &settings.host,
            settings.port,
            settings.username.clone(),
            settings.password.clone(),
            settings.use_tls,
            settings.from.clone(),
        )
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify_match_created(
        &self,
        recipient: &str,
        notice: &MatchCreatedNotice,
    ) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.parse().map_err(|e| {
                NotifyError::InvalidConfig(format!("Invalid from address: {}", e))
            })?)
            .to(recipient
                .parse()
                .map_err(|e| NotifyError::SendFailed(format!("Invalid recipient address: {}", e)))?)
            .subject(notice.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(notice.body())
            .map_err(|e| NotifyError::SendFailed(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::SendFailed(format!("SMTP error: {}", e)))?;

        tracing::info!("Match notification sent to {}", recipient);
        Ok(())
    }
}

/// Notifier that only logs, used when SMTP is not configured
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_match_created(
        &self,
        recipient: &str,
        notice: &MatchCreatedNotice,
    ) -> Result<(), NotifyError> {
        tracing::info!("Notification for {}: {}", recipient, notice.body());
        Ok(())
    }
}

/// Notifier that keeps every notice in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, MatchCreatedNotice)>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that records each attempt and then reports failure
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, MatchCreatedNotice)> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_match_created(
        &self,
        recipient: &str,
        notice: &MatchCreatedNotice,
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((recipient.to_string(), notice.clone()));

        if self.fail {
            return Err(NotifyError::SendFailed("recording notifier set to fail".to_string()));
        }
        Ok(())
    }
}

/// Pick the notifier for the configured environment
pub fn create_notifier(settings: Option<&SmtpSettings>) -> Result<Arc<dyn Notifier>, NotifyError> {
    match settings {
        Some(smtp) => Ok(Arc::new(SmtpNotifier::from_settings(smtp)?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn notice() -> MatchCreatedNotice {
        MatchCreatedNotice {
            project_id: Uuid::nil(),
            country: "UAE".to_string(),
            vendor_name: "Desert Growth".to_string(),
            score: dec!(9.00),
        }
    }

    #[test]
    fn test_notice_text() {
        let notice = notice();
        assert_eq!(
            notice.subject(),
            "New vendor match for Project 00000000-0000-0000-0000-000000000000: Desert Growth"
        );
        assert_eq!(
            notice.body(),
            "A new match was created for project 00000000-0000-0000-0000-000000000000 (UAE): Desert Growth (score 9.00)."
        );
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::failing();

        let result = notifier.notify_match_created("ops@acme.test", &notice()).await;

        assert!(result.is_err());
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].0, "ops@acme.test");
    }

    #[test]
    fn test_log_notifier_without_smtp() {
        assert!(create_notifier(None).is_ok());
    }
}
