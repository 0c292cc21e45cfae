//! Outgoing mail.
//!
//! Mail goes out over SMTP when an `[email]` section is configured. Without
//! one the service is disabled and only logs what it would have sent.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use studyhub_common::{AppError, AppResult, config::EmailConfig};

#[derive(Clone)]
struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

/// Email service.
#[derive(Clone, Default)]
pub struct EmailService {
    mailer: Option<SmtpMailer>,
}

impl EmailService {
    /// Build the service from the optional SMTP configuration.
    pub fn new(config: Option<&EmailConfig>) -> AppResult<Self> {
        let Some(config) = config else {
            return Ok(Self::disabled());
        };

        let from: Mailbox = config
            .from_address
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid email.from_address: {e}")))?;

        let builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                    .map_err(|e| AppError::Config(format!("Invalid SMTP relay: {e}")))?
                    .credentials(Credentials::new(username.clone(), password.clone()))
            }
            // Unauthenticated relays are local test servers (MailHog and the like).
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host),
        };
        let transport = builder.port(config.smtp_port).build();

        tracing::info!(host = %config.smtp_host, port = config.smtp_port, "SMTP delivery enabled");
        Ok(Self {
            mailer: Some(SmtpMailer { transport, from }),
        })
    }

    /// A service that never sends.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { mailer: None }
    }

    /// Whether mail is actually delivered.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Send a plain-text message.
    pub async fn send(&self, to: &str, subject: &str, body: String) -> AppResult<()> {
        let Some(mailer) = &self.mailer else {
            tracing::info!(to, subject, "Email disabled; message not sent");
            return Ok(());
        };

        let to: Mailbox = to
            .parse()
            .map_err(|e| AppError::Email(format!("Invalid recipient: {e}")))?;
        let message = Message::builder()
            .from(mailer.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::Email(e.to_string()))?;

        mailer
            .transport
            .send(message)
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;

        tracing::debug!(subject, "Email sent");
        Ok(())
    }

    /// Send the password reset mail carrying the raw reset token.
    pub async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        token: &str,
        valid_minutes: i64,
    ) -> AppResult<()> {
        let body = format!(
            "Hi {name},\n\n\
             Someone asked to reset the password of your StudyHub account.\n\
             Use this code to choose a new password:\n\n    {token}\n\n\
             The code expires in {valid_minutes} minutes. If you did not ask for \
             a reset you can ignore this mail.\n"
        );
        self.send(to, "Reset your StudyHub password", body).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_service_accepts_mail() {
        let service = EmailService::new(None).unwrap();
        assert!(!service.is_enabled());
        service
            .send_password_reset("alice@example.com", "Alice", "token", 60)
            .await
            .unwrap();
    }

    #[test]
    fn test_invalid_from_address_is_config_error() {
        let config = EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            username: None,
            password: None,
            from_address: "not an address".to_string(),
        };
        assert!(matches!(
            EmailService::new(Some(&config)),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_local_relay_builds() {
        let config = EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            username: None,
            password: None,
            from_address: "StudyHub <no-reply@example.com>".to_string(),
        };
        assert!(EmailService::new(Some(&config)).unwrap().is_enabled());
    }
}
