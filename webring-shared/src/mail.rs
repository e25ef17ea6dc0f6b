/// Outgoing email
///
/// Registration emails are best-effort: `UserService::register` dispatches
/// them on a detached task and only logs failures. Two mailers are provided:
///
/// - `HttpMailer`: POSTs a JSON message to a transactional mail endpoint
/// - `LogMailer`: writes the message to the log (development default)

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::models::user::User;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Mail endpoint rejected message with status {0}")]
    Rejected(u16),
}

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl EmailMessage {
    pub fn registration(from: &str, user: &User) -> Self {
        Self {
            from: from.to_string(),
            to: user.email.clone(),
            subject: "Welcome to the webring".to_string(),
            text: format!(
                "Hi {},\n\nYour account has been created. You can now create \
                 webrings and add your sites to them.\n",
                user.username
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_registration_email(&self, user: &User) -> Result<(), MailError>;
}

/// Mailer for a JSON-over-HTTP delivery service
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            from: from.into(),
        }
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let mut request = self.client.post(&self.endpoint).json(message);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_registration_email(&self, user: &User) -> Result<(), MailError> {
        let message = EmailMessage::registration(&self.from, user);
        self.send(&message).await?;
        info!(user_id = %user.id, "Registration email sent");
        Ok(())
    }
}

/// Mailer that only logs, used when no mail endpoint is configured
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_registration_email(&self, user: &User) -> Result<(), MailError> {
        let message = EmailMessage::registration(&self.from, user);
        info!(
            to = %message.to,
            subject = %message.subject,
            "Mail delivery disabled, registration email not sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_registration_message() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let message = EmailMessage::registration("noreply@webring.test", &user);
        assert_eq!(message.to, "alice@example.com");
        assert_eq!(message.from, "noreply@webring.test");
        assert!(message.text.contains("alice"));
    }
}
