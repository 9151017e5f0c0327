use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Real SMTP delivery over a relay with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .context("smtp relay")?
            .credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from: cfg.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.parse().context("invalid from address")?)
            .to(to.parse().context("invalid to address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("build email")?;

        self.transport.send(email).await.context("smtp send")?;
        info!(%to, %subject, "email sent");
        Ok(())
    }
}

/// Development fallback: logs the mail instead of sending it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(%to, %subject, %body, "email (log only, SMTP not configured)");
        Ok(())
    }
}

pub fn reset_request_email(frontend_url: &str, token: &str) -> (String, String) {
    let subject = "Reset your password".to_string();
    let body = format!(
        "You are receiving this email because you (or someone else) have requested \
         the reset of the password for your account at Palette.\n\n\
         Please click on the following link, or paste this into your browser to \
         complete the process:\n\n\
         https://{frontend_url}/reset/{token}\n\n\
         If you did not request this, please ignore this email and your password \
         will remain unchanged.\n"
    );
    (subject, body)
}

pub fn password_changed_email(frontend_url: &str, email: &str) -> (String, String) {
    let subject = "Your password has been changed".to_string();
    let body = format!(
        "Hello,\n\nThis is a confirmation that the password for your account \
         {email} has just been changed.\n\n\
         Use your new password to login at https://{frontend_url}/login\n"
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_request_email_contains_link() {
        let (subject, body) = reset_request_email("app.example.com", "deadbeef");
        assert_eq!(subject, "Reset your password");
        assert!(body.contains("https://app.example.com/reset/deadbeef"));
    }

    #[test]
    fn password_changed_email_mentions_account() {
        let (_, body) = password_changed_email("app.example.com", "ada@x.com");
        assert!(body.contains("ada@x.com"));
        assert!(body.contains("https://app.example.com/login"));
    }
}
