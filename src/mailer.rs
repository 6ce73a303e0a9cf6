use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Clone)]
pub struct Email {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Outbound mail seam. Failures propagate so callers can decide whether a
/// failed send is fatal (registration) or merely logged (notifications).
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> anyhow::Result<()>;
}

/// SendGrid v3 mail client.
#[derive(Clone)]
pub struct SendgridMailer {
    http: reqwest::Client,
    api_key: String,
    from_address: String,
}

impl SendgridMailer {
    pub fn new(api_key: String, from_address: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from_address,
        }
    }
}

#[async_trait]
impl Mailer for SendgridMailer {
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        let recipients: Vec<_> = email.to.iter().map(|to| json!({ "email": to })).collect();
        let body = json!({
            "personalizations": [{ "to": recipients }],
            "from": { "email": self.from_address },
            "subject": email.subject,
            "content": [{ "type": "text/html", "value": email.html }],
        });

        let response = self
            .http
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("sendgrid request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("sendgrid rejected the message: {status} {detail}");
        }

        info!(to = ?email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Development mailer: logs instead of sending, so local environments work
/// without a SendGrid key.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        warn!(
            to = ?email.to,
            subject = %email.subject,
            "email delivery bypassed (no SENDGRID_API_KEY configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mailer = LogMailer;
        let email = Email {
            to: vec!["someone@example.com".into()],
            subject: "hello".into(),
            html: "<p>hi</p>".into(),
        };
        mailer.send(&email).await.expect("log mailer never fails");
    }
}
