use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::EmailConfig;

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to_email: String,
    pub to_name: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html_body: String,
}

/// Mail-sending collaborator
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .context("Invalid from email address")?;

        let creds = Credentials::new(config.smtp_login.clone(), config.smtp_password.clone());
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
                .context("Invalid SMTP server for TLS")?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_server)
        }
        .port(config.smtp_port)
        .credentials(creds);

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let to_address: Mailbox = format!("{} <{}>", email.to_name, email.to_email)
            .parse()
            .context("Invalid recipient email address")?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to_address)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML);
        if let Some(reply_to) = &email.reply_to {
            let reply_to: Mailbox = reply_to.parse().context("Invalid reply-to address")?;
            builder = builder.reply_to(reply_to);
        }

        let message = builder
            .body(email.html_body)
            .context("Failed to build email message")?;

        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;

        tracing::info!(to = %email.to_email, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Logs messages instead of delivering them (EMAIL_SEND_DISABLED)
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        tracing::info!(
            to = %email.to_email,
            subject = %email.subject,
            "Email sending disabled, message not delivered"
        );
        tracing::debug!(body = %email.html_body, "Suppressed email body");
        Ok(())
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub fn password_reset_email(
    to_email: &str,
    to_name: &str,
    code: &str,
    ttl_minutes: i64,
) -> OutgoingEmail {
    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 480px; margin: 0 auto;">
  <h2>Reset your SkillPath password</h2>
  <p>Hi {name},</p>
  <p>Use the code below to reset your password. It expires in {ttl} minutes.</p>
  <p style="font-size: 28px; font-weight: bold; letter-spacing: 6px;">{code}</p>
  <p>If you did not request a password reset you can ignore this email.</p>
</div>"#,
        name = escape_html(to_name),
        ttl = ttl_minutes,
        code = code,
    );

    OutgoingEmail {
        to_email: to_email.to_string(),
        to_name: to_name.to_string(),
        reply_to: None,
        subject: "Your SkillPath password reset code".to_string(),
        html_body,
    }
}

pub fn contact_email(
    recipient: &str,
    sender_name: &str,
    sender_email: &str,
    subject: &str,
    message: &str,
) -> OutgoingEmail {
    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif;">
  <h2>New contact form message</h2>
  <p><strong>From:</strong> {name} &lt;{email}&gt;</p>
  <p><strong>Subject:</strong> {subject}</p>
  <p>{message}</p>
</div>"#,
        name = escape_html(sender_name),
        email = escape_html(sender_email),
        subject = escape_html(subject),
        message = escape_html(message).replace('\n', "<br>"),
    );

    OutgoingEmail {
        to_email: recipient.to_string(),
        to_name: "SkillPath Support".to_string(),
        reply_to: Some(sender_email.to_string()),
        subject: format!("[Contact] {}", subject),
        html_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_email_escapes_user_input() {
        let email = contact_email(
            "support@example.com",
            "<b>Eve</b>",
            "eve@example.com",
            "Hi & bye",
            "line1\n<script>",
        );
        assert!(email.html_body.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(email.html_body.contains("Hi &amp; bye"));
        assert!(email.html_body.contains("line1<br>&lt;script&gt;"));
        assert_eq!(email.reply_to.as_deref(), Some("eve@example.com"));
    }

    #[test]
    fn reset_email_contains_code() {
        let email = password_reset_email("a@example.com", "Ann", "123456", 15);
        assert!(email.html_body.contains("123456"));
        assert!(email.html_body.contains("15 minutes"));
    }
}
