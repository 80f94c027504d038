//! Follow-up notices for recipients who clicked a simulated lure.

use std::path::Path;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::info;

use super::engagement::EngagementRecord;
use crate::config::MailConfig;
use crate::error::MailError;

/// File name the training attachment is sent under.
pub const ATTACHMENT_NAME: &str = "training_phishing.pdf";

/// Port that speaks TLS from the first byte; anything else upgrades via STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

#[async_trait]
pub trait NoticeMailer: Send + Sync {
    async fn send_notice(&self, record: &EngagementRecord) -> Result<(), MailError>;
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML body of the notice, addressed to the recipient by name.
pub fn notice_html(first_name: &str, last_name: &str) -> String {
    let name = escape_html(format!("{first_name} {last_name}").trim());
    format!(
        r#"<html>
  <body style="font-family: Arial, sans-serif; background-color: #f4f4f4; color: #333;">
    <h1 style="color: #2c3e50;">Phishing Simulation Campaign Results</h1>
    <p>Dear {name},</p>
    <p>Thank you for participating in our recent phishing simulation campaign. The results are as follows:</p>
    <ul>
      <li>You clicked on a phishing link during this campaign.</li>
    </ul>
    <p>To get better at recognising phishing attempts, please complete the recommended training modules.</p>
    <p>If you have any questions, please reach out to the security team.</p>
    <footer style="margin-top: 20px; font-size: 12px; color: #7f8c8d;">
      <p>This email is part of a simulated phishing awareness campaign. Please stay cautious and do not click suspicious links in real messages.</p>
    </footer>
  </body>
</html>"#
    )
}

/// Sends notices through an authenticated SMTP relay.
pub struct SmtpNoticeMailer {
    config: MailConfig,
}

impl SmtpNoticeMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    /// Build the full MIME message for `record`.
    pub fn build_message(&self, record: &EngagementRecord) -> Result<Message, MailError> {
        let from: Mailbox = self
            .config
            .username
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address {
                address: self.config.username.clone(),
                reason: e.to_string(),
            })?;
        let to: Mailbox = record
            .email
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address {
                address: record.email.clone(),
                reason: e.to_string(),
            })?;

        let mut body = MultiPart::mixed().singlepart(SinglePart::html(notice_html(
            &record.first_name,
            &record.last_name,
        )));
        if let Some(path) = &self.config.attachment_path {
            body = body.singlepart(pdf_attachment(path)?);
        }

        Message::builder()
            .from(from)
            .to(to)
            .subject(self.config.subject.clone())
            .multipart(body)
            .map_err(|e| MailError::Build(e.to_string()))
    }

    fn transport(&self) -> Result<SmtpTransport, MailError> {
        let builder = if self.config.smtp_port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&self.config.smtp_host)
        } else {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
        }
        .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?;

        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.expose_secret().to_string(),
        );
        Ok(builder.port(self.config.smtp_port).credentials(creds).build())
    }
}

fn pdf_attachment(path: &Path) -> Result<SinglePart, MailError> {
    let bytes = std::fs::read(path).map_err(|e| MailError::Attachment {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let content_type = ContentType::parse("application/pdf")
        .map_err(|e| MailError::Build(e.to_string()))?;
    Ok(Attachment::new(ATTACHMENT_NAME.to_string()).body(bytes, content_type))
}

#[async_trait]
impl NoticeMailer for SmtpNoticeMailer {
    async fn send_notice(&self, record: &EngagementRecord) -> Result<(), MailError> {
        let message = self.build_message(record)?;
        let transport = self.transport()?;

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Transport(format!("send task failed: {e}")))?
            .map_err(|e| MailError::Transport(format!("SMTP send failed: {e}")))?;

        info!(email = %record.email, "Feedback notice sent");
        Ok(())
    }
}
