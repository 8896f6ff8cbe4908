//! Operator mail for user problem reports, using the SMTP configuration
//! from the main config file.

use anyhow::{anyhow, Result};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::EmailConfig;

/// Sends problem reports to the operator mailbox.
pub struct ReportMailer {
    config: EmailConfig,
}

impl ReportMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Check if email sending is configured
    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    /// Send a problem report. The reporting user's address goes in
    /// Reply-To so the operator can answer directly.
    pub async fn send_report(&self, reporter_email: &str, content: &str) -> Result<()> {
        if !self.is_enabled() {
            return Err(anyhow!("email is not configured"));
        }

        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let body = render_report_text(&now.to_string(), reporter_email, content);

        self.send_email(reporter_email, "[Gamelog] User problem report", &body)
            .await
    }

    async fn send_email(&self, reply_to: &str, subject: &str, text_body: &str) -> Result<()> {
        let smtp_host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| anyhow!("SMTP host not configured"))?;
        let from_address = self
            .config
            .from_address
            .as_ref()
            .ok_or_else(|| anyhow!("From address not configured"))?;
        let report_address = self
            .config
            .report_address
            .as_ref()
            .ok_or_else(|| anyhow!("Report address not configured"))?;

        let from: Mailbox = format!("{} <{}>", self.config.from_name, from_address).parse()?;
        let to: Mailbox = report_address.parse()?;
        let reply_to: Mailbox = reply_to.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .reply_to(reply_to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(text_body.to_string())?;

        let mailer = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer
        };

        mailer.build().send(email).await?;
        Ok(())
    }
}

fn render_report_text(timestamp: &str, reporter_email: &str, content: &str) -> String {
    format!(
        "Reported at:\n{timestamp}\n\nReporter:\n{reporter_email}\n\nDescription:\n{content}\n"
    )
}
