// src/notify/email.rs
use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use crate::config::SmtpConfig;

use super::DigestDelivery;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    pub fn new(cfg: &SmtpConfig) -> Result<Self> {
        let creds = Credentials::new(cfg.user.clone(), cfg.pass.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .context("invalid SMTP host")?
            .credentials(creds)
            .build();

        let from = cfg.from.parse().context("invalid digest from address")?;
        let to = cfg.to.parse().context("invalid digest to address")?;

        Ok(Self { mailer, from, to })
    }
}

#[async_trait::async_trait]
impl DigestDelivery for EmailSender {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .context("build digest email")?;

        self.mailer.send(msg).await.context("send digest email")?;
        Ok(())
    }
}
