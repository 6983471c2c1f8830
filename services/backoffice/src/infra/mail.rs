use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::domain::repository::MailTransport;
use crate::domain::types::OutgoingMail;
use crate::error::MailError;

/// One sending mailbox and its SMTP password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAccount {
    pub address: String,
    pub password: String,
}

/// SMTP submission with one authenticated transport per sender mailbox.
#[derive(Clone)]
pub struct SmtpMailTransport {
    transports: Arc<HashMap<String, AsyncSmtpTransport<Tokio1Executor>>>,
}

impl SmtpMailTransport {
    pub fn new(
        host: &str,
        port: u16,
        accounts: &[MailAccount],
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut transports = HashMap::with_capacity(accounts.len());
        for account in accounts {
            let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .with_context(|| format!("smtp relay {host}"))?
                .port(port)
                .credentials(Credentials::new(
                    account.address.clone(),
                    account.password.clone(),
                ))
                .timeout(Some(timeout))
                .build();
            transports.insert(account.address.clone(), transport);
        }
        Ok(Self {
            transports: Arc::new(transports),
        })
    }
}

impl MailTransport for SmtpMailTransport {
    async fn send(&self, mail: &OutgoingMail<'_>) -> Result<(), MailError> {
        let transport = self
            .transports
            .get(mail.sender)
            .ok_or_else(|| MailError::Rejected(format!("no transport for sender {}", mail.sender)))?;
        let message = build_message(mail).await?;
        transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

fn classify(err: lettre::transport::smtp::Error) -> MailError {
    if err.is_timeout() {
        MailError::Timeout
    } else if err.is_permanent() {
        MailError::Rejected(err.to_string())
    } else {
        MailError::Transient(err.to_string())
    }
}

async fn build_message(mail: &OutgoingMail<'_>) -> Result<Message, MailError> {
    let from: Mailbox = mail
        .sender
        .parse()
        .map_err(|e| MailError::Rejected(format!("invalid sender address: {e}")))?;
    let to: Mailbox = mail
        .to
        .parse()
        .map_err(|e| MailError::Rejected(format!("invalid recipient address: {e}")))?;

    let mut body = MultiPart::mixed().singlepart(SinglePart::html(mail.html_body.to_owned()));
    for attachment in &mail.attachments {
        let content = tokio::fs::read(attachment.path)
            .await
            .map_err(|e| MailError::Transient(format!("read attachment: {e}")))?;
        let content_type = ContentType::parse(attachment.content_type)
            .map_err(|e| MailError::Rejected(format!("attachment content type: {e}")))?;
        body = body.singlepart(
            Attachment::new(attachment.filename.to_owned()).body(content, content_type),
        );
    }

    Message::builder()
        .from(from)
        .to(to)
        .subject(mail.subject)
        .multipart(body)
        .map_err(|e| MailError::Rejected(format!("build message: {e}")))
}
