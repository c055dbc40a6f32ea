//! Dashboard delivery
//!
//! Finished dashboards are written to a timestamped file and can be mailed
//! through an SMTP relay, inline and as an attachment.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::{Error, Result};

/// Which dashboard a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardKind {
    Single,
    Multi,
}

impl DashboardKind {
    fn file_name(&self) -> &'static str {
        match self {
            DashboardKind::Single => "IsilonDashboard.html",
            DashboardKind::Multi => "MultiCluster_IsilonDashboard.html",
        }
    }
}

/// `<dir>/<YYYYmmdd_HHMMSS> - <name>.html`
pub fn report_path(dir: &Path, kind: DashboardKind, now: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "{} - {}",
        now.format("%Y%m%d_%H%M%S"),
        kind.file_name()
    ))
}

/// Write a dashboard to its timestamped path, creating `dir` if needed
#[instrument(skip(html))]
pub async fn write_report(
    dir: &Path,
    kind: DashboardKind,
    html: &str,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = report_path(dir, kind, now);
    tokio::fs::write(&path, html).await?;
    info!(path = %path.display(), bytes = html.len(), "Dashboard written");
    Ok(path)
}

/// `Isilon Dashboard on Monday October 19, 2026 at 07:30:00`
pub fn mail_subject(now: DateTime<Local>) -> String {
    now.format("Isilon Dashboard on %A %B %d, %Y at %H:%M:%S")
        .to_string()
}

/// SMTP relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub relay: String,
    pub port: u16,
    pub from: String,
    /// Comma-separated recipients
    pub to: String,
    pub cc: Option<String>,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            relay: "mailhost".to_string(),
            port: 25,
            from: String::new(),
            to: String::new(),
            cc: None,
        }
    }
}

/// Build the dashboard email: HTML body plus the same HTML as an attachment
pub fn build_message(
    settings: &MailSettings,
    subject: &str,
    file_name: &str,
    html: &str,
) -> Result<Message> {
    if settings.from.trim().is_empty() {
        return Err(Error::Config("mail.from is not set".to_string()));
    }
    let to = mailboxes(&settings.to)?;
    if to.is_empty() {
        return Err(Error::Config("mail.to is not set".to_string()));
    }

    let mut builder = Message::builder()
        .from(mailbox(&settings.from)?)
        .subject(subject);
    for recipient in to {
        builder = builder.to(recipient);
    }
    if let Some(cc) = &settings.cc {
        for recipient in mailboxes(cc)? {
            builder = builder.cc(recipient);
        }
    }

    let octet_stream = ContentType::parse("application/octet-stream")
        .map_err(|e| Error::Mail(e.to_string()))?;
    let body = MultiPart::mixed()
        .singlepart(SinglePart::html(html.to_string()))
        .singlepart(Attachment::new(file_name.to_string()).body(html.to_string(), octet_stream));

    builder
        .multipart(body)
        .map_err(|e| Error::Mail(format!("Failed to build message: {}", e)))
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid mail address {:?}: {}", address, e)))
}

fn mailboxes(list: &str) -> Result<Vec<Mailbox>> {
    list.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(mailbox)
        .collect()
}

/// Something that can deliver a built message
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> Result<()>;

    /// Backend name
    fn name(&self) -> &str;
}

/// Unauthenticated SMTP relay
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(settings.relay.as_str())
            .port(settings.port)
            .build();
        Self { transport }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: Message) -> Result<()> {
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| Error::Mail(e.to_string()))?;
        debug!(code = %response.code(), "SMTP relay accepted message");
        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

/// Mail the dashboard stored at `path`
#[instrument(skip(mailer, settings, html), fields(backend = mailer.name()))]
pub async fn send_dashboard(
    mailer: &dyn Mailer,
    settings: &MailSettings,
    path: &Path,
    html: &str,
    now: DateTime<Local>,
) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidInput(format!("Not a file path: {}", path.display())))?;

    let message = build_message(settings, &mail_subject(now), &file_name, html)?;
    mailer.send(message).await?;
    info!(to = %settings.to, "Dashboard emailed");
    Ok(())
}
