//! Shared application state for the interactive flows

use anyhow::{Context, Result};
use chrono::Local;
use isidash_core::{
    connect, render_cluster_dashboard, send_dashboard, write_report, Collector, CommandExecutor,
    ConnectError, DashboardKind, Session, SmtpMailer,
};
use std::path::PathBuf;
use tracing::error;

use crate::config::Config;
use crate::prompt::{self, Credentials};

pub struct App {
    config: Config,
    collector: Collector,
    mailer: SmtpMailer,
}

impl App {
    pub fn new(config: Config) -> Self {
        let collector = Collector::new(CommandExecutor::new(config.executor.clone()));
        let mailer = SmtpMailer::new(&config.mail);
        Self {
            config,
            collector,
            mailer,
        }
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub async fn connect(&self, credentials: &Credentials) -> Result<Session, ConnectError> {
        connect(
            &credentials.host,
            &credentials.username,
            &credentials.password,
            &self.config.ssh,
        )
        .await
    }

    /// Collect every report from `session` and render its dashboard
    pub async fn cluster_dashboard(&self, session: &mut Session) -> isidash_core::Result<String> {
        let bundle = self.collector.collect_bundle(session).await?;
        render_cluster_dashboard(&bundle)
    }

    /// Write a dashboard to disk and offer to email it
    pub async fn deliver(&self, kind: DashboardKind, html: &str) -> Result<PathBuf> {
        let now = Local::now();
        let path = write_report(&self.config.output_dir, kind, html, now)
            .await
            .context("Failed to write dashboard")?;

        let label = match kind {
            DashboardKind::Single => "HTML Dashboard",
            DashboardKind::Multi => "Multi-Cluster HTML Dashboard",
        };
        println!("{} saved to: {}", label, path.display());

        if prompt::yes_no("Send this HTML via email? (y/n): ")? {
            match send_dashboard(&self.mailer, &self.config.mail, &path, html, now).await {
                Ok(()) => println!("Email successfully sent."),
                Err(e) => {
                    error!(error = %e, "Failed to send dashboard email");
                    println!("Error sending email: {}", e);
                }
            }
        }

        Ok(path)
    }
}
