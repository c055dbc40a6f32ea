//! Core library for isidash
//!
//! Sessions to Isilon/PowerScale clusters, command execution, report
//! collection, HTML rendering and dashboard delivery. The `isidash` binary
//! drives all of it from an interactive menu.

pub mod dashboard;
pub mod delivery;
pub mod error;
pub mod executor;
pub mod remote;
pub mod render;
pub mod reports;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports
pub use dashboard::{
    render_cluster_dashboard, render_multi_cluster_dashboard, sanitize_cluster_id,
    ClusterFragment,
};
pub use delivery::{
    mail_subject, report_path, send_dashboard, write_report, DashboardKind, MailSettings, Mailer,
    SmtpMailer,
};
pub use error::{ConnectError, Error, Result};
pub use executor::{CommandExecutor, ExecutorConfig};
pub use remote::{connect, CommandStream, Session, SshSettings, StreamEvent, Transport};
pub use render::{render_nfs_table, render_quota_table, render_smb_table};
pub use reports::{Collector, Report};
pub use types::ClusterReportBundle;
