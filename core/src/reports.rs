//! Report collectors
//!
//! Each report is one fixed OneFS CLI command. Collectors return the
//! executor's output unmodified; only the JSON listings are handed on to the
//! table renderers when a full bundle is collected.

use tracing::{info, instrument};

use crate::dashboard::preformatted;
use crate::executor::CommandExecutor;
use crate::remote::Session;
use crate::render::{render_nfs_table, render_quota_table, render_smb_table};
use crate::types::json_text;
use crate::{ClusterReportBundle, Error, Result};

/// Where the audit-rate script is written on the cluster
pub const AUDIT_SCRIPT_PATH: &str = "/root/auditrates.sh";

/// Mode set on the uploaded script
pub const AUDIT_SCRIPT_MODE: u32 = 0o755;

/// The audit-rate script
pub const AUDIT_SCRIPT: &str = include_str!("../scripts/auditrates.sh");

/// The fixed set of reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Report {
    Status,
    Battery,
    ReadWrite,
    DiskUsage,
    Nics,
    Version,
    ClusterTime,
    Ntp,
    Quota,
    Nfs,
    Smb,
    AuditRate,
}

impl Report {
    pub const ALL: [Report; 12] = [
        Report::Status,
        Report::Battery,
        Report::ReadWrite,
        Report::DiskUsage,
        Report::Nics,
        Report::Version,
        Report::ClusterTime,
        Report::Ntp,
        Report::Quota,
        Report::Nfs,
        Report::Smb,
        Report::AuditRate,
    ];

    /// Command issued on the cluster
    pub fn command(&self) -> &'static str {
        match self {
            Report::Status => "isi status",
            Report::Battery => "isi batterystatus list",
            Report::ReadWrite => "isi readonly list",
            Report::DiskUsage => "isi_for_array -s df -ik | grep -v 1024-blocks",
            Report::Nics => "isi network interfaces list",
            Report::Version => "isi version",
            Report::ClusterTime => "isi_for_array -s date",
            Report::Ntp => "isi ntp servers list",
            Report::Quota => "isi quota quotas list --format json",
            Report::Nfs => "isi nfs exports list --format json",
            Report::Smb => "isi smb share list --format json",
            Report::AuditRate => "bash /root/auditrates.sh",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Report::Status => "Isilon Status",
            Report::Battery => "Battery Status",
            Report::ReadWrite => "Read/Write Status",
            Report::DiskUsage => "Disk Usage",
            Report::Nics => "NIC Info",
            Report::Version => "Isilon Version",
            Report::ClusterTime => "Cluster Time",
            Report::Ntp => "NTP Servers",
            Report::Quota => "Quota Usage Report",
            Report::Nfs => "NFS Configuration Report",
            Report::Smb => "SMB Configuration Report",
            Report::AuditRate => "Audit Rate",
        }
    }
}

/// Build the domain time-sync command.
///
/// The domain ends up on a remote shell command line, so only letters,
/// digits, `.`, `-` and `_` are accepted.
pub fn time_sync_command(domain: &str) -> Result<String> {
    let valid = !domain.is_empty()
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if !valid {
        return Err(Error::InvalidInput(format!(
            "Invalid domain name: {:?}",
            domain
        )));
    }
    Ok(format!(
        "isi_for_array -s isi_classic auth ads time --sync --domain={} --force",
        domain
    ))
}

/// Runs reports on a session
#[derive(Debug, Clone, Default)]
pub struct Collector {
    executor: CommandExecutor,
}

impl Collector {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    /// Run one report
    pub async fn collect(&self, session: &mut Session, report: Report) -> Result<Vec<String>> {
        self.executor.execute(session, report.command()).await
    }

    /// Write the audit-rate script to the cluster, replacing any old copy
    pub async fn upload_audit_script(&self, session: &mut Session) -> Result<()> {
        session
            .upload(AUDIT_SCRIPT_PATH, AUDIT_SCRIPT.as_bytes(), AUDIT_SCRIPT_MODE)
            .await
    }

    /// Upload the audit-rate script and run it
    pub async fn run_audit_rate(&self, session: &mut Session) -> Result<Vec<String>> {
        self.upload_audit_script(session).await?;
        self.collect(session, Report::AuditRate).await
    }

    /// Sync every node's clock with the given AD domain
    #[instrument(skip(self, session), fields(host = %session.host()))]
    pub async fn sync_time_with_domain(
        &self,
        session: &mut Session,
        domain: &str,
    ) -> Result<Vec<String>> {
        let command = time_sync_command(domain)?;
        self.executor.execute(session, &command).await
    }

    /// Collect every report for one cluster and render the table fragments
    #[instrument(skip(self, session), fields(host = %session.host()))]
    pub async fn collect_bundle(&self, session: &mut Session) -> Result<ClusterReportBundle> {
        let mut bundle = ClusterReportBundle::new(session.host());

        info!("Uploading audit rate script");
        self.upload_audit_script(session).await?;

        info!("Gathering cluster time and NTP");
        bundle.time = self.collect(session, Report::ClusterTime).await?;
        bundle.ntp = self.collect(session, Report::Ntp).await?;

        info!("Gathering status");
        bundle.status = self.collect(session, Report::Status).await?;
        info!("Gathering battery status");
        bundle.battery = self.collect(session, Report::Battery).await?;
        info!("Gathering read/write status");
        bundle.read_write = self.collect(session, Report::ReadWrite).await?;
        info!("Gathering disk usage");
        bundle.disk = self.collect(session, Report::DiskUsage).await?;
        info!("Gathering NIC info");
        bundle.nic = self.collect(session, Report::Nics).await?;
        info!("Gathering OneFS version");
        bundle.version = self.collect(session, Report::Version).await?;

        info!("Gathering quota usage");
        let quota = self.collect(session, Report::Quota).await?;
        bundle.quota_table_html = render_quota_table(&json_text(&quota));

        info!("Gathering NFS exports");
        let nfs = self.collect(session, Report::Nfs).await?;
        bundle.nfs_table_html = render_nfs_table(&json_text(&nfs));

        info!("Gathering SMB shares");
        let smb = self.collect(session, Report::Smb).await?;
        bundle.smb_table_html = render_smb_table(&json_text(&smb));

        info!("Gathering audit rate");
        let audit = self.collect(session, Report::AuditRate).await?;
        bundle.audit_panel_html = preformatted(&audit, "No audit rate output.")?;

        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Script, ScriptedTransport};

    #[test]
    fn test_report_commands() {
        assert_eq!(Report::Status.command(), "isi status");
        assert_eq!(
            Report::DiskUsage.command(),
            "isi_for_array -s df -ik | grep -v 1024-blocks"
        );
        assert_eq!(Report::Smb.command(), "isi smb share list --format json");
        assert_eq!(Report::AuditRate.command(), "bash /root/auditrates.sh");
        assert!(Report::AuditRate.command().contains(AUDIT_SCRIPT_PATH));
    }

    #[test]
    fn test_only_audit_rate_is_long_running() {
        let executor = CommandExecutor::default();
        for report in Report::ALL {
            assert_eq!(
                executor.is_long_running(report.command()),
                report == Report::AuditRate,
                "{:?}",
                report
            );
        }
    }

    #[test]
    fn test_audit_script_ends_with_sentinel() {
        assert!(AUDIT_SCRIPT.starts_with("#!/bin/bash"));
        assert!(AUDIT_SCRIPT.contains("echo \"Total average:"));
    }

    #[test]
    fn test_time_sync_command() {
        assert_eq!(
            time_sync_command("CORP.EXAMPLE.COM").unwrap(),
            "isi_for_array -s isi_classic auth ads time --sync --domain=CORP.EXAMPLE.COM --force"
        );
        assert!(matches!(
            time_sync_command("corp; rm -rf /"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(time_sync_command(""), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_collect_returns_output_unmodified() {
        let transport = ScriptedTransport::default()
            .with_script("isi version", Script::lines(&["Isilon OneFS v9.5.0.0 B_9_5_0_005"]));
        let mut session = Session::new("prod01", Box::new(transport));

        let lines = Collector::default()
            .collect(&mut session, Report::Version)
            .await
            .unwrap();
        assert_eq!(lines, vec!["Isilon OneFS v9.5.0.0 B_9_5_0_005"]);
    }

    #[tokio::test]
    async fn test_run_audit_rate_uploads_first() {
        let transport = ScriptedTransport::default().with_script(
            "bash /root/auditrates.sh",
            Script::lines(&["node 1:", "Total average: 2 evts/s"]),
        );
        let uploads = transport.uploads();
        let commands = transport.commands();
        let mut session = Session::new("prod01", Box::new(transport));

        let lines = Collector::default()
            .run_audit_rate(&mut session)
            .await
            .unwrap();

        assert_eq!(lines, vec!["node 1:", "Total average: 2 evts/s"]);
        let uploads = uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, AUDIT_SCRIPT_PATH);
        assert_eq!(uploads[0].2, 0o755);
        assert_eq!(*commands.lock().unwrap(), vec!["bash /root/auditrates.sh"]);
    }

    #[tokio::test]
    async fn test_collect_bundle_runs_reports_in_order() {
        let transport = ScriptedTransport::default()
            .with_script("isi status", Script::lines(&["Cluster Health: [ OK ]"]))
            .with_script(
                "isi nfs exports list --format json",
                Script::lines(&["[", r#"{"id": 1, "paths": ["/ifs/data"]}"#, "]"]),
            )
            .with_script("isi smb share list --format json", Script::lines(&["not json"]));
        let commands = transport.commands();
        let mut session = Session::new("10.154.0.71", Box::new(transport));

        let bundle = Collector::default()
            .collect_bundle(&mut session)
            .await
            .unwrap();

        assert_eq!(bundle.cluster, "10.154.0.71");
        assert_eq!(bundle.status, vec!["Cluster Health: [ OK ]"]);
        assert_eq!(bundle.quota_table_html, "<p>No quotas found.</p>");
        assert!(bundle.nfs_table_html.contains("<td>/ifs/data</td>"));
        assert!(bundle.smb_table_html.contains("ERROR parsing SMB JSON."));
        assert!(bundle.audit_panel_html.contains("No audit rate output."));

        assert_eq!(
            *commands.lock().unwrap(),
            vec![
                "isi_for_array -s date",
                "isi ntp servers list",
                "isi status",
                "isi batterystatus list",
                "isi readonly list",
                "isi_for_array -s df -ik | grep -v 1024-blocks",
                "isi network interfaces list",
                "isi version",
                "isi quota quotas list --format json",
                "isi nfs exports list --format json",
                "isi smb share list --format json",
                "bash /root/auditrates.sh",
            ]
        );
    }
}
