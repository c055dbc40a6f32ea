//! Single-cluster interactive menu

use anyhow::Result;
use isidash_core::{DashboardKind, Report, Session};
use tracing::{error, warn};

use crate::app::App;
use crate::prompt::{self, Credentials};

const NO_SESSION: &str = "No SSH session. Please connect first.";

/// One menu selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Report(Report),
    Dashboard,
    TimeSync,
    AuditRate,
    TimeAndNtp,
    Connect,
    Disconnect,
    Quit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        let choice = match input.trim().to_lowercase().as_str() {
            "1" => MenuChoice::Report(Report::Battery),
            "2" => MenuChoice::Report(Report::Status),
            "3" => MenuChoice::Report(Report::Version),
            "4" => MenuChoice::Report(Report::DiskUsage),
            "5" => MenuChoice::Report(Report::Nics),
            "6" => MenuChoice::Dashboard,
            "7" => MenuChoice::TimeSync,
            "8" => MenuChoice::Report(Report::Quota),
            "9" => MenuChoice::Report(Report::Nfs),
            "10" => MenuChoice::Report(Report::Smb),
            "11" => MenuChoice::AuditRate,
            "12" => MenuChoice::Report(Report::ReadWrite),
            "13" => MenuChoice::TimeAndNtp,
            "c" => MenuChoice::Connect,
            "d" => MenuChoice::Disconnect,
            "x" | "q" => MenuChoice::Quit,
            _ => return None,
        };
        Some(choice)
    }

    fn needs_session(&self) -> bool {
        !matches!(
            self,
            MenuChoice::Connect | MenuChoice::Disconnect | MenuChoice::Quit
        )
    }
}

/// Printed when a JSON listing comes back empty
fn empty_notice(report: Report) -> Option<&'static str> {
    match report {
        Report::Quota => Some("No quotas found."),
        Report::Nfs => Some("No NFS exports found."),
        Report::Smb => Some("No SMB shares found."),
        _ => None,
    }
}

fn print_menu() {
    println!("\n=== ISILON MENU ===");
    println!("1)  Get Battery Status           (isi batterystatus list)");
    println!("2)  Get Isilon Status            (isi status)");
    println!("3)  Get Isilon Version           (isi version)");
    println!("4)  Get Disk Usage               (df -ik)");
    println!("5)  Get NIC Info                 (isi network interfaces list)");
    println!("6)  Generate HTML Dashboard      (with all info)");
    println!("7)  Set Time with Domain         (isi auth ads time --sync)");
    println!("8)  Quota Usage Report           (isi quota quotas list)");
    println!("9)  NFS Report                   (isi nfs exports list)");
    println!("10) SMB Report                   (isi smb share list)");
    println!("11) Audit Rate                   (runs the audit rate script)");
    println!("12) Read/Write Status            (isi readonly list)");
    println!("13) Cluster Time & NTP           (date, isi ntp servers list)");
    println!("C)  Connect to a cluster");
    println!("D)  Disconnect from cluster");
    println!("X/Q) Quit");
    println!("==============================================");
}

fn print_output(title: &str, lines: &[String]) {
    println!("\n-- {} --", title);
    for line in lines {
        println!("{}", line);
    }
}

/// Run the menu until the operator quits
pub async fn run(app: &App, mut session: Session) -> Result<()> {
    loop {
        print_menu();
        let answer = prompt::line("Choose an option: ")?;
        let Some(choice) = MenuChoice::parse(&answer) else {
            println!("Invalid choice, please try again.");
            continue;
        };

        if choice == MenuChoice::Quit {
            let status = session.disconnect().await;
            println!("{}", status);
            println!("Exiting.");
            return Ok(());
        }

        if choice.needs_session() && !session.is_open() {
            println!("{}", NO_SESSION);
            continue;
        }

        if let Err(e) = handle(app, &mut session, choice).await {
            error!(error = %e, "Menu action failed");
            println!("ERROR: {}", e);
        }
    }
}

async fn handle(app: &App, session: &mut Session, choice: MenuChoice) -> Result<()> {
    let collector = app.collector();
    match choice {
        MenuChoice::Report(report) => {
            let lines = collector.collect(session, report).await?;
            match empty_notice(report) {
                Some(notice) if lines.is_empty() => {
                    println!("\n-- {} --", report.title());
                    println!("{}", notice);
                }
                _ => print_output(report.title(), &lines),
            }
        }
        MenuChoice::Dashboard => {
            let html = app.cluster_dashboard(session).await?;
            app.deliver(DashboardKind::Single, &html).await?;
        }
        MenuChoice::TimeSync => {
            let domain = prompt::line("Enter domain name (e.g. ADDOMAIN): ")?;
            let lines = collector.sync_time_with_domain(session, &domain).await?;
            print_output("Set Time With Domain Output", &lines);
        }
        MenuChoice::AuditRate => {
            println!("\n-- Uploading script and running Audit Rate --");
            let lines = collector.run_audit_rate(session).await?;
            for line in &lines {
                println!("{}", line);
            }
        }
        MenuChoice::TimeAndNtp => {
            let time = collector.collect(session, Report::ClusterTime).await?;
            print_output(Report::ClusterTime.title(), &time);
            let ntp = collector.collect(session, Report::Ntp).await?;
            print_output(Report::Ntp.title(), &ntp);
        }
        MenuChoice::Connect => {
            if session.is_open() {
                println!("{}", session.disconnect().await);
            }
            let credentials = Credentials::ask(None, None)?;
            match app.connect(&credentials).await {
                Ok(new_session) => {
                    println!("Successfully connected to {} via SSH", new_session.host());
                    *session = new_session;
                }
                Err(e) => {
                    warn!(host = %credentials.host, error = %e, "Reconnect failed");
                    println!("{}", e);
                }
            }
        }
        MenuChoice::Disconnect => println!("{}", session.disconnect().await),
        MenuChoice::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::Report(Report::Battery)));
        assert_eq!(MenuChoice::parse("2"), Some(MenuChoice::Report(Report::Status)));
        assert_eq!(MenuChoice::parse(" 6 "), Some(MenuChoice::Dashboard));
        assert_eq!(MenuChoice::parse("10"), Some(MenuChoice::Report(Report::Smb)));
        assert_eq!(MenuChoice::parse("11"), Some(MenuChoice::AuditRate));
        assert_eq!(MenuChoice::parse("12"), Some(MenuChoice::Report(Report::ReadWrite)));
        assert_eq!(MenuChoice::parse("13"), Some(MenuChoice::TimeAndNtp));
    }

    #[test]
    fn test_parse_letters_case_insensitive() {
        assert_eq!(MenuChoice::parse("C"), Some(MenuChoice::Connect));
        assert_eq!(MenuChoice::parse("d"), Some(MenuChoice::Disconnect));
        assert_eq!(MenuChoice::parse("X"), Some(MenuChoice::Quit));
        assert_eq!(MenuChoice::parse("q"), Some(MenuChoice::Quit));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(MenuChoice::parse(""), None);
        assert_eq!(MenuChoice::parse("14"), None);
        assert_eq!(MenuChoice::parse("exit"), None);
    }

    #[test]
    fn test_session_requirements() {
        assert!(MenuChoice::Report(Report::Status).needs_session());
        assert!(MenuChoice::Dashboard.needs_session());
        assert!(!MenuChoice::Connect.needs_session());
        assert!(!MenuChoice::Disconnect.needs_session());
    }

    #[test]
    fn test_empty_notice_only_for_listings() {
        assert_eq!(empty_notice(Report::Quota), Some("No quotas found."));
        assert_eq!(empty_notice(Report::Status), None);
    }
}
