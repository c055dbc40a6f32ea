//! Shared types

use chrono::{DateTime, Local};

/// Everything collected from one cluster visit, ready for the dashboard.
///
/// Raw report output is kept as lines; the JSON reports and the audit panel
/// are already rendered HTML fragments.
#[derive(Debug, Clone)]
pub struct ClusterReportBundle {
    /// Host or IP the cluster was reached at
    pub cluster: String,
    pub collected_at: DateTime<Local>,
    pub time: Vec<String>,
    pub ntp: Vec<String>,
    pub status: Vec<String>,
    pub battery: Vec<String>,
    pub read_write: Vec<String>,
    pub disk: Vec<String>,
    pub nic: Vec<String>,
    pub version: Vec<String>,
    pub quota_table_html: String,
    pub nfs_table_html: String,
    pub smb_table_html: String,
    pub audit_panel_html: String,
}

impl ClusterReportBundle {
    /// An empty bundle for `cluster`
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            collected_at: Local::now(),
            time: Vec::new(),
            ntp: Vec::new(),
            status: Vec::new(),
            battery: Vec::new(),
            read_write: Vec::new(),
            disk: Vec::new(),
            nic: Vec::new(),
            version: Vec::new(),
            quota_table_html: String::new(),
            nfs_table_html: String::new(),
            smb_table_html: String::new(),
            audit_panel_html: String::new(),
        }
    }
}

/// Join command output lines back into one text blob.
///
/// Empty output becomes `"[]"` so JSON reports with nothing to say render as
/// an empty list instead of a parse error.
pub fn json_text(lines: &[String]) -> String {
    if lines.is_empty() {
        "[]".to_string()
    } else {
        lines.join("\n")
    }
}
