//! JSON report tables
//!
//! Turn the `--format json` output of the quota, NFS and SMB listings into
//! HTML tables. Rendering never fails: malformed JSON degrades to an inline
//! error fragment that shows the raw text.

use askama::Template;
use serde_json::Value;
use tracing::warn;

/// Which listing a table renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Quota,
    Nfs,
    Smb,
}

impl TableKind {
    pub fn label(&self) -> &'static str {
        match self {
            TableKind::Quota => "Quota",
            TableKind::Nfs => "NFS",
            TableKind::Smb => "SMB",
        }
    }

    /// Fragment returned for an empty listing
    pub fn empty_fragment(&self) -> &'static str {
        match self {
            TableKind::Quota => "<p>No quotas found.</p>",
            TableKind::Nfs => "<p>No NFS Exports Found.</p>",
            TableKind::Smb => "<p>No SMB Shares Found.</p>",
        }
    }
}

#[derive(Template)]
#[template(path = "tables/error.html")]
struct ParseErrorTemplate<'a> {
    kind: &'a str,
    raw: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
struct QuotaRow {
    kind: String,
    path: String,
    hard_threshold: String,
    usage: String,
}

#[derive(Template)]
#[template(path = "tables/quota.html")]
struct QuotaTableTemplate {
    rows: Vec<QuotaRow>,
}

#[derive(Debug, Clone, PartialEq)]
struct NfsRow {
    id: String,
    description: String,
    paths: Vec<String>,
    read_only: String,
    read_write_clients: Vec<String>,
    root_clients: Vec<String>,
}

#[derive(Template)]
#[template(path = "tables/nfs.html")]
struct NfsTableTemplate {
    rows: Vec<NfsRow>,
}

#[derive(Debug, Clone, PartialEq)]
struct SmbRow {
    id: String,
    name: String,
    path: String,
    description: String,
    browsable: String,
    permissions: Vec<String>,
}

#[derive(Template)]
#[template(path = "tables/smb.html")]
struct SmbTableTemplate {
    rows: Vec<SmbRow>,
}

/// Render `isi quota quotas list --format json` output
pub fn render_quota_table(json: &str) -> String {
    render_records(TableKind::Quota, json, |records| {
        QuotaTableTemplate {
            rows: records.iter().map(quota_row).collect(),
        }
        .render()
    })
}

/// Render `isi nfs exports list --format json` output
pub fn render_nfs_table(json: &str) -> String {
    render_records(TableKind::Nfs, json, |records| {
        NfsTableTemplate {
            rows: records.iter().map(nfs_row).collect(),
        }
        .render()
    })
}

/// Render `isi smb share list --format json` output
pub fn render_smb_table(json: &str) -> String {
    render_records(TableKind::Smb, json, |records| {
        SmbTableTemplate {
            rows: records.iter().map(smb_row).collect(),
        }
        .render()
    })
}

fn render_records<F>(kind: TableKind, json: &str, render: F) -> String
where
    F: FnOnce(&[Value]) -> askama::Result<String>,
{
    let records = match serde_json::from_str::<Value>(json) {
        Ok(Value::Array(records)) => records,
        Ok(_) => {
            warn!(kind = kind.label(), "Report JSON is not a list");
            return parse_error_fragment(kind, json);
        }
        Err(e) => {
            warn!(kind = kind.label(), error = %e, "Failed to parse report JSON");
            return parse_error_fragment(kind, json);
        }
    };

    if records.is_empty() {
        return kind.empty_fragment().to_string();
    }

    render(&records).unwrap_or_else(|e| {
        warn!(kind = kind.label(), error = %e, "Failed to render report table");
        parse_error_fragment(kind, json)
    })
}

fn parse_error_fragment(kind: TableKind, raw: &str) -> String {
    ParseErrorTemplate {
        kind: kind.label(),
        raw,
    }
    .render()
    .unwrap_or_else(|_| format!("<p>ERROR parsing {} JSON.</p>", kind.label()))
}

fn quota_row(record: &Value) -> QuotaRow {
    let hard = record.get("thresholds").and_then(|t| t.get("hard"));
    QuotaRow {
        kind: text(record, "type"),
        path: text(record, "path"),
        hard_threshold: hard.filter(|v| is_truthy(v)).map(scalar).unwrap_or_default(),
        usage: record
            .get("usage_derived")
            .map(scalar)
            .unwrap_or_else(|| "0".to_string()),
    }
}

fn nfs_row(record: &Value) -> NfsRow {
    NfsRow {
        id: text(record, "id"),
        description: text(record, "description"),
        paths: list(record, "paths"),
        read_only: flag(record, "read_only"),
        read_write_clients: list(record, "read_write_clients"),
        root_clients: list(record, "root_clients"),
    }
}

fn smb_row(record: &Value) -> SmbRow {
    let mut permissions: Vec<String> = match record.get("permissions") {
        Some(Value::Array(entries)) => entries.iter().map(permission).collect(),
        _ => Vec::new(),
    };
    if permissions.is_empty() {
        permissions.push("None".to_string());
    }

    SmbRow {
        id: text(record, "id"),
        name: text(record, "name"),
        path: text(record, "path"),
        description: text(record, "description"),
        browsable: flag(record, "browsable"),
        permissions,
    }
}

/// `<mode>(<type>) => <trustee-id>`
fn permission(entry: &Value) -> String {
    let trustee = entry
        .get("trustee")
        .map(|t| text(t, "id"))
        .unwrap_or_default();
    format!(
        "{}({}) => {}",
        text(entry, "permission"),
        text(entry, "permission_type"),
        trustee
    )
}

fn text(record: &Value, key: &str) -> String {
    record.get(key).map(scalar).unwrap_or_default()
}

fn flag(record: &Value, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_bool)
        .unwrap_or(false)
        .to_string()
}

fn list(record: &Value, key: &str) -> Vec<String> {
    match record.get(key) {
        Some(Value::Array(items)) => items.iter().map(scalar).collect(),
        _ => Vec::new(),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
