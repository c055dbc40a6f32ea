//! Dashboard assembly
//!
//! One HTML document per cluster, plus a combined document that nests each
//! cluster's body inside its own top-level accordion section. Every element
//! id inside a cluster document carries the sanitized cluster id so several
//! cluster bodies can live in one page.

use askama::Template;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::{ClusterReportBundle, Result};

const BOOTSTRAP_CSS: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.2.3/dist/css/bootstrap.min.css";
const BOOTSTRAP_JS: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.2.3/dist/js/bootstrap.bundle.min.js";

/// Document wrapper tags removed from a cluster page before nesting it
static WRAPPER_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<head\b[^>]*>.*?</head>|<script\b[^>]*>.*?</script>|<!DOCTYPE[^>]*>|</?html\b[^>]*>|</?body\b[^>]*>",
    )
    .expect("wrapper tag pattern is valid")
});

/// Map a cluster host to a string usable inside element ids.
///
/// Every character outside `[A-Za-z0-9_-]` becomes `_`, so
/// `10.154.0.71` becomes `10_154_0_71`.
pub fn sanitize_cluster_id(cluster: &str) -> String {
    cluster
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

struct PanelPart {
    heading: Option<&'static str>,
    text: String,
}

#[derive(Template)]
#[template(path = "dashboard/panel.html")]
struct PanelTemplate {
    parts: Vec<PanelPart>,
}

/// Escape command output into a `<pre>` block, or show `empty` when there
/// is none.
pub fn preformatted(lines: &[String], empty: &str) -> Result<String> {
    panel(vec![part(None, lines, empty)])
}

fn part(heading: Option<&'static str>, lines: &[String], empty: &str) -> PanelPart {
    PanelPart {
        heading,
        text: if lines.is_empty() {
            empty.to_string()
        } else {
            lines.join("\n")
        },
    }
}

fn panel(parts: Vec<PanelPart>) -> Result<String> {
    Ok(PanelTemplate { parts }.render()?)
}

struct Section {
    /// Id stem, e.g. `Status` for `headingStatus_<cluster>`
    key: &'static str,
    title: &'static str,
    expanded: bool,
    body: String,
}

impl Section {
    fn new(key: &'static str, title: &'static str, body: String) -> Self {
        Self {
            key,
            title,
            expanded: false,
            body,
        }
    }

    fn expanded(mut self) -> Self {
        self.expanded = true;
        self
    }
}

#[derive(Template)]
#[template(path = "dashboard/cluster.html")]
struct ClusterTemplate<'a> {
    cluster: &'a str,
    cluster_id: String,
    collected_at: String,
    sections: Vec<Section>,
    bootstrap_css: &'static str,
    bootstrap_js: &'static str,
}

/// Render the single-cluster dashboard document
pub fn render_cluster_dashboard(bundle: &ClusterReportBundle) -> Result<String> {
    const NO_OUTPUT: &str = "No output.";

    let time = panel(vec![
        part(
            Some("Cluster Time (isi_for_array -s date)"),
            &bundle.time,
            "No cluster time data.",
        ),
        part(Some("NTP Servers (isi ntp servers list)"), &bundle.ntp, "No NTP data."),
    ])?;

    let sections = vec![
        Section::new("Time", "Cluster Time & NTP", time).expanded(),
        Section::new("Status", "Cluster Status", preformatted(&bundle.status, NO_OUTPUT)?),
        Section::new("Battery", "Battery Status", preformatted(&bundle.battery, NO_OUTPUT)?),
        Section::new("RW", "Read/Write Status", preformatted(&bundle.read_write, NO_OUTPUT)?),
        Section::new("Disk", "Disk Usage", preformatted(&bundle.disk, NO_OUTPUT)?),
        Section::new("NIC", "NIC Info", preformatted(&bundle.nic, NO_OUTPUT)?),
        Section::new("Version", "OneFS Version", preformatted(&bundle.version, NO_OUTPUT)?),
        Section::new("Quota", "Quota Usage Report", bundle.quota_table_html.clone()),
        Section::new("NFS", "NFS Configuration Report", bundle.nfs_table_html.clone()),
        Section::new("SMB", "SMB Configuration Report", bundle.smb_table_html.clone()),
        Section::new("Audit", "Audit Rate", bundle.audit_panel_html.clone()),
    ];

    let html = ClusterTemplate {
        cluster: &bundle.cluster,
        cluster_id: sanitize_cluster_id(&bundle.cluster),
        collected_at: bundle.collected_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        sections,
        bootstrap_css: BOOTSTRAP_CSS,
        bootstrap_js: BOOTSTRAP_JS,
    }
    .render()?;

    Ok(html)
}

/// A rendered single-cluster document, keyed by the cluster it came from
#[derive(Debug, Clone)]
pub struct ClusterFragment {
    pub cluster: String,
    pub html: String,
}

impl ClusterFragment {
    pub fn new(cluster: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            html: html.into(),
        }
    }
}

struct MultiEntry<'a> {
    index: usize,
    name: &'a str,
    body: String,
}

#[derive(Template)]
#[template(path = "dashboard/multi.html")]
struct MultiTemplate<'a> {
    clusters: Vec<MultiEntry<'a>>,
    bootstrap_css: &'static str,
    bootstrap_js: &'static str,
}

/// Strip the document wrapper (doctype, `html`, `head`, `body` and the
/// script include) from a cluster page, keeping the body content.
pub fn strip_document_wrapper(html: &str) -> String {
    WRAPPER_TAGS.replace_all(html, "").into_owned()
}

/// Combine cluster documents, in visit order, into one page.
///
/// Returns `None` when there is nothing to combine.
pub fn render_multi_cluster_dashboard(fragments: &[ClusterFragment]) -> Result<Option<String>> {
    if fragments.is_empty() {
        return Ok(None);
    }

    let mut seen = HashSet::new();
    for fragment in fragments {
        let id = sanitize_cluster_id(&fragment.cluster);
        if !seen.insert(id.clone()) {
            warn!(
                cluster = %fragment.cluster,
                cluster_id = %id,
                "Sanitized cluster id collides with an earlier cluster; element ids will repeat"
            );
        }
    }

    let clusters = fragments
        .iter()
        .enumerate()
        .map(|(i, fragment)| MultiEntry {
            index: i + 1,
            name: &fragment.cluster,
            body: strip_document_wrapper(&fragment.html),
        })
        .collect::<Vec<_>>();

    debug!(clusters = clusters.len(), "Building combined multi-cluster HTML");

    let html = MultiTemplate {
        clusters,
        bootstrap_css: BOOTSTRAP_CSS,
        bootstrap_js: BOOTSTRAP_JS,
    }
    .render()?;

    Ok(Some(html))
}
