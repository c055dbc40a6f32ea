//! Collect, render and combine dashboards for two clusters against canned
//! command output.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use isidash_core::{
    render_cluster_dashboard, render_multi_cluster_dashboard, ClusterFragment, Collector,
    CommandStream, Result, Session, StreamEvent, Transport,
};

/// Answers each command with fixed stdout, then reports completion
struct CannedTransport {
    outputs: HashMap<&'static str, Vec<&'static str>>,
}

struct CannedStream {
    lines: VecDeque<String>,
    finished: bool,
}

#[async_trait]
impl CommandStream for CannedStream {
    async fn next_line(&mut self, _timeout: Duration) -> Result<StreamEvent> {
        match self.lines.pop_front() {
            Some(line) => Ok(StreamEvent::Line(line)),
            None => {
                self.finished = true;
                Ok(StreamEvent::Closed)
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    async fn drain_stderr(&mut self) -> Vec<String> {
        Vec::new()
    }
}

#[async_trait]
impl Transport for CannedTransport {
    async fn exec(&mut self, command: &str) -> Result<Box<dyn CommandStream>> {
        let lines = self
            .outputs
            .get(command)
            .map(|lines| lines.iter().map(|l| l.to_string()).collect())
            .unwrap_or_default();
        Ok(Box::new(CannedStream {
            lines,
            finished: false,
        }))
    }

    async fn upload(&mut self, _path: &str, _contents: &[u8], _mode: u32) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn cluster(name: &'static str) -> CannedTransport {
    let mut outputs = HashMap::new();
    outputs.insert("isi status", vec!["Cluster Name: prod", "Cluster Health: [ OK ]"]);
    outputs.insert("isi version", vec!["Isilon OneFS v9.5.0.0"]);
    outputs.insert("isi_for_array -s date", vec!["node-1: Mon Oct 19 07:30:05 UTC 2026"]);
    outputs.insert(
        "isi quota quotas list --format json",
        vec![r#"[{"type": "directory", "path": "/ifs/home", "thresholds": {"hard": 1024}, "usage_derived": 10}]"#],
    );
    outputs.insert(
        "isi nfs exports list --format json",
        vec![r#"[{"id": 1, "paths": ["/ifs/data"], "read_only": false}]"#],
    );
    outputs.insert("isi smb share list --format json", vec!["[]"]);
    outputs.insert(
        "bash /root/auditrates.sh",
        vec![name, "Average rate: 1.0 evts/s", "Total average: 1.0 evts/s"],
    );
    CannedTransport { outputs }
}

async fn fragment(host: &'static str) -> ClusterFragment {
    let mut session = Session::new(host, Box::new(cluster(host)));
    let bundle = Collector::default().collect_bundle(&mut session).await.unwrap();
    session.disconnect().await;
    ClusterFragment::new(host, render_cluster_dashboard(&bundle).unwrap())
}

fn element_ids(html: &str) -> Vec<&str> {
    html.split(" id=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .collect()
}

#[tokio::test]
async fn single_cluster_dashboard() {
    let fragment = fragment("10.154.0.71").await;
    let html = &fragment.html;

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Daily Isilon Overview for 10.154.0.71"));
    assert!(html.contains("id=\"accordion_10_154_0_71\""));
    assert!(html.contains("Cluster Health: [ OK ]"));
    assert!(html.contains("<td>/ifs/home</td>"));
    assert!(html.contains("<p>No SMB Shares Found.</p>"));
    assert!(html.contains("Total average: 1.0 evts/s"));
}

#[tokio::test]
async fn multi_cluster_dashboard_has_one_section_per_cluster() {
    let fragments = vec![fragment("10.154.0.71").await, fragment("prod-02.example.com").await];

    let html = render_multi_cluster_dashboard(&fragments).unwrap().unwrap();

    assert_eq!(html.matches("<!DOCTYPE").count(), 1);
    assert_eq!(html.matches("<body").count(), 1);
    assert_eq!(html.matches("<script").count(), 1);
    assert!(html.contains("id=\"headingMulti_1\""));
    assert!(html.contains("id=\"headingMulti_2\""));
    assert!(!html.contains("headingMulti_3"));

    let first = html.find("Cluster: 10.154.0.71").unwrap();
    let second = html.find("Cluster: prod-02.example.com").unwrap();
    assert!(first < second);

    let ids = element_ids(&html);
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(ids.len(), unique.len(), "duplicate element ids");
}
