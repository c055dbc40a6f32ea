//! Multi-cluster mode
//!
//! Clusters are visited strictly one after another: connect, collect,
//! disconnect, then the next. Clusters that fail to connect or collect are
//! left out of the combined dashboard.

use anyhow::Result;
use isidash_core::{render_multi_cluster_dashboard, ClusterFragment, DashboardKind};
use tracing::{error, info, instrument};

use crate::app::App;
use crate::prompt::Credentials;

#[instrument(skip(app))]
pub async fn run(app: &App, count: usize) -> Result<()> {
    let mut fragments = Vec::with_capacity(count);

    for i in 0..count {
        println!("\n=== Cluster {} of {} ===", i + 1, count);
        let credentials = Credentials::ask(None, None)?;

        let mut session = match app.connect(&credentials).await {
            Ok(session) => session,
            Err(e) => {
                println!("{}", e);
                println!("Skipping {} due to connection error.", credentials.host);
                continue;
            }
        };

        info!(host = %credentials.host, "Gathering data for cluster");
        let result = app.cluster_dashboard(&mut session).await;
        println!("{}", session.disconnect().await);

        match result {
            Ok(html) => fragments.push(ClusterFragment::new(credentials.host, html)),
            Err(e) => {
                error!(host = %credentials.host, error = %e, "Collection failed, skipping cluster");
                println!("Skipping {} due to collection error: {}", credentials.host, e);
            }
        }
    }

    info!(clusters = fragments.len(), "Building combined multi-cluster HTML");
    let Some(html) = render_multi_cluster_dashboard(&fragments)? else {
        println!("No successful clusters connected. Exiting multi-cluster mode.");
        return Ok(());
    };

    app.deliver(DashboardKind::Multi, &html).await?;
    Ok(())
}
