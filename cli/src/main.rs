//! isidash
//!
//! Interactive Isilon/PowerScale dashboard tool: runs OneFS report commands
//! over SSH and turns the output into an HTML dashboard.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod menu;
mod multi;
mod prompt;

use app::App;
use config::Config;
use prompt::Credentials;

/// Isilon dashboard generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "ISIDASH_CONFIG")]
    config: Option<String>,

    /// Directory dashboards are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Monitor this many clusters (at least 2) without asking
    #[arg(long)]
    clusters: Option<usize>,

    /// Cluster host for single-cluster mode
    #[arg(long)]
    host: Option<String>,

    /// SSH username for single-cluster mode
    #[arg(short, long)]
    username: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse CLI args
    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,isidash=debug".into());
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    // Load configuration
    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = args.output_dir.clone() {
        config.output_dir = dir;
    }
    info!(output_dir = %config.output_dir.display(), "Starting isidash");

    let app = App::new(config);

    let clusters = match args.clusters {
        Some(n) if n < 2 => bail!("--clusters must be at least 2"),
        Some(n) => Some(n),
        None if args.host.is_some() => None,
        None => {
            if prompt::yes_no("Do you want to monitor multiple clusters? (y/n): ")? {
                Some(prompt::cluster_count()?)
            } else {
                None
            }
        }
    };

    if let Some(count) = clusters {
        return multi::run(&app, count).await;
    }

    let credentials = Credentials::ask(args.host.as_deref(), args.username.as_deref())?;
    let session = match app.connect(&credentials).await {
        Ok(session) => session,
        Err(e) => {
            println!("{}", e);
            std::process::exit(1);
        }
    };
    println!("Successfully connected to {} via SSH", session.host());

    menu::run(&app, session).await
}
