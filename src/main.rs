mod chart;
mod config;
mod dashboard;
mod error;
mod models;
mod store;
mod utils;
mod view;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::{
    config::Settings,
    dashboard::{API_EQUITY_CAP, API_HISTORY_CAP},
    store::ArtifactStore,
};

/// Close-price window for the summary digest.
const SUMMARY_CLOSE_CAP: usize = 300;

#[derive(Debug, Parser)]
#[command(name = "alpharoom", version)]
struct Cli {
    /// Override RUN_MODE (serve|summary)
    #[arg(long)]
    mode: Option<String>,

    /// Override REPO_ROOT (directory holding reports/ and config/)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Override DASHBOARD_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(m) = cli.mode {
        settings.run_mode = m.to_lowercase();
    }
    if let Some(root) = cli.root {
        settings.repo_root = root;
    }
    if let Some(port) = cli.port {
        settings.dashboard_port = port;
    }
    settings.validate()?;

    let store = ArtifactStore::new(settings.repo_root.clone());

    log::info!(
        "app.start run_mode={} root={}",
        settings.run_mode,
        store.root().display()
    );

    if settings.run_mode == "summary" {
        print_summary(&store).await;
        return Ok(());
    }

    if settings.dashboard_open_browser {
        let url = settings.dashboard_url();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(650)).await;
            if let Err(e) = std::process::Command::new("xdg-open").arg(&url).spawn() {
                log::warn!("dashboard.open_browser_failed url={} err={}", url, e);
            }
        });
    }

    dashboard::serve_dashboard(settings, store).await
}

async fn print_summary(store: &ArtifactStore) {
    for line in summary_lines(store).await {
        println!("{line}");
    }
}

/// Plain-text digest of the artifacts, one line per figure.
async fn summary_lines(store: &ArtifactStore) -> Vec<String> {
    let (report, history, equity, closes) = tokio::join!(
        store.get_report(),
        store.get_history(API_HISTORY_CAP),
        store.get_equity_curve(API_EQUITY_CAP),
        store.get_price_closes(SUMMARY_CLOSE_CAP),
    );

    vec![
        format!("Dashboard artifacts under {}", store.root().display()),
        format!("- Report: {} ({})", report.report_path, report.run_id),
        format!("- Final equity: {}", report.final_equity),
        format!("- Return: {}%", report.total_return_pct),
        format!("- Max drawdown: {}%", report.max_drawdown_pct),
        format!("- Sharpe: {}", report.annualized_sharpe),
        format!("- Stored runs: {}", history.len()),
        format!("- Equity points: {}", equity.len()),
        format!("- Sample closes: {}", closes.len()),
    ]
}
