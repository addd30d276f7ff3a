use crate::api::ApiClient;
use crate::model::{DashboardConfig, DEFAULT_PREVIEW_LIMIT};
use crate::orchestrator::{Dashboard, RunOutcome};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "foodfacts-dashboard",
    version,
    about = "Terminal dashboard for the OpenFoodFacts cleaning pipeline"
)]
pub struct Cli {
    /// Base URL of the pipeline backend
    #[arg(long, env = "API_URL", default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Total timeout for each backend request, in milliseconds
    #[arg(long, env = "API_TIMEOUT_MS", default_value_t = 180_000)]
    pub timeout_ms: u64,

    /// Number of rows requested from /preview
    #[arg(
        long,
        default_value_t = DEFAULT_PREVIEW_LIMIT,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub preview_limit: u32,

    /// Use --refresh-on-launch true or --refresh-on-launch false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub refresh_on_launch: bool,

    /// Run the pipeline before printing (requires --json or --text)
    #[arg(long, requires = "output")]
    pub run: bool,

    /// Print the refreshed dashboard state as JSON and exit (no TUI)
    #[arg(long, group = "output", conflicts_with_all = ["text", "health"])]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long, group = "output", conflicts_with = "health")]
    pub text: bool,

    /// Print the backend health status and exit
    #[arg(long)]
    pub health: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// True when no terminal UI will be started.
    pub fn is_headless(&self) -> bool {
        self.json || self.text || self.health || !cfg!(feature = "tui")
    }
}

/// Build a `DashboardConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> DashboardConfig {
    DashboardConfig {
        base_url: args.base_url.clone(),
        timeout_ms: args.timeout_ms,
        preview_limit: args.preview_limit,
        refresh_on_launch: args.refresh_on_launch,
        user_agent: format!("foodfacts-dashboard/{}", env!("CARGO_PKG_VERSION")),
    }
}

pub async fn run(args: Cli, log_path: Option<std::path::PathBuf>) -> Result<()> {
    let cfg = build_config(&args);
    tracing::info!(base_url = %cfg.base_url, timeout_ms = cfg.timeout_ms, "starting");

    if args.health {
        return run_health(&cfg).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(cfg, log_path).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            let _ = log_path;
            return run_headless(&args, cfg, false).await;
        }
    }

    let _ = log_path;
    run_headless(&args, cfg, args.json).await
}

async fn run_health(cfg: &DashboardConfig) -> Result<()> {
    let client = ApiClient::new(cfg)?;
    let status = client
        .health()
        .await
        .map_err(|e| anyhow::anyhow!(e.describe()))
        .with_context(|| format!("health check against {} failed", cfg.base_url))?;
    println!("{status}");
    Ok(())
}

/// Drive the dashboard without a terminal UI and print its final state.
async fn run_headless(args: &Cli, cfg: DashboardConfig, json: bool) -> Result<()> {
    let api = Arc::new(ApiClient::new(&cfg)?);
    let mut dashboard = Dashboard::new(api, cfg.preview_limit);
    let (out_tx, out_handle) = spawn_output_writer();

    if args.run {
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "Running pipeline on {}...",
            cfg.base_url
        )));
        match dashboard.run_pipeline().await {
            RunOutcome::Completed { rows } => {
                let _ = out_tx.send(OutputLine::Stderr(format!("Pipeline completed: {rows} rows")));
            }
            RunOutcome::Failed(e) => {
                drop(out_tx);
                let _ = out_handle.await;
                return Err(anyhow::anyhow!(e.describe())).context("pipeline run failed");
            }
            RunOutcome::Rejected => {}
        }
    }

    // A completed run already refreshed; fetch again so a failure there is reported here.
    if let Err(e) = dashboard.refresh().await {
        drop(out_tx);
        let _ = out_handle.await;
        return Err(anyhow::anyhow!(e.describe()))
            .with_context(|| format!("failed to fetch dashboard data from {}", cfg.base_url));
    }

    if json {
        let out = serde_json::to_string_pretty(dashboard.state())?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = crate::text_summary::build_text_summary(dashboard.state());
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}
