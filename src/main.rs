//! Analyzer CLI: one goal check for today's lock slot.
//!
//! Exit status is non-zero when the run could not produce a result
//! (lock unavailable or every source failed).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use keeput_analyzer::telemetry::Metrics;
use keeput_analyzer::{app, config, logging, AnalyzeInput, GoalType};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(version, about = "Check whether a new entry was published within the goal window")]
struct Cli {
    /// recent_week | recent_month (unknown values mean recent_week)
    #[arg(long)]
    goal: Option<String>,

    /// TOML config file; environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env in local runs; no-op in deployed environments.
    if let Err(e) = config::init_for_local() {
        eprintln!("failed to init env for local: {e:#}");
        return ExitCode::FAILURE;
    }

    let cfg = match config::AppConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("invalid configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&cfg.log_level);

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "metrics disabled");
            None
        }
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling run");
                cancel.cancel();
            }
        });
    }

    let now = chrono::Utc::now();
    let goal = cli.goal.map(GoalType::from).unwrap_or(cfg.goal);

    let analyzer = match app::build_analyzer(&cfg, now) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "failed to build analyzer");
            return ExitCode::FAILURE;
        }
    };

    let result = analyzer.analyze(&cancel, AnalyzeInput { goal }).await;

    if let Some(m) = &metrics {
        tracing::debug!(exposition = %m.render(), "metrics snapshot");
    }

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, contended = e.is_contention(), "failed to run analysis");
            ExitCode::FAILURE
        }
    }
}
