// src/telemetry.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const GOAL_ACHIEVED_TOTAL: &str = "goal_achieved_total";
pub const FETCH_SOURCE_ERRORS_TOTAL: &str = "fetch_source_errors_total";
pub const REPORT_STAGE_FAILURES_TOTAL: &str = "report_stage_failures_total";
pub const LOCK_CONTENDED_TOTAL: &str = "lock_contended_total";
pub const ANALYZE_RUNS_TOTAL: &str = "analyze_runs_total";

/// One-time metrics registration (so series carry descriptions in the exposition).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(GOAL_ACHIEVED_TOTAL, "Runs whose report achieved the goal.");
        describe_counter!(
            FETCH_SOURCE_ERRORS_TOTAL,
            "Latest-entry fetches that failed, by source."
        );
        describe_counter!(
            REPORT_STAGE_FAILURES_TOTAL,
            "Persist/print/notify stage failures, by stage."
        );
        describe_counter!(
            LOCK_CONTENDED_TOTAL,
            "Lock acquisitions that found the daily lock already held."
        );
        describe_counter!(ANALYZE_RUNS_TOTAL, "Analysis runs, by outcome.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process. Call once at startup.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_described();
        gauge!("analyzer_start_ts").set(chrono::Utc::now().timestamp() as f64);
        Ok(Self { handle })
    }

    /// Prometheus exposition text of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
