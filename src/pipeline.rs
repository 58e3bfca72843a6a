// src/pipeline.rs
//! Side effects run against a computed report: persist, print, notify.
//!
//! Each stage is independently fallible. A failure is logged and counted but
//! never stops the next stage or changes the run's result.

use metrics::counter;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::model::AnalysisReport;
use crate::notify::Notifier;
use crate::persist::Persister;
use crate::print::Printer;
use crate::telemetry::{ensure_described, GOAL_ACHIEVED_TOTAL, REPORT_STAGE_FAILURES_TOTAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Persist,
    Print,
    Notify,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Persist => "persist",
            Stage::Print => "print",
            Stage::Notify => "notify",
        }
    }
}

/// Which stages ran and which of them failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub attempted: Vec<Stage>,
    pub failed: Vec<Stage>,
}

#[derive(Clone, Default)]
pub struct ReportPipeline {
    persister: Option<Arc<dyn Persister>>,
    printer: Option<Arc<dyn Printer>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ReportPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persister(mut self, p: Arc<dyn Persister>) -> Self {
        self.persister = Some(p);
        self
    }

    pub fn with_printer(mut self, p: Arc<dyn Printer>) -> Self {
        self.printer = Some(p);
        self
    }

    pub fn with_notifier(mut self, n: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(n);
        self
    }

    pub async fn run(
        &self,
        cancel: &CancellationToken,
        report: &AnalysisReport,
    ) -> PipelineOutcome {
        ensure_described();
        let mut outcome = PipelineOutcome::default();

        if let Some(p) = &self.persister {
            let res = p.persist(cancel, report).await;
            record(&mut outcome, Stage::Persist, res);
        }
        if let Some(p) = &self.printer {
            let res = p.print(report);
            record(&mut outcome, Stage::Print, res);
        }
        if let Some(n) = &self.notifier {
            let res = n.notify(cancel, report).await;
            record(&mut outcome, Stage::Notify, res);
        }

        if report.is_goal_achieved {
            counter!(GOAL_ACHIEVED_TOTAL).increment(1);
        }
        outcome
    }
}

fn record(outcome: &mut PipelineOutcome, stage: Stage, res: anyhow::Result<()>) {
    outcome.attempted.push(stage);
    if let Err(e) = res {
        tracing::warn!(
            stage = stage.as_str(),
            error = %format!("{e:#}"),
            "failed to {} analysis report",
            stage.as_str()
        );
        counter!(REPORT_STAGE_FAILURES_TOTAL, "stage" => stage.as_str()).increment(1);
        outcome.failed.push(stage);
    }
}
