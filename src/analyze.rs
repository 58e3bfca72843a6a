// src/analyze.rs
//! The daily analysis run: lock → fetch → evaluate → report → release.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::error::AnalyzeError;
use crate::fetch::SourceAggregator;
use crate::lock::{self, LockCoordinator};
use crate::model::{AnalysisReport, GoalEvaluator, GoalType};
use crate::pipeline::ReportPipeline;
use crate::telemetry::{ensure_described, ANALYZE_RUNS_TOTAL};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeInput {
    #[serde(default)]
    pub goal: GoalType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeOutput {
    pub is_goal_achieved: bool,
}

/// Phases of a run, logged as they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    LockPending,
    LockHeld,
    Fetching,
    Evaluating,
    Reporting,
    Releasing,
    Done,
    Failed,
}

fn enter(state: RunState, lock_id: &str) {
    tracing::debug!(?state, lock_id, "analyze state");
}

pub struct Analyzer {
    clock: Arc<dyn Clock>,
    lock: LockCoordinator,
    sources: SourceAggregator,
    evaluator: GoalEvaluator,
    pipeline: ReportPipeline,
}

impl Analyzer {
    pub fn new(
        clock: Arc<dyn Clock>,
        lock: LockCoordinator,
        sources: SourceAggregator,
        pipeline: ReportPipeline,
    ) -> Self {
        Self {
            clock,
            lock,
            sources,
            evaluator: GoalEvaluator::default(),
            pipeline,
        }
    }

    pub fn with_evaluator(mut self, evaluator: GoalEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Runs once for today's lock slot.
    ///
    /// Only lock and all-sources-failed errors are returned; side-effect failures
    /// show up in logs and metrics. The lock is released on every path once acquired.
    pub async fn analyze(
        &self,
        cancel: &CancellationToken,
        input: AnalyzeInput,
    ) -> Result<AnalyzeOutput, AnalyzeError> {
        ensure_described();

        // Read once so the lock key, goal window and persisted path agree.
        let now = self.clock.now();
        let lock_id = lock::lock_id(now);
        enter(RunState::Idle, &lock_id);
        enter(RunState::LockPending, &lock_id);

        let res = self
            .lock
            .with_lock(cancel, &lock_id, || self.run_locked(cancel, &lock_id, now, input.goal))
            .await;

        match &res {
            Ok(out) => {
                enter(RunState::Done, &lock_id);
                counter!(ANALYZE_RUNS_TOTAL, "outcome" => "ok").increment(1);
                tracing::info!(
                    lock_id = %lock_id,
                    goal = input.goal.as_str(),
                    is_goal_achieved = out.is_goal_achieved,
                    "analysis finished"
                );
            }
            Err(e) => {
                enter(RunState::Failed, &lock_id);
                let outcome = match e {
                    AnalyzeError::LockTransport(_) => "lock_transport",
                    AnalyzeError::LockContended { .. } => "lock_contended",
                    AnalyzeError::AllSourcesFailed { .. } => "all_sources_failed",
                };
                counter!(ANALYZE_RUNS_TOTAL, "outcome" => outcome).increment(1);
            }
        }
        res
    }

    async fn run_locked(
        &self,
        cancel: &CancellationToken,
        lock_id: &str,
        now: chrono::DateTime<chrono::Utc>,
        goal: GoalType,
    ) -> Result<AnalyzeOutput, AnalyzeError> {
        enter(RunState::LockHeld, lock_id);

        enter(RunState::Fetching, lock_id);
        let latest = self.sources.fetch_all(cancel).await.inspect_err(|_| {
            enter(RunState::Releasing, lock_id);
        })?;

        enter(RunState::Evaluating, lock_id);
        let report = AnalysisReport::analyze(latest, now, goal, &self.evaluator);

        enter(RunState::Reporting, lock_id);
        let outcome = self.pipeline.run(cancel, &report).await;
        if !outcome.failed.is_empty() {
            tracing::debug!(failed = ?outcome.failed, "report pipeline degraded");
        }

        enter(RunState::Releasing, lock_id);
        Ok(AnalyzeOutput {
            is_goal_achieved: report.is_goal_achieved,
        })
    }
}
