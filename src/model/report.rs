// src/model/report.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Entry, GoalEvaluator, GoalType};

/// Result of one analysis run. Persisted and printed as
/// `{"is_goal_achieved": bool, "latest_entry": Entry | null}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub is_goal_achieved: bool,
    pub latest_entry: Option<Entry>,
}

impl AnalysisReport {
    /// Builds the report; without an entry the goal is never achieved.
    pub fn analyze(
        latest_entry: Option<Entry>,
        now: DateTime<Utc>,
        goal: GoalType,
        evaluator: &GoalEvaluator,
    ) -> Self {
        let is_goal_achieved = evaluator.is_achieved(latest_entry.as_ref(), now, goal);
        Self {
            is_goal_achieved,
            latest_entry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_report_serializes_null_entry() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let r = AnalysisReport::analyze(None, now, GoalType::RecentWeek, &GoalEvaluator::default());
        assert!(!r.is_goal_achieved);
        assert_eq!(
            serde_json::to_string(&r).unwrap(),
            r#"{"is_goal_achieved":false,"latest_entry":null}"#
        );
    }
}
