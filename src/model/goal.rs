// src/model/goal.rs
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

use crate::date;
use crate::model::Entry;

/// Trailing window a publish must fall into. Unknown names fall back to `RecentWeek`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    #[default]
    RecentWeek,
    RecentMonth,
}

impl GoalType {
    pub fn window_days(self) -> i64 {
        match self {
            GoalType::RecentWeek => 7,
            GoalType::RecentMonth => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GoalType::RecentWeek => "recent_week",
            GoalType::RecentMonth => "recent_month",
        }
    }
}

impl FromStr for GoalType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "recent_month" => GoalType::RecentMonth,
            _ => GoalType::RecentWeek,
        })
    }
}

impl From<String> for GoalType {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

// Null, numbers and unknown names all mean the default goal.
impl<'de> Deserialize<'de> for GoalType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default())
    }
}

/// Decides goal achievement relative to midnight of "today" in a reference offset.
///
/// Anchoring on midnight instead of `now - N days` keeps an entry published early
/// in the day from flipping in or out of the window depending on when the check runs.
#[derive(Debug, Clone, Copy)]
pub struct GoalEvaluator {
    reference: FixedOffset,
}

impl Default for GoalEvaluator {
    fn default() -> Self {
        Self {
            reference: date::jst(),
        }
    }
}

impl GoalEvaluator {
    pub fn new(reference: FixedOffset) -> Self {
        Self { reference }
    }

    /// First instant (inclusive) that still counts towards the goal.
    pub fn window_start(&self, now: DateTime<Utc>, goal: GoalType) -> DateTime<Utc> {
        let today = date::beginning_of_day(now, self.reference);
        date::add_days(today, -goal.window_days())
    }

    pub fn is_achieved(&self, entry: Option<&Entry>, now: DateTime<Utc>, goal: GoalType) -> bool {
        match entry {
            None => false,
            Some(e) => e.published_at >= self.window_start(now, goal),
        }
    }
}

/// [`GoalEvaluator::is_achieved`] with the default (JST) reference offset.
pub fn is_goal_achieved(entry: Option<&Entry>, now: DateTime<Utc>, goal: GoalType) -> bool {
    GoalEvaluator::default().is_achieved(entry, now, goal)
}
