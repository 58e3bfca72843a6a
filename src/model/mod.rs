// src/model/mod.rs
pub mod entry;
pub mod goal;
pub mod report;

pub use entry::{latest, platforms_by_priority, Entry, Platform, PlatformKind};
pub use goal::{is_goal_achieved, GoalEvaluator, GoalType};
pub use report::AnalysisReport;
