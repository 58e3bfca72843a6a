// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod app;
pub mod clock;
pub mod config;
pub mod date;
pub mod error;
pub mod fetch;
pub mod http;
pub mod lock;
pub mod logging;
pub mod model;
pub mod notify;
pub mod persist;
pub mod pipeline;
pub mod print;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{AnalyzeInput, AnalyzeOutput, Analyzer};
pub use crate::error::AnalyzeError;
pub use crate::fetch::types::EntryFetcher;
pub use crate::lock::Locker;
pub use crate::model::{AnalysisReport, Entry, GoalType, Platform, PlatformKind};
pub use crate::notify::Notifier;
pub use crate::persist::Persister;
pub use crate::print::Printer;
