//! File scanning: pattern compilation, per-file matching, worker pool

pub mod matcher;
pub mod matches;
pub mod worker;

pub use matcher::{MatchOptions, PatternMatcher};
pub use matches::{FileMatches, MatchList, MatchRecord};
pub use worker::{ScannerStats, ScannerWorker};
