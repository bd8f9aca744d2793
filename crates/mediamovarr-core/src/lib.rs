pub mod classify;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod model;
pub mod mover;
pub mod planner;
pub mod progress;
pub mod report;
pub mod rules;
pub mod scanner;

pub use config::AppConfig;
pub use decision::{Band, ConfirmResponse, Confirmer, Decision, SkipReason, Thresholds};
pub use engine::{OrganizeEngine, RunOptions};
pub use error::Error;
pub use model::{ClassificationResult, FileEntry, FolderCandidate, MediaType, TraceEntry};
pub use progress::{ProgressReporter, SilentReporter};
pub use report::{CandidateReport, RunReport, RunSummary};
