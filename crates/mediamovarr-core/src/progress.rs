use crate::decision::Decision;
use crate::model::FolderCandidate;

/// Trait for reporting organize progress.
///
/// The CLI implements it with indicatif. All methods have default no-op
/// implementations.
pub trait ProgressReporter {
    fn on_run_start(&self, _total_candidates: usize) {}
    fn on_candidate_start(&self, _index: usize, _candidate: &FolderCandidate) {}
    fn on_candidate_done(&self, _index: usize, _decision: &Decision) {}
    fn on_file_moved(&self, _source: &str, _destination: &str) {}
    fn on_run_complete(&self, _processed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
