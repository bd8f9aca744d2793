use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::decision::Decision;
use crate::error::Error;
use crate::metadata::ResolverStats;
use crate::model::{MediaType, TraceEntry};
use crate::mover::{MoveOutcome, MovePlan};

#[derive(Debug, Clone, Serialize)]
pub struct FileMove {
    pub plan: MovePlan,
    pub outcome: MoveOutcome,
}

/// Everything that happened to one candidate folder.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub path: PathBuf,
    pub media_type: MediaType,
    pub confidence: f64,
    pub trace: Vec<TraceEntry>,
    pub decision: Decision,
    pub moves: Vec<FileMove>,
    pub left_behind: Vec<PathBuf>,
    /// Part of the destination name was guessed.
    pub fallback: bool,
    pub failure: Option<String>,
}

impl CandidateReport {
    pub fn files_moved(&self) -> usize {
        self.moves
            .iter()
            .filter(|m| matches!(m.outcome, MoveOutcome::Moved | MoveOutcome::Overwritten))
            .count()
    }

    pub fn files_failed(&self) -> usize {
        self.moves
            .iter()
            .filter(|m| matches!(m.outcome, MoveOutcome::Failed(_)))
            .count()
    }

    pub fn conflicts(&self) -> usize {
        self.moves.iter().filter(|m| m.plan.conflict).count()
    }

    pub fn has_failure(&self) -> bool {
        self.failure.is_some() || self.files_failed() > 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    /// Candidates with at least one file moved.
    pub moved: usize,
    /// Candidates that would have moved files outside dry-run.
    pub would_move: usize,
    pub confirmed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub files_moved: usize,
    /// Candidates left untouched after an operator abort.
    pub aborted_remaining: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub dry_run: bool,
    pub candidates: Vec<CandidateReport>,
    pub summary: RunSummary,
    pub metadata: Option<ResolverStats>,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    path: String,
    media_type: &'a str,
    confidence: String,
    decision: String,
    files_planned: usize,
    files_moved: usize,
    conflicts: usize,
    left_behind: usize,
    fallback: bool,
    trace: String,
    failure: &'a str,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            started_at: Local::now(),
            dry_run,
            candidates: Vec::new(),
            summary: RunSummary::default(),
            metadata: None,
        }
    }

    pub fn record(&mut self, report: CandidateReport) {
        let summary = &mut self.summary;
        summary.processed += 1;
        if report.decision == Decision::Confirmed {
            summary.confirmed += 1;
        }
        if matches!(report.decision, Decision::Skip(_)) {
            summary.skipped += 1;
        }
        if report.has_failure() {
            summary.failed += 1;
        }
        let moved = report.files_moved();
        summary.files_moved += moved;
        if moved > 0 {
            summary.moved += 1;
        }
        if report.moves.iter().any(|m| m.outcome == MoveOutcome::WouldMove) {
            summary.would_move += 1;
        }
        self.candidates.push(report);
    }

    /// One row per candidate.
    pub fn write_csv(&self, path: &Path) -> Result<(), Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for c in &self.candidates {
            let trace = c
                .trace
                .iter()
                .map(|t| format!("{}:{:+.2}", t.source, t.delta))
                .collect::<Vec<_>>()
                .join("; ");
            writer.serialize(CsvRow {
                path: c.path.display().to_string(),
                media_type: c.media_type.as_str(),
                confidence: format!("{:.2}", c.confidence),
                decision: c.decision.to_string(),
                files_planned: c.moves.len(),
                files_moved: c.files_moved(),
                conflicts: c.conflicts(),
                left_behind: c.left_behind.len(),
                fallback: c.fallback,
                trace,
                failure: c.failure.as_deref().unwrap_or(""),
            })?;
        }
        writer.flush()?;
        info!("Wrote report for {} candidates to {}", self.candidates.len(), path.display());
        Ok(())
    }
}
