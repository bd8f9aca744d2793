use indicatif::{ProgressBar, ProgressStyle};
use mediamovarr_core::{Decision, FolderCandidate, ProgressReporter};
use std::sync::Mutex;
use std::time::Duration;

/// CLI progress reporter: one bar over the candidate folders.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    /// Hide the bar while `f` writes to the terminal.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        let guard = self.bar.lock().unwrap();
        match guard.as_ref() {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_run_start(&self, total_candidates: usize) {
        let pb = ProgressBar::new(total_candidates as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Organizing [{bar:30.cyan/dim}] {pos}/{len} {wide_msg}",
            )
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_candidate_start(&self, _index: usize, candidate: &FolderCandidate) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_message(candidate.folder_name());
        }
    }

    fn on_candidate_done(&self, _index: usize, _decision: &Decision) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.inc(1);
        }
    }

    fn on_run_complete(&self, processed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Organize complete: {} folders in {:.2}s",
            processed, duration_secs
        );
    }
}
