use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::classify::{self, FeatureSet};
use crate::config::AppConfig;
use crate::decision::{self, Band, Confirmer, Decision, SkipReason};
use crate::metadata::{MetadataMatch, MetadataResolver, MetadataSource, ResolverStats};
use crate::model::{ClassificationResult, FolderCandidate};
use crate::mover::{self, MoveAction, MoveOutcome, MovePlan};
use crate::planner::{self, ResolvedNaming};
use crate::progress::ProgressReporter;
use crate::report::{CandidateReport, FileMove, RunReport};
use crate::rules::{self, Rule};

pub type Resolver = MetadataResolver<Box<dyn MetadataSource>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub force: bool,
    /// Prompt for medium-confidence candidates instead of skipping them.
    pub interactive: bool,
}

/// Classification outcome for one candidate, before any decision.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub features: FeatureSet,
    pub result: ClassificationResult,
    /// `None` when no lookup was made.
    pub metadata: Option<MetadataMatch>,
    /// `None` when the type has no destination template.
    pub naming: Option<ResolvedNaming>,
}

pub struct OrganizeEngine {
    config: AppConfig,
    rules: Vec<Rule>,
    resolver: Option<Resolver>,
}

impl OrganizeEngine {
    pub fn new(config: AppConfig, rules: Vec<Rule>, resolver: Option<Resolver>) -> Self {
        Self {
            config,
            rules,
            resolver,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metadata_stats(&self) -> Option<ResolverStats> {
        self.resolver.as_ref().map(|r| r.stats())
    }

    /// Features, base classification, optional lookup and rule adjustments.
    pub fn assess(&mut self, candidate: &FolderCandidate) -> Assessment {
        let features = classify::extract(candidate, &self.config.extensions);
        let base = classify::classify(candidate, &features);
        let folder_name = candidate.folder_name();

        let metadata = match self.resolver.as_mut() {
            Some(resolver) if base.media_type.supports_lookup() => {
                planner::lookup_query(base.media_type, &folder_name)
                    .map(|(title, year)| resolver.resolve(base.media_type, &title, year))
            }
            _ => None,
        };

        let result = rules::apply(&self.rules, &features, metadata.as_ref(), base);
        let naming = planner::resolve_naming(result.media_type, &folder_name, metadata.as_ref());

        Assessment {
            features,
            result,
            metadata,
            naming,
        }
    }

    fn decide(
        &self,
        candidate: &FolderCandidate,
        assessment: &Assessment,
        options: &RunOptions,
        confirmer: &mut dyn Confirmer,
    ) -> Decision {
        let thresholds = &self.config.thresholds;
        if assessment.naming.is_none() {
            // Nothing to move to; never prompt for it.
            return match thresholds.band(assessment.result.confidence()) {
                Band::Skip => Decision::Skip(SkipReason::BelowThreshold),
                _ => Decision::Skip(SkipReason::NoTemplate),
            };
        }
        decision::decide(
            thresholds,
            candidate,
            &assessment.result,
            options.interactive,
            confirmer,
        )
    }

    /// Run the pipeline over every candidate in order. An operator abort
    /// stops the run; candidates after it are left untouched.
    pub fn run(
        &mut self,
        candidates: &[FolderCandidate],
        options: &RunOptions,
        confirmer: &mut dyn Confirmer,
        reporter: &dyn ProgressReporter,
    ) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport::new(options.dry_run);
        reporter.on_run_start(candidates.len());

        for (index, candidate) in candidates.iter().enumerate() {
            reporter.on_candidate_start(index, candidate);
            let assessment = self.assess(candidate);
            let decision = self.decide(candidate, &assessment, options, confirmer);

            if decision == Decision::Abort {
                report.summary.aborted_remaining = candidates.len() - index;
                warn!(
                    "Run aborted at {}, {} candidates left untouched",
                    candidate.path.display(),
                    report.summary.aborted_remaining
                );
                reporter.on_candidate_done(index, &decision);
                break;
            }

            let candidate_report = self.process(candidate, assessment, decision, options, reporter);
            reporter.on_candidate_done(index, &candidate_report.decision);
            report.record(candidate_report);
        }

        report.metadata = self.metadata_stats();
        reporter.on_run_complete(report.summary.processed, start.elapsed().as_secs_f64());
        report
    }

    fn process(
        &self,
        candidate: &FolderCandidate,
        assessment: Assessment,
        decision: Decision,
        options: &RunOptions,
        reporter: &dyn ProgressReporter,
    ) -> CandidateReport {
        let Assessment { result, naming, .. } = assessment;
        let mut report = CandidateReport {
            path: candidate.path.clone(),
            media_type: result.media_type,
            confidence: result.confidence(),
            trace: result.trace().to_vec(),
            decision,
            moves: Vec::new(),
            left_behind: Vec::new(),
            fallback: naming.as_ref().map_or(false, |n| n.fallback),
            failure: None,
        };

        let naming = match naming {
            Some(naming) if decision.proceeds() => naming,
            _ => {
                info!(
                    "{}: {} {:.2} -> {}",
                    candidate.path.display(),
                    result.media_type,
                    result.confidence(),
                    decision
                );
                return report;
            }
        };

        let plan = planner::plan_candidate(candidate, &naming, &self.config.extensions);
        report.fallback = plan.fallback;
        report.left_behind = plan.left_behind;

        let destination_root = Path::new(&self.config.dest_dir);
        for file in plan.files {
            let destination = destination_root.join(&file.relative_destination);
            let (move_plan, outcome) = match MovePlan::build(&file.source, &destination, options.force) {
                Ok(move_plan) => {
                    let outcome = mover::execute(&move_plan, options.dry_run);
                    (move_plan, outcome)
                }
                Err(e) => {
                    warn!("Could not inspect {}: {}", destination.display(), e);
                    let move_plan = MovePlan {
                        source_path: file.source,
                        destination_path: destination,
                        conflict: false,
                        action: MoveAction::Move,
                    };
                    (move_plan, MoveOutcome::Failed(e.to_string()))
                }
            };

            if matches!(outcome, MoveOutcome::Moved | MoveOutcome::Overwritten) {
                reporter.on_file_moved(
                    &move_plan.source_path.to_string_lossy(),
                    &move_plan.destination_path.to_string_lossy(),
                );
            }
            report.moves.push(FileMove {
                plan: move_plan,
                outcome,
            });
        }

        if !options.dry_run && report.files_moved() > 0 {
            match mover::prune_empty_dirs(&candidate.path) {
                Ok(removed) => debug!("Pruned {} empty directories below {}", removed, candidate.path.display()),
                Err(e) => warn!("Could not prune {}: {}", candidate.path.display(), e),
            }
        }

        let failed = report.files_failed();
        if failed > 0 {
            report.failure = Some(format!("{} of {} files failed to move", failed, report.moves.len()));
        }

        info!(
            "{}: {} {:.2} -> {} ({} files{})",
            candidate.path.display(),
            result.media_type,
            result.confidence(),
            decision,
            report.moves.len(),
            if options.dry_run { ", dry-run" } else { "" }
        );
        report
    }
}
