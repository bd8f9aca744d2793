use tracing::debug;

use super::{Condition, Rule};
use crate::classify::FeatureSet;
use crate::metadata::MetadataMatch;
use crate::model::ClassificationResult;

impl Condition {
    /// `metadata` is `None` when no lookup was made; `tmdb_match` then does
    /// not fire in either direction.
    pub fn evaluate(&self, features: &FeatureSet, metadata: Option<&MetadataMatch>) -> bool {
        match self {
            Condition::FileType(ext) => features.extensions.contains(ext),
            Condition::TmdbMatch(expected) => metadata.map_or(false, |m| m.matched == *expected),
            Condition::SingleLargeVideo(expected) => features.single_large_video == *expected,
            Condition::ManySmallFiles(expected) => features.many_small_files == *expected,
            Condition::HasSeasonStructure(expected) => features.has_season_structure == *expected,
            Condition::AudioFileCount(cmp) => cmp.matches(features.audio_file_count()),
            Condition::FolderNameContains(needles) => {
                let folder = features.folder_name.to_lowercase();
                needles.iter().any(|n| folder.contains(n.as_str()))
            }
            Condition::FolderNameMatches(re) => re.is_match(&features.folder_name),
        }
    }
}

/// Apply every matching rule cumulatively. Each match appends a trace entry;
/// the confidence stays `clamp(base + sum of matched adjustments, 0, 1)`.
pub fn apply(
    rules: &[Rule],
    features: &FeatureSet,
    metadata: Option<&MetadataMatch>,
    mut result: ClassificationResult,
) -> ClassificationResult {
    for rule in rules {
        if rule.condition.evaluate(features, metadata) {
            debug!(
                "Rule '{}' ({}) matched: {:+.2}",
                rule.name,
                rule.condition.name(),
                rule.adjustment
            );
            result.adjust(&rule.name, rule.adjustment, rule.reason.clone());
        }
    }
    result
}
