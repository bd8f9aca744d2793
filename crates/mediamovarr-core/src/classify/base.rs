use tracing::debug;

use super::features::FeatureSet;
use crate::model::{ClassificationResult, FolderCandidate, MediaType};

pub const TV_CONFIDENCE: f64 = 0.9;
pub const MOVIE_LARGE_CONFIDENCE: f64 = 0.85;
pub const MOVIE_DOMINANT_CONFIDENCE: f64 = 0.8;
pub const MOVIE_AMBIGUOUS_CONFIDENCE: f64 = 0.6;
pub const MUSIC_CONFIDENCE: f64 = 0.7;
pub const AUDIOBOOK_CONFIDENCE: f64 = 0.65;

pub const MIN_AUDIO_FILES: usize = 3;
/// Largest per-track size still treated as a music track.
pub const MAX_MUSIC_TRACK_BYTES: u64 = 50 * 1024 * 1024;

/// Pattern scoring. Signals are tested in priority order and the first one
/// that fires decides the type; its score is the first trace entry.
pub fn classify(candidate: &FolderCandidate, features: &FeatureSet) -> ClassificationResult {
    let (media_type, confidence, reason) = score(features);
    debug!(
        "{}: base {} {:.2} ({})",
        candidate.path.display(),
        media_type,
        confidence,
        reason
    );
    ClassificationResult::new(media_type, confidence, reason)
}

fn score(features: &FeatureSet) -> (MediaType, f64, &'static str) {
    if features.has_season_structure {
        return (MediaType::Tv, TV_CONFIDENCE, "season folder pattern");
    }
    if features.has_episode_pattern {
        return (MediaType::Tv, TV_CONFIDENCE, "episode filename pattern");
    }

    if features.has_year_token() && features.video.count > 0 {
        if features.single_large_video {
            return (MediaType::Movie, MOVIE_LARGE_CONFIDENCE, "year token with single large video");
        }
        if features.dominant_video {
            return (MediaType::Movie, MOVIE_DOMINANT_CONFIDENCE, "year token with dominant video");
        }
        return (MediaType::Movie, MOVIE_AMBIGUOUS_CONFIDENCE, "year token with ambiguous videos");
    }

    let many_audio = features.audio_file_count() >= MIN_AUDIO_FILES;
    if many_audio
        && !features.has_chapter_tokens
        && !features.has_audiobook_container
        && features.audio.max_bytes < MAX_MUSIC_TRACK_BYTES
    {
        return (MediaType::Music, MUSIC_CONFIDENCE, "many small audio tracks");
    }

    if many_audio && features.has_chapter_tokens {
        return (MediaType::Audiobook, AUDIOBOOK_CONFIDENCE, "audio files with chapter tokens");
    }
    if features.has_audiobook_container {
        return (MediaType::Audiobook, AUDIOBOOK_CONFIDENCE, "audiobook container");
    }

    (MediaType::Unknown, 0.0, "no signal")
}
