use std::collections::BTreeSet;

use super::patterns;
use crate::config::ExtensionConfig;
use crate::model::{FileEntry, FolderCandidate};

pub const LARGE_VIDEO_BYTES: u64 = 500 * 1024 * 1024;
pub const SMALL_FILE_BYTES: u64 = 10 * 1024 * 1024;
pub const MANY_SMALL_FILES: usize = 10;
/// Share of total video bytes the largest video needs to count as dominant.
pub const DOMINANT_VIDEO_SHARE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Video,
    Audio,
    Subtitle,
    Other,
}

impl FileCategory {
    pub fn of(file: &FileEntry, extensions: &ExtensionConfig) -> Self {
        let ext = file.extension.as_str();
        if extensions.video.contains(ext) {
            FileCategory::Video
        } else if extensions.audio.contains(ext) || extensions.audiobook.contains(ext) {
            FileCategory::Audio
        } else if extensions.subtitle.contains(ext) {
            FileCategory::Subtitle
        } else {
            FileCategory::Other
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    pub count: usize,
    pub total_bytes: u64,
    pub max_bytes: u64,
}

impl CategoryStats {
    fn add(&mut self, size: u64) {
        self.count += 1;
        self.total_bytes += size;
        self.max_bytes = self.max_bytes.max(size);
    }
}

/// Structural summary of one candidate. Computed once, never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    pub folder_name: String,
    pub video: CategoryStats,
    pub audio: CategoryStats,
    pub subtitle: CategoryStats,
    pub other: CategoryStats,
    pub extensions: BTreeSet<String>,
    pub has_season_structure: bool,
    pub has_episode_pattern: bool,
    pub year: Option<u16>,
    pub has_chapter_tokens: bool,
    pub has_audiobook_container: bool,
    pub single_large_video: bool,
    pub dominant_video: bool,
    pub many_small_files: bool,
}

impl FeatureSet {
    pub fn has_year_token(&self) -> bool {
        self.year.is_some()
    }

    pub fn audio_file_count(&self) -> usize {
        self.audio.count
    }

    pub fn total_files(&self) -> usize {
        self.video.count + self.audio.count + self.subtitle.count + self.other.count
    }
}

pub fn extract(candidate: &FolderCandidate, extensions: &ExtensionConfig) -> FeatureSet {
    let folder_name = candidate.folder_name();
    let mut features = FeatureSet {
        has_season_structure: patterns::is_season_name(&folder_name),
        year: patterns::first_year(&folder_name),
        has_chapter_tokens: patterns::has_chapter_token(&folder_name),
        ..FeatureSet::default()
    };

    let mut small_files = 0usize;
    let mut video_sizes: Vec<u64> = Vec::new();

    for file in &candidate.files {
        if !file.extension.is_empty() {
            features.extensions.insert(file.extension.clone());
        }
        if file.size < SMALL_FILE_BYTES {
            small_files += 1;
        }
        if !features.has_season_structure && file.parent_dirs().any(|d| patterns::is_season_name(&d)) {
            features.has_season_structure = true;
        }

        match FileCategory::of(file, extensions) {
            FileCategory::Video => {
                features.video.add(file.size);
                video_sizes.push(file.size);
                if patterns::has_episode_marker(&file.name) {
                    features.has_episode_pattern = true;
                }
            }
            FileCategory::Audio => {
                features.audio.add(file.size);
                if extensions.audiobook.contains(&file.extension) {
                    features.has_audiobook_container = true;
                }
                if patterns::has_chapter_token(file.stem()) {
                    features.has_chapter_tokens = true;
                }
            }
            FileCategory::Subtitle => {
                features.subtitle.add(file.size);
                if patterns::has_episode_marker(&file.name) {
                    features.has_episode_pattern = true;
                }
            }
            FileCategory::Other => features.other.add(file.size),
        }
    }

    let large_videos = video_sizes.iter().filter(|s| **s > LARGE_VIDEO_BYTES).count();
    features.single_large_video = video_sizes.len() == 1 && large_videos == 1;
    features.dominant_video = match video_sizes.len() {
        0 => false,
        1 => true,
        _ => {
            let total = features.video.total_bytes as f64;
            total > 0.0 && features.video.max_bytes as f64 >= total * DOMINANT_VIDEO_SHARE
        }
    };
    features.many_small_files = small_files > MANY_SMALL_FILES;
    features.folder_name = folder_name;

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn candidate(name: &str, files: &[(&str, u64)]) -> FolderCandidate {
        FolderCandidate::new(
            format!("/downloads/{}", name),
            files.iter().map(|(p, s)| FileEntry::new(*p, *s)).collect(),
        )
    }

    #[test]
    fn test_empty_candidate_is_zero_valued() {
        let features = extract(&candidate("Empty", &[]), &ExtensionConfig::default());
        assert_eq!(features.total_files(), 0);
        assert!(!features.single_large_video);
        assert!(!features.many_small_files);
        assert!(!features.dominant_video);
        assert_eq!(features.folder_name, "Empty");
    }

    #[test]
    fn test_single_large_video() {
        let features = extract(
            &candidate("Inception (2010)", &[("inception.mkv", 2100 * MB), ("info.nfo", 2_000)]),
            &ExtensionConfig::default(),
        );
        assert!(features.single_large_video);
        assert!(features.dominant_video);
        assert_eq!(features.year, Some(2010));
        assert_eq!(features.video.count, 1);
        assert_eq!(features.other.count, 1);
        assert!(features.extensions.contains("nfo"));
    }

    #[test]
    fn test_video_at_threshold_is_not_large() {
        let features = extract(
            &candidate("Clip", &[("clip.mp4", LARGE_VIDEO_BYTES)]),
            &ExtensionConfig::default(),
        );
        assert!(!features.single_large_video);
        assert!(features.dominant_video);
    }

    #[test]
    fn test_many_small_files_is_strict() {
        let ten: Vec<(String, u64)> = (0..10).map(|i| (format!("doc{}.txt", i), 100)).collect();
        let refs: Vec<(&str, u64)> = ten.iter().map(|(n, s)| (n.as_str(), *s)).collect();
        let features = extract(&candidate("Docs", &refs), &ExtensionConfig::default());
        assert!(!features.many_small_files);

        let eleven: Vec<(String, u64)> = (0..11).map(|i| (format!("doc{}.txt", i), 100)).collect();
        let refs: Vec<(&str, u64)> = eleven.iter().map(|(n, s)| (n.as_str(), *s)).collect();
        let features = extract(&candidate("Docs", &refs), &ExtensionConfig::default());
        assert!(features.many_small_files);
    }

    #[test]
    fn test_season_structure_from_subfolder() {
        let features = extract(
            &candidate("The Office", &[("Season 01/The.Office.S01E01.mkv", 300 * MB)]),
            &ExtensionConfig::default(),
        );
        assert!(features.has_season_structure);
        assert!(features.has_episode_pattern);
    }

    #[test]
    fn test_audio_features() {
        let features = extract(
            &candidate(
                "Author - Book",
                &[("Chapter 01.mp3", 30 * MB), ("Chapter 02.mp3", 30 * MB), ("book.m4b", 300 * MB)],
            ),
            &ExtensionConfig::default(),
        );
        assert_eq!(features.audio_file_count(), 3);
        assert!(features.has_chapter_tokens);
        assert!(features.has_audiobook_container);
        assert_eq!(features.audio.max_bytes, 300 * MB);
    }
}
