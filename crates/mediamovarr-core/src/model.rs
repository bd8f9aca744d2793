use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Tv,
    Movie,
    Music,
    Audiobook,
    Unknown,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Tv => "tv",
            MediaType::Movie => "movie",
            MediaType::Music => "music",
            MediaType::Audiobook => "audiobook",
            MediaType::Unknown => "unknown",
        }
    }

    /// Types the external metadata provider knows how to search.
    pub fn supports_lookup(&self) -> bool {
        matches!(self, MediaType::Tv | MediaType::Movie)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file found below a candidate folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the candidate root.
    pub relative_path: PathBuf,
    pub name: String,
    /// Lower-case extension without the leading dot, empty when absent.
    pub extension: String,
    pub size: u64,
    /// Directories between the candidate root and the file (0 = direct child).
    pub depth: usize,
}

impl FileEntry {
    pub fn new(relative_path: impl Into<PathBuf>, size: u64) -> Self {
        let relative_path = relative_path.into();
        let name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = relative_path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let depth = relative_path.components().count().saturating_sub(1);

        Self {
            relative_path,
            name,
            extension,
            size,
            depth,
        }
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }

    /// Names of the directories between the candidate root and the file.
    pub fn parent_dirs(&self) -> impl Iterator<Item = String> + '_ {
        self.relative_path
            .parent()
            .into_iter()
            .flat_map(|p| p.components())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
    }
}

/// A discovered folder under consideration. Immutable for the pass.
#[derive(Debug, Clone)]
pub struct FolderCandidate {
    pub path: PathBuf,
    pub files: Vec<FileEntry>,
}

impl FolderCandidate {
    pub fn new(path: impl Into<PathBuf>, files: Vec<FileEntry>) -> Self {
        Self {
            path: path.into(),
            files,
        }
    }

    pub fn folder_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn source_of(&self, file: &FileEntry) -> PathBuf {
        self.path.join(&file.relative_path)
    }

    pub fn root(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum TraceSource {
    Base,
    Rule(String),
}

impl fmt::Display for TraceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceSource::Base => f.write_str("base"),
            TraceSource::Rule(name) => write!(f, "rule:{}", name),
        }
    }
}

/// One immutable record in the adjustment log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub source: TraceSource,
    pub delta: f64,
    pub reason: String,
}

/// The record threaded through classification, rules and decision.
///
/// The confidence is recomputed from the trace after every adjustment as
/// `clamp(sum of deltas, 0, 1)`, so it is always in range and independent
/// of the order in which adjustments were applied.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub media_type: MediaType,
    confidence: f64,
    trace: Vec<TraceEntry>,
}

impl ClassificationResult {
    pub fn new(media_type: MediaType, base_confidence: f64, reason: impl Into<String>) -> Self {
        let trace = vec![TraceEntry {
            source: TraceSource::Base,
            delta: base_confidence,
            reason: reason.into(),
        }];
        Self {
            media_type,
            confidence: clamp_confidence(base_confidence),
            trace,
        }
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn base_confidence(&self) -> f64 {
        self.trace[0].delta
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn adjust(&mut self, rule: &str, delta: f64, reason: impl Into<String>) {
        self.trace.push(TraceEntry {
            source: TraceSource::Rule(rule.to_string()),
            delta,
            reason: reason.into(),
        });
        let raw: f64 = self.trace.iter().map(|t| t.delta).sum();
        self.confidence = clamp_confidence(raw);
    }
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
