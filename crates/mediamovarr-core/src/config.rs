use config::{Config, Environment, File as ConfigFile, FileFormat};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::decision::Thresholds;
use crate::error::Error;
use crate::rules::RuleDef;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source_dirs: Vec<String>,
    #[serde(default)]
    pub dest_dir: String,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub extensions: ExtensionConfig,
    /// `None` selects the built-in rule set, an empty list disables rules.
    #[serde(default)]
    pub rules: Option<Vec<RuleDef>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_dirs: Vec::new(),
            dest_dir: String::new(),
            ignore_patterns: Vec::new(),
            max_depth: default_max_depth(),
            thresholds: Thresholds::default(),
            metadata: MetadataConfig::default(),
            extensions: ExtensionConfig::default(),
            rules: None,
        }
    }
}

fn default_max_depth() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default)]
    pub language: Option<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            base_url: default_base_url(),
            min_interval_ms: default_min_interval_ms(),
            language: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_min_interval_ms() -> u64 {
    250
}

/// Extension sets (lower-case, no dot) used to bucket files.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionConfig {
    #[serde(default = "default_video")]
    pub video: BTreeSet<String>,
    #[serde(default = "default_audio")]
    pub audio: BTreeSet<String>,
    #[serde(default = "default_subtitle")]
    pub subtitle: BTreeSet<String>,
    #[serde(default = "default_audiobook")]
    pub audiobook: BTreeSet<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            video: default_video(),
            audio: default_audio(),
            subtitle: default_subtitle(),
            audiobook: default_audiobook(),
        }
    }
}

fn to_set(exts: &[&str]) -> BTreeSet<String> {
    exts.iter().map(|e| e.to_string()).collect()
}

fn default_video() -> BTreeSet<String> {
    to_set(&[
        "mkv", "mp4", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts",
    ])
}

fn default_audio() -> BTreeSet<String> {
    to_set(&[
        "mp3", "flac", "m4a", "aac", "ogg", "opus", "wav", "wma", "alac", "m4b",
    ])
}

fn default_subtitle() -> BTreeSet<String> {
    to_set(&["srt", "sub", "ass", "ssa", "vtt", "idx"])
}

fn default_audiobook() -> BTreeSet<String> {
    to_set(&["m4b"])
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.thresholds.validate()?;

        if self.dest_dir.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "dest_dir must be set".to_string(),
            ));
        }

        if self.metadata.enabled && self.metadata.api_key.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "metadata.enabled requires metadata.api_key".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load configuration from `mediamovarr.toml` in the working directory (or
/// an explicit file) layered with `MEDIAMOVARR__*` environment variables.
pub fn load_configuration(path: Option<&Path>) -> Result<AppConfig, Error> {
    let file_source = match path {
        Some(p) => ConfigFile::from(p).required(true),
        None => ConfigFile::with_name("mediamovarr").required(false),
    };

    let builder = Config::builder()
        .add_source(file_source)
        .add_source(
            Environment::with_prefix("MEDIAMOVARR")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(builder.try_deserialize::<AppConfig>()?)
}

/// Parse configuration from a TOML string, without environment overlay.
pub fn parse_configuration(toml: &str) -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::from_str(toml, FileFormat::Toml))
        .build()?;
    Ok(builder.try_deserialize::<AppConfig>()?)
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        if result.iter().any(|kept| dir_path.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !Path::new(kept).starts_with(dir_path));
        result.push(dir);
    }

    result
}
