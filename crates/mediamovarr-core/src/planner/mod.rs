//! Canonical library paths per media type.
//!
//! - tv: `{Show}/Season {ss}/{Show.Name}.S{ss}E{ee}.{ext}`
//! - movie: `Movies/{Title} ({Year})/{Title} ({Year}).{ext}`
//! - music: `Music/{Artist}/{Album}/{file name}`
//! - audiobook: `Audiobooks/{Author}/{Title}/{file name}`

pub mod names;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::classify::FileCategory;
use crate::classify::patterns;
use crate::config::ExtensionConfig;
use crate::metadata::MetadataMatch;
use crate::model::{FileEntry, FolderCandidate, MediaType};
use names::sanitize;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const UNKNOWN_TITLE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Naming {
    Tv { show: String, season: Option<u32> },
    Movie { title: String, year: Option<u16> },
    Music { artist: String, album: String },
    Audiobook { author: String, title: String },
}

/// Library names for a candidate. `fallback` is set when a part of the name
/// had to be guessed, which lowers the implied confidence of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNaming {
    pub naming: Naming,
    pub fallback: bool,
}

/// Title and year to send to the metadata provider.
pub fn lookup_query(media_type: MediaType, folder_name: &str) -> Option<(String, Option<u16>)> {
    match media_type {
        MediaType::Tv => names::parse_tv_folder(folder_name).0.map(|t| (t, None)),
        MediaType::Movie => {
            let (title, year) = names::parse_movie_folder(folder_name);
            title.map(|t| (t, year))
        }
        _ => None,
    }
}

pub fn resolve_naming(
    media_type: MediaType,
    folder_name: &str,
    metadata: Option<&MetadataMatch>,
) -> Option<ResolvedNaming> {
    let canonical = metadata
        .filter(|m| m.matched)
        .and_then(|m| m.canonical_title.as_deref())
        .map(sanitize)
        .filter(|t| !t.is_empty());

    let resolved = match media_type {
        MediaType::Tv => {
            let (parsed, season) = names::parse_tv_folder(folder_name);
            let fallback = canonical.is_none() && parsed.is_none();
            let show = canonical
                .or(parsed)
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
            ResolvedNaming {
                naming: Naming::Tv { show, season },
                fallback,
            }
        }
        MediaType::Movie => {
            let (parsed, parsed_year) = names::parse_movie_folder(folder_name);
            let year = metadata
                .filter(|m| m.matched)
                .and_then(|m| m.year)
                .or(parsed_year);
            let fallback = year.is_none() || (canonical.is_none() && parsed.is_none());
            let title = canonical
                .or(parsed)
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
            ResolvedNaming {
                naming: Naming::Movie { title, year },
                fallback,
            }
        }
        MediaType::Music => {
            let (artist, album) = names::parse_music_folder(folder_name);
            ResolvedNaming {
                fallback: artist.is_none() || album.is_none(),
                naming: Naming::Music {
                    artist: artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
                    album: album.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                },
            }
        }
        MediaType::Audiobook => {
            let (author, title) = names::parse_audiobook_folder(folder_name);
            ResolvedNaming {
                fallback: author.is_none() || title.is_none(),
                naming: Naming::Audiobook {
                    author: author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
                    title: title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                },
            }
        }
        MediaType::Unknown => return None,
    };

    Some(resolved)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPath {
    pub relative: PathBuf,
    pub fallback: bool,
}

fn with_extension(base: &str, language: Option<&str>, ext: &str) -> String {
    let mut name = base.to_string();
    if let Some(lang) = language {
        name.push('.');
        name.push_str(lang);
    }
    if !ext.is_empty() {
        name.push('.');
        name.push_str(ext);
    }
    name
}

fn season_from_dirs(file: &FileEntry) -> Option<u32> {
    file.parent_dirs().filter_map(|d| names::season_of_dir(&d)).last()
}

/// Season of a tv file: its own marker, then the folder name, then the
/// nearest `Season NN` directory above it.
fn tv_season(folder_season: Option<u32>, file: &FileEntry) -> Option<u32> {
    patterns::episode_numbers(&file.name)
        .map(|(s, _)| s)
        .or(folder_season)
        .or_else(|| season_from_dirs(file))
}

/// Destination of one file, relative to the library root.
///
/// `ordinal` is the file's 1-based position among files of its kind in the
/// same season that carry no episode marker; it numbers episodes when
/// nothing better exists.
pub fn plan_path(naming: &Naming, file: &FileEntry, category: FileCategory, ordinal: u32) -> PlannedPath {
    let language = match category {
        FileCategory::Subtitle => names::subtitle_language(file.stem()),
        _ => None,
    };

    match naming {
        Naming::Tv { show, season } => {
            let marker = patterns::episode_numbers(&file.name);
            let mut fallback = marker.is_none();
            let season = tv_season(*season, file).unwrap_or_else(|| {
                fallback = true;
                1
            });
            let episode = marker.map(|(_, e)| e).unwrap_or(ordinal);
            let dotted = show.replace(' ', ".");
            let base = format!("{}.S{:02}E{:02}", dotted, season, episode);
            PlannedPath {
                relative: PathBuf::from(show)
                    .join(format!("Season {:02}", season))
                    .join(with_extension(&base, language.as_deref(), &file.extension)),
                fallback,
            }
        }
        Naming::Movie { title, year } => {
            let folder = match year {
                Some(y) => format!("{} ({})", title, y),
                None => title.clone(),
            };
            PlannedPath {
                relative: PathBuf::from("Movies")
                    .join(&folder)
                    .join(with_extension(&folder, language.as_deref(), &file.extension)),
                fallback: year.is_none(),
            }
        }
        Naming::Music { artist, album } => PlannedPath {
            relative: PathBuf::from("Music").join(artist).join(album).join(&file.name),
            fallback: false,
        },
        Naming::Audiobook { author, title } => PlannedPath {
            relative: PathBuf::from("Audiobooks").join(author).join(title).join(&file.name),
            fallback: false,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub source: PathBuf,
    pub relative_destination: PathBuf,
    pub fallback: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CandidatePlan {
    pub files: Vec<PlannedFile>,
    /// Files with no place in the template; they stay where they are.
    pub left_behind: Vec<PathBuf>,
    pub fallback: bool,
}

fn organized_files<'a>(
    candidate: &'a FolderCandidate,
    naming: &Naming,
    extensions: &ExtensionConfig,
) -> Vec<(&'a FileEntry, FileCategory)> {
    let mut files: Vec<(&FileEntry, FileCategory)> = candidate
        .files
        .iter()
        .map(|f| (f, FileCategory::of(f, extensions)))
        .collect();
    files.sort_by(|a, b| a.0.relative_path.cmp(&b.0.relative_path));

    match naming {
        Naming::Tv { .. } => files
            .into_iter()
            .filter(|(_, c)| matches!(c, FileCategory::Video | FileCategory::Subtitle))
            .collect(),
        Naming::Movie { .. } => {
            let main = files
                .iter()
                .filter(|(_, c)| *c == FileCategory::Video)
                .fold(None::<&FileEntry>, |best, (f, _)| match best {
                    Some(b) if b.size >= f.size => Some(b),
                    _ => Some(*f),
                });
            files
                .into_iter()
                .filter(|(f, c)| match c {
                    FileCategory::Video => main.map_or(false, |m| std::ptr::eq(m, *f)),
                    FileCategory::Subtitle => true,
                    _ => false,
                })
                .collect()
        }
        Naming::Music { .. } | Naming::Audiobook { .. } => files,
    }
}

/// Fallback names for a file whose planned destination is already taken:
/// its original name, then its original name prefixed with the
/// sub-directories it came from (`CD2 - 01 - Track.flac`).
fn collision_alternatives(planned: &Path, file: &FileEntry) -> Vec<PathBuf> {
    let folder = planned.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut alternatives = vec![folder.join(&file.name)];
    let dirs: Vec<String> = file.parent_dirs().collect();
    if !dirs.is_empty() {
        let prefix = sanitize(&dirs.join(" - "));
        alternatives.push(folder.join(format!("{} - {}", prefix, file.name)));
    }
    alternatives
}

/// Plan every file of a candidate that belongs in the library layout.
pub fn plan_candidate(
    candidate: &FolderCandidate,
    resolved: &ResolvedNaming,
    extensions: &ExtensionConfig,
) -> CandidatePlan {
    let selected = organized_files(candidate, &resolved.naming, extensions);
    let mut plan = CandidatePlan {
        fallback: resolved.fallback,
        ..CandidatePlan::default()
    };

    let selected_paths: HashSet<&PathBuf> = selected.iter().map(|(f, _)| &f.relative_path).collect();
    plan.left_behind = candidate
        .files
        .iter()
        .filter(|f| !selected_paths.contains(&f.relative_path))
        .map(|f| candidate.source_of(f))
        .collect();

    let mut taken: HashSet<PathBuf> = HashSet::new();
    // (season, is subtitle) -> files numbered so far
    let mut ordinals: HashMap<(u32, bool), u32> = HashMap::new();

    for (file, category) in selected {
        let ordinal = if patterns::has_episode_marker(&file.name) {
            0
        } else {
            let season = match &resolved.naming {
                Naming::Tv { season, .. } => tv_season(*season, file).unwrap_or(1),
                _ => 0,
            };
            let counter = ordinals
                .entry((season, category == FileCategory::Subtitle))
                .or_insert(0);
            *counter += 1;
            *counter
        };

        let planned = plan_path(&resolved.naming, file, category, ordinal);
        let mut relative = planned.relative;

        if taken.contains(&relative) {
            match collision_alternatives(&relative, file)
                .into_iter()
                .find(|a| !taken.contains(a))
            {
                Some(alternative) => {
                    debug!(
                        "Destination {} already planned, using {}",
                        relative.display(),
                        alternative.display()
                    );
                    relative = alternative;
                }
                None => {
                    warn!(
                        "No free destination for {}, leaving it in place",
                        candidate.source_of(file).display()
                    );
                    plan.left_behind.push(candidate.source_of(file));
                    continue;
                }
            }
        }

        taken.insert(relative.clone());
        plan.fallback |= planned.fallback;
        plan.files.push(PlannedFile {
            source: candidate.source_of(file),
            relative_destination: relative,
            fallback: planned.fallback,
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const MB: u64 = 1024 * 1024;

    fn candidate(name: &str, files: &[(&str, u64)]) -> FolderCandidate {
        FolderCandidate::new(
            format!("/downloads/{}", name),
            files.iter().map(|(p, s)| FileEntry::new(*p, *s)).collect(),
        )
    }

    fn plan(media_type: MediaType, c: &FolderCandidate, metadata: Option<&MetadataMatch>) -> CandidatePlan {
        let naming = resolve_naming(media_type, &c.folder_name(), metadata).unwrap();
        plan_candidate(c, &naming, &ExtensionConfig::default())
    }

    #[test]
    fn test_tv_template() {
        let c = candidate(
            "The Office Season 01",
            &[
                ("The.Office.S01E01.mkv", 200 * MB),
                ("The.Office.S01E02.mkv", 200 * MB),
                ("The.Office.S01E01.en.srt", 1000),
                ("release.nfo", 100),
            ],
        );
        let p = plan(MediaType::Tv, &c, None);
        let dests: Vec<&Path> = p.files.iter().map(|f| f.relative_destination.as_path()).collect();
        assert!(dests.contains(&Path::new("The Office/Season 01/The.Office.S01E01.mkv")));
        assert!(dests.contains(&Path::new("The Office/Season 01/The.Office.S01E02.mkv")));
        assert!(dests.contains(&Path::new("The Office/Season 01/The.Office.S01E01.en.srt")));
        assert_eq!(p.left_behind, vec![PathBuf::from("/downloads/The Office Season 01/release.nfo")]);
        assert!(!p.fallback);
    }

    #[test]
    fn test_tv_episode_fallback_uses_ordinal() {
        let c = candidate("Show Season 2", &[("b.mkv", 100 * MB), ("a.mkv", 100 * MB)]);
        let p = plan(MediaType::Tv, &c, None);
        assert_eq!(
            p.files[0].relative_destination,
            PathBuf::from("Show/Season 02/Show.S02E01.mkv")
        );
        assert_eq!(p.files[0].source, PathBuf::from("/downloads/Show Season 2/a.mkv"));
        assert_eq!(
            p.files[1].relative_destination,
            PathBuf::from("Show/Season 02/Show.S02E02.mkv")
        );
        assert!(p.fallback);
    }

    #[test]
    fn test_tv_fallback_episodes_count_per_season() {
        let c = candidate(
            "Show",
            &[
                ("Season 01/a.mkv", 100 * MB),
                ("Season 01/b.mkv", 100 * MB),
                ("Season 02/c.mkv", 100 * MB),
                ("Season 02/c.srt", 1000),
            ],
        );
        let p = plan(MediaType::Tv, &c, None);
        let dests: Vec<&Path> = p.files.iter().map(|f| f.relative_destination.as_path()).collect();
        assert_eq!(
            dests,
            vec![
                Path::new("Show/Season 01/Show.S01E01.mkv"),
                Path::new("Show/Season 01/Show.S01E02.mkv"),
                Path::new("Show/Season 02/Show.S02E01.mkv"),
                Path::new("Show/Season 02/Show.S02E01.srt"),
            ]
        );
    }

    #[test]
    fn test_tv_season_from_subfolder() {
        let c = candidate("The Office", &[("Season 03/ep.mkv", 100 * MB)]);
        let p = plan(MediaType::Tv, &c, None);
        assert_eq!(
            p.files[0].relative_destination,
            PathBuf::from("The Office/Season 03/The.Office.S03E01.mkv")
        );
    }

    #[test]
    fn test_movie_template() {
        let c = candidate(
            "Inception (2010)",
            &[
                ("inception.mkv", 2100 * MB),
                ("sample.mkv", 30 * MB),
                ("inception.en.srt", 1000),
            ],
        );
        let p = plan(MediaType::Movie, &c, None);
        assert_eq!(p.files.len(), 2);
        assert_eq!(
            p.files[0].relative_destination,
            PathBuf::from("Movies/Inception (2010)/Inception (2010).en.srt")
        );
        assert_eq!(
            p.files[1].relative_destination,
            PathBuf::from("Movies/Inception (2010)/Inception (2010).mkv")
        );
        assert_eq!(p.left_behind.len(), 1);
        assert!(!p.fallback);
    }

    #[test]
    fn test_movie_without_year_is_fallback() {
        let c = candidate("Heat", &[("heat.mp4", 900 * MB)]);
        let p = plan(MediaType::Movie, &c, None);
        assert_eq!(p.files[0].relative_destination, PathBuf::from("Movies/Heat/Heat.mp4"));
        assert!(p.fallback);
    }

    #[test]
    fn test_metadata_overrides_title() {
        let c = candidate("spider-man homecoming 2017", &[("movie.mkv", 900 * MB)]);
        let metadata = MetadataMatch {
            matched: true,
            canonical_title: Some("Spider-Man: Homecoming".into()),
            year: Some(2017),
            season_count: None,
        };
        let p = plan(MediaType::Movie, &c, Some(&metadata));
        assert_eq!(
            p.files[0].relative_destination,
            PathBuf::from("Movies/Spider-Man Homecoming (2017)/Spider-Man Homecoming (2017).mkv")
        );
    }

    #[test]
    fn test_music_and_audiobook_keep_file_names() {
        let c = candidate("Pink Floyd - The Wall", &[("CD1/01 - In the Flesh.flac", 30 * MB), ("cover.jpg", 100)]);
        let p = plan(MediaType::Music, &c, None);
        assert_eq!(
            p.files[0].relative_destination,
            PathBuf::from("Music/Pink Floyd/The Wall/01 - In the Flesh.flac")
        );
        assert_eq!(p.files[1].relative_destination, PathBuf::from("Music/Pink Floyd/The Wall/cover.jpg"));

        let c = candidate("Mystery Book", &[("Chapter 01.mp3", 20 * MB)]);
        let p = plan(MediaType::Audiobook, &c, None);
        assert_eq!(
            p.files[0].relative_destination,
            PathBuf::from("Audiobooks/Unknown Author/Mystery Book/Chapter 01.mp3")
        );
        assert!(p.fallback);
    }

    #[test]
    fn test_colliding_destinations_keep_original_name() {
        let c = candidate("Inception (2010)", &[("a.srt", 10), ("b.srt", 10), ("movie.mkv", 900 * MB)]);
        let p = plan(MediaType::Movie, &c, None);
        let dests: Vec<&Path> = p.files.iter().map(|f| f.relative_destination.as_path()).collect();
        assert!(dests.contains(&Path::new("Movies/Inception (2010)/Inception (2010).srt")));
        assert!(dests.contains(&Path::new("Movies/Inception (2010)/b.srt")));
    }

    #[test]
    fn test_multi_disc_album_moves_every_disc() {
        let c = candidate(
            "Pink Floyd - The Wall",
            &[
                ("CD1/01 - Track.flac", 30 * MB),
                ("CD1/02 - Track.flac", 30 * MB),
                ("CD2/01 - Track.flac", 30 * MB),
                ("CD2/02 - Track.flac", 30 * MB),
            ],
        );
        let p = plan(MediaType::Music, &c, None);
        assert!(p.left_behind.is_empty());
        let dests: Vec<&Path> = p.files.iter().map(|f| f.relative_destination.as_path()).collect();
        assert_eq!(
            dests,
            vec![
                Path::new("Music/Pink Floyd/The Wall/01 - Track.flac"),
                Path::new("Music/Pink Floyd/The Wall/02 - Track.flac"),
                Path::new("Music/Pink Floyd/The Wall/CD2 - 01 - Track.flac"),
                Path::new("Music/Pink Floyd/The Wall/CD2 - 02 - Track.flac"),
            ]
        );
        assert_eq!(p.files[2].source, PathBuf::from("/downloads/Pink Floyd - The Wall/CD2/01 - Track.flac"));
    }

    #[test]
    fn test_unknown_has_no_naming() {
        assert!(resolve_naming(MediaType::Unknown, "Random Documents", None).is_none());
    }

    #[test]
    fn test_lookup_query() {
        assert_eq!(
            lookup_query(MediaType::Movie, "Inception (2010)"),
            Some(("Inception".to_string(), Some(2010)))
        );
        assert_eq!(
            lookup_query(MediaType::Tv, "The Office Season 01"),
            Some(("The Office".to_string(), None))
        );
        assert_eq!(lookup_query(MediaType::Music, "A - B"), None);
    }
}
