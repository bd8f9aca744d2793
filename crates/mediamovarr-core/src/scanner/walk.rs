use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::model::{FileEntry, FolderCandidate};

fn compile_patterns(ignore_globs: &[String]) -> Vec<Pattern> {
    ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

fn is_ignored(path: &Path, patterns: &[Pattern]) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy());
    patterns.iter().any(|pattern| {
        pattern.matches_path(path) || name.as_deref().map_or(false, |n| pattern.matches(n))
    })
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn is_excluded(path: &Path, excluded: &[PathBuf]) -> bool {
    let path = absolute(path);
    excluded.iter().any(|e| path.starts_with(e))
}

fn permission_denied(err: &walkdir::Error) -> bool {
    err.io_error()
        .map_or(false, |e| e.kind() == io::ErrorKind::PermissionDenied)
}

/// Every immediate sub-directory of each root becomes one candidate.
/// Loose files directly under a root are not candidates. Nothing at or
/// below an `exclude` path (the library) is ever a candidate or part of one.
pub fn discover(
    roots: &[String],
    ignore_globs: &[String],
    max_depth: usize,
    exclude: &[PathBuf],
) -> io::Result<Vec<FolderCandidate>> {
    let patterns = compile_patterns(ignore_globs);
    let excluded: Vec<PathBuf> = exclude
        .iter()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| absolute(p))
        .collect();
    let mut candidates = Vec::new();

    for root in roots {
        let root = Path::new(root);
        if is_excluded(root, &excluded) {
            info!("Skipping source {}, it lies inside the library", root.display());
            continue;
        }
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                error!("Access denied reading directory {}: {}", root.display(), err);
                continue;
            }
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading directory {}: {}", root.display(), err),
                ));
            }
        };

        let mut dirs: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            if !file_type.is_dir() || is_ignored(&path, &patterns) {
                continue;
            }
            if is_excluded(&path, &excluded) {
                debug!("Skipping library folder {}", path.display());
                continue;
            }
            dirs.push(path);
        }
        dirs.sort();

        for dir in dirs {
            candidates.push(collect_candidate(&dir, &patterns, max_depth, &excluded)?);
        }
    }

    debug!("Discovered {} candidate folders", candidates.len());
    Ok(candidates)
}

fn collect_candidate(
    dir: &Path,
    patterns: &[Pattern],
    max_depth: usize,
    excluded: &[PathBuf],
) -> io::Result<FolderCandidate> {
    let mut files = Vec::new();

    // Excluded trees nested inside this folder, relative to it.
    let base = absolute(dir);
    let nested: Vec<PathBuf> = excluded
        .iter()
        .filter_map(|e| e.strip_prefix(&base).ok().map(Path::to_path_buf))
        .collect();
    let inside_excluded = |path: &Path| {
        path.strip_prefix(dir)
            .map_or(false, |r| nested.iter().any(|n| r.starts_with(n)))
    };

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth.max(1))
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored(e.path(), patterns) && !inside_excluded(e.path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if permission_denied(&err) => {
                error!("Access denied below {}: {}", dir.display(), err);
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let size = entry.metadata().map_err(io::Error::from)?.len();
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| entry.path().to_path_buf());
        files.push(FileEntry::new(relative, size));
    }

    Ok(FolderCandidate::new(dir, files))
}

impl FolderCandidate {
    /// Build a single candidate from one folder, without ignore patterns.
    pub fn from_path(path: impl AsRef<Path>, max_depth: usize) -> io::Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", path.display()),
            ));
        }
        collect_candidate(path, &[], max_depth, &[])
    }
}
