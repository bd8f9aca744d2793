//! Safe file moves.
//!
//! A [`MovePlan`] is built by inspecting the filesystem and is never changed
//! afterwards. [`execute`] never overwrites a differing destination unless
//! the plan says so, and never mutates anything in dry-run mode.

use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveAction {
    Move,
    SkipExists,
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovePlan {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    /// Destination exists with different content.
    pub conflict: bool,
    pub action: MoveAction,
}

impl MovePlan {
    pub fn build(source: &Path, destination: &Path, force: bool) -> io::Result<Self> {
        let (conflict, action) = if same_path(source, destination) {
            (false, MoveAction::SkipExists)
        } else if destination.exists() {
            if files_identical(source, destination)? {
                (false, MoveAction::SkipExists)
            } else if force {
                (true, MoveAction::Overwrite)
            } else {
                (true, MoveAction::SkipExists)
            }
        } else {
            (false, MoveAction::Move)
        };

        Ok(Self {
            source_path: source.to_path_buf(),
            destination_path: destination.to_path_buf(),
            conflict,
            action,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved,
    WouldMove,
    SkippedExists,
    Overwritten,
    Failed(String),
}

impl fmt::Display for MoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveOutcome::Moved => f.write_str("moved"),
            MoveOutcome::WouldMove => f.write_str("would move"),
            MoveOutcome::SkippedExists => f.write_str("skipped (exists)"),
            MoveOutcome::Overwritten => f.write_str("overwritten"),
            MoveOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn digest(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize())
}

/// Byte-identical check: sizes first, then content digests.
pub fn files_identical(a: &Path, b: &Path) -> io::Result<bool> {
    let (meta_a, meta_b) = (fs::metadata(a)?, fs::metadata(b)?);
    if !meta_a.is_file() || !meta_b.is_file() || meta_a.len() != meta_b.len() {
        return Ok(false);
    }
    Ok(digest(a)? == digest(b)?)
}

fn is_cross_device(err: &io::Error) -> bool {
    #[cfg(unix)]
    const CROSS_DEVICE: i32 = 18; // EXDEV
    #[cfg(windows)]
    const CROSS_DEVICE: i32 = 17; // ERROR_NOT_SAME_DEVICE
    #[cfg(not(any(unix, windows)))]
    const CROSS_DEVICE: i32 = -1;

    err.raw_os_error() == Some(CROSS_DEVICE)
}

fn partial_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}{}", name, PARTIAL_SUFFIX))
}

/// Copy to a hidden sibling, verify it, move it into place, then delete the
/// source. The source is only removed after the copy is verified.
pub(crate) fn copy_then_remove(source: &Path, destination: &Path) -> io::Result<()> {
    let partial = partial_path(destination);

    let result = (|| {
        fs::copy(source, &partial)?;
        if !files_identical(source, &partial)? {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("copy of {} did not verify", source.display()),
            ));
        }
        fs::rename(&partial, destination)
    })();

    if let Err(e) = result {
        if partial.exists() {
            if let Err(cleanup) = fs::remove_file(&partial) {
                warn!("Could not remove partial copy {}: {}", partial.display(), cleanup);
            }
        }
        return Err(e);
    }

    fs::remove_file(source)
}

fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!(
                "Rename across devices, copying {} -> {}",
                source.display(),
                destination.display()
            );
            copy_then_remove(source, destination)
        }
        Err(e) => Err(e),
    }
}

pub fn execute(plan: &MovePlan, dry_run: bool) -> MoveOutcome {
    match plan.action {
        MoveAction::SkipExists => {
            debug!(
                "Skipping {} (destination exists{})",
                plan.source_path.display(),
                if plan.conflict { ", differs" } else { "" }
            );
            MoveOutcome::SkippedExists
        }
        _ if dry_run => {
            info!(
                "[dry-run] {} -> {}",
                plan.source_path.display(),
                plan.destination_path.display()
            );
            MoveOutcome::WouldMove
        }
        MoveAction::Move if plan.destination_path.exists() => {
            // Appeared after planning; never overwrite implicitly.
            warn!(
                "Destination {} appeared after planning, skipping",
                plan.destination_path.display()
            );
            MoveOutcome::SkippedExists
        }
        action => match move_file(&plan.source_path, &plan.destination_path) {
            Ok(()) => {
                info!(
                    "{} -> {}",
                    plan.source_path.display(),
                    plan.destination_path.display()
                );
                if action == MoveAction::Overwrite {
                    MoveOutcome::Overwritten
                } else {
                    MoveOutcome::Moved
                }
            }
            Err(e) => {
                warn!("Failed to move {}: {}", plan.source_path.display(), e);
                MoveOutcome::Failed(e.to_string())
            }
        },
    }
}

/// Remove empty directories below (and including) `root`, deepest first.
/// Non-empty directories are left alone.
pub fn prune_empty_dirs(root: &Path) -> io::Result<usize> {
    let mut dirs: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));

    let mut removed = 0;
    for dir in dirs {
        if fs::read_dir(&dir)?.next().is_none() {
            fs::remove_dir(&dir)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_plan_move_when_destination_missing() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("a.mkv");
        fs::write(&src, "video").unwrap();
        let plan = MovePlan::build(&src, &tmp.path().join("out/a.mkv"), false).unwrap();
        assert_eq!(plan.action, MoveAction::Move);
        assert!(!plan.conflict);
    }

    #[test]
    fn test_same_path_is_noop() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("a.mkv");
        fs::write(&src, "video").unwrap();
        let plan = MovePlan::build(&src, &src, true).unwrap();
        assert_eq!(plan.action, MoveAction::SkipExists);
        assert!(!plan.conflict);
        assert_eq!(execute(&plan, false), MoveOutcome::SkippedExists);
        assert!(src.exists());
    }

    #[test]
    fn test_identical_destination_is_not_conflict() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("a.mkv");
        let dst = tmp.path().join("b.mkv");
        fs::write(&src, "same").unwrap();
        fs::write(&dst, "same").unwrap();
        let plan = MovePlan::build(&src, &dst, false).unwrap();
        assert_eq!(plan.action, MoveAction::SkipExists);
        assert!(!plan.conflict);
    }

    #[test]
    fn test_conflict_needs_force() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("a.mkv");
        let dst = tmp.path().join("b.mkv");
        fs::write(&src, "new").unwrap();
        fs::write(&dst, "old!").unwrap();

        let plan = MovePlan::build(&src, &dst, false).unwrap();
        assert!(plan.conflict);
        assert_eq!(plan.action, MoveAction::SkipExists);
        assert_eq!(execute(&plan, false), MoveOutcome::SkippedExists);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old!");

        let forced = MovePlan::build(&src, &dst, true).unwrap();
        assert_eq!(forced.action, MoveAction::Overwrite);
        assert_eq!(execute(&forced, true), MoveOutcome::WouldMove);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old!");
        assert_eq!(execute(&forced, false), MoveOutcome::Overwritten);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "new");
        assert!(!src.exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("a.mkv");
        fs::write(&src, "video").unwrap();
        let dst = tmp.path().join("lib/Movies/A/a.mkv");
        let plan = MovePlan::build(&src, &dst, false).unwrap();
        assert_eq!(execute(&plan, true), MoveOutcome::WouldMove);
        assert!(src.exists());
        assert!(!tmp.path().join("lib").exists());
    }

    #[test]
    fn test_live_move_creates_parents() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("a.mkv");
        fs::write(&src, "video").unwrap();
        let dst = tmp.path().join("lib/Movies/A/a.mkv");
        let plan = MovePlan::build(&src, &dst, false).unwrap();
        assert_eq!(execute(&plan, false), MoveOutcome::Moved);
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "video");
    }

    #[test]
    fn test_destination_appearing_after_plan_is_skipped() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("a.mkv");
        let dst = tmp.path().join("b.mkv");
        fs::write(&src, "video").unwrap();
        let plan = MovePlan::build(&src, &dst, false).unwrap();
        fs::write(&dst, "other").unwrap();
        assert_eq!(execute(&plan, false), MoveOutcome::SkippedExists);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "other");
        assert!(src.exists());
    }

    #[test]
    fn test_missing_source_fails() {
        let tmp = tempdir().unwrap();
        let plan = MovePlan {
            source_path: tmp.path().join("gone.mkv"),
            destination_path: tmp.path().join("out/gone.mkv"),
            conflict: false,
            action: MoveAction::Move,
        };
        assert!(matches!(execute(&plan, false), MoveOutcome::Failed(_)));
    }

    #[test]
    fn test_copy_then_remove_verifies_and_cleans_up() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("a.bin");
        fs::write(&src, vec![7u8; 200_000]).unwrap();
        let dst = tmp.path().join("b.bin");
        copy_then_remove(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap().len(), 200_000);
        assert!(!partial_path(&dst).exists());
    }

    #[test]
    fn test_copy_failure_keeps_source() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("a.bin");
        fs::write(&src, "data").unwrap();
        let dst = tmp.path().join("missing-dir/b.bin");
        assert!(copy_then_remove(&src, &dst).is_err());
        assert!(src.exists());
    }

    #[test]
    fn test_prune_empty_dirs() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("cand");
        fs::create_dir_all(root.join("Season 01/empty")).unwrap();
        fs::create_dir_all(root.join("keep")).unwrap();
        fs::write(root.join("keep/readme.txt"), "x").unwrap();
        let removed = prune_empty_dirs(&root).unwrap();
        assert_eq!(removed, 2);
        assert!(root.join("keep/readme.txt").exists());
        assert!(!root.join("Season 01").exists());
    }
}
