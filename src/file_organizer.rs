//! Moving scanned files into their category directories.
//!
//! Each file is handled independently: a failure is recorded and the batch
//! moves on. Nothing is rolled back, so an interrupted or partially failed
//! run leaves already-moved files where they landed.
use crate::interrupt::InterruptHandler;
use crate::scanner::{CategoryGrouping, FileRecord};
use filetime::FileTime;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while organizing a single file.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The category directory could not be created.
    #[error("could not create directory {}: {reason}", path.display())]
    DirectoryCreationFailed { path: PathBuf, reason: String },
    /// The file could not be moved to its destination.
    #[error("{source}")]
    FileMoveFailure {
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The source path has no final component.
    #[error("{} has no file name", .0.display())]
    MissingFileName(PathBuf),
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Outcome of organizing one file.
#[derive(Debug)]
pub enum MoveOutcome {
    /// The file now lives at `destination`.
    Moved {
        source: PathBuf,
        destination: PathBuf,
        category: String,
    },
    /// The file stayed where it was.
    Failed {
        source: PathBuf,
        category: String,
        error: OrganizeError,
    },
}

impl MoveOutcome {
    /// Name of the file this outcome is about.
    pub fn file_name(&self) -> String {
        let source = match self {
            Self::Moved { source, .. } | Self::Failed { source, .. } => source,
        };
        source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source.display().to_string())
    }

    pub fn category(&self) -> &str {
        match self {
            Self::Moved { category, .. } | Self::Failed { category, .. } => category,
        }
    }

    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Counts of a finished (or interrupted) move pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MoveTally {
    pub moved: usize,
    pub errors: usize,
    /// True if the pass stopped early because of an interrupt.
    pub interrupted: bool,
}

/// Moves files into category subdirectories of a base directory.
pub struct FileOrganizer<'a> {
    base_path: &'a Path,
}

impl<'a> FileOrganizer<'a> {
    pub fn new(base_path: &'a Path) -> Self {
        Self { base_path }
    }

    /// Moves every file in `grouping`, category by category in sorted order.
    ///
    /// `on_outcome` is called once per processed file, as soon as its move
    /// finishes. The interrupt flag is checked before each file.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dlsort::file_organizer::FileOrganizer;
    /// use dlsort::interrupt::InterruptHandler;
    /// use dlsort::scanner::CategoryGrouping;
    /// use std::path::Path;
    ///
    /// let grouping = CategoryGrouping::default();
    /// let tally = FileOrganizer::new(Path::new("/home/me/Downloads")).organize(
    ///     &grouping,
    ///     &InterruptHandler::new(),
    ///     |outcome| println!("{} -> {}", outcome.file_name(), outcome.category()),
    /// );
    /// println!("moved {}, failed {}", tally.moved, tally.errors);
    /// ```
    pub fn organize<F>(
        &self,
        grouping: &CategoryGrouping,
        interrupt: &InterruptHandler,
        mut on_outcome: F,
    ) -> MoveTally
    where
        F: FnMut(&MoveOutcome),
    {
        let mut tally = MoveTally::default();

        for (category, files) in grouping.iter() {
            if interrupt.is_triggered() {
                tally.interrupted = true;
                break;
            }

            let category_dir = match self.ensure_category_dir(category) {
                Ok(dir) => Ok(dir),
                Err(OrganizeError::DirectoryCreationFailed { reason, .. }) => {
                    warn!(category, error = %reason, "category directory unavailable");
                    Err(reason)
                }
                Err(e) => Err(e.to_string()),
            };

            for file in files {
                if interrupt.is_triggered() {
                    tally.interrupted = true;
                    break;
                }

                let outcome = match &category_dir {
                    Ok(dir) => Self::move_record(file, dir),
                    Err(reason) => MoveOutcome::Failed {
                        source: file.path.clone(),
                        category: file.category.clone(),
                        error: OrganizeError::DirectoryCreationFailed {
                            path: self.base_path.join(category),
                            reason: reason.clone(),
                        },
                    },
                };

                if outcome.is_moved() {
                    tally.moved += 1;
                } else {
                    tally.errors += 1;
                }
                on_outcome(&outcome);
            }

            if tally.interrupted {
                break;
            }
        }

        info!(
            moved = tally.moved,
            errors = tally.errors,
            interrupted = tally.interrupted,
            "move pass finished"
        );
        tally
    }

    /// Creates `<base>/<category>` if it is missing and returns its path.
    pub fn ensure_category_dir(&self, category: &str) -> OrganizeResult<PathBuf> {
        let category_path = self.base_path.join(category);
        match fs::create_dir(&category_path) {
            Ok(()) => {
                debug!(path = %category_path.display(), "created category directory");
                Ok(category_path)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && category_path.is_dir() => {
                Ok(category_path)
            }
            Err(e) => Err(OrganizeError::DirectoryCreationFailed {
                path: category_path,
                reason: e.to_string(),
            }),
        }
    }

    fn move_record(file: &FileRecord, category_dir: &Path) -> MoveOutcome {
        match move_into(&file.path, category_dir) {
            Ok(destination) => {
                debug!(
                    source = %file.path.display(),
                    destination = %destination.display(),
                    "moved file"
                );
                MoveOutcome::Moved {
                    source: file.path.clone(),
                    destination,
                    category: file.category.clone(),
                }
            }
            Err(error) => {
                warn!(source = %file.path.display(), error = %error, "move failed");
                MoveOutcome::Failed {
                    source: file.path.clone(),
                    category: file.category.clone(),
                    error,
                }
            }
        }
    }
}

/// Moves `file_path` into `category_dir`, renaming on collision.
///
/// Returns the path the file ended up at.
pub fn move_into(file_path: &Path, category_dir: &Path) -> OrganizeResult<PathBuf> {
    let file_name = file_path
        .file_name()
        .ok_or_else(|| OrganizeError::MissingFileName(file_path.to_path_buf()))?;

    let destination = resolve_destination(&category_dir.join(file_name));
    relocate(file_path, &destination).map_err(|source| OrganizeError::FileMoveFailure {
        destination: destination.clone(),
        source,
    })?;
    Ok(destination)
}

/// Returns `candidate` if it is free, otherwise the first free
/// `stem_N.ext` for N = 1, 2, ...
///
/// # Examples
///
/// ```no_run
/// use dlsort::file_organizer::resolve_destination;
/// use std::path::Path;
///
/// // With Documents/report.pdf already present:
/// let dest = resolve_destination(Path::new("Documents/report.pdf"));
/// assert_eq!(dest, Path::new("Documents/report_1.pdf"));
/// ```
pub fn resolve_destination(candidate: &Path) -> PathBuf {
    if candidate.symlink_metadata().is_err() {
        return candidate.to_path_buf();
    }

    let stem = candidate.file_stem().unwrap_or_default();
    let extension = candidate.extension();

    let mut counter: u64 = 1;
    loop {
        let mut name = stem.to_os_string();
        name.push(format!("_{}", counter));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }
        let next = candidate.with_file_name(name);
        if next.symlink_metadata().is_err() {
            return next;
        }
        counter += 1;
    }
}

/// Renames `source` to `destination`, copying across filesystems if needed.
fn relocate(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(source = %source.display(), "cross-device move, copying");
            copy_then_remove(source, destination)
        }
        Err(e) => Err(e),
    }
}

/// Recreates `source` at `destination`, then removes `source`.
///
/// Symlinks are recreated as links. Regular files keep their access and
/// modification times. If the source cannot be removed afterwards, the copy
/// is deleted again so the file exists in exactly one place.
fn copy_then_remove(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(source)?;

    let copied = if metadata.file_type().is_symlink() {
        copy_symlink(source, destination)
    } else {
        fs::copy(source, destination).and_then(|_| {
            filetime::set_file_times(
                destination,
                FileTime::from_last_access_time(&metadata),
                FileTime::from_last_modification_time(&metadata),
            )
        })
    };
    if let Err(copy_err) = copied {
        let _ = fs::remove_file(destination);
        return Err(copy_err);
    }

    if let Err(remove_err) = fs::remove_file(source) {
        let _ = fs::remove_file(destination);
        return Err(remove_err);
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> io::Result<()> {
    let target = fs::read_link(source)?;
    std::os::unix::fs::symlink(target, destination)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, destination: &Path) -> io::Result<()> {
    fs::copy(source, destination).map(|_| ())
}
