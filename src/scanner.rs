//! Directory scanning: collect the files eligible for organization.
//!
//! Only the immediate children of the target directory are considered.
//! Subdirectories and hidden entries are always skipped; age, category and
//! configured exclude rules narrow the result further.

use crate::config::CompiledFilters;
use crate::file_category::CategoryTable;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that stop a scan before it produces anything.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Directory {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("Error reading directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file selected for organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Full path to the file.
    #[serde(serialize_with = "crate::report::serialize_path_lossy")]
    pub path: PathBuf,
    /// The file's name within the target directory.
    pub name: String,
    /// Lower-case extension with a leading dot, empty if there is none.
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    /// Whole days since last modification.
    pub age_days: u64,
    /// Category the file was classified into.
    pub category: String,
}

/// Files grouped by category, iterated in lexicographic category order.
///
/// Within a category, files keep the order the directory listing produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryGrouping {
    groups: BTreeMap<String, Vec<FileRecord>>,
}

impl CategoryGrouping {
    /// Appends a record to its category's list.
    pub fn push(&mut self, record: FileRecord) {
        self.groups
            .entry(record.category.clone())
            .or_default()
            .push(record);
    }

    /// Iterates `(category, files)` pairs in sorted category order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FileRecord])> {
        self.groups
            .iter()
            .map(|(name, files)| (name.as_str(), files.as_slice()))
    }

    /// Files of one category, if any were selected.
    pub fn get(&self, category: &str) -> Option<&[FileRecord]> {
        self.groups.get(category).map(Vec::as_slice)
    }

    /// Category names present, sorted.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Total number of files across all categories.
    pub fn file_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Result of a successful scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub grouping: CategoryGrouping,
    /// Sum of the sizes of every selected file.
    pub total_bytes: u64,
}

/// Which files a scan should keep.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Minimum age in days; 0 disables the age filter.
    pub min_age_days: u64,
    /// If set, only files classified into one of these categories are kept.
    pub allowed_categories: Option<BTreeSet<String>>,
}

/// Scans a directory using a category table and exclude filters.
pub struct Scanner<'a> {
    table: &'a CategoryTable,
    filters: &'a CompiledFilters,
}

impl<'a> Scanner<'a> {
    pub fn new(table: &'a CategoryTable, filters: &'a CompiledFilters) -> Self {
        Self { table, filters }
    }

    /// Scans `directory` relative to the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the directory is missing, is not a directory,
    /// or cannot be listed.
    pub fn scan(&self, directory: &Path, options: &ScanOptions) -> Result<ScanReport, ScanError> {
        self.scan_at(directory, options, Utc::now())
    }

    /// Scans `directory`, computing file ages relative to `now`.
    pub fn scan_at(
        &self,
        directory: &Path,
        options: &ScanOptions,
        now: DateTime<Utc>,
    ) -> Result<ScanReport, ScanError> {
        if !directory.exists() {
            return Err(ScanError::NotFound(directory.to_path_buf()));
        }
        if !directory.is_dir() {
            return Err(ScanError::NotADirectory(directory.to_path_buf()));
        }

        let entries = fs::read_dir(directory).map_err(|source| ScanError::ReadDir {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut report = ScanReport::default();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                debug!(file = %name, "skipping hidden entry");
                continue;
            }

            let path = entry.path();
            // Follows symlinks, so a link to a directory counts as a directory.
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping entry without readable metadata");
                    continue;
                }
            };
            if metadata.is_dir() {
                continue;
            }

            let age_days = match metadata.modified() {
                Ok(modified) => age_in_days(modified.into(), now),
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping entry without modification time");
                    continue;
                }
            };
            if options.min_age_days > 0 && age_days < options.min_age_days {
                debug!(file = %name, age_days, "younger than age threshold");
                continue;
            }

            let category = self.table.classify(&name);
            if let Some(allowed) = &options.allowed_categories
                && !allowed.contains(category)
            {
                debug!(file = %name, category, "category not selected");
                continue;
            }

            if !self.filters.should_include(&name) {
                debug!(file = %name, "excluded by configuration");
                continue;
            }

            let extension = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
                .unwrap_or_default();

            report.total_bytes += metadata.len();
            report.grouping.push(FileRecord {
                category: category.to_string(),
                path,
                name,
                extension,
                size: metadata.len(),
                age_days,
            });
        }

        debug!(
            files = report.grouping.file_count(),
            bytes = report.total_bytes,
            "scan complete"
        );
        Ok(report)
    }
}

/// Whole days between `modified` and `now`; modification times in the future
/// count as zero days.
pub fn age_in_days(modified: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - modified).num_days()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use filetime::FileTime;
    use tempfile::TempDir;

    fn touch_aged(dir: &Path, name: &str, content: &[u8], age: Duration, now: DateTime<Utc>) {
        let path = dir.join(name);
        fs::write(&path, content).expect("Failed to write test file");
        let mtime = now - age;
        filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime.timestamp(), 0))
            .expect("Failed to set mtime");
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    fn scan(dir: &Path, options: &ScanOptions) -> ScanReport {
        let table = CategoryTable::default();
        let filters = CompiledFilters::default();
        Scanner::new(&table, &filters)
            .scan_at(dir, options, fixed_now())
            .expect("scan should succeed")
    }

    #[test]
    fn test_age_in_days_truncates() {
        let now = fixed_now();
        assert_eq!(age_in_days(now, now), 0);
        assert_eq!(age_in_days(now - Duration::hours(47), now), 1);
        assert_eq!(age_in_days(now - Duration::hours(48), now), 2);
        assert_eq!(age_in_days(now + Duration::hours(30), now), 0);
    }

    #[test]
    fn test_skips_hidden_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let now = fixed_now();
        touch_aged(temp_dir.path(), "photo.png", b"png", Duration::days(1), now);
        touch_aged(temp_dir.path(), ".hidden.png", b"x", Duration::days(1), now);
        fs::create_dir(temp_dir.path().join("Images")).unwrap();
        fs::create_dir(temp_dir.path().join("folder.zip")).unwrap();

        let report = scan(temp_dir.path(), &ScanOptions::default());

        assert_eq!(report.grouping.file_count(), 1);
        let images = report.grouping.get("Images").unwrap();
        assert_eq!(images[0].name, "photo.png");
        assert!(report.grouping.get("Archives").is_none());
    }

    #[test]
    fn test_age_threshold_boundary() {
        let temp_dir = TempDir::new().unwrap();
        let now = fixed_now();
        let hour = Duration::hours(1);
        touch_aged(temp_dir.path(), "exact.pdf", b"a", Duration::days(5) + hour, now);
        touch_aged(temp_dir.path(), "young.pdf", b"b", Duration::days(4) + hour, now);
        touch_aged(temp_dir.path(), "old.pdf", b"c", Duration::days(30), now);

        let report = scan(
            temp_dir.path(),
            &ScanOptions {
                min_age_days: 5,
                ..Default::default()
            },
        );

        let mut names: Vec<_> = report
            .grouping
            .get("Documents")
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        names.sort();
        assert_eq!(names, vec!["exact.pdf", "old.pdf"]);
    }

    #[test]
    fn test_zero_age_threshold_keeps_fresh_files() {
        let temp_dir = TempDir::new().unwrap();
        touch_aged(
            temp_dir.path(),
            "fresh.txt",
            b"now",
            Duration::zero(),
            fixed_now(),
        );

        let report = scan(temp_dir.path(), &ScanOptions::default());
        assert_eq!(report.grouping.file_count(), 1);
        assert_eq!(report.grouping.get("Documents").unwrap()[0].age_days, 0);
    }

    #[test]
    fn test_age_and_hidden_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let now = fixed_now();
        touch_aged(temp_dir.path(), "a.png", b"a", Duration::days(2), now);
        touch_aged(temp_dir.path(), "b.stl", b"solid", Duration::days(10), now);
        touch_aged(temp_dir.path(), ".hidden", b"h", Duration::days(40), now);
        fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let report = scan(
            temp_dir.path(),
            &ScanOptions {
                min_age_days: 5,
                ..Default::default()
            },
        );

        let categories: Vec<_> = report.grouping.categories().collect();
        assert_eq!(categories, vec!["3D_Models"]);
        let models = report.grouping.get("3D_Models").unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "b.stl");
        assert_eq!(models[0].extension, ".stl");
        assert_eq!(models[0].age_days, 10);
        assert_eq!(report.total_bytes, 5);
    }

    #[test]
    fn test_allow_list_is_respected() {
        let temp_dir = TempDir::new().unwrap();
        let now = fixed_now();
        for name in ["a.png", "b.pdf", "c.zip", "d.unknown", "e"] {
            touch_aged(temp_dir.path(), name, b"data", Duration::days(1), now);
        }
        let allowed: BTreeSet<String> = ["Images", "Other"].iter().map(|s| s.to_string()).collect();

        let report = scan(
            temp_dir.path(),
            &ScanOptions {
                min_age_days: 0,
                allowed_categories: Some(allowed.clone()),
            },
        );

        assert!(report.grouping.categories().all(|c| allowed.contains(c)));
        assert_eq!(report.grouping.get("Images").map(|f| f.len()), Some(1));
        assert_eq!(report.grouping.get("Other").map(|f| f.len()), Some(2));
        assert_eq!(report.total_bytes, 12);
    }

    #[test]
    fn test_configured_excludes_apply() {
        let temp_dir = TempDir::new().unwrap();
        let now = fixed_now();
        touch_aged(temp_dir.path(), "movie.mp4", b"v", Duration::days(1), now);
        touch_aged(temp_dir.path(), "movie.mp4.part", b"p", Duration::days(1), now);

        let settings: crate::config::Settings =
            toml::from_str("[filters.exclude]\nextensions = [\"part\"]\n").unwrap();
        let filters = settings.compile_filters().unwrap();
        let table = CategoryTable::default();
        let report = Scanner::new(&table, &filters)
            .scan_at(temp_dir.path(), &ScanOptions::default(), now)
            .unwrap();

        assert_eq!(report.grouping.file_count(), 1);
        assert!(report.grouping.get("Videos").is_some());
    }

    #[test]
    fn test_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        let table = CategoryTable::default();
        let filters = CompiledFilters::default();

        let result = Scanner::new(&table, &filters).scan(&missing, &ScanOptions::default());
        assert!(matches!(result, Err(ScanError::NotFound(_))));
    }

    #[test]
    fn test_path_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        let table = CategoryTable::default();
        let filters = CompiledFilters::default();

        let result = Scanner::new(&table, &filters).scan(&file, &ScanOptions::default());
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(
            temp_dir.path().join("gone.pdf"),
            temp_dir.path().join("link.pdf"),
        )
        .unwrap();

        let report = scan(temp_dir.path(), &ScanOptions::default());
        assert!(report.grouping.is_empty());
    }
}
