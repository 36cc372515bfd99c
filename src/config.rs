//! Optional TOML configuration: extra category rules and exclude filters.
//!
//! Hidden files and subdirectories are always skipped by the scanner; the
//! rules here only narrow what remains.
//!
//! # Configuration File Format
//!
//! ```toml
//! [categories]
//! Ebooks = [".epub", ".mobi"]
//! Images = [".png", ".jpg", ".heic"]   # replaces the built-in list
//!
//! [filters.exclude]
//! filenames = ["desktop.ini"]
//! extensions = ["part", "crdownload"]
//! patterns = ["*.tmp"]
//! regex = ["^~\\$"]
//! ```

use crate::file_category::{CategoryTable, TableError};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".dlsortrc.toml";

/// Errors that can occur during configuration loading and compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("invalid configuration in {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },
    /// Invalid glob pattern provided.
    #[error("invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    /// The configured category rules do not form a valid table.
    #[error("invalid category rules: {0}")]
    InvalidRules(#[from] TableError),
    /// IO error while reading configuration.
    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Contents of a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Category overrides applied on top of the built-in table.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,

    /// File filtering rules.
    #[serde(default)]
    pub filters: FilterRules,
}

/// Root-level filter rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRules {
    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,
}

/// Rules for excluding files from organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g. "desktop.ini").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the file name (e.g. "*.tmp").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, with or without the dot (e.g. "part").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

impl Settings {
    /// Load configuration, falling back to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if provided
    /// 2. `.dlsortrc.toml` in the current directory
    /// 3. `dlsort/config.toml` under the user's config directory
    /// 4. Built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly provided file is missing, or if any
    /// file that is found cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.is_file() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("dlsort").join("config.toml");
            if user_config.is_file() {
                return Self::load_from_file(&user_config);
            }
        }

        debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = Self::parse(&content).map_err(|reason| ConfigError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(settings)
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Builds the category table: built-in rules plus configured overrides.
    pub fn category_table(&self) -> Result<CategoryTable, ConfigError> {
        Ok(CategoryTable::default().with_overrides(
            self.categories
                .iter()
                .map(|(name, extensions)| (name.clone(), extensions.iter())),
        )?)
    }

    /// Compile the exclude rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters.exclude)
    }
}

/// Pre-compiled exclude rules.
#[derive(Debug, Default)]
pub struct CompiledFilters {
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
}

impl CompiledFilters {
    fn new(rules: &ExcludeRules) -> Result<Self, ConfigError> {
        let exclude_patterns = rules
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = rules
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exclude_filenames: rules.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
        })
    }

    /// Returns true if no exclude rule matches the file name.
    ///
    /// Checked in order: exact name, extension, glob, regex.
    pub fn should_include(&self, file_name: &str) -> bool {
        if self.exclude_filenames.contains(file_name) {
            return false;
        }

        if let Some(ext) = Path::new(file_name).extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches(file_name))
        {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(file_name))
    }
}
