//! File categorization by extension.
//!
//! This module maps file extensions to named categories (e.g. "Images",
//! "Archives"). The rules live in a [`CategoryTable`] value that is built once
//! at startup and handed to whoever needs to classify files.
//!
//! # Examples
//!
//! ```
//! use dlsort::file_category::{CategoryTable, FALLBACK_CATEGORY};
//!
//! let table = CategoryTable::default();
//! assert_eq!(table.classify("holiday.PNG"), "Images");
//! assert_eq!(table.classify("bracket.stl"), "3D_Models");
//! assert_eq!(table.classify("notes"), FALLBACK_CATEGORY);
//! ```
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Category assigned when no rule matches a file's extension.
pub const FALLBACK_CATEGORY: &str = "Other";

/// Built-in category rules, in the order they are listed to the user.
const BUILTIN_RULES: &[(&str, &[&str])] = &[
    ("3D_Models", &[".stl", ".obj", ".3mf", ".amf", ".gcode"]),
    (
        "Images",
        &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp", ".ico"],
    ),
    (
        "Documents",
        &[".pdf", ".doc", ".docx", ".txt", ".odt", ".rtf", ".md"],
    ),
    ("Spreadsheets", &[".xls", ".xlsx", ".csv", ".ods"]),
    (
        "Archives",
        &[".zip", ".tar", ".gz", ".bz2", ".7z", ".rar", ".xz"],
    ),
    (
        "Videos",
        &[".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm"],
    ),
    ("Audio", &[".mp3", ".wav", ".flac", ".aac", ".ogg", ".m4a"]),
    (
        "Code",
        &[
            ".py", ".js", ".html", ".css", ".java", ".cpp", ".c", ".sh", ".json", ".xml",
        ],
    ),
    (
        "Installers",
        &[".exe", ".dmg", ".deb", ".rpm", ".appimage", ".msi"],
    ),
];

/// Errors raised while building a [`CategoryTable`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Two categories claim the same extension.
    #[error("extension '{extension}' is claimed by both '{first}' and '{second}'")]
    DuplicateExtension {
        extension: String,
        first: String,
        second: String,
    },
    /// The fallback name cannot carry rules of its own.
    #[error("'{0}' is reserved for unmatched files and cannot have extension rules")]
    ReservedName(String),
    /// Category names must be non-empty.
    #[error("category names must not be empty")]
    EmptyName,
    /// An extension entry was empty or just a dot.
    #[error("category '{0}' lists an empty extension")]
    EmptyExtension(String),
}

/// A single category and the extensions that select it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    /// Directory name the category's files are moved into.
    pub name: String,
    /// Lower-case extensions with a leading dot, in declaration order.
    pub extensions: Vec<String>,
}

/// Immutable extension → category rules.
///
/// Every extension belongs to at most one category; this is checked when the
/// table is built, so lookups never depend on rule order.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    rules: Vec<CategoryRule>,
    extension_map: HashMap<String, usize>,
}

impl CategoryTable {
    /// Builds a table from `(category, extensions)` pairs.
    ///
    /// Extensions are normalized to lower case with a leading dot, so `"PNG"`,
    /// `".png"` and `".Png"` all mean the same thing.
    ///
    /// # Errors
    ///
    /// Returns a [`TableError`] if a name is empty or reserved, or if an
    /// extension is claimed by more than one category.
    pub fn from_rules<I, N, E, S>(rules: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (N, E)>,
        N: Into<String>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self {
            rules: Vec::new(),
            extension_map: HashMap::new(),
        };
        for (name, extensions) in rules {
            table.set_rule(name.into(), extensions)?;
        }
        Ok(table)
    }

    /// Returns a copy of this table with `overrides` applied.
    ///
    /// An override naming an existing category replaces that category's
    /// extension list; a new name is appended as a new category. Extensions
    /// released by a replaced category may be claimed by any other override.
    pub fn with_overrides<I, N, E, S>(&self, overrides: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (N, E)>,
        N: Into<String>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let overrides: Vec<(String, E)> = overrides
            .into_iter()
            .map(|(name, extensions)| {
                let name: String = name.into();
                (name.trim().to_string(), extensions)
            })
            .collect();

        // Release every overridden category's extensions up front so the
        // overrides may trade extensions among themselves in any order.
        let mut table = self.clone();
        for (name, _) in &overrides {
            if let Some(index) = table.rules.iter().position(|rule| &rule.name == name) {
                table.extension_map.retain(|_, owner| *owner != index);
                table.rules[index].extensions.clear();
            }
        }

        for (name, extensions) in overrides {
            table.set_rule(name, extensions)?;
        }
        Ok(table)
    }

    fn set_rule<E, S>(&mut self, name: String, extensions: E) -> Result<(), TableError>
    where
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(TableError::EmptyName);
        }
        if name == FALLBACK_CATEGORY {
            return Err(TableError::ReservedName(name));
        }

        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = normalize_extension(ext.as_ref())
                .ok_or_else(|| TableError::EmptyExtension(name.clone()))?;
            if !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }

        let index = match self.rules.iter().position(|rule| rule.name == name) {
            Some(index) => {
                self.extension_map.retain(|_, owner| *owner != index);
                index
            }
            None => {
                self.rules.push(CategoryRule {
                    name: name.clone(),
                    extensions: Vec::new(),
                });
                self.rules.len() - 1
            }
        };

        for ext in &normalized {
            if let Some(&owner) = self.extension_map.get(ext)
                && owner != index
            {
                return Err(TableError::DuplicateExtension {
                    extension: ext.clone(),
                    first: self.rules[owner].name.clone(),
                    second: name,
                });
            }
            self.extension_map.insert(ext.clone(), index);
        }
        self.rules[index].extensions = normalized;
        Ok(())
    }

    /// Maps an extension (with or without the leading dot) to its category.
    ///
    /// # Examples
    ///
    /// ```
    /// use dlsort::file_category::CategoryTable;
    ///
    /// let table = CategoryTable::default();
    /// assert_eq!(table.extension_to_category("pdf"), Some("Documents"));
    /// assert_eq!(table.extension_to_category(".MP3"), Some("Audio"));
    /// assert_eq!(table.extension_to_category("xyz"), None);
    /// ```
    pub fn extension_to_category(&self, ext: &str) -> Option<&str> {
        let ext = normalize_extension(ext)?;
        self.extension_map
            .get(&ext)
            .map(|&index| self.rules[index].name.as_str())
    }

    /// Classifies a file name, falling back to [`FALLBACK_CATEGORY`].
    pub fn classify(&self, file_name: &str) -> &str {
        self.classify_path(Path::new(file_name))
    }

    /// Classifies the final component of `path` by its extension.
    pub fn classify_path(&self, path: &Path) -> &str {
        path.extension()
            .and_then(|ext| self.extension_to_category(&ext.to_string_lossy()))
            .unwrap_or(FALLBACK_CATEGORY)
    }

    /// Returns true if `name` is a category with rules in this table.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.name == name)
    }

    /// Returns true if `name` may be used to select files: any table category
    /// or the fallback category.
    pub fn is_selectable(&self, name: &str) -> bool {
        name == FALLBACK_CATEGORY || self.contains(name)
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Rules sorted by category name, for display.
    pub fn sorted_rules(&self) -> Vec<&CategoryRule> {
        let mut rules: Vec<_> = self.rules.iter().collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }
}

impl Default for CategoryTable {
    /// The built-in downloads table.
    fn default() -> Self {
        let mut table = Self {
            rules: Vec::with_capacity(BUILTIN_RULES.len()),
            extension_map: HashMap::new(),
        };
        for (name, extensions) in BUILTIN_RULES {
            let index = table.rules.len();
            table.rules.push(CategoryRule {
                name: (*name).to_string(),
                extensions: extensions.iter().map(|e| (*e).to_string()).collect(),
            });
            for ext in *extensions {
                table.extension_map.insert((*ext).to_string(), index);
            }
        }
        table
    }
}

/// Lower-cases an extension and gives it a leading dot.
///
/// Returns `None` for an empty extension.
fn normalize_extension(ext: &str) -> Option<String> {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!(".{}", trimmed.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_extension_classifies_to_its_category() {
        let table = CategoryTable::default();
        for (category, extensions) in BUILTIN_RULES {
            for ext in *extensions {
                let file_name = format!("file{}", ext);
                assert_eq!(table.classify(&file_name), *category, "{}", file_name);
            }
        }
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let table = CategoryTable::default();
        assert_eq!(table.classify("PHOTO.JPG"), "Images");
        assert_eq!(table.classify("Report.Pdf"), "Documents");
        assert_eq!(table.classify("setup.AppImage"), "Installers");
    }

    #[test]
    fn test_classify_unknown_and_missing_extensions() {
        let table = CategoryTable::default();
        assert_eq!(table.classify("data.xyz"), FALLBACK_CATEGORY);
        assert_eq!(table.classify("README"), FALLBACK_CATEGORY);
        assert_eq!(table.classify("trailing."), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_classify_uses_last_extension() {
        let table = CategoryTable::default();
        assert_eq!(table.classify("backup.tar.gz"), "Archives");
        assert_eq!(table.classify("model.v2.stl"), "3D_Models");
    }

    #[test]
    fn test_builtin_table_has_no_duplicates() {
        let rebuilt = CategoryTable::from_rules(
            BUILTIN_RULES
                .iter()
                .map(|(name, exts)| (*name, exts.iter().copied())),
        );
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_from_rules_normalizes_extensions() {
        let table = CategoryTable::from_rules([("Ebooks", vec!["EPUB", ".Mobi", "epub"])])
            .expect("valid table");
        assert_eq!(table.rules()[0].extensions, vec![".epub", ".mobi"]);
        assert_eq!(table.classify("book.epub"), "Ebooks");
        assert_eq!(table.classify("book.MOBI"), "Ebooks");
    }

    #[test]
    fn test_from_rules_rejects_duplicate_extension() {
        let result = CategoryTable::from_rules([
            ("Images", vec![".png"]),
            ("Screenshots", vec![".PNG"]),
        ]);
        assert_eq!(
            result.unwrap_err(),
            TableError::DuplicateExtension {
                extension: ".png".to_string(),
                first: "Images".to_string(),
                second: "Screenshots".to_string(),
            }
        );
    }

    #[test]
    fn test_from_rules_rejects_reserved_and_empty_names() {
        assert_eq!(
            CategoryTable::from_rules([("Other", vec![".x"])]).unwrap_err(),
            TableError::ReservedName("Other".to_string())
        );
        assert_eq!(
            CategoryTable::from_rules([("  ", vec![".x"])]).unwrap_err(),
            TableError::EmptyName
        );
        assert_eq!(
            CategoryTable::from_rules([("Misc", vec!["."])]).unwrap_err(),
            TableError::EmptyExtension("Misc".to_string())
        );
    }

    #[test]
    fn test_override_replaces_existing_category() {
        let table = CategoryTable::default()
            .with_overrides([("Images", vec![".png", ".heic"])])
            .expect("valid override");

        assert_eq!(table.classify("a.heic"), "Images");
        assert_eq!(table.classify("a.jpg"), FALLBACK_CATEGORY);
        assert_eq!(table.rules().len(), BUILTIN_RULES.len());
    }

    #[test]
    fn test_override_can_reassign_extension_it_released() {
        let table = CategoryTable::default()
            .with_overrides([
                ("Notes", vec![".md"]),
                ("Documents", vec![".pdf", ".txt"]),
            ])
            .expect("md was released by Documents");
        assert_eq!(table.classify("todo.md"), "Notes");
    }

    #[test]
    fn test_override_new_category_conflicting_with_builtin() {
        let result = CategoryTable::default().with_overrides([("Ebooks", vec![".pdf"])]);
        assert!(matches!(
            result,
            Err(TableError::DuplicateExtension { ref first, .. }) if first == "Documents"
        ));
    }

    #[test]
    fn test_selectable_names() {
        let table = CategoryTable::default();
        assert!(table.is_selectable("Images"));
        assert!(table.is_selectable(FALLBACK_CATEGORY));
        assert!(!table.is_selectable("images"));
        assert!(!table.contains(FALLBACK_CATEGORY));
    }

    #[test]
    fn test_sorted_rules() {
        let table = CategoryTable::default();
        let names: Vec<_> = table
            .sorted_rules()
            .iter()
            .map(|rule| rule.name.as_str())
            .collect();
        assert_eq!(names.first(), Some(&"3D_Models"));
        assert_eq!(names.last(), Some(&"Videos"));
        assert!(names.windows(2).all(|w| w[0] < w[1]));
    }
}
