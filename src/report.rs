//! Human-readable and JSON summaries of a scan.
//!
//! Text writers take any `io::Write` so they can be pointed at stdout or a
//! buffer. Categories are always listed in lexicographic order.

use crate::file_category::CategoryTable;
use crate::file_organizer::{MoveOutcome, MoveTally};
use crate::scanner::{FileRecord, ScanReport};
use serde::{Serialize, Serializer};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Width of the horizontal rules in text output.
pub const RULE_WIDTH: usize = 60;

/// Printed when a scan selects nothing.
pub const EMPTY_MESSAGE: &str = "No files to organize";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Writes the run header, totals and per-category counts.
pub fn write_summary<W: Write>(
    out: &mut W,
    report: &ScanReport,
    directory: &Path,
    preview: bool,
) -> io::Result<()> {
    let mode = if preview { "PREVIEW" } else { "ACTIVE MODE" };
    writeln!(out, "dlsort - {}", mode)?;
    writeln!(out, "Directory: {}", directory.display())?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;

    let total_files = report.grouping.file_count();
    writeln!(
        out,
        "Found {} {} ({:.1} MB)",
        total_files,
        plural(total_files),
        bytes_to_mb(report.total_bytes)
    )?;
    writeln!(out)?;

    for (category, files) in report.grouping.iter() {
        let bytes: u64 = files.iter().map(|f| f.size).sum();
        writeln!(
            out,
            "{}: {} {} ({:.1} MB)",
            category,
            files.len(),
            plural(files.len()),
            bytes_to_mb(bytes)
        )?;
    }
    writeln!(out)
}

/// Writes every file under its category header, files sorted by path.
pub fn write_preview_listing<W: Write>(out: &mut W, report: &ScanReport) -> io::Result<()> {
    writeln!(out, "PREVIEW - No files will be moved")?;
    writeln!(out)?;
    writeln!(out, "Files to be organized:")?;

    for (category, files) in report.grouping.iter() {
        writeln!(out)?;
        writeln!(out, "{}/", category)?;

        let mut sorted: Vec<&FileRecord> = files.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        for file in sorted {
            writeln!(
                out,
                "  - {} ({:.2} MB, {}d old)",
                file.name,
                bytes_to_mb(file.size),
                file.age_days
            )?;
        }
    }
    Ok(())
}

/// Writes the final moved/error counts.
pub fn write_tally<W: Write>(out: &mut W, tally: &MoveTally) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    writeln!(out, "Moved: {} {}", tally.moved, plural(tally.moved))?;
    if tally.errors > 0 {
        writeln!(out, "Errors: {} {}", tally.errors, plural(tally.errors))?;
    }
    Ok(())
}

/// Writes every category with its extensions, categories sorted.
pub fn write_rule_table<W: Write>(out: &mut W, table: &CategoryTable) -> io::Result<()> {
    writeln!(out, "Available categories:")?;
    writeln!(out)?;
    for rule in table.sorted_rules() {
        writeln!(out, "{}:", rule.name)?;
        writeln!(out, "  {}", rule.extensions.join(", "))?;
    }
    Ok(())
}

/// Serializes a path as a string, replacing invalid UTF-8 with U+FFFD.
pub(crate) fn serialize_path_lossy<P, S>(path: &P, serializer: S) -> Result<S::Ok, S::Error>
where
    P: AsRef<Path>,
    S: Serializer,
{
    serializer.serialize_str(&path.as_ref().to_string_lossy())
}

fn serialize_optional_path_lossy<S>(
    path: &Option<PathBuf>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match path {
        Some(path) => serialize_path_lossy(path, serializer),
        None => serializer.serialize_none(),
    }
}

/// Machine-readable summary of a run.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    #[serde(serialize_with = "serialize_path_lossy")]
    pub directory: &'a Path,
    pub preview: bool,
    pub total_files: usize,
    pub total_bytes: u64,
    pub categories: Vec<CategorySummary<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moves: Option<MoveSummary>,
}

#[derive(Debug, Serialize)]
pub struct CategorySummary<'a> {
    pub name: &'a str,
    pub count: usize,
    pub bytes: u64,
    pub files: &'a [FileRecord],
}

#[derive(Debug, Serialize)]
pub struct MoveSummary {
    #[serde(flatten)]
    pub tally: MoveTally,
    pub outcomes: Vec<OutcomeSummary>,
}

/// One file's move result, flattened for serialization.
#[derive(Debug, Serialize)]
pub struct OutcomeSummary {
    pub file: String,
    pub category: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_path_lossy"
    )]
    pub destination: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&MoveOutcome> for OutcomeSummary {
    fn from(outcome: &MoveOutcome) -> Self {
        let (destination, error) = match outcome {
            MoveOutcome::Moved { destination, .. } => (Some(destination.clone()), None),
            MoveOutcome::Failed { error, .. } => (None, Some(error.to_string())),
        };
        Self {
            file: outcome.file_name(),
            category: outcome.category().to_string(),
            destination,
            error,
        }
    }
}

impl<'a> RunSummary<'a> {
    pub fn new(report: &'a ScanReport, directory: &'a Path, preview: bool) -> Self {
        let categories = report
            .grouping
            .iter()
            .map(|(name, files)| CategorySummary {
                name,
                count: files.len(),
                bytes: files.iter().map(|f| f.size).sum(),
                files,
            })
            .collect();

        Self {
            directory,
            preview,
            total_files: report.grouping.file_count(),
            total_bytes: report.total_bytes,
            categories,
            moves: None,
        }
    }

    pub fn with_moves(mut self, tally: MoveTally, outcomes: Vec<OutcomeSummary>) -> Self {
        self.moves = Some(MoveSummary { tally, outcomes });
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
