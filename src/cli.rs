//! Command-line interface for dlsort.
//!
//! This module handles:
//! - Argument parsing and validation
//! - Configuration loading
//! - Scan, report and move orchestration

use crate::config::{CompiledFilters, ConfigError, Settings};
use crate::file_category::CategoryTable;
use crate::file_organizer::{FileOrganizer, MoveTally};
use crate::interrupt::InterruptHandler;
use crate::output::OutputFormatter;
use crate::report::{
    EMPTY_MESSAGE, OutcomeSummary, RunSummary, write_preview_listing, write_rule_table,
    write_summary, write_tally,
};
use crate::scanner::{ScanError, ScanOptions, Scanner};
use clap::Parser;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const EXAMPLES: &str = "\
Examples:
  dlsort                              # Organize your downloads folder
  dlsort --dry-run                    # Preview changes without moving files
  dlsort -d ~/Downloads --age 7       # Only files at least 7 days old
  dlsort -c 3D_Models Images          # Only organize models and images
  dlsort -d /path/to/folder           # Custom folder";

/// Organize a downloads folder by moving files into category subfolders.
#[derive(Debug, Parser)]
#[command(name = "dlsort", version, about, after_help = EXAMPLES)]
pub struct Cli {
    /// Directory to organize (default: your downloads folder)
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Show what would be done without moving files
    #[arg(long, visible_alias = "preview")]
    pub dry_run: bool,

    /// Only process files at least DAYS old (0 = all files)
    #[arg(
        long,
        value_name = "DAYS",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub age: i64,

    /// Only process these categories (e.g. 3D_Models Images)
    #[arg(short, long, value_name = "CATEGORY", num_args = 1..)]
    pub categories: Option<Vec<String>>,

    /// List all available categories and exit
    #[arg(long)]
    pub list_categories: bool,

    /// Read category rules and filters from this TOML file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print a JSON summary instead of text
    #[arg(long)]
    pub json: bool,

    /// Log debug details to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Errors that end a run with a failure status.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid categories: {}", .0.join(", "))]
    InvalidCategories(Vec<String>),
    #[error("Age must be 0 or positive (got {0})")]
    NegativeAge(i64),
    #[error("Could not determine the downloads directory; pass one with --directory")]
    NoDefaultDirectory,
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("Failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub directory: PathBuf,
    /// Scan and report only.
    pub preview: bool,
    pub min_age_days: u64,
    pub categories: Option<BTreeSet<String>>,
    pub json: bool,
}

impl RunConfig {
    /// Validates parsed arguments against `table`.
    ///
    /// Nothing on disk is touched here; a bad category or age is reported
    /// before the target directory is even looked at.
    pub fn from_cli(cli: &Cli, table: &CategoryTable) -> Result<Self, CliError> {
        let categories = validate_categories(cli.categories.as_deref(), table)?;
        let min_age_days = validate_age(cli.age)?;
        let directory = resolve_directory(cli.directory.as_deref())?;

        Ok(Self {
            directory,
            preview: cli.dry_run,
            min_age_days,
            categories,
            json: cli.json,
        })
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            min_age_days: self.min_age_days,
            allowed_categories: self.categories.clone(),
        }
    }
}

/// What a run ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The rule table was printed.
    ListedCategories,
    /// The scan selected no files.
    NothingToOrganize,
    /// Preview mode: files were reported, nothing moved.
    Previewed { files: usize, total_bytes: u64 },
    /// Files were moved (possibly with per-file failures).
    Organized(MoveTally),
    /// Stopped by the user before any file was moved.
    Interrupted,
}

impl RunOutcome {
    pub fn was_interrupted(&self) -> bool {
        match self {
            Self::Interrupted => true,
            Self::Organized(tally) => tally.interrupted,
            _ => false,
        }
    }
}

/// Runs the CLI: loads configuration, then lists categories or organizes.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use dlsort::cli::{Cli, run_cli};
/// use dlsort::interrupt::InterruptHandler;
///
/// let cli = Cli::parse_from(["dlsort", "--dry-run", "-d", "/tmp/downloads"]);
/// match run_cli(&cli, &InterruptHandler::new()) {
///     Ok(outcome) => println!("{:?}", outcome),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli, interrupt: &InterruptHandler) -> Result<RunOutcome, CliError> {
    let settings = Settings::load(cli.config.as_deref())?;
    let table = settings.category_table()?;

    if cli.list_categories {
        write_rule_table(&mut io::stdout().lock(), &table)?;
        return Ok(RunOutcome::ListedCategories);
    }

    let config = RunConfig::from_cli(cli, &table)?;
    let filters = settings.compile_filters()?;
    organize(&config, &table, &filters, interrupt)
}

/// Scans the target directory, reports, and (unless previewing) moves files.
pub fn organize(
    config: &RunConfig,
    table: &CategoryTable,
    filters: &CompiledFilters,
    interrupt: &InterruptHandler,
) -> Result<RunOutcome, CliError> {
    info!(directory = %config.directory.display(), preview = config.preview, "scanning");
    let report = Scanner::new(table, filters).scan(&config.directory, &config.scan_options())?;

    if interrupt.is_triggered() {
        return Ok(RunOutcome::Interrupted);
    }

    if report.grouping.is_empty() {
        if config.json {
            print_json(&RunSummary::new(&report, &config.directory, config.preview))?;
        } else {
            writeln!(io::stdout().lock(), "{}", EMPTY_MESSAGE)?;
        }
        return Ok(RunOutcome::NothingToOrganize);
    }

    if config.preview {
        if config.json {
            print_json(&RunSummary::new(&report, &config.directory, true))?;
        } else {
            let mut out = io::stdout().lock();
            write_summary(&mut out, &report, &config.directory, true)?;
            write_preview_listing(&mut out, &report)?;
        }
        return Ok(RunOutcome::Previewed {
            files: report.grouping.file_count(),
            total_bytes: report.total_bytes,
        });
    }

    let organizer = FileOrganizer::new(&config.directory);
    let tally = if config.json {
        let mut outcomes = Vec::new();
        let tally = organizer.organize(&report.grouping, interrupt, |outcome| {
            outcomes.push(OutcomeSummary::from(outcome));
        });
        print_json(
            &RunSummary::new(&report, &config.directory, false).with_moves(tally, outcomes),
        )?;
        tally
    } else {
        write_summary(&mut io::stdout().lock(), &report, &config.directory, false)?;

        // Moves keep going if stdout goes away; the write error is returned
        // once the pass is over.
        let mut write_error: Option<io::Error> = None;
        let pb = OutputFormatter::create_progress_bar(report.grouping.file_count() as u64);
        let tally = organizer.organize(&report.grouping, interrupt, |outcome| {
            if write_error.is_none() {
                let written = pb.suspend(|| {
                    OutputFormatter::write_move_outcome(
                        &mut io::stdout().lock(),
                        &mut io::stderr().lock(),
                        outcome,
                    )
                });
                write_error = written.err();
            }
            pb.inc(1);
        });
        pb.finish_and_clear();
        if let Some(e) = write_error {
            return Err(e.into());
        }

        write_tally(&mut io::stdout().lock(), &tally)?;
        tally
    };

    Ok(RunOutcome::Organized(tally))
}

fn print_json(summary: &RunSummary<'_>) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", summary.to_json()?)?;
    Ok(())
}

/// Rejects names the table does not know. The fallback category is always
/// accepted.
pub fn validate_categories(
    requested: Option<&[String]>,
    table: &CategoryTable,
) -> Result<Option<BTreeSet<String>>, CliError> {
    let Some(requested) = requested else {
        return Ok(None);
    };

    let invalid: Vec<String> = requested
        .iter()
        .filter(|name| !table.is_selectable(name))
        .cloned()
        .collect();
    if !invalid.is_empty() {
        return Err(CliError::InvalidCategories(invalid));
    }

    Ok(Some(requested.iter().cloned().collect()))
}

pub fn validate_age(age: i64) -> Result<u64, CliError> {
    u64::try_from(age).map_err(|_| CliError::NegativeAge(age))
}

/// The directory to organize: the given path with `~` expanded, or the
/// platform downloads folder.
pub fn resolve_directory(directory: Option<&Path>) -> Result<PathBuf, CliError> {
    match directory {
        Some(path) => Ok(expand_tilde(path)),
        None => dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .ok_or(CliError::NoDefaultDirectory),
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) if rest.as_os_str().is_empty() => home,
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

impl CliError {
    /// True if the error only means stdout was closed early, e.g. by `head`.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Self::Output(e) if e.kind() == io::ErrorKind::BrokenPipe)
    }
}

/// Tells the user the run was stopped early. In JSON mode stdout carries only
/// the document, so the notice goes to `err`.
pub fn write_interrupt_notice<W, E>(out: &mut W, err: &mut E, json: bool) -> io::Result<()>
where
    W: Write,
    E: Write,
{
    if json {
        OutputFormatter::write_warning(err, "Stopped by user")
    } else {
        writeln!(out)?;
        OutputFormatter::write_warning(out, "Stopped by user")
    }
}

/// Printed after an invalid category error.
pub const INVALID_CATEGORY_HINT: &str = "Use --list-categories to see available options";
