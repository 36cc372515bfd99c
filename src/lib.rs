//! dlsort - sort a downloads folder into category subdirectories
//!
//! This library classifies files by extension, scans a directory for
//! eligible files (skipping hidden entries, subdirectories, files younger than
//! an age threshold, and unselected categories), reports what it found, and
//! moves files into per-category folders with collision-safe renaming.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod interrupt;
pub mod output;
pub mod report;
pub mod scanner;

pub use cli::{Cli, CliError, RunConfig, RunOutcome, organize, run_cli};
pub use config::{CompiledFilters, ConfigError, Settings};
pub use file_category::{CategoryTable, FALLBACK_CATEGORY};
pub use file_organizer::{FileOrganizer, MoveOutcome, MoveTally};
pub use interrupt::InterruptHandler;
pub use scanner::{CategoryGrouping, FileRecord, ScanError, ScanOptions, ScanReport, Scanner};
