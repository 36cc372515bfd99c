//! Terminal styling for status lines and the move progress bar.
//!
//! Report bodies are plain text (see [`crate::report`]); this module only
//! decorates the lines that announce individual outcomes.

use crate::file_organizer::MoveOutcome;
use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};

/// Consistent styling for CLI status output.
///
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
///
/// The `write_*` variants return write errors such as a closed pipe instead
/// of panicking.
pub struct OutputFormatter;

impl OutputFormatter {
    pub fn write_success<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
        writeln!(out, "{} {}", "✓".green(), message)
    }

    pub fn write_error<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
        writeln!(out, "{} {}", "✗".red(), message)
    }

    pub fn write_warning<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
        writeln!(out, "{} {}", "⚠".yellow(), message)
    }

    /// Prints an error message on stderr, ignoring write failures.
    pub fn error(message: &str) {
        let _ = Self::write_error(&mut io::stderr().lock(), message);
    }

    /// Writes the line for one processed file: successes to `out`, failures
    /// to `err`.
    ///
    /// ```no_run
    /// use dlsort::file_organizer::MoveOutcome;
    /// use dlsort::output::OutputFormatter;
    /// use std::io;
    /// use std::path::PathBuf;
    ///
    /// let outcome = MoveOutcome::Moved {
    ///     source: PathBuf::from("/dl/a.png"),
    ///     destination: PathBuf::from("/dl/Images/a.png"),
    ///     category: "Images".to_string(),
    /// };
    /// OutputFormatter::write_move_outcome(&mut io::stdout(), &mut io::stderr(), &outcome)?;
    /// # Ok::<(), io::Error>(())
    /// ```
    pub fn write_move_outcome<W, E>(
        out: &mut W,
        err: &mut E,
        outcome: &MoveOutcome,
    ) -> io::Result<()>
    where
        W: Write,
        E: Write,
    {
        match outcome {
            MoveOutcome::Moved { category, .. } => {
                Self::write_success(out, &format!("{} → {}/", outcome.file_name(), category))
            }
            MoveOutcome::Failed { error, .. } => Self::write_error(
                err,
                &format!("Failed to move {}: {}", outcome.file_name(), error),
            ),
        }
    }

    /// Creates a progress bar for the move pass, drawn on stderr.
    ///
    /// The bar hides itself when stderr is not a terminal. Print through
    /// [`ProgressBar::suspend`] so lines are not overdrawn.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }
}
