use clap::Parser;
use dlsort::cli::{Cli, CliError, INVALID_CATEGORY_HINT, run_cli, write_interrupt_notice};
use dlsort::interrupt::InterruptHandler;
use dlsort::output::OutputFormatter;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let interrupt = InterruptHandler::new();
    if let Err(e) = interrupt.install() {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }

    match run_cli(&cli, &interrupt) {
        Ok(outcome) => {
            if outcome.was_interrupted() {
                report_interrupted(cli.json);
            }
            ExitCode::SUCCESS
        }
        Err(e) if e.is_broken_pipe() => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            if matches!(e, CliError::InvalidCategories(_)) {
                let _ = writeln!(io::stderr(), "{}", INVALID_CATEGORY_HINT);
            }
            ExitCode::FAILURE
        }
    }
}

fn report_interrupted(json: bool) {
    let result =
        write_interrupt_notice(&mut io::stdout().lock(), &mut io::stderr().lock(), json);
    if let Err(e) = result {
        tracing::debug!(error = %e, "could not print interrupt notice");
    }
}

/// Logs go to stderr so they never mix with the report on stdout.
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "warn,dlsort=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
