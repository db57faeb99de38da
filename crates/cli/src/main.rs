//! redist command line
//!
//! Downloads an upstream tool's release executables, repackages them as
//! platform wheels and publishes them to a Python package index.

// The binary reports command output on stdout and fatal errors on stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod commands;
mod errors;
mod tracing;

use crate::commands::Command;
use crate::errors::{CliError, CliResult, EXIT_OK, exit_code_for, render_error};
use crate::tracing::{TracingConfig, TracingFormat, init_tracing};
use redist_release::Context;

fn main() {
    // Tracing may be unusable while panicking.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();
    let code = match run(cli) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            let code = exit_code_for(&err);
            render_error(err);
            code
        }
    };
    std::process::exit(code);
}

/// Tracing settings for a loaded context.
fn tracing_config(format: TracingFormat, ctx: &Context) -> TracingConfig {
    TracingConfig::for_verbosity(format, ctx.verbosity)
}

fn run(cli: cli::Cli) -> CliResult<()> {
    let format = cli.format.unwrap_or_else(TracingFormat::detect);
    let ctx = Context::load(&cli.root, cli.verbose)?;
    init_tracing(tracing_config(format, &ctx)).map_err(|e| CliError::Tracing {
        message: e.to_string(),
    })?;

    let command: Command = cli.command.into();
    let span = command_span!(command.name());
    let _guard = span.enter();

    ::tracing::debug!(root = %cli.root.display(), ci = ctx.ci, "Starting");
    let output = commands::execute(command, &ctx, format)?;
    if !output.is_empty() {
        print!("{output}");
    }
    Ok(())
}
