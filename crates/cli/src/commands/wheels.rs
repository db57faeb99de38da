//! Commands working on the local trees: build, assemble, verify, test and
//! publish.

use crate::errors::{CliError, CliResult};
use crate::tracing::{TracingFormat, notice};
use redist_release::publish::{self, PipInstaller, TwinePublisher};
use redist_release::{Context, VersionSuffix, stage, vcs, verify, wheel};
use std::fmt::Write;

/// Execute the `build` command.
///
/// # Errors
///
/// Returns an error if the glob is invalid or a copy fails.
pub fn execute_build(ctx: &Context, tag_glob: &str, clean: bool) -> CliResult<String> {
    let staged = stage::build(ctx, tag_glob, clean)?;
    let mut output = String::new();
    for build in &staged {
        let _ = writeln!(output, "{}", ctx.layout.display(&build.dir));
    }
    Ok(output)
}

/// Execute the `assemble` command.
///
/// # Errors
///
/// Returns an error if the commit time cannot be read in development mode,
/// a tag is not a valid version, or an archive cannot be written.
pub fn execute_assemble(
    ctx: &Context,
    tag_glob: &str,
    dev: bool,
    clean: bool,
) -> CliResult<String> {
    let suffix = if dev {
        VersionSuffix::Development {
            commit_time: vcs::latest_commit_time(ctx.layout.root())?,
        }
    } else {
        VersionSuffix::Release
    };

    let archives = wheel::assemble(ctx, tag_glob, suffix, clean)?;
    let mut output = String::new();
    for archive in &archives {
        let _ = writeln!(output, "{}", ctx.layout.display(&archive.path));
    }
    Ok(output)
}

/// Execute the `verify` command.
///
/// # Errors
///
/// Returns [`CliError::VerificationFailed`] if any archive failed.
pub fn execute_verify(ctx: &Context, version_glob: &str) -> CliResult<String> {
    let report = verify::verify(ctx, version_glob)?;
    if report.has_failures() {
        return Err(CliError::VerificationFailed {
            failed: report.failure_count(),
            total: report.checks.len(),
        });
    }
    Ok(format!("{} archive(s) passed\n", report.checks.len()))
}

/// Execute the `test` command.
///
/// # Errors
///
/// Returns an error if no wheel matches the host or the smoke test fails.
pub fn execute_test(
    ctx: &Context,
    version_glob: &str,
    args: &[String],
    format: TracingFormat,
) -> CliResult<String> {
    let installer = PipInstaller::for_ci(ctx.ci);
    let report = publish::smoke_test(ctx, &installer, version_glob, args)?;

    let text = format!("{}\n{}", report.location.display(), report.output);
    Ok(if format == TracingFormat::Github {
        format!("{}\n", notice(&text))
    } else {
        format!("{text}\n")
    })
}

/// Execute the `publish` command.
///
/// # Errors
///
/// Returns an error for a dirty working tree without `force`, or if an
/// upload fails.
pub fn execute_publish(
    ctx: &Context,
    repository: &str,
    version_glob: &str,
    force: bool,
) -> CliResult<String> {
    let published = publish::publish(ctx, &TwinePublisher, repository, version_glob, force)?;
    let mut output = String::new();
    for path in &published {
        let _ = writeln!(output, "{}", ctx.layout.display(path));
    }
    Ok(output)
}
