//! CLI error types and rendering
//!
//! Pipeline errors keep their own diagnostics; the CLI only adds the cases it
//! introduces itself and maps everything to an exit code.

use miette::{Diagnostic, Report};
use std::io::{self, Write};
use thiserror::Error;

/// Successful execution.
pub const EXIT_OK: i32 = 0;

/// Any failure, including a failed verification.
pub const EXIT_FAILURE: i32 = 1;

/// CLI-specific error types with diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// An error raised by the pipeline.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Redist(#[from] redist_release::Error),

    /// At least one archive failed verification.
    #[error("{failed} of {total} archive(s) failed verification")]
    #[diagnostic(
        code(redist::cli::verification_failed),
        help("See the findings logged above for each failed archive")
    )]
    VerificationFailed {
        /// Number of failed archives.
        failed: usize,
        /// Number of checked archives.
        total: usize,
    },

    /// Tracing could not be initialised.
    #[error("Tracing initialization failed: {message}")]
    #[diagnostic(
        code(redist::cli::tracing_error),
        help("Check the RUST_LOG environment variable")
    )]
    Tracing {
        /// The error message
        message: String,
    },
}

impl CliError {
    /// Whether the failure was already reported through the log.
    #[must_use]
    pub const fn is_reported(&self) -> bool {
        matches!(self, Self::VerificationFailed { .. })
    }
}

/// Result type for command handlers.
pub type CliResult<T> = Result<T, CliError>;

/// Maps an error to a process exit code.
#[must_use]
pub const fn exit_code_for(_err: &CliError) -> i32 {
    EXIT_FAILURE
}

/// Prints `err` with miette's fancy formatting unless it was already logged.
#[allow(clippy::print_stderr)]
pub fn render_error(err: CliError) {
    if err.is_reported() {
        tracing::error!("{err}");
        return;
    }
    let report = Report::new(err);
    eprintln!("{report:?}");
    let _ = io::stderr().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redist_error_is_transparent() {
        let err: CliError = redist_release::Error::UncommittedChanges.into();
        assert!(err.to_string().contains("uncommitted changes"));
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("redist::uncommitted_changes")
        );
        assert!(!err.is_reported());
    }

    #[test]
    fn test_verification_failed() {
        let err = CliError::VerificationFailed {
            failed: 1,
            total: 2,
        };
        assert_eq!(err.to_string(), "1 of 2 archive(s) failed verification");
        assert!(err.is_reported());
        assert_eq!(exit_code_for(&err), EXIT_FAILURE);
    }
}
