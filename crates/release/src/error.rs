//! Error types for the redistribution pipeline.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching, staging, assembling or publishing.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Configuration error (missing token, unreadable config file).
    #[error("Configuration error: {message}")]
    #[diagnostic(code(redist::config), help("{help}"))]
    Config {
        /// The error message
        message: String,
        /// Help text for the user
        help: String,
    },

    /// The hosting service answered with a non-success status.
    #[error("Request to {url} failed with HTTP {status}")]
    #[diagnostic(
        code(redist::http),
        help("Check that the token is valid and the repository or tag exists")
    )]
    Http {
        /// The requested URL
        url: String,
        /// The HTTP status code
        status: u16,
    },

    /// The request never produced a response.
    #[error("Network error while requesting {url}: {message}")]
    #[diagnostic(code(redist::network))]
    Network {
        /// The requested URL
        url: String,
        /// The error message
        message: String,
    },

    /// A tag or version string is not a valid PEP 440 version.
    #[error("Invalid version: {version}")]
    #[diagnostic(
        code(redist::invalid_version),
        help("Versions must follow PEP 440 (e.g., 1.2.3, 1.2.3rc1, 1.2.3.dev20240101000000)")
    )]
    InvalidVersion {
        /// The invalid version string
        version: String,
    },

    /// Wheel archive could not be written or read.
    #[error("Archive error: {message}")]
    #[diagnostic(code(redist::archive))]
    Archive {
        /// The error message
        message: String,
        /// The archive path, when known
        path: Option<PathBuf>,
    },

    /// Git operation error.
    #[error("Git error: {message}")]
    #[diagnostic(
        code(redist::git),
        help("Ensure you are in a git repository with at least one commit")
    )]
    Git {
        /// The error message
        message: String,
    },

    /// Publishing was attempted from a dirty working tree.
    #[error("Refusing publication, the working tree has uncommitted changes")]
    #[diagnostic(
        code(redist::uncommitted_changes),
        help("Commit or stash your changes, or pass --force to ignore this check")
    )]
    UncommittedChanges,

    /// A delegated tool (pip, twine, the executable itself) failed.
    #[error("{tool} failed: {message}")]
    #[diagnostic(code(redist::external))]
    External {
        /// The tool that failed
        tool: String,
        /// The error message
        message: String,
    },

    /// A glob selector could not be parsed.
    #[error("Invalid glob pattern '{pattern}': {message}")]
    #[diagnostic(code(redist::glob))]
    Glob {
        /// The offending pattern
        pattern: String,
        /// The error message
        message: String,
    },

    /// Wrapped I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(redist::io))]
    Io(#[from] std::io::Error),

    /// Wrapped TOML parsing error.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(redist::toml_parse))]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Create a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a new HTTP status error.
    #[must_use]
    pub fn http(url: impl Into<String>, status: u16) -> Self {
        Self::Http {
            url: url.into(),
            status,
        }
    }

    /// Create a new network error.
    #[must_use]
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid version error.
    #[must_use]
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Create a new archive error.
    #[must_use]
    pub fn archive(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Archive {
            message: message.into(),
            path,
        }
    }

    /// Create a new git error.
    #[must_use]
    pub fn git(message: impl Into<String>) -> Self {
        Self::Git {
            message: message.into(),
        }
    }

    /// Create a new external tool error.
    #[must_use]
    pub fn external(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::External {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new glob error.
    #[must_use]
    pub fn glob(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Glob {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(io) => Self::Io(io),
            other => Self::archive(other.to_string(), None),
        }
    }
}
