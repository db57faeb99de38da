//! Per-invocation context threaded through every pipeline operation.

use crate::config::RedistConfig;
use crate::error::Result;
use crate::layout::Layout;
use std::path::PathBuf;

/// How chatty the pipeline should be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Warnings, errors and produced artifacts.
    #[default]
    Normal,
    /// Also report skipped and ignored paths.
    Verbose,
}

impl Verbosity {
    /// Verbose when requested explicitly or when running under CI.
    #[must_use]
    pub const fn resolve(verbose: bool, ci: bool) -> Self {
        if verbose || ci {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Whether skip-case diagnostics are wanted.
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }
}

/// Everything an operation needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct Context {
    /// Project configuration.
    pub config: RedistConfig,
    /// Directory layout derived from the project root.
    pub layout: Layout,
    /// Requested verbosity.
    pub verbosity: Verbosity,
    /// Whether we are running under a CI system.
    pub ci: bool,
}

impl Context {
    /// Creates a context from an explicit configuration.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: RedistConfig) -> Self {
        let layout = Layout::new(root, &config.executable.name);
        Self {
            config,
            layout,
            verbosity: Verbosity::Normal,
            ci: false,
        }
    }

    /// Loads `redist.toml` below `root` and detects CI from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed.
    pub fn load(root: impl Into<PathBuf>, verbose: bool) -> Result<Self> {
        let root = root.into();
        let config = RedistConfig::load(&root)?;
        let ci = std::env::var_os("CI").is_some();
        Ok(Self::new(root, config)
            .with_ci(ci)
            .with_verbosity(Verbosity::resolve(verbose, ci)))
    }

    /// Sets the verbosity.
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Sets the CI flag.
    #[must_use]
    pub const fn with_ci(mut self, ci: bool) -> Self {
        self.ci = ci;
        self
    }
}
