pub mod fetch;
pub mod wheels;

use crate::errors::CliResult;
use crate::tracing::TracingFormat;
use redist_release::Context;

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Download {
        clean: bool,
        tag: String,
    },
    Build {
        clean: bool,
        tag_glob: String,
    },
    Assemble {
        clean: bool,
        dev: bool,
        tag_glob: String,
    },
    Verify {
        version_glob: String,
    },
    Test {
        version_glob: String,
        args: Vec<String>,
    },
    Publish {
        force: bool,
        version_glob: String,
        repository: String,
    },
    Sync,
}

impl Command {
    /// Subcommand name, for spans.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Download { .. } => "download",
            Self::Build { .. } => "build",
            Self::Assemble { .. } => "assemble",
            Self::Verify { .. } => "verify",
            Self::Test { .. } => "test",
            Self::Publish { .. } => "publish",
            Self::Sync => "sync",
        }
    }
}

/// Runs `command` and returns what should be printed to stdout.
pub fn execute(command: Command, ctx: &Context, format: TracingFormat) -> CliResult<String> {
    match command {
        Command::Download { clean, tag } => fetch::execute_download(ctx, &tag, clean),
        Command::Build { clean, tag_glob } => wheels::execute_build(ctx, &tag_glob, clean),
        Command::Assemble {
            clean,
            dev,
            tag_glob,
        } => wheels::execute_assemble(ctx, &tag_glob, dev, clean),
        Command::Verify { version_glob } => wheels::execute_verify(ctx, &version_glob),
        Command::Test { version_glob, args } => {
            wheels::execute_test(ctx, &version_glob, &args, format)
        }
        Command::Publish {
            force,
            version_glob,
            repository,
        } => wheels::execute_publish(ctx, &repository, &version_glob, force),
        Command::Sync => fetch::execute_sync(ctx),
    }
}
