use crate::commands::Command;
use crate::tracing::TracingFormat;
use clap::{Parser, Subcommand};
use redist_release::publish::DEFAULT_REPOSITORY;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "redist")]
#[command(about = "Redistribute GitHub release executables as Python wheels")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        help = "Project root holding redist.toml, .cache, build and dist",
        default_value = "."
    )]
    pub root: PathBuf,

    #[arg(
        long,
        global = true,
        help = "Log format (default: github under GitHub Actions, compact otherwise)",
        value_enum
    )]
    pub format: Option<TracingFormat>,

    #[arg(short = 'v', long, help = "Also report skipped and ignored paths")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Download a release's license and executables into the cache")]
    Download {
        #[arg(short, long, help = "Wipe the cache first")]
        clean: bool,
        #[arg(help = "Release tag to download", default_value = "latest")]
        tag: String,
    },
    #[command(about = "Stage cached executables under their wheel platform tags")]
    Build {
        #[arg(short, long, help = "Wipe the build directory first")]
        clean: bool,
        #[arg(
            short,
            long = "tag",
            help = "Glob selecting cached tags",
            default_value = "*",
            value_name = "GLOB"
        )]
        tag_glob: String,
    },
    #[command(about = "Assemble reproducible wheels from staged builds")]
    Assemble {
        #[arg(short, long, help = "Wipe the dist directory first")]
        clean: bool,
        #[arg(
            short,
            long,
            help = "Append a .devYYYYMMDDHHMMSS suffix from the latest commit time"
        )]
        dev: bool,
        #[arg(
            short,
            long = "tag",
            help = "Glob selecting staged tags",
            default_value = "*",
            value_name = "GLOB"
        )]
        tag_glob: String,
    },
    #[command(about = "Check assembled wheels against strict structural rules")]
    Verify {
        #[arg(
            short = 'v',
            long = "version",
            help = "Glob selecting version directories",
            default_value = "*",
            value_name = "GLOB"
        )]
        version_glob: String,
    },
    #[command(about = "Install the host's wheel and run the executable")]
    Test {
        #[arg(
            short = 'v',
            long = "version",
            help = "Glob selecting version directories",
            default_value = "*",
            value_name = "GLOB"
        )]
        version_glob: String,
        #[arg(help = "Arguments for the executable (default from redist.toml)")]
        args: Vec<String>,
    },
    #[command(about = "Upload wheels to a package index")]
    Publish {
        #[arg(short, long, help = "Publish even with uncommitted changes")]
        force: bool,
        #[arg(
            short = 'v',
            long = "version",
            help = "Glob selecting version directories",
            default_value = "*",
            value_name = "GLOB"
        )]
        version_glob: String,
        #[arg(help = "Repository name from .pypirc", default_value = DEFAULT_REPOSITORY)]
        repository: String,
    },
    #[command(about = "List mirrored and upstream releases")]
    Sync,
}

impl From<Commands> for Command {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::Download { clean, tag } => Self::Download { clean, tag },
            Commands::Build { clean, tag_glob } => Self::Build { clean, tag_glob },
            Commands::Assemble {
                clean,
                dev,
                tag_glob,
            } => Self::Assemble {
                clean,
                dev,
                tag_glob,
            },
            Commands::Verify { version_glob } => Self::Verify { version_glob },
            Commands::Test { version_glob, args } => Self::Test { version_glob, args },
            Commands::Publish {
                force,
                version_glob,
                repository,
            } => Self::Publish {
                force,
                version_glob,
                repository,
            },
            Commands::Sync => Self::Sync,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
