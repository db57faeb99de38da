//! Release-to-wheel redistribution pipeline.
//!
//! This crate repackages a third-party executable, published as per-platform
//! GitHub release assets, into reproducible platform wheels ready for a
//! Python package index.
//!
//! # Pipeline
//!
//! - [`github`] - Paginated release listing and asset downloads
//! - [`cache`] - Skip-if-present download of a release into `.cache/`
//! - [`stage`] - Renaming cached executables to wheel platform tags in `build/`
//! - [`wheel`] - Byte-reproducible wheel assembly into `dist/`
//! - [`verify`] - Strict structural checks of assembled wheels
//! - [`publish`] - Upload and install smoke tests through external tools
//! - [`sync`] - Mirrored versus upstream release sets
//!
//! Supporting modules: [`platform`] maps asset names to platform tags,
//! [`version`] derives PEP 440 versions from tags, [`metadata`] renders the
//! embedded `METADATA` and `WHEEL` blocks, and [`config`], [`layout`] and
//! [`context`] describe the project and its directory tree.
//!
//! # Example
//!
//! ```rust,ignore
//! use redist_release::{Context, VersionSuffix, stage, wheel};
//!
//! let ctx = Context::load(".", false)?;
//! stage::build(&ctx, "*", false)?;
//! for archive in wheel::assemble(&ctx, "*", VersionSuffix::Release, false)? {
//!     println!("{}", archive.path.display());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod github;
pub mod layout;
pub mod metadata;
pub mod platform;
pub mod publish;
pub mod stage;
pub mod sync;
pub mod vcs;
pub mod verify;
pub mod version;
pub mod wheel;

// Re-export main types
pub use cache::CachedArtifact;
pub use config::{Credentials, RedistConfig};
pub use context::{Context, Verbosity};
pub use error::{Error, Result};
pub use github::{Asset, GitHubClient, Release, ReleaseApi, fetch_releases};
pub use layout::Layout;
pub use metadata::MetadataRecord;
pub use platform::Platform;
pub use publish::{Installer, PipInstaller, Publisher, SmokeReport, TwinePublisher};
pub use stage::StagedBuild;
pub use sync::SyncReport;
pub use verify::{CheckReport, VerifyReport};
pub use version::{Version, VersionSuffix};
pub use wheel::DistArchive;
