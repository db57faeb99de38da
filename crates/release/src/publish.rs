//! Delegation to external packaging tools: upload and install smoke tests.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::layout::{file_name, glob_in};
use crate::platform::Platform;
use crate::vcs;
use crate::wheel::WHEEL_EXTENSION;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Default upload destination.
pub const DEFAULT_REPOSITORY: &str = "testpypi";

/// Uploads finished archives to a package index.
pub trait Publisher {
    /// Uploads `archives` to the index configured as `repository`.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    fn publish(&self, repository: &str, archives: &[PathBuf]) -> Result<()>;
}

/// Uploads through `twine upload --repository <repository>`.
#[derive(Debug, Clone, Default)]
pub struct TwinePublisher;

impl Publisher for TwinePublisher {
    fn publish(&self, repository: &str, archives: &[PathBuf]) -> Result<()> {
        let status = Command::new("twine")
            .args(["upload", "--repository", repository])
            .args(archives)
            .status()
            .map_err(|e| Error::external("twine", e.to_string()))?;
        if !status.success() {
            return Err(Error::external("twine", format!("exited with {status}")));
        }
        Ok(())
    }
}

/// Installs and removes wheels for the smoke test.
pub trait Installer {
    /// Installs `wheel`, replacing any installed copy.
    ///
    /// # Errors
    ///
    /// Returns an error if installation fails.
    fn install(&self, wheel: &Path, workdir: &Path) -> Result<()>;

    /// Removes the distribution contained in `wheel`.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn uninstall(&self, wheel: &Path, workdir: &Path) -> Result<()>;
}

/// Installs through `pip`.
#[derive(Debug, Clone, Default)]
pub struct PipInstaller {
    /// Adds `--require-virtualenv`.
    pub require_virtualenv: bool,
}

impl PipInstaller {
    /// Outside CI, pip must run inside a virtual environment.
    #[must_use]
    pub const fn for_ci(ci: bool) -> Self {
        Self {
            require_virtualenv: !ci,
        }
    }

    fn pip(&self, workdir: &Path, args: &[&str], wheel: &Path) -> Result<()> {
        let mut cmd = Command::new("pip");
        cmd.args(["--disable-pip-version-check", "--no-input"]);
        if self.require_virtualenv {
            cmd.arg("--require-virtualenv");
        }
        let status = cmd
            .args(args)
            .arg(wheel)
            .current_dir(workdir)
            .status()
            .map_err(|e| Error::external("pip", e.to_string()))?;
        if !status.success() {
            return Err(Error::external("pip", format!("exited with {status}")));
        }
        Ok(())
    }
}

impl Installer for PipInstaller {
    fn install(&self, wheel: &Path, workdir: &Path) -> Result<()> {
        self.pip(workdir, &["install", "--force-reinstall"], wheel)
    }

    fn uninstall(&self, wheel: &Path, workdir: &Path) -> Result<()> {
        self.pip(workdir, &["uninstall", "--yes"], wheel)
    }
}

/// Wheels in every version directory matching `version_glob`, grouped per
/// directory.
fn wheels_by_version(ctx: &Context, version_glob: &str) -> Result<Vec<Vec<PathBuf>>> {
    let layout = &ctx.layout;
    if !layout.dist_root().is_dir() {
        return Ok(Vec::new());
    }
    let mut groups = Vec::new();
    for version_dir in glob_in(layout.dist_root(), version_glob)? {
        if !version_dir.is_dir() {
            debug!(path = %layout.display(&version_dir), "Ignoring non-directory");
            continue;
        }
        let wheels = glob_in(&version_dir, &format!("*.{WHEEL_EXTENSION}"))?
            .into_iter()
            .filter(|p| p.is_file())
            .collect::<Vec<_>>();
        groups.push(wheels);
    }
    Ok(groups)
}

/// Uploads every wheel below `dist/<version_glob>` to `repository`.
///
/// Refuses to run from a dirty working tree unless `force` is set.
///
/// # Errors
///
/// Returns [`Error::UncommittedChanges`] for a dirty tree, otherwise the
/// first publisher failure.
pub fn publish(
    ctx: &Context,
    publisher: &dyn Publisher,
    repository: &str,
    version_glob: &str,
    force: bool,
) -> Result<Vec<PathBuf>> {
    if !force && vcs::has_uncommitted_changes(ctx.layout.root())? {
        return Err(Error::UncommittedChanges);
    }

    let mut published = Vec::new();
    for wheels in wheels_by_version(ctx, version_glob)? {
        if wheels.is_empty() {
            continue;
        }
        info!(count = wheels.len(), %repository, "Publishing");
        publisher.publish(repository, &wheels)?;
        published.extend(wheels);
    }
    Ok(published)
}

/// Result of a successful smoke test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeReport {
    /// The installed wheel.
    pub wheel: PathBuf,
    /// Where the installed executable was found.
    pub location: PathBuf,
    /// Combined stdout and stderr of the invocation.
    pub output: String,
}

/// Finds the wheel for `platform` below `dist/<version_glob>`.
///
/// # Errors
///
/// Returns a configuration error if the platform is unsupported or no
/// matching wheel exists.
pub fn find_wheel(ctx: &Context, version_glob: &str, platform: Platform) -> Result<PathBuf> {
    let Some(wheel_tag) = platform.wheel_tag() else {
        return Err(Error::config(
            format!(
                "Unsupported host platform {}/{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
            "Run the smoke test on one of the redistributed platforms",
        ));
    };
    let prefix = format!("{}-", ctx.config.dist_name());
    let suffix = format!("-{wheel_tag}.{WHEEL_EXTENSION}");

    wheels_by_version(ctx, version_glob)?
        .into_iter()
        .flatten()
        .find(|p| file_name(p).is_some_and(|n| n.starts_with(&prefix) && n.ends_with(&suffix)))
        .ok_or_else(|| {
            Error::config(
                format!("Could not find any wheel for {wheel_tag} matching '{version_glob}'"),
                "Run `redist assemble` first or adjust --version",
            )
        })
}

/// Installs the host's wheel, runs the executable with `args`, and removes
/// the wheel again outside CI.
///
/// # Errors
///
/// Returns an error if no wheel matches, installation fails, the executable
/// cannot be found, or it exits unsuccessfully.
pub fn smoke_test(
    ctx: &Context,
    installer: &dyn Installer,
    version_glob: &str,
    args: &[String],
) -> Result<SmokeReport> {
    let wheel = find_wheel(ctx, version_glob, Platform::host())?;
    let exe_name = &ctx.config.executable.name;
    let args = if args.is_empty() {
        ctx.config.executable.test_args.as_slice()
    } else {
        args
    };

    // Outside CI pip runs from a scratch directory so the project tree
    // cannot shadow the installed package.
    let scratch = if ctx.ci {
        None
    } else {
        std::fs::create_dir_all(ctx.layout.build_root())?;
        Some(
            tempfile::Builder::new()
                .prefix("smoke-")
                .tempdir_in(ctx.layout.build_root())?,
        )
    };
    let workdir = scratch
        .as_ref()
        .map_or_else(|| ctx.layout.root(), |d| d.path());

    info!(wheel = %ctx.layout.display(&wheel), "Installing");
    installer.install(&wheel, workdir)?;

    let location = which::which(exe_name)
        .map_err(|e| Error::external(exe_name.as_str(), format!("not found on PATH: {e}")))?;
    let output = Command::new(&location)
        .args(args)
        .current_dir(workdir)
        .output()
        .map_err(|e| Error::external(exe_name.as_str(), e.to_string()))?;
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    if !output.status.success() {
        return Err(Error::external(
            exe_name.as_str(),
            format!("exited with {}: {}", output.status, combined.trim()),
        ));
    }

    if !ctx.ci {
        installer.uninstall(&wheel, workdir)?;
    }

    Ok(SmokeReport {
        wheel,
        location,
        output: combined.trim_end().to_string(),
    })
}
