//! Staging of cached executables under their wheel platform tags.

use crate::cache::LICENSE_FILE;
use crate::context::Context;
use crate::error::Result;
use crate::layout::{file_name, files_with_prefix, glob_in, prepare_dir};
use crate::platform::Platform;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// A staged build tag: license plus executables renamed to their wheel tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBuild {
    /// Release tag.
    pub tag: String,
    /// The staging directory.
    pub dir: PathBuf,
    /// Staged executables and their platforms, in cache order.
    pub executables: Vec<(Platform, PathBuf)>,
}

/// Stages every cached tag matching `tag_glob`.
///
/// A tag whose staging directory already exists is skipped entirely.
/// Executables with an unrecognised platform are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the glob is invalid or a copy fails.
pub fn build(ctx: &Context, tag_glob: &str, clean: bool) -> Result<Vec<StagedBuild>> {
    let layout = &ctx.layout;
    prepare_dir(layout.build_root(), clean)?;
    if !layout.cache_root().is_dir() {
        debug!(path = %layout.display(layout.cache_root()), "Nothing cached yet");
        return Ok(Vec::new());
    }

    let exe_prefix = format!("{}-", ctx.config.executable.name);
    let mut staged = Vec::new();
    for cache_dir in glob_in(layout.cache_root(), tag_glob)? {
        let Some(tag) = file_name(&cache_dir).map(str::to_string) else {
            continue;
        };
        if !cache_dir.is_dir() {
            debug!(path = %layout.display(&cache_dir), "Ignoring non-directory");
            continue;
        }

        let dir = layout.build_dir(&tag);
        match std::fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(%tag, "Already staged");
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        std::fs::copy(cache_dir.join(LICENSE_FILE), dir.join(LICENSE_FILE))?;

        let mut executables = Vec::new();
        for source in files_with_prefix(&cache_dir, &exe_prefix)? {
            let name = file_name(&source).unwrap_or_default();
            let platform = Platform::from_asset_name(&ctx.config.executable.name, name);
            let Some(wheel_tag) = platform.wheel_tag() else {
                warn!(%tag, file = name, "Unknown platform, skipping");
                continue;
            };
            let target = dir.join(&wheel_tag);
            std::fs::copy(&source, &target)?;
            debug!(file = name, %wheel_tag, "Staged");
            executables.push((platform, target));
        }

        info!(%tag, count = executables.len(), path = %layout.display(&dir), "Staged build");
        staged.push(StagedBuild {
            tag,
            dir,
            executables,
        });
    }
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedistConfig;
    use std::path::Path;
    use tempfile::TempDir;

    fn seed_cache(ctx: &Context, tag: &str, files: &[&str]) {
        let dir = ctx.layout.cache_dir(tag);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(LICENSE_FILE), "license").unwrap();
        for file in files {
            std::fs::write(dir.join(file), *file).unwrap();
        }
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_build_renames_to_wheel_tags() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        seed_cache(
            &ctx,
            "v1.2.3",
            &["buf-Linux-x86_64", "buf-Darwin-arm64", "buf-Windows-x86_64.exe"],
        );

        let staged = build(&ctx, "*", false).unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].tag, "v1.2.3");
        assert_eq!(staged[0].executables.len(), 3);
        assert_eq!(
            listing(&ctx.layout.build_dir("v1.2.3")),
            vec![
                "LICENSE",
                "py2.py3-none-macosx_11_0_arm64",
                "py2.py3-none-manylinux_2_5_x86_64.manylinux1_x86_64",
                "py2.py3-none-win_amd64",
            ]
        );
        assert_eq!(
            std::fs::read_to_string(ctx.layout.build_dir("v1.2.3").join("py2.py3-none-win_amd64"))
                .unwrap(),
            "buf-Windows-x86_64.exe"
        );
    }

    #[test]
    fn test_build_skips_unknown_platforms() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        seed_cache(&ctx, "v1.0.0", &["buf-FreeBSD-x86_64", "buf-Linux-aarch64"]);

        let staged = build(&ctx, "v1.0.0", false).unwrap();
        assert_eq!(staged[0].executables.len(), 1);
        assert_eq!(staged[0].executables[0].0, Platform::LinuxAarch64);
    }

    #[test]
    fn test_build_skips_existing_tag() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        seed_cache(&ctx, "v1.0.0", &["buf-Linux-x86_64"]);

        assert_eq!(build(&ctx, "*", false).unwrap().len(), 1);
        let before = listing(&ctx.layout.build_dir("v1.0.0"));

        std::fs::write(ctx.layout.cache_dir("v1.0.0").join("buf-Linux-aarch64"), "x").unwrap();
        assert!(build(&ctx, "*", false).unwrap().is_empty());
        assert_eq!(listing(&ctx.layout.build_dir("v1.0.0")), before);

        let rebuilt = build(&ctx, "*", true).unwrap();
        assert_eq!(rebuilt[0].executables.len(), 2);
    }

    #[test]
    fn test_build_honours_glob() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        seed_cache(&ctx, "v1.0.0", &["buf-Linux-x86_64"]);
        seed_cache(&ctx, "v2.0.0", &["buf-Linux-x86_64"]);

        let staged = build(&ctx, "v2.*", false).unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].tag, "v2.0.0");
        assert!(!ctx.layout.build_dir("v1.0.0").exists());
    }

    #[test]
    fn test_build_without_cache() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        assert!(build(&ctx, "*", false).unwrap().is_empty());
    }
}
