//! On-disk cache of upstream release artifacts, keyed by release tag.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::github::{Asset, ReleaseApi};
use crate::layout::{self, prepare_dir};
use regex::Regex;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Name of the license file in cache and build directories.
pub const LICENSE_FILE: &str = "LICENSE";

/// A downloaded release: license plus raw per-platform executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    /// Release tag the directory is keyed by.
    pub tag: String,
    /// The tag directory.
    pub dir: PathBuf,
    /// Raw executables present after the download, sorted.
    pub executables: Vec<PathBuf>,
}

impl CachedArtifact {
    /// Path of the cached license file.
    #[must_use]
    pub fn license(&self) -> PathBuf {
        self.dir.join(LICENSE_FILE)
    }
}

/// Matches raw executable asset names: `<exe>-<os>-<arch>[.exe]`.
///
/// # Errors
///
/// Returns an error if the executable name yields an invalid pattern.
pub fn asset_pattern(exe_name: &str) -> Result<Regex> {
    let pattern = format!(r"\A{}-[^.]+(?:\.exe)?\z", regex::escape(exe_name));
    Regex::new(&pattern).map_err(|e| Error::config(e.to_string(), "Check executable.name"))
}

/// Downloads the release selected by `selector` (`latest` or a tag) into the
/// cache, skipping files already present.
///
/// # Errors
///
/// Returns an error on the first failed request or write. Files completed
/// before the failure stay on disk.
pub fn download(
    ctx: &Context,
    api: &dyn ReleaseApi,
    selector: &str,
    clean: bool,
) -> Result<CachedArtifact> {
    let layout = &ctx.layout;
    prepare_dir(layout.cache_root(), clean)?;

    let release = api.release(&ctx.config.upstream, selector)?;
    let tag = release.tag_name.clone();
    let dir = layout.cache_dir(&tag);
    std::fs::create_dir_all(&dir)?;
    info!(%tag, path = %layout.display(&dir), "Downloading release");

    fetch_file(api, &ctx.config.license_url(&tag), &dir.join(LICENSE_FILE))?;

    let pattern = asset_pattern(&ctx.config.executable.name)?;
    let mut executables = Vec::new();
    for asset in &release.assets {
        if !pattern.is_match(&asset.name) {
            debug!(asset = %asset.name, "Ignoring asset");
            continue;
        }
        executables.push(fetch_asset(api, asset, &dir)?);
    }
    executables.sort();

    Ok(CachedArtifact {
        tag,
        dir,
        executables,
    })
}

fn fetch_asset(api: &dyn ReleaseApi, asset: &Asset, dir: &Path) -> Result<PathBuf> {
    let target = dir.join(&asset.name);
    fetch_file(api, &asset.download_url, &target)?;
    Ok(target)
}

/// Streams `url` into `target` unless it already exists.
///
/// The body lands in a temporary sibling and is renamed into place once
/// complete.
fn fetch_file(api: &dyn ReleaseApi, url: &str, target: &Path) -> Result<()> {
    if target.exists() {
        debug!(path = %target.display(), "Already downloaded");
        return Ok(());
    }
    let dir = target
        .parent()
        .ok_or_else(|| Error::config("Download target has no parent", "Check the project root"))?;

    let mut part = NamedTempFile::new_in(dir)?;
    let bytes = api.download(url, part.as_file_mut())?;
    part.persist(target).map_err(|e| e.error)?;
    info!(
        file = layout::file_name(target).unwrap_or_default(),
        bytes, "Downloaded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedistConfig;
    use crate::github::fake::{FakeApi, release};
    use tempfile::TempDir;

    const LICENSE_URL: &str = "https://raw.githubusercontent.com/bufbuild/buf/v1.2.3/LICENSE";

    fn asset(id: u64, name: &str) -> Asset {
        Asset {
            id,
            download_url: format!("https://downloads.test/{name}"),
            name: name.to_string(),
            content_type: "application/octet-stream".to_string(),
            size: 3,
        }
    }

    fn api_with_release() -> FakeApi {
        let mut api = FakeApi::default();
        let mut rel = release(1, "v1.2.3", false, false);
        rel.assets = vec![
            asset(10, "buf-Linux-x86_64"),
            asset(11, "buf-Windows-x86_64.exe"),
            asset(12, "buf-Linux-x86_64.tar.gz"),
            asset(13, "sha256.txt"),
            asset(14, "protoc-gen-buf-breaking-Linux-x86_64"),
        ];
        for a in &rel.assets {
            api.files.insert(a.download_url.clone(), a.name.as_bytes().to_vec());
        }
        api.files.insert(LICENSE_URL.to_string(), b"Apache".to_vec());
        api.releases
            .insert(("bufbuild/buf".to_string(), "latest".to_string()), rel.clone());
        api.releases
            .insert(("bufbuild/buf".to_string(), "v1.2.3".to_string()), rel);
        api
    }

    #[test]
    fn test_asset_pattern() {
        let pattern = asset_pattern("buf").unwrap();
        assert!(pattern.is_match("buf-Linux-x86_64"));
        assert!(pattern.is_match("buf-Windows-arm64.exe"));
        assert!(!pattern.is_match("buf-Linux-x86_64.tar.gz"));
        assert!(!pattern.is_match("buf-Linux-x86_64.exe.sig"));
        assert!(!pattern.is_match("protoc-gen-buf-Linux-x86_64"));
        assert!(!pattern.is_match("buf-"));
    }

    #[test]
    fn test_download_filters_assets() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        let api = api_with_release();

        let artifact = download(&ctx, &api, "latest", false).unwrap();
        assert_eq!(artifact.tag, "v1.2.3");
        assert_eq!(artifact.dir, temp.path().join(".cache/buf/v1.2.3"));
        assert_eq!(std::fs::read(artifact.license()).unwrap(), b"Apache");

        let names: Vec<_> = artifact
            .executables
            .iter()
            .map(|p| layout::file_name(p).unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["buf-Linux-x86_64", "buf-Windows-x86_64.exe"]);
        assert!(!artifact.dir.join("sha256.txt").exists());
        assert_eq!(std::fs::read_dir(&artifact.dir).unwrap().count(), 3);
    }

    #[test]
    fn test_download_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        let api = api_with_release();

        let first = download(&ctx, &api, "v1.2.3", false).unwrap();
        let requests_after_first = api.requests().len();
        let second = download(&ctx, &api, "v1.2.3", false).unwrap();

        assert_eq!(first, second);
        // Only the release lookup is repeated.
        assert_eq!(api.requests().len(), requests_after_first + 1);
    }

    #[test]
    fn test_download_resumes_after_partial_failure() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        let mut api = api_with_release();
        let windows = api
            .files
            .remove("https://downloads.test/buf-Windows-x86_64.exe")
            .unwrap();

        let err = download(&ctx, &api, "v1.2.3", false).unwrap_err();
        assert!(matches!(err, Error::Http { status: 404, .. }));
        let dir = ctx.layout.cache_dir("v1.2.3");
        assert!(dir.join("buf-Linux-x86_64").exists());
        assert!(!dir.join("buf-Windows-x86_64.exe").exists());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 2);

        api.files
            .insert("https://downloads.test/buf-Windows-x86_64.exe".to_string(), windows);
        let artifact = download(&ctx, &api, "v1.2.3", false).unwrap();
        assert_eq!(artifact.executables.len(), 2);
    }

    #[test]
    fn test_download_clean_removes_other_tags() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        let stale = ctx.layout.cache_dir("v0.1.0");
        std::fs::create_dir_all(&stale).unwrap();

        download(&ctx, &api_with_release(), "v1.2.3", true).unwrap();
        assert!(!stale.exists());
    }

    #[test]
    fn test_download_missing_release() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        let api = api_with_release();
        assert!(matches!(
            download(&ctx, &api, "v9.9.9", false).unwrap_err(),
            Error::Http { status: 404, .. }
        ));
    }
}
