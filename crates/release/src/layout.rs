//! Persistent directory layout.
//!
//! ```text
//! <root>/
//! ├── .cache/<exe>/<tag>/{LICENSE, <exe>-<os>-<arch>[.exe]}
//! ├── build/<exe>/<tag>/{LICENSE, py2.py3-none-<platform>}
//! └── dist/<version>/<dist>-<version>-py2.py3-none-<platform>.whl
//! ```

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolved locations of the cache, build and dist trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
    cache_root: PathBuf,
    build_root: PathBuf,
    dist_root: PathBuf,
}

impl Layout {
    /// Creates the layout for `exe_name` below `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, exe_name: &str) -> Self {
        let root = root.into();
        Self {
            cache_root: root.join(".cache").join(exe_name),
            build_root: root.join("build").join(exe_name),
            dist_root: root.join("dist"),
            root,
        }
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one subdirectory per downloaded tag.
    #[must_use]
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Directory holding one subdirectory per staged tag.
    #[must_use]
    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    /// Directory holding one subdirectory per assembled version.
    #[must_use]
    pub fn dist_root(&self) -> &Path {
        &self.dist_root
    }

    /// Cache directory of a release tag.
    #[must_use]
    pub fn cache_dir(&self, tag: &str) -> PathBuf {
        self.cache_root.join(tag)
    }

    /// Staging directory of a release tag.
    #[must_use]
    pub fn build_dir(&self, tag: &str) -> PathBuf {
        self.build_root.join(tag)
    }

    /// Output directory of a normalized version.
    #[must_use]
    pub fn dist_dir(&self, version: &str) -> PathBuf {
        self.dist_root.join(version)
    }

    /// Path relative to the project root, for log output.
    #[must_use]
    pub fn display<'a>(&self, path: &'a Path) -> std::path::Display<'a> {
        path.strip_prefix(&self.root).unwrap_or(path).display()
    }
}

/// Ensures `directory` exists, wiping it first when `clean` is set.
///
/// # Errors
///
/// Returns an error if the directory cannot be removed or created.
pub fn prepare_dir(directory: &Path, clean: bool) -> Result<()> {
    if clean && directory.exists() {
        debug!(path = %directory.display(), "Cleaning directory");
        std::fs::remove_dir_all(directory)?;
    }
    std::fs::create_dir_all(directory)?;
    Ok(())
}

/// Expands `pattern` relative to `base`, returning matches in sorted order.
///
/// The base path is escaped so only `pattern` is interpreted as a glob.
///
/// # Errors
///
/// Returns an error if the pattern is malformed or a match cannot be read.
pub fn glob_in(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&base.to_string_lossy());
    let full = format!("{escaped}/{pattern}");
    let entries = glob::glob(&full).map_err(|e| Error::glob(pattern, e.to_string()))?;

    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry.map_err(std::io::Error::from)?);
    }
    paths.sort();
    Ok(paths)
}

/// Lists regular files in `dir` whose name starts with `prefix`, sorted.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn files_with_prefix(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix));
        if !matches {
            continue;
        }
        if path.is_file() {
            files.push(path);
        } else {
            debug!(path = %path.display(), "Ignoring non-file");
        }
    }
    files.sort();
    Ok(files)
}

/// Name of the final path component as UTF-8.
#[must_use]
pub fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = Layout::new("/work", "buf");
        assert_eq!(layout.cache_dir("v1.0.0"), Path::new("/work/.cache/buf/v1.0.0"));
        assert_eq!(layout.build_dir("v1.0.0"), Path::new("/work/build/buf/v1.0.0"));
        assert_eq!(layout.dist_dir("1.0.0"), Path::new("/work/dist/1.0.0"));
        assert_eq!(
            layout.display(Path::new("/work/dist/1.0.0")).to_string(),
            "dist/1.0.0"
        );
    }

    #[test]
    fn test_prepare_dir_clean() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("build");
        std::fs::create_dir_all(dir.join("v1")).unwrap();

        prepare_dir(&dir, false).unwrap();
        assert!(dir.join("v1").exists());

        prepare_dir(&dir, true).unwrap();
        assert!(dir.exists());
        assert!(!dir.join("v1").exists());
    }

    #[test]
    fn test_glob_in_sorted() {
        let temp = TempDir::new().unwrap();
        for tag in ["v1.10.0", "v1.2.0", "v2.0.0"] {
            std::fs::create_dir(temp.path().join(tag)).unwrap();
        }

        let all = glob_in(temp.path(), "*").unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0] <= w[1]));

        let v1 = glob_in(temp.path(), "v1.*").unwrap();
        assert_eq!(v1.len(), 2);

        assert!(glob_in(temp.path(), "nothing").unwrap().is_empty());
    }

    #[test]
    fn test_glob_in_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            glob_in(temp.path(), "[").unwrap_err(),
            Error::Glob { .. }
        ));
    }

    #[test]
    fn test_files_with_prefix() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("buf-Linux-x86_64"), "a").unwrap();
        std::fs::write(temp.path().join("LICENSE"), "b").unwrap();
        std::fs::create_dir(temp.path().join("buf-dir")).unwrap();

        let files = files_with_prefix(temp.path(), "buf").unwrap();
        assert_eq!(files, vec![temp.path().join("buf-Linux-x86_64")]);
    }
}
