//! Version control probes used by assembly and publishing.

use crate::error::{Error, Result};
use std::path::Path;
use std::process::Command;

/// Committer time of `HEAD`, in seconds since the Unix epoch.
///
/// # Errors
///
/// Returns an error if `root` is not a repository or has no commits.
pub fn latest_commit_time(root: &Path) -> Result<i64> {
    let repo =
        gix::open(root).map_err(|e| Error::git(format!("Failed to open repository: {e}")))?;
    let commit = repo
        .head_commit()
        .map_err(|e| Error::git(format!("Failed to get HEAD commit: {e}")))?;
    let time = commit
        .time()
        .map_err(|e| Error::git(format!("Failed to decode commit time: {e}")))?;
    Ok(time.seconds)
}

/// Whether the working tree below `root` has staged, unstaged or untracked
/// changes.
///
/// # Errors
///
/// Returns an error if `git status` cannot be run or fails.
pub fn has_uncommitted_changes(root: &Path) -> Result<bool> {
    let output = Command::new("git")
        .args(["status", "--porcelain=v1"])
        .current_dir(root)
        .output()
        .map_err(|e| Error::git(format!("Failed to run git status: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::git(format!("git status failed: {}", stderr.trim())));
    }
    Ok(!output.stdout.iter().all(u8::is_ascii_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git(path: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(path)
            .env("GIT_AUTHOR_DATE", "1700000000 +0000")
            .env("GIT_COMMITTER_DATE", "1700000000 +0000")
            .output()
            .unwrap()
            .status;
        assert!(status.success(), "git {args:?}");
    }

    fn init_repo() -> TempDir {
        let temp = TempDir::new().unwrap();
        git(temp.path(), &["init"]);
        git(temp.path(), &["config", "user.name", "Test User"]);
        git(temp.path(), &["config", "user.email", "test@example.com"]);
        std::fs::write(temp.path().join("README.md"), "# test\n").unwrap();
        git(temp.path(), &["add", "."]);
        git(temp.path(), &["commit", "--no-gpg-sign", "-m", "initial"]);
        temp
    }

    #[test]
    fn test_latest_commit_time() {
        let repo = init_repo();
        assert_eq!(latest_commit_time(repo.path()).unwrap(), 1_700_000_000);
    }

    #[test]
    fn test_latest_commit_time_outside_repository() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            latest_commit_time(temp.path()).unwrap_err(),
            Error::Git { .. }
        ));
    }

    #[test]
    fn test_uncommitted_changes() {
        let repo = init_repo();
        assert!(!has_uncommitted_changes(repo.path()).unwrap());

        std::fs::write(repo.path().join("new.txt"), "x").unwrap();
        assert!(has_uncommitted_changes(repo.path()).unwrap());
    }
}
