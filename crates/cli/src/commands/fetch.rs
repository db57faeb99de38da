//! Commands talking to the hosting service: `download` and `sync`.

use crate::errors::CliResult;
use redist_release::{Context, Credentials, GitHubClient, Release, cache, sync};
use std::fmt::Write;

/// Builds an authenticated client. The token is resolved before any request.
fn client(ctx: &Context) -> CliResult<GitHubClient> {
    let credentials = Credentials::from_env()?;
    Ok(GitHubClient::from_config(&ctx.config, credentials)?)
}

/// Execute the `download` command.
///
/// # Errors
///
/// Returns an error if no token is configured or a request fails.
pub fn execute_download(ctx: &Context, tag: &str, clean: bool) -> CliResult<String> {
    let api = client(ctx)?;
    let artifact = cache::download(ctx, &api, tag, clean)?;

    let mut output = String::new();
    let _ = writeln!(output, "{}", ctx.layout.display(&artifact.dir));
    Ok(output)
}

fn format_release(release: &Release) -> String {
    let assets = release
        .assets
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{:>12}  {:<16} [{assets}]", release.id, release.tag_name)
}

/// Execute the `sync` command.
///
/// Prints the origin releases, then the upstream releases.
///
/// # Errors
///
/// Returns an error if no token is configured or a listing fails.
pub fn execute_sync(ctx: &Context) -> CliResult<String> {
    let api = client(ctx)?;
    let report = sync::sync(&ctx.config, &api)?;

    let mut output = String::new();
    for (repo, releases) in [
        (&ctx.config.origin, &report.origin),
        (&ctx.config.upstream, &report.upstream),
    ] {
        let _ = writeln!(output, "{repo} ({} releases)", releases.len());
        for release in releases {
            let _ = writeln!(output, "{}", format_release(release));
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CliError;
    use redist_release::{Asset, Error, RedistConfig};
    use tempfile::TempDir;

    #[test]
    fn test_missing_token_is_reported_before_network() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        temp_env::with_vars_unset(["GITHUB_TOKEN", "GH_TOKEN"], || {
            for result in [execute_download(&ctx, "latest", false), execute_sync(&ctx)] {
                assert!(matches!(
                    result.unwrap_err(),
                    CliError::Redist(Error::Config { .. })
                ));
            }
        });
        assert!(!ctx.layout.cache_root().exists());
    }

    #[test]
    fn test_format_release() {
        let release = Release {
            id: 42,
            url: String::new(),
            tag_name: "v1.2.3".to_string(),
            draft: false,
            prerelease: false,
            assets: vec![Asset {
                id: 1,
                download_url: String::new(),
                name: "buf-Linux-x86_64".to_string(),
                content_type: String::new(),
                size: 0,
            }],
        };
        let line = format_release(&release);
        assert!(line.contains("42"));
        assert!(line.contains("v1.2.3"));
        assert!(line.ends_with("[buf-Linux-x86_64]"));
    }
}
