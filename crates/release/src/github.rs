//! GitHub Releases client.
//!
//! Provides the [`ReleaseApi`] seam used by the download and sync steps, the
//! blocking [`GitHubClient`] implementation, and [`fetch_releases`], a lazy
//! iterator over every published release of a repository.

use crate::config::{Credentials, RedistConfig};
use crate::error::{Error, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, LINK};
use serde::Deserialize;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use tracing::{debug, trace};

/// Number of releases requested per listing page.
pub const PAGE_SIZE: usize = 100;

/// Value of the `X-GitHub-Api-Version` header.
pub const API_VERSION: &str = "2022-11-28";

/// Chunk size used when streaming downloads to disk.
const CHUNK_SIZE: usize = 8192;

/// A release asset.
///
/// Equality and hashing consider the identifier only.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    /// Unique asset identifier.
    pub id: u64,
    /// Direct download URL.
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    /// File name (e.g., `buf-Linux-x86_64`).
    pub name: String,
    /// Media type reported by the service.
    #[serde(default)]
    pub content_type: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Asset {}

impl Hash for Asset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A tagged release and the assets attached to it.
///
/// Equality and hashing consider the identifier only, so releases seen on
/// more than one listing page collapse in a set.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Unique release identifier.
    pub id: u64,
    /// API URL of the release.
    #[serde(default)]
    pub url: String,
    /// Git tag (e.g., `v1.2.3`).
    pub tag_name: String,
    /// Unpublished draft.
    #[serde(default)]
    pub draft: bool,
    /// Marked as prerelease.
    #[serde(default)]
    pub prerelease: bool,
    /// Attached assets, in service order.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    /// Neither a draft nor a prerelease.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        !self.draft && !self.prerelease
    }
}

impl PartialEq for Release {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Release {}

impl Hash for Release {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One page of the release listing.
#[derive(Debug, Clone, Default)]
pub struct ReleasePage {
    /// Releases on this page, unfiltered.
    pub releases: Vec<Release>,
    /// URL of the following page, if any.
    pub next: Option<String>,
}

/// Operations the pipeline needs from the hosting service.
pub trait ReleaseApi {
    /// Base URL of the REST API (no trailing slash).
    fn api_url(&self) -> &str;

    /// Looks up a single release by tag, or the newest one for `latest`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    fn release(&self, repo: &str, selector: &str) -> Result<Release>;

    /// Fetches one page of the release listing.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    fn releases_page(&self, url: &str) -> Result<ReleasePage>;

    /// Streams the body at `url` into `sink`, returning the byte count.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// failed write.
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}

/// Blocking client for the GitHub REST API.
pub struct GitHubClient {
    http: Client,
    credentials: Credentials,
    api_url: String,
}

impl GitHubClient {
    /// Creates a client authenticated with `credentials`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("redist/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::network("<client>", e.to_string()))?;
        Ok(Self {
            http,
            credentials,
            api_url: "https://api.github.com".to_string(),
        })
    }

    /// Creates a client for the API configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn from_config(config: &RedistConfig, credentials: Credentials) -> Result<Self> {
        Ok(Self::new(credentials)?.with_api_url(&config.api_url))
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .bearer_auth(self.credentials.token())
    }

    fn send(&self, url: &str) -> Result<Response> {
        trace!(%url, "GET");
        let response = self
            .get(url)
            .send()
            .map_err(|e| Error::network(url, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(url, status.as_u16()));
        }
        Ok(response)
    }
}

impl ReleaseApi for GitHubClient {
    fn api_url(&self) -> &str {
        &self.api_url
    }

    fn release(&self, repo: &str, selector: &str) -> Result<Release> {
        let url = release_url(&self.api_url, repo, selector);
        debug!(%url, "Fetching release");
        self.send(&url)?
            .json()
            .map_err(|e| Error::network(url, format!("Failed to parse release: {e}")))
    }

    fn releases_page(&self, url: &str) -> Result<ReleasePage> {
        debug!(%url, "Fetching release page");
        let response = self.send(url)?;
        let next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_link);
        let releases = response
            .json()
            .map_err(|e| Error::network(url, format!("Failed to parse releases: {e}")))?;
        Ok(ReleasePage { releases, next })
    }

    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let mut response = self.send(url)?;
        let mut buffer = [0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|e| Error::network(url, e.to_string()))?;
            if read == 0 {
                break;
            }
            sink.write_all(&buffer[..read])?;
            total += read as u64;
        }
        sink.flush()?;
        Ok(total)
    }
}

/// URL of a single release: `latest` or `tags/<tag>`.
#[must_use]
pub fn release_url(api_url: &str, repo: &str, selector: &str) -> String {
    if selector == "latest" {
        format!("{api_url}/repos/{repo}/releases/latest")
    } else {
        format!("{api_url}/repos/{repo}/releases/tags/{selector}")
    }
}

/// URL of the first release listing page.
#[must_use]
pub fn releases_url(api_url: &str, repo: &str) -> String {
    format!("{api_url}/repos/{repo}/releases?per_page={PAGE_SIZE}")
}

/// Extracts the `rel="next"` target from an RFC 8288 `Link` header.
#[must_use]
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        if is_next {
            target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .map(str::to_string)
        } else {
            None
        }
    })
}

/// Lazily walks every page of a repository's release listing.
///
/// Each page costs one round-trip and is only fetched once the previous
/// one has been consumed. Drafts and prereleases are skipped. After an error
/// the iterator is exhausted; walk again from the start to retry.
pub struct Releases<'a, A: ReleaseApi + ?Sized> {
    api: &'a A,
    next: Option<String>,
    buffer: std::vec::IntoIter<Release>,
}

impl<A: ReleaseApi + ?Sized> Iterator for Releases<'_, A> {
    type Item = Result<Release>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(release) = self.buffer.next() {
                if release.is_published() {
                    return Some(Ok(release));
                }
                trace!(tag = %release.tag_name, "Skipping unpublished release");
                continue;
            }

            let url = self.next.take()?;
            match self.api.releases_page(&url) {
                Ok(page) => {
                    self.buffer = page.releases.into_iter();
                    self.next = page.next;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Iterates the published releases of `repo`.
pub fn fetch_releases<'a, A: ReleaseApi + ?Sized>(api: &'a A, repo: &str) -> Releases<'a, A> {
    Releases {
        next: Some(releases_url(api.api_url(), repo)),
        api,
        buffer: Vec::new().into_iter(),
    }
}


#[cfg(test)]
mod tests {
    use super::fake::{FakeApi, release};
    use super::*;
    use std::collections::HashSet;

    fn first_page(repo: &str) -> String {
        releases_url("https://api.test", repo)
    }

    #[test]
    fn test_release_url() {
        assert_eq!(
            release_url("https://api.github.com", "bufbuild/buf", "latest"),
            "https://api.github.com/repos/bufbuild/buf/releases/latest"
        );
        assert_eq!(
            release_url("https://api.github.com", "bufbuild/buf", "v1.2.3"),
            "https://api.github.com/repos/bufbuild/buf/releases/tags/v1.2.3"
        );
        assert_eq!(
            releases_url("https://api.github.com", "bufbuild/buf"),
            "https://api.github.com/repos/bufbuild/buf/releases?per_page=100"
        );
    }

    #[test]
    fn test_next_link() {
        let header = r#"<https://api.github.com/repositories/1/releases?per_page=100&page=2>; rel="next", <https://api.github.com/repositories/1/releases?per_page=100&page=5>; rel="last""#;
        assert_eq!(
            next_link(header).as_deref(),
            Some("https://api.github.com/repositories/1/releases?per_page=100&page=2")
        );

        let last_page = r#"<https://api.github.com/x?page=1>; rel="prev", <https://api.github.com/x?page=1>; rel="first""#;
        assert_eq!(next_link(last_page), None);
        assert_eq!(next_link(""), None);
    }

    #[test]
    fn test_release_deserialize_ignores_unknown_fields() {
        let json = r#"{
            "id": 42,
            "url": "https://api.github.com/repos/bufbuild/buf/releases/42",
            "tag_name": "v1.2.3",
            "name": "v1.2.3",
            "draft": false,
            "prerelease": false,
            "assets": [{
                "id": 7,
                "name": "buf-Linux-x86_64",
                "content_type": "application/octet-stream",
                "size": 1024,
                "browser_download_url": "https://github.com/bufbuild/buf/releases/download/v1.2.3/buf-Linux-x86_64",
                "uploader": {"login": "someone"}
            }]
        }"#;
        let release: Release = serde_json::from_str(json).unwrap();
        assert_eq!(release.id, 42);
        assert_eq!(release.tag_name, "v1.2.3");
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].name, "buf-Linux-x86_64");
        assert_eq!(release.assets[0].size, 1024);
        assert!(release.assets[0].download_url.ends_with("/buf-Linux-x86_64"));
    }

    #[test]
    fn test_release_identity() {
        let a = release(1, "v1.0.0", false, false);
        let mut b = release(1, "v1.0.0-renamed", false, false);
        b.assets.clear();
        assert_eq!(a, b);

        let set: HashSet<Release> = [a, b, release(2, "v2.0.0", false, false)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_fetch_filters_drafts_and_prereleases() {
        let mut api = FakeApi::default();
        api.pages.insert(
            first_page("a/b"),
            ReleasePage {
                releases: vec![
                    release(1, "v1.0.0", false, false),
                    release(2, "v1.1.0-draft", true, false),
                    release(3, "v1.1.0-rc1", false, true),
                    release(4, "v1.1.0", false, false),
                ],
                next: None,
            },
        );

        let tags: Vec<String> = fetch_releases(&api, "a/b")
            .map(|r| r.unwrap().tag_name)
            .collect();
        assert_eq!(tags, vec!["v1.0.0", "v1.1.0"]);
    }

    #[test]
    fn test_fetch_follows_next_links_and_dedups() {
        let mut api = FakeApi::default();
        api.pages.insert(
            first_page("a/b"),
            ReleasePage {
                releases: vec![release(1, "v1", false, false), release(2, "v2", false, false)],
                next: Some("https://api.test/page2".to_string()),
            },
        );
        api.pages.insert(
            "https://api.test/page2".to_string(),
            ReleasePage {
                releases: vec![release(2, "v2", false, false), release(3, "v3", false, false)],
                next: None,
            },
        );

        let all: Vec<Release> = fetch_releases(&api, "a/b").map(|r| r.unwrap()).collect();
        assert_eq!(all.len(), 4);

        let unique: HashSet<Release> = all.into_iter().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(api.requests().len(), 4);
    }

    #[test]
    fn test_fetch_is_lazy() {
        let mut api = FakeApi::default();
        api.pages.insert(
            first_page("a/b"),
            ReleasePage {
                releases: vec![release(1, "v1", false, false)],
                next: Some("https://api.test/page2".to_string()),
            },
        );

        let mut releases = fetch_releases(&api, "a/b");
        assert!(api.requests().is_empty());
        assert_eq!(releases.next().unwrap().unwrap().id, 1);
        assert_eq!(api.requests().len(), 1);
    }

    #[test]
    fn test_fetch_propagates_errors_and_stops() {
        let mut api = FakeApi::default();
        api.pages.insert(
            first_page("a/b"),
            ReleasePage {
                releases: vec![release(1, "v1", false, false)],
                next: Some("https://api.test/missing".to_string()),
            },
        );

        let mut releases = fetch_releases(&api, "a/b");
        assert!(releases.next().unwrap().is_ok());
        assert!(matches!(
            releases.next().unwrap().unwrap_err(),
            Error::Http { status: 500, .. }
        ));
        assert!(releases.next().is_none());
    }

    #[test]
    fn test_collect_into_result_set() {
        let mut api = FakeApi::default();
        api.pages.insert(first_page("a/b"), ReleasePage::default());
        let set: Result<HashSet<Release>> = fetch_releases(&api, "a/b").collect();
        assert!(set.unwrap().is_empty());
    }
}
