//! Redistribution configuration types.
//!
//! A project describes the executable it repackages in an optional
//! `redist.toml` at its root. Every field has a default, so an absent file
//! yields the stock `buf` → `buf-exe` redistribution.

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name of the optional project configuration.
pub const CONFIG_FILE: &str = "redist.toml";

/// Environment variables consulted for the hosting-service token, in order.
pub const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Complete redistribution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedistConfig {
    /// The upstream executable.
    pub executable: ExecutableConfig,
    /// The downstream package.
    pub package: PackageConfig,
    /// Downstream repository that mirrors the releases (`owner/name`).
    pub origin: String,
    /// Upstream repository publishing the executables (`owner/name`).
    pub upstream: String,
    /// Base URL of the hosting-service REST API.
    #[serde(rename = "apiUrl")]
    pub api_url: String,
    /// Base URL serving raw repository files.
    #[serde(rename = "rawUrl")]
    pub raw_url: String,
}

impl Default for RedistConfig {
    fn default() -> Self {
        Self {
            executable: ExecutableConfig::default(),
            package: PackageConfig::default(),
            origin: "fleshgrinder/python-buf-exe".to_string(),
            upstream: "bufbuild/buf".to_string(),
            api_url: "https://api.github.com".to_string(),
            raw_url: "https://raw.githubusercontent.com".to_string(),
        }
    }
}

impl RedistConfig {
    /// Loads `redist.toml` from `root`, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::config(
                format!("Failed to read {}: {e}", path.display()),
                "Check that the configuration file is readable",
            )
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Web URL of the origin repository.
    #[must_use]
    pub fn origin_url(&self) -> String {
        format!("https://github.com/{}", self.origin)
    }

    /// Web URL of the upstream repository.
    #[must_use]
    pub fn upstream_url(&self) -> String {
        format!("https://github.com/{}", self.upstream)
    }

    /// Distribution name used in wheel file names (`buf-exe` → `buf_exe`).
    #[must_use]
    pub fn dist_name(&self) -> String {
        self.package.name.replace('-', "_")
    }

    /// URL of the license file for an upstream tag.
    #[must_use]
    pub fn license_url(&self, tag: &str) -> String {
        format!("{}/{}/{}/LICENSE", self.raw_url, self.upstream, tag)
    }

    /// Human facing URL of an upstream release.
    #[must_use]
    pub fn release_url(&self, tag: &str) -> String {
        format!("{}/releases/tag/{}", self.upstream_url(), tag)
    }
}

/// The executable being redistributed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutableConfig {
    /// Executable name; also the asset name prefix (`buf-Linux-x86_64`).
    pub name: String,
    /// Arguments used for the post-install smoke invocation.
    #[serde(rename = "testArgs")]
    pub test_args: Vec<String>,
}

impl Default for ExecutableConfig {
    fn default() -> Self {
        Self {
            name: "buf".to_string(),
            test_args: vec!["--version".to_string()],
        }
    }
}

/// Package index metadata for the generated wheels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Package name on the index.
    pub name: String,
    /// One line summary.
    pub summary: String,
    /// Path (relative to the project root) of the long description.
    #[serde(rename = "descriptionPath")]
    pub description_path: PathBuf,
    /// Media type of the long description.
    #[serde(rename = "descriptionContentType")]
    pub description_content_type: String,
    /// Author of the redistributed software.
    pub author: String,
    /// Maintainer of the redistribution.
    pub maintainer: String,
    /// Maintainer contact address.
    #[serde(rename = "maintainerEmail")]
    pub maintainer_email: String,
    /// SPDX license expression.
    pub license: String,
    /// Name of the license file inside the wheel.
    #[serde(rename = "licenseFile")]
    pub license_file: String,
    /// Trove classifiers.
    pub classifiers: Vec<String>,
    /// `label, url` project links.
    #[serde(rename = "projectUrls")]
    pub project_urls: Vec<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: "buf-exe".to_string(),
            summary: "PyPI packaged Buf CLI".to_string(),
            description_path: PathBuf::from("README.md"),
            description_content_type: "text/markdown".to_string(),
            author: "Buf Technologies".to_string(),
            maintainer: "Fleshgrinder".to_string(),
            maintainer_email: "pypi@fleshgrinder.com".to_string(),
            license: "Apache-2.0".to_string(),
            license_file: "LICENSE".to_string(),
            classifiers: vec![
                "Topic :: Software Development :: Code Generators".to_string(),
                "Topic :: Software Development :: Quality Assurance".to_string(),
                "Topic :: Text Processing :: Markup".to_string(),
                "Topic :: Utilities".to_string(),
                "License :: OSI Approved :: Apache Software License".to_string(),
            ],
            project_urls: vec![
                "Official Website, https://buf.build/".to_string(),
                "Source Code, https://github.com/bufbuild/buf".to_string(),
                "Issue Tracker, https://github.com/bufbuild/buf/issues".to_string(),
            ],
        }
    }
}

/// Hosting-service credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    token: SecretString,
}

impl Credentials {
    /// Wraps an explicit token.
    #[must_use]
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }

    /// Reads the token from `GITHUB_TOKEN`, falling back to `GH_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when neither variable is set.
    pub fn from_env() -> Result<Self> {
        TOKEN_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
            .map(Self::from_token)
            .ok_or_else(|| {
                Error::config(
                    "Missing required GITHUB_TOKEN or GH_TOKEN environment variable",
                    "Export GITHUB_TOKEN (or GH_TOKEN) containing a valid GitHub API token",
                )
            })
    }

    /// Returns the raw token.
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}
