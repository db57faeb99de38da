//! `Key: Value` metadata blocks embedded in wheels.
//!
//! Both the package `METADATA` and the `WHEEL` file use the same RFC 822 style
//! layout: header lines, a blank line, then an optional free-text payload.

use crate::config::RedistConfig;
use std::fmt::Write as _;

/// Value of the `Metadata-Version` header.
pub const METADATA_VERSION: &str = "2.1";

/// Value of the `Wheel-Version` header.
pub const WHEEL_VERSION: &str = "1.0";

/// Ordered headers with optional payload.
///
/// Multi-valued keys are stored as repeated entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    headers: Vec<(String, String)>,
    payload: Option<String>,
}

impl MetadataRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Appends one header per value.
    #[must_use]
    pub fn with_all<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        for value in values {
            self.headers.push((key.to_string(), value.into()));
        }
        self
    }

    /// Sets the free-text payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// First value of `key`, matched case-insensitively.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of `key` in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// The payload, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// Renders the block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.headers {
            let _ = writeln!(out, "{key}: {value}");
        }
        out.push('\n');
        if let Some(payload) = &self.payload {
            out.push_str(payload);
        }
        out
    }

    /// Parses a rendered block.
    ///
    /// Continuation lines (leading whitespace) are folded into the previous
    /// header. Lines without a colon end the header section.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut record = Self::new();
        let mut rest = "";
        let mut consumed = 0;

        for line in text.split_inclusive('\n') {
            consumed += line.len();
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                rest = &text[consumed..];
                break;
            }
            if trimmed.starts_with([' ', '\t']) {
                if let Some((_, value)) = record.headers.last_mut() {
                    value.push(' ');
                    value.push_str(trimmed.trim());
                }
                continue;
            }
            let Some((key, value)) = trimmed.split_once(':') else {
                rest = &text[consumed - line.len()..];
                break;
            };
            record.headers.push((key.trim().to_string(), value.trim().to_string()));
        }

        if !rest.is_empty() {
            record.payload = Some(rest.to_string());
        }
        record
    }
}

/// Builds the package `METADATA` block for one release.
///
/// Only `Version` and `Download-URL` vary per release.
#[must_use]
pub fn package_metadata(
    config: &RedistConfig,
    version: &str,
    tag: &str,
    description: &str,
) -> MetadataRecord {
    let package = &config.package;
    MetadataRecord::new()
        .with("Metadata-Version", METADATA_VERSION)
        .with("Name", package.name.as_str())
        .with("Summary", package.summary.as_str())
        .with(
            "Description-Content-Type",
            package.description_content_type.as_str(),
        )
        .with("Author", package.author.as_str())
        .with("Maintainer", package.maintainer.as_str())
        .with("Maintainer-email", package.maintainer_email.as_str())
        .with("Home-page", config.origin_url())
        .with("License-File", package.license_file.as_str())
        .with("License", package.license.as_str())
        .with_all("Classifier", package.classifiers.iter().map(String::as_str))
        .with_all("Project-URL", package.project_urls.iter().map(String::as_str))
        .with("Version", version)
        .with("Download-URL", config.release_url(tag))
        .with_payload(description)
}

/// Builds the `WHEEL` block for one platform tag.
#[must_use]
pub fn wheel_metadata(config: &RedistConfig, wheel_tag: &str) -> MetadataRecord {
    MetadataRecord::new()
        .with("Wheel-Version", WHEEL_VERSION)
        .with("Generator", config.origin_url())
        .with("Root-Is-Purelib", "false")
        .with("Tag", wheel_tag)
}
