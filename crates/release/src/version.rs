//! Version derivation for assembled wheels.
//!
//! Upstream tags (`v1.2.3`) are turned into package index versions by
//! stripping the leading `v`, optionally appending a development suffix
//! derived from the latest commit time, and normalising the result following
//! PEP 440.

use crate::error::{Error, Result};
use chrono::DateTime;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

const PATTERN: &str = r"(?xi)
    ^\s*
    v?
    (?:(?P<epoch>[0-9]+)!)?
    (?P<release>[0-9]+(?:\.[0-9]+)*)
    (?P<pre>
        [-_.]?
        (?P<pre_l>alpha|beta|preview|pre|rc|a|b|c)
        [-_.]?
        (?P<pre_n>[0-9]+)?
    )?
    (?P<post>
        (?:-(?P<post_n1>[0-9]+))
        |
        (?:
            [-_.]?
            (?P<post_l>post|rev|r)
            [-_.]?
            (?P<post_n2>[0-9]+)?
        )
    )?
    (?P<dev>
        [-_.]?
        dev
        [-_.]?
        (?P<dev_n>[0-9]+)?
    )?
    (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
    \s*$
";

#[allow(clippy::expect_used)]
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PATTERN).expect("version pattern compiles"));

/// Pre-release phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreRelease {
    /// `a`, `alpha`
    Alpha,
    /// `b`, `beta`
    Beta,
    /// `rc`, `c`, `pre`, `preview`
    ReleaseCandidate,
}

impl PreRelease {
    fn parse(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "a" | "alpha" => Self::Alpha,
            "b" | "beta" => Self::Beta,
            _ => Self::ReleaseCandidate,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::ReleaseCandidate => "rc",
        }
    }
}

/// Decimal digits with leading zeros removed (`"007"` → `"7"`).
///
/// Components are kept as text, so arbitrarily large numbers survive.
fn canonical_number(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A PEP 440 version in canonical form.
///
/// Numeric components are canonical decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    /// Epoch, `0` when absent.
    pub epoch: String,
    /// Release segment (e.g., `["1", "2", "3"]`).
    pub release: Vec<String>,
    /// Pre-release phase and number.
    pub pre: Option<(PreRelease, String)>,
    /// Post-release number.
    pub post: Option<String>,
    /// Development release number.
    pub dev: Option<String>,
    /// Local version label, normalised to dot separators.
    pub local: Option<String>,
}

impl Version {
    /// Parses and normalises a version string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] when the string does not conform.
    pub fn parse(input: &str) -> Result<Self> {
        let caps = VERSION_RE
            .captures(input)
            .ok_or_else(|| Error::invalid_version(input))?;
        let number = |name: &str| caps.name(name).map(|m| canonical_number(m.as_str()));
        let zero = || "0".to_string();

        let release = caps
            .name("release")
            .map(|m| m.as_str())
            .unwrap_or_default()
            .split('.')
            .map(canonical_number)
            .collect();

        let pre = caps.name("pre_l").map(|label| {
            (
                PreRelease::parse(label.as_str()),
                number("pre_n").unwrap_or_else(zero),
            )
        });
        let post = caps.name("post").map(|_| {
            number("post_n1")
                .or_else(|| number("post_n2"))
                .unwrap_or_else(zero)
        });
        let dev = caps
            .name("dev")
            .map(|_| number("dev_n").unwrap_or_else(zero));

        let local = caps
            .name("local")
            .map(|m| m.as_str().to_ascii_lowercase().replace(['-', '_'], "."));

        Ok(Self {
            epoch: number("epoch").unwrap_or_else(zero),
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    /// Whether this is a development release.
    #[must_use]
    pub const fn is_dev(&self) -> bool {
        self.dev.is_some()
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != "0" {
            write!(f, "{}!", self.epoch)?;
        }
        write!(f, "{}", self.release.join("."))?;
        if let Some((phase, n)) = &self.pre {
            write!(f, "{}{n}", phase.as_str())?;
        }
        if let Some(n) = &self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = &self.dev {
            write!(f, ".dev{n}")?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{local}")?;
        }
        Ok(())
    }
}

/// Optional qualifier appended to the tag-derived version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionSuffix {
    /// Plain release version.
    #[default]
    Release,
    /// Development build stamped with a commit time (seconds since epoch).
    Development {
        /// Commit timestamp in seconds since the Unix epoch, UTC.
        commit_time: i64,
    },
}

impl VersionSuffix {
    /// Renders the suffix (`""` or `.devYYYYMMDDHHMMSS`).
    ///
    /// # Errors
    ///
    /// Returns an error if the commit time is outside the representable range.
    pub fn render(self) -> Result<String> {
        match self {
            Self::Release => Ok(String::new()),
            Self::Development { commit_time } => {
                let time = DateTime::from_timestamp(commit_time, 0).ok_or_else(|| {
                    Error::invalid_version(format!("commit time {commit_time} out of range"))
                })?;
                Ok(format!(".dev{}", time.format("%Y%m%d%H%M%S")))
            }
        }
    }
}

/// Derives the normalised version of a release tag.
///
/// # Errors
///
/// Returns [`Error::InvalidVersion`] if the resulting string is not PEP 440.
pub fn derive(tag: &str, suffix: VersionSuffix) -> Result<Version> {
    let stem = tag.strip_prefix(['v', 'V']).unwrap_or(tag);
    Version::parse(&format!("{stem}{}", suffix.render()?))
}
