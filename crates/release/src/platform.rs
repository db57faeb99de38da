//! Mapping of upstream release asset names to wheel platform tags.
//!
//! Upstream executables are published as `<exe>-<os>-<arch>[.exe]`. The
//! `<os>-<arch>` key is looked up in a fixed table; anything not in the table
//! maps to [`Platform::Unknown`] so callers can warn and move on.

use std::fmt;

/// Prefix shared by every staged executable name and wheel platform tag.
///
/// The binaries carry no Python ABI dependency, so the interpreter and ABI
/// parts of the tag are universal while the platform part is specific.
pub const WHEEL_TAG_PREFIX: &str = "py2.py3-none-";

/// Destination platforms supported by the redistribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Linux ARM64/aarch64
    LinuxAarch64,
    /// Linux `x86_64`
    LinuxX86_64,
    /// macOS ARM64 (Apple Silicon)
    MacosArm64,
    /// macOS `x86_64`
    MacosX86_64,
    /// Windows ARM64
    WindowsArm64,
    /// Windows `x86_64`
    WindowsX86_64,
    /// Not present in the mapping table.
    Unknown,
}

impl Platform {
    /// Returns every known platform.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::LinuxAarch64,
            Self::LinuxX86_64,
            Self::MacosArm64,
            Self::MacosX86_64,
            Self::WindowsArm64,
            Self::WindowsX86_64,
        ]
    }

    /// Returns the upstream `<os>-<arch>` key for this platform.
    #[must_use]
    pub const fn upstream_key(&self) -> Option<&'static str> {
        match self {
            Self::LinuxAarch64 => Some("Linux-aarch64"),
            Self::LinuxX86_64 => Some("Linux-x86_64"),
            Self::MacosArm64 => Some("Darwin-arm64"),
            Self::MacosX86_64 => Some("Darwin-x86_64"),
            Self::WindowsArm64 => Some("Windows-arm64"),
            Self::WindowsX86_64 => Some("Windows-x86_64"),
            Self::Unknown => None,
        }
    }

    /// Returns the package index platform tag (e.g., `win_amd64`).
    #[must_use]
    pub const fn platform_tag(&self) -> Option<&'static str> {
        match self {
            Self::LinuxAarch64 => Some("manylinux_2_17_aarch64.manylinux2014_aarch64"),
            Self::LinuxX86_64 => Some("manylinux_2_5_x86_64.manylinux1_x86_64"),
            Self::MacosArm64 => Some("macosx_11_0_arm64"),
            Self::MacosX86_64 => Some("macosx_10_4_x86_64"),
            Self::WindowsArm64 => Some("win_arm64"),
            Self::WindowsX86_64 => Some("win_amd64"),
            Self::Unknown => None,
        }
    }

    /// Returns the full wheel tag (`py2.py3-none-<platform tag>`).
    #[must_use]
    pub fn wheel_tag(&self) -> Option<String> {
        self.platform_tag()
            .map(|tag| format!("{WHEEL_TAG_PREFIX}{tag}"))
    }

    /// Whether executables for this platform carry an `.exe` suffix.
    #[must_use]
    pub const fn is_windows(&self) -> bool {
        matches!(self, Self::WindowsArm64 | Self::WindowsX86_64)
    }

    /// Looks up an `<os>-<arch>` key.
    #[must_use]
    pub fn from_upstream_key(key: &str) -> Self {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.upstream_key() == Some(key))
            .unwrap_or(Self::Unknown)
    }

    /// Maps a raw asset file name such as `buf-Linux-x86_64` or
    /// `buf-Windows-arm64.exe` to its platform.
    #[must_use]
    pub fn from_asset_name(exe_name: &str, file_name: &str) -> Self {
        let key = file_name
            .strip_prefix(exe_name)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(file_name);
        let key = key.strip_suffix(".exe").unwrap_or(key);
        Self::from_upstream_key(key)
    }

    /// Parses a staged file name or wheel tag (`py2.py3-none-win_amd64`).
    #[must_use]
    pub fn from_wheel_tag(tag: &str) -> Self {
        let tag = tag.strip_prefix(WHEEL_TAG_PREFIX).unwrap_or(tag);
        Self::all()
            .iter()
            .copied()
            .find(|p| p.platform_tag() == Some(tag))
            .unwrap_or(Self::Unknown)
    }

    /// Returns the platform of the running host, if it is a supported one.
    #[must_use]
    pub fn host() -> Self {
        match (std::env::consts::OS, std::env::consts::ARCH) {
            ("linux", "aarch64") => Self::LinuxAarch64,
            ("linux", "x86_64") => Self::LinuxX86_64,
            ("macos", "aarch64") => Self::MacosArm64,
            ("macos", "x86_64") => Self::MacosX86_64,
            ("windows", "aarch64") => Self::WindowsArm64,
            ("windows", "x86_64") => Self::WindowsX86_64,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.upstream_key().unwrap_or("unknown"))
    }
}
