//! Reproducible wheel assembly.
//!
//! Every staged executable becomes one wheel with exactly four entries:
//!
//! ```text
//! <dist>-<version>.data/scripts/<exe>[.exe]   0755
//! <dist>-<version>.dist-info/LICENSE          0644
//! <dist>-<version>.dist-info/METADATA         0644
//! <dist>-<version>.dist-info/WHEEL            0644
//! ```
//!
//! Entry timestamps and the creator system are fixed, so identical inputs
//! always produce identical bytes.

use crate::cache::LICENSE_FILE;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::layout::{file_name, files_with_prefix, glob_in, prepare_dir};
use crate::metadata::{package_metadata, wheel_metadata};
use crate::platform::{Platform, WHEEL_TAG_PREFIX};
use crate::version::{self, Version, VersionSuffix};
use std::io::{Cursor, Seek, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File extension of assembled archives.
pub const WHEEL_EXTENSION: &str = "whl";

/// Permission bits of the executable entry.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Permission bits of every other entry.
pub const FILE_MODE: u32 = 0o644;

/// An assembled wheel on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistArchive {
    /// Normalised version.
    pub version: String,
    /// Full wheel tag (`py2.py3-none-<platform>`).
    pub wheel_tag: String,
    /// Location of the archive.
    pub path: PathBuf,
}

/// Zip writer that pins every mutable per-entry field.
///
/// Each entry is deflated, stamped 1980-01-01T00:00:00 and attributed to a
/// Unix creator, independent of the host and the wall clock.
pub struct ReproducibleZip<W: Write + Seek> {
    inner: ZipWriter<W>,
}

impl<W: Write + Seek> ReproducibleZip<W> {
    /// Wraps a seekable sink.
    pub fn new(sink: W) -> Self {
        Self {
            inner: ZipWriter::new(sink),
        }
    }

    /// Writes one regular-file entry with the given Unix permission bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    pub fn add(&mut self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(mode);
        self.inner.start_file(name, options)?;
        self.inner.write_all(data)?;
        Ok(())
    }

    /// Writes the central directory and returns the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the central directory cannot be written.
    pub fn finish(self) -> Result<W> {
        Ok(self.inner.finish()?)
    }
}

/// Inputs of a single wheel.
#[derive(Debug, Clone, Copy)]
pub struct WheelInput<'a> {
    /// Upstream release tag, used for the download URL.
    pub tag: &'a str,
    /// Normalised version.
    pub version: &'a str,
    /// Full wheel tag.
    pub wheel_tag: &'a str,
    /// Executable bytes.
    pub executable: &'a [u8],
    /// License bytes.
    pub license: &'a [u8],
    /// Long description.
    pub description: &'a str,
}

/// Wheel file name: `<dist>-<version>-<wheel tag>.whl`.
#[must_use]
pub fn wheel_file_name(dist_name: &str, version: &str, wheel_tag: &str) -> String {
    format!("{dist_name}-{version}-{wheel_tag}.{WHEEL_EXTENSION}")
}

/// Name of the executable inside the wheel.
#[must_use]
pub fn script_name(exe_name: &str, wheel_tag: &str) -> String {
    if wheel_tag.starts_with(&format!("{WHEEL_TAG_PREFIX}win")) {
        format!("{exe_name}.exe")
    } else {
        exe_name.to_string()
    }
}

/// Builds the bytes of one wheel.
///
/// # Errors
///
/// Returns an error if the archive cannot be written.
pub fn build_wheel(ctx: &Context, input: &WheelInput<'_>) -> Result<Vec<u8>> {
    let config = &ctx.config;
    let stem = format!("{}-{}", config.dist_name(), input.version);
    let dist_info = format!("{stem}.dist-info");
    let script = script_name(&config.executable.name, input.wheel_tag);

    let metadata = package_metadata(config, input.version, input.tag, input.description);
    let wheel = wheel_metadata(config, input.wheel_tag);

    let mut zip = ReproducibleZip::new(Cursor::new(Vec::new()));
    zip.add(
        &format!("{stem}.data/scripts/{script}"),
        input.executable,
        EXECUTABLE_MODE,
    )?;
    zip.add(&format!("{dist_info}/{LICENSE_FILE}"), input.license, FILE_MODE)?;
    zip.add(
        &format!("{dist_info}/METADATA"),
        metadata.render().as_bytes(),
        FILE_MODE,
    )?;
    zip.add(
        &format!("{dist_info}/WHEEL"),
        wheel.render().as_bytes(),
        FILE_MODE,
    )?;
    Ok(zip.finish()?.into_inner())
}

/// Assembles wheels for every staged tag matching `tag_glob`.
///
/// Existing wheels are left untouched.
///
/// # Errors
///
/// Returns an error if a tag is not a valid version, the description cannot
/// be read, or an archive cannot be written.
pub fn assemble(
    ctx: &Context,
    tag_glob: &str,
    suffix: VersionSuffix,
    clean: bool,
) -> Result<Vec<DistArchive>> {
    let layout = &ctx.layout;
    prepare_dir(layout.dist_root(), clean)?;
    if !layout.build_root().is_dir() {
        debug!(path = %layout.display(layout.build_root()), "Nothing staged yet");
        return Ok(Vec::new());
    }

    let description_path = layout.root().join(&ctx.config.package.description_path);
    let description = std::fs::read_to_string(&description_path).map_err(|e| {
        Error::config(
            format!("Failed to read {}: {e}", description_path.display()),
            "Set package.descriptionPath to the long description document",
        )
    })?;

    let mut assembled = Vec::new();
    for tag_dir in glob_in(layout.build_root(), tag_glob)? {
        if !tag_dir.is_dir() {
            debug!(path = %layout.display(&tag_dir), "Ignoring non-directory");
            continue;
        }
        let Some(tag) = file_name(&tag_dir) else {
            continue;
        };

        let version: Version = version::derive(tag, suffix)?;
        let version = version.to_string();
        let dist_dir = layout.dist_dir(&version);
        std::fs::create_dir_all(&dist_dir)?;
        let license = std::fs::read(tag_dir.join(LICENSE_FILE))?;

        for exe in files_with_prefix(&tag_dir, WHEEL_TAG_PREFIX)? {
            let Some(wheel_tag) = file_name(&exe) else {
                continue;
            };
            if Platform::from_wheel_tag(wheel_tag) == Platform::Unknown {
                warn!(%tag, %wheel_tag, "Unknown platform tag, skipping");
                continue;
            }
            let target = dist_dir.join(wheel_file_name(
                &ctx.config.dist_name(),
                &version,
                wheel_tag,
            ));
            if target.exists() {
                debug!(path = %layout.display(&target), "Already assembled");
                continue;
            }

            let executable = std::fs::read(&exe)?;
            let bytes = build_wheel(
                ctx,
                &WheelInput {
                    tag,
                    version: &version,
                    wheel_tag,
                    executable: &executable,
                    license: &license,
                    description: &description,
                },
            )
            .map_err(|e| match e {
                Error::Archive { message, .. } => Error::archive(message, Some(target.clone())),
                other => other,
            })?;

            let mut part = NamedTempFile::new_in(&dist_dir)?;
            part.write_all(&bytes)?;
            part.persist(&target).map_err(|e| e.error)?;
            info!(path = %layout.display(&target), "Assembled");

            assembled.push(DistArchive {
                version: version.clone(),
                wheel_tag: wheel_tag.to_string(),
                path: target,
            });
        }
    }
    Ok(assembled)
}
