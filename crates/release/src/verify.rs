//! Structural checks of assembled wheels.
//!
//! Every archive in every matching version directory is checked; a failing
//! archive never stops the others from being inspected.

use crate::context::Context;
use crate::error::Result;
use crate::layout::{file_name, glob_in};
use crate::metadata::MetadataRecord;
use crate::version::Version;
use crate::wheel::WHEEL_EXTENSION;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

/// Outcome of checking one archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// The archive.
    pub path: PathBuf,
    /// Violations that always fail the check.
    pub errors: Vec<String>,
    /// Violations that fail the check in strict mode.
    pub warnings: Vec<String>,
}

impl CheckReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Self::default()
        }
    }

    /// Whether the archive passed.
    #[must_use]
    pub fn passed(&self, strict: bool) -> bool {
        self.errors.is_empty() && !(strict && !self.warnings.is_empty())
    }
}

/// Outcome of a verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// One report per archive, in directory then file name order.
    pub checks: Vec<CheckReport>,
    /// Whether warnings count as failures.
    pub strict: bool,
}

impl VerifyReport {
    /// True when any archive failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.checks.iter().any(|c| !c.passed(self.strict))
    }

    /// Number of failed archives.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed(self.strict)).count()
    }
}

/// Checks every wheel below `dist/<version_glob>` in strict mode.
///
/// # Errors
///
/// Returns an error only if the glob is invalid or a directory cannot be
/// listed. Problems with individual archives are reported, not raised.
pub fn verify(ctx: &Context, version_glob: &str) -> Result<VerifyReport> {
    let layout = &ctx.layout;
    let mut report = VerifyReport {
        checks: Vec::new(),
        strict: true,
    };
    if !layout.dist_root().is_dir() {
        debug!(path = %layout.display(layout.dist_root()), "Nothing assembled yet");
        return Ok(report);
    }

    for version_dir in glob_in(layout.dist_root(), version_glob)? {
        if !version_dir.is_dir() {
            debug!(path = %layout.display(&version_dir), "Ignoring non-directory");
            continue;
        }
        debug!(path = %layout.display(&version_dir), "Checking");

        let mut wheels: Vec<PathBuf> = std::fs::read_dir(&version_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == WHEEL_EXTENSION))
            .collect();
        wheels.sort();

        for wheel in wheels {
            let check = check_wheel(&wheel);
            let shown = layout.display(&wheel);
            for message in &check.errors {
                error!(path = %shown, "{message}");
            }
            for message in &check.warnings {
                warn!(path = %shown, "{message}");
            }
            if check.passed(report.strict) {
                info!(path = %shown, "PASSED");
            } else {
                error!(path = %shown, "FAILED");
            }
            report.checks.push(check);
        }
    }
    Ok(report)
}

/// Parsed `<dist>-<version>-<python>-<abi>-<platform>.whl` file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelName {
    /// Distribution name.
    pub dist: String,
    /// Version as written.
    pub version: String,
    /// `<python>-<abi>-<platform>`.
    pub tag: String,
}

impl WheelName {
    /// Parses a wheel file name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(&format!(".{WHEEL_EXTENSION}"))?;
        let parts: Vec<&str> = stem.split('-').collect();
        // An optional build tag sits between version and python tag.
        let (dist, version, tag) = match parts.as_slice() {
            [dist, version, python, abi, platform]
            | [dist, version, _, python, abi, platform] => {
                (*dist, *version, format!("{python}-{abi}-{platform}"))
            }
            _ => return None,
        };
        let valid_dist = !dist.is_empty()
            && dist
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid_dist || tag.split('-').any(str::is_empty) {
            return None;
        }
        Some(Self {
            dist: dist.to_string(),
            version: version.to_string(),
            tag,
        })
    }
}

fn normalize_name(name: &str) -> String {
    name.to_ascii_lowercase().replace(['-', '.'], "_")
}

/// Checks a single wheel. Never fails; every problem becomes a finding.
#[must_use]
pub fn check_wheel(path: &Path) -> CheckReport {
    let mut report = CheckReport::new(path);

    let name = file_name(path).and_then(WheelName::parse);
    if name.is_none() {
        report
            .errors
            .push("File name does not follow <dist>-<version>-<tag>.whl".to_string());
    }
    if let Some(name) = &name
        && Version::parse(&name.version).is_err()
    {
        report
            .errors
            .push(format!("File name version '{}' is not valid", name.version));
    }

    let mut archive = match File::open(path)
        .map_err(|e| e.to_string())
        .and_then(|f| ZipArchive::new(f).map_err(|e| e.to_string()))
    {
        Ok(archive) => archive,
        Err(e) => {
            report.errors.push(format!("Not a readable archive: {e}"));
            return report;
        }
    };

    let metadata = read_single(&mut archive, "METADATA", &mut report);
    let wheel = read_single(&mut archive, "WHEEL", &mut report);

    if let Some(metadata) = metadata {
        check_metadata(&metadata, name.as_ref(), &mut report);
    }
    if let Some(wheel) = wheel {
        check_wheel_block(&wheel, name.as_ref(), &mut report);
    }
    report
}

fn read_single(
    archive: &mut ZipArchive<File>,
    file: &str,
    report: &mut CheckReport,
) -> Option<MetadataRecord> {
    let suffix = format!(".dist-info/{file}");
    let matches: Vec<String> = archive
        .file_names()
        .filter(|n| n.ends_with(&suffix) && !n[..n.len() - suffix.len()].contains('/'))
        .map(str::to_string)
        .collect();

    let [entry] = matches.as_slice() else {
        report.errors.push(format!(
            "Expected exactly one .dist-info/{file}, found {}",
            matches.len()
        ));
        return None;
    };

    let mut text = String::new();
    let read = archive
        .by_name(entry)
        .map_err(|e| e.to_string())
        .and_then(|mut f| f.read_to_string(&mut text).map_err(|e| e.to_string()));
    match read {
        Ok(_) => Some(MetadataRecord::parse(&text)),
        Err(e) => {
            report.errors.push(format!("Cannot read {entry}: {e}"));
            None
        }
    }
}

fn check_metadata(metadata: &MetadataRecord, name: Option<&WheelName>, report: &mut CheckReport) {
    for field in ["Metadata-Version", "Name", "Version"] {
        if metadata.get(field).is_none_or(str::is_empty) {
            report
                .errors
                .push(format!("METADATA is missing required field {field}"));
        }
    }

    if let (Some(name), Some(meta_name)) = (name, metadata.get("Name"))
        && normalize_name(meta_name) != normalize_name(&name.dist)
    {
        report.errors.push(format!(
            "METADATA Name '{meta_name}' does not match file name '{}'",
            name.dist
        ));
    }

    if let (Some(name), Some(meta_version)) = (name, metadata.get("Version")) {
        let agrees = match (Version::parse(meta_version), Version::parse(&name.version)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !agrees {
            report.errors.push(format!(
                "METADATA Version '{meta_version}' does not match file name '{}'",
                name.version
            ));
        }
    }

    if metadata.payload().is_none_or(|p| p.trim().is_empty()) {
        report
            .errors
            .push("METADATA has no long description".to_string());
    }
    if metadata
        .get("Description-Content-Type")
        .is_none_or(str::is_empty)
    {
        report
            .warnings
            .push("METADATA is missing Description-Content-Type".to_string());
    }
}

fn check_wheel_block(wheel: &MetadataRecord, name: Option<&WheelName>, report: &mut CheckReport) {
    match wheel.get("Root-Is-Purelib") {
        Some(v) if v.eq_ignore_ascii_case("false") => {}
        other => report.errors.push(format!(
            "WHEEL Root-Is-Purelib must be false, found {}",
            other.unwrap_or("nothing")
        )),
    }

    let tags: Vec<&str> = wheel.get_all("Tag").collect();
    if tags.is_empty() {
        report.errors.push("WHEEL declares no Tag".to_string());
    } else if let Some(name) = name
        && !tags.contains(&name.tag.as_str())
    {
        report.errors.push(format!(
            "WHEEL Tag {} does not match file name tag '{}'",
            tags.join(", "),
            name.tag
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedistConfig;
    use crate::wheel::{ReproducibleZip, WheelInput, build_wheel, wheel_file_name};
    use std::io::Cursor;
    use tempfile::TempDir;

    const TAG: &str = "py2.py3-none-manylinux_2_5_x86_64.manylinux1_x86_64";

    fn good_wheel(ctx: &Context, version: &str) -> PathBuf {
        let dir = ctx.layout.dist_dir(version);
        std::fs::create_dir_all(&dir).unwrap();
        let bytes = build_wheel(
            ctx,
            &WheelInput {
                tag: "v1.2.3",
                version,
                wheel_tag: TAG,
                executable: b"exe",
                license: b"license",
                description: "# buf-exe\n",
            },
        )
        .unwrap();
        let path = dir.join(wheel_file_name("buf_exe", version, TAG));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_wheel_name_parse() {
        let name = WheelName::parse(&format!("buf_exe-1.2.3-{TAG}.whl")).unwrap();
        assert_eq!(name.dist, "buf_exe");
        assert_eq!(name.version, "1.2.3");
        assert_eq!(name.tag, TAG);

        let with_build = WheelName::parse("buf_exe-1.2.3-1-py3-none-any.whl").unwrap();
        assert_eq!(with_build.tag, "py3-none-any");

        assert!(WheelName::parse("buf_exe-1.2.3.whl").is_none());
        assert!(WheelName::parse("buf-exe-1.2.3-py3-none-any.zip").is_none());
    }

    #[test]
    fn test_good_wheel_passes() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        let check = check_wheel(&good_wheel(&ctx, "1.2.3"));
        assert!(check.errors.is_empty(), "{:?}", check.errors);
        assert!(check.warnings.is_empty());
        assert!(check.passed(true));
    }

    #[test]
    fn test_garbage_is_a_finding() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(format!("buf_exe-1.2.3-{TAG}.whl"));
        std::fs::write(&path, "not a zip").unwrap();
        let check = check_wheel(&path);
        assert_eq!(check.errors.len(), 1);
        assert!(check.errors[0].contains("Not a readable archive"));
    }

    #[test]
    fn test_mismatched_name_and_missing_content_type() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(format!("other-2.0.0-{TAG}.whl"));
        let mut zip = ReproducibleZip::new(Cursor::new(Vec::new()));
        zip.add(
            "other-2.0.0.dist-info/METADATA",
            b"Metadata-Version: 2.1\nName: buf-exe\nVersion: 1.2.3\n\nbody\n",
            0o644,
        )
        .unwrap();
        zip.add(
            "other-2.0.0.dist-info/WHEEL",
            b"Wheel-Version: 1.0\nRoot-Is-Purelib: true\nTag: py3-none-any\n\n",
            0o644,
        )
        .unwrap();
        std::fs::write(&path, zip.finish().unwrap().into_inner()).unwrap();

        let check = check_wheel(&path);
        assert_eq!(check.errors.len(), 4, "{:?}", check.errors);
        assert_eq!(check.warnings.len(), 1);
        assert!(!check.passed(false));
    }

    #[test]
    fn test_missing_wheel_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(format!("buf_exe-1.2.3-{TAG}.whl"));
        let mut zip = ReproducibleZip::new(Cursor::new(Vec::new()));
        zip.add(
            "buf_exe-1.2.3.dist-info/METADATA",
            b"Metadata-Version: 2.1\nName: buf-exe\nVersion: 1.2.3\nDescription-Content-Type: text/plain\n\nbody\n",
            0o644,
        )
        .unwrap();
        std::fs::write(&path, zip.finish().unwrap().into_inner()).unwrap();

        let check = check_wheel(&path);
        assert_eq!(check.errors, vec!["Expected exactly one .dist-info/WHEEL, found 0"]);
    }

    #[test]
    fn test_strict_mode_fails_on_warnings() {
        let report = CheckReport {
            path: PathBuf::from("x.whl"),
            errors: Vec::new(),
            warnings: vec!["missing content type".to_string()],
        };
        assert!(report.passed(false));
        assert!(!report.passed(true));
    }

    #[test]
    fn test_verify_checks_everything() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        good_wheel(&ctx, "1.2.3");
        let bad = ctx
            .layout
            .dist_dir("1.2.3")
            .join(format!("buf_exe-1.2.3-{}.whl", "py2.py3-none-win_amd64"));
        std::fs::write(&bad, "broken").unwrap();
        good_wheel(&ctx, "2.0.0");

        let report = verify(&ctx, "*").unwrap();
        assert_eq!(report.checks.len(), 3);
        assert!(report.has_failures());
        assert_eq!(report.failure_count(), 1);

        let only_good = verify(&ctx, "2.*").unwrap();
        assert_eq!(only_good.checks.len(), 1);
        assert!(!only_good.has_failures());
    }

    #[test]
    fn test_verify_without_dist() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), RedistConfig::default());
        let report = verify(&ctx, "*").unwrap();
        assert!(report.checks.is_empty());
        assert!(!report.has_failures());
    }
}
