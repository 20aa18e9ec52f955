//! Platform-specific path handling
//!
//! - Python home resolution, with the relocated-install override on Windows
//! - Search path normalization and tilde expansion

use std::env;
use std::path::{Path, PathBuf};

use super::Platform;
use crate::runtime::RuntimeVersion;

/// Resolve the Python home for a freshly created runtime
///
/// Returns `compiled_default` unchanged, except on Windows where an install
/// that was moved away from its build-time location is detected by the
/// missing standard library directory; the executable's directory is used
/// instead in that case.
pub fn resolve_home(version: RuntimeVersion, compiled_default: &Path) -> PathBuf {
    resolve_home_with(
        version,
        compiled_default,
        !Platform::current().is_posix(),
        executable_dir,
    )
}

/// [`resolve_home`] with the platform decision and executable lookup injected
pub fn resolve_home_with<F>(
    version: RuntimeVersion,
    compiled_default: &Path,
    override_enabled: bool,
    exe_dir: F,
) -> PathBuf
where
    F: FnOnce() -> Option<PathBuf>,
{
    if !override_enabled {
        return compiled_default.to_path_buf();
    }

    if has_stdlib(version, compiled_default) {
        return compiled_default.to_path_buf();
    }

    match exe_dir() {
        Some(here) => {
            tracing::debug!(
                compiled_home = %compiled_default.display(),
                home = %here.display(),
                "Python home not found at build-time location, using executable directory"
            );
            here
        }
        None => {
            tracing::warn!(
                compiled_home = %compiled_default.display(),
                "Could not determine executable directory, keeping build-time python home"
            );
            compiled_default.to_path_buf()
        }
    }
}

/// Whether `home/lib` holds a standard library directory for the major version
///
/// A `lib` directory that cannot be read counts as missing.
pub fn has_stdlib(version: RuntimeVersion, home: &Path) -> bool {
    let prefix = version.stdlib_prefix();
    std::fs::read_dir(home.join("lib"))
        .map(|entries| {
            entries.filter_map(Result::ok).any(|entry| {
                entry.file_name().to_string_lossy().starts_with(prefix) && entry.path().is_dir()
            })
        })
        .unwrap_or(false)
}

/// Directory containing the running executable
pub fn executable_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Normalize a search path for the current platform
///
/// On Windows forward slashes become backslashes and the drive letter is
/// uppercased; on Unix duplicate and trailing slashes are removed.
pub fn normalize_path(path: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        normalize_path_windows(path)
    }

    #[cfg(not(target_os = "windows"))]
    {
        normalize_path_unix(path)
    }
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn normalize_path_windows(path: &str) -> String {
    let mut result = path.replace('/', "\\");

    // Remove trailing backslash unless it's a root path (C:\)
    if result.len() > 3 && result.ends_with('\\') {
        result.pop();
    }

    let mut chars = result.chars();
    if let (Some(drive), Some(':')) = (chars.next(), chars.next()) {
        if drive.is_ascii_alphabetic() {
            result = format!("{}{}", drive.to_ascii_uppercase(), &result[1..]);
        }
    }

    result
}

#[cfg_attr(target_os = "windows", allow(dead_code))]
fn normalize_path_unix(path: &str) -> String {
    let mut result = path.to_string();

    while result.contains("//") {
        result = result.replace("//", "/");
    }

    // Remove trailing slash unless it's the root
    if result.len() > 1 && result.ends_with('/') {
        result.pop();
    }

    result
}

/// Expand a leading tilde to the home directory
pub fn expand_home(path: &str) -> String {
    if !path.starts_with('~') {
        return path.to_string();
    }

    let home = directories::BaseDirs::new()
        .map(|d| d.home_dir().to_string_lossy().to_string())
        .unwrap_or_else(|| {
            env::var("HOME")
                .or_else(|_| env::var("USERPROFILE"))
                .unwrap_or_default()
        });

    if path == "~" {
        return home;
    }

    if path.starts_with("~/") || path.starts_with("~\\") {
        return format!("{}{}", home, &path[1..]);
    }

    // ~username is left alone
    path.to_string()
}

/// Prepare a caller-supplied search path for injection
pub fn search_path(raw: &str) -> PathBuf {
    PathBuf::from(normalize_path(&expand_home(raw)))
}
