//! Path utilities.
//!
//! Windows long path support and numbered file names for destination
//! collisions.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Convert a path to an extended-length path format on Windows.
///
/// On Windows, the default maximum path length is 260 characters (MAX_PATH).
/// By using the extended-length path syntax (prefixing with `\\?\`), paths
/// can be up to 32,767 characters.
///
/// This function:
/// - On Windows, converts paths to extended-length format if needed
/// - On other platforms, returns the path unchanged
///
/// # Windows Path Conversion
///
/// The conversion follows these rules:
/// - Absolute paths like `C:\path` become `\\?\C:\path`
/// - UNC paths like `\\server\share\path` become `\\?\UNC\server\share\path`
/// - Relative paths are first converted to absolute, then prefixed
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use dedupcopy::utils::path::to_extended_length_path;
///
/// let path = Path::new(r"C:\very\long\path\...");
/// let extended = to_extended_length_path(path);
/// // On Windows: extended = r"\\?\C:\very\long\path\..."
/// // On other platforms: extended is unchanged
/// ```
#[cfg(windows)]
pub fn to_extended_length_path(path: &Path) -> PathBuf {
    // Check if the path is already in extended-length format
    let path_str = path.as_os_str().to_string_lossy();
    if path_str.starts_with(r"\\?\") {
        return path.to_path_buf();
    }

    // Check if it's a UNC path (starts with \\)
    if path_str.starts_with(r"\\") {
        // Convert \\server\share\path to \\?\UNC\server\share\path
        let without_prefix = &path_str[2..];
        let extended = format!(r"\\?\UNC{}", without_prefix);
        return PathBuf::from(extended);
    }

    // For relative paths, canonicalize first
    // For absolute paths, just add the prefix
    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        // Try to canonicalize, but if it fails (e.g., path doesn't exist yet),
        // just make it absolute relative to current directory
        match std::fs::canonicalize(path) {
            Ok(canonical) => canonical,
            Err(_) => {
                // Get current directory and join with the relative path
                match std::env::current_dir() {
                    Ok(cwd) => cwd.join(path),
                    Err(_) => path.to_path_buf(),
                }
            }
        }
    };

    // Add \\?\ prefix
    let extended = format!(r"\\?\{}", absolute_path.display());
    PathBuf::from(extended)
}

/// Convert a path to an extended-length path format on Windows.
///
/// On non-Windows platforms, this simply returns a clone of the input path.
#[cfg(not(windows))]
pub fn to_extended_length_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}

/// Convert a path for safe use with file operations.
///
/// On Windows, this converts the path to extended-length format if it's
/// already long or might become long (e.g., when a temp file name is added).
/// On other platforms, it returns the path unchanged.
///
/// This function is designed to be used proactively - even if a path
/// isn't currently long, it may become long when combined with temp
/// file names or other path components.
#[cfg(windows)]
pub fn safe_path(path: &Path) -> PathBuf {
    // Always use extended-length format on Windows for consistency
    // This avoids issues when parent paths are long and we need to
    // create temp files or subdirectories
    to_extended_length_path(path)
}

/// Convert a path for safe use with file operations.
///
/// On non-Windows platforms, this simply returns a clone of the input path.
#[cfg(not(windows))]
pub fn safe_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}

/// Insert `_<n>` before the extension of `name`; `n == 0` returns `name`.
///
/// `report.txt` becomes `report_1.txt`, `README` becomes `README_1`.
/// A leading dot does not start an extension, so `.bashrc` becomes
/// `.bashrc_1`. Only the last extension moves: `logs.tar.gz` becomes
/// `logs.tar_1.gz`.
pub fn numbered_name(name: &OsStr, n: u64) -> OsString {
    if n == 0 {
        return name.to_os_string();
    }

    let as_path = Path::new(name);
    let stem = as_path.file_stem().unwrap_or(name);
    let mut numbered = stem.to_os_string();
    numbered.push(format!("_{}", n));
    if let Some(extension) = as_path.extension() {
        numbered.push(".");
        numbered.push(extension);
    }
    numbered
}
