//! Helpers for locating external tools.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Check if a binary is available on PATH (or at the given path).
pub fn check_binary(name: impl AsRef<Path>) -> bool {
    resolve_binary(name).is_some()
}

/// Resolve a binary name to its full path.
pub fn resolve_binary(name: impl AsRef<Path>) -> Option<PathBuf> {
    which::which(name.as_ref()).ok()
}

/// Check that `python` can import `module`.
pub fn check_python_module(python: &Path, module: &str) -> bool {
    Command::new(python)
        .args(["-c", &format!("import {}", module)])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Hint for a missing pdftoppm, or `None` when it is installed.
pub fn check_pdftoppm_hint() -> Option<String> {
    if check_binary("pdftoppm") {
        None
    } else {
        Some("pdftoppm not installed. Install with: apt install poppler-utils".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary() {
        assert!(!check_binary("arpdf-no-such-binary-0b1c"));
        assert!(resolve_binary("arpdf-no-such-binary-0b1c").is_none());
    }

    #[test]
    fn test_missing_python() {
        assert!(!check_python_module(Path::new("arpdf-no-such-python"), "json"));
    }
}
