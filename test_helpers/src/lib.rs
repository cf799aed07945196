//! Test helpers for the sedflux workspace
//!
//! Small utilities shared by tests that need to reach fixture files (for
//! example the bundled evolutionary-model tables under `sedflux/data/`)
//! regardless of which directory the test binary runs from.

use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;

/// Error type for test helper operations
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to find workspace root: {0}")]
    WorkspaceRootNotFound(String),
}

/// Returns the path to the workspace root directory.
///
/// Walks upward from the current directory until it finds the Cargo.toml
/// that declares the `[workspace]` section.
///
/// # Returns
/// * `Ok(PathBuf)` - The path to the workspace root
/// * `Err(TestHelperError)` - If the workspace root could not be found
pub fn find_workspace_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::WorkspaceRootNotFound(format!("Failed to get current directory: {}", e))
    })?;

    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::WorkspaceRootNotFound(format!("Failed to read Cargo.toml: {}", e))
            })?;

            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::WorkspaceRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

/// Lazily initialized workspace root path
static WORKSPACE_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_workspace_root().expect("Failed to find workspace root directory"));

/// Returns the absolute path of a fixture file given its path relative to
/// the workspace root, e.g. `fixture_path("sedflux/data/models/hybrid_solar_age.txt")`.
pub fn fixture_path(relative: &str) -> PathBuf {
    WORKSPACE_ROOT.join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_workspace_root() {
        let root = find_workspace_root().unwrap();
        assert!(root.join("Cargo.toml").exists());
        assert!(root.join("test_helpers").exists());
    }

    #[test]
    fn test_fixture_path_is_rooted() {
        let path = fixture_path("sedflux/Cargo.toml");
        assert!(path.is_absolute());
        assert!(path.exists());
    }
}
