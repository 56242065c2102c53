//! Loader that shells out to a triplestore-specific script.
//!
//! The script is called as `script <directory>/ <file name>` and must block
//! until the file is loaded. Its exit status decides success.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{DatasetLoader, LoadError, LoadResult};

#[derive(Debug, Clone)]
pub struct ScriptLoader {
    script: PathBuf,
}

impl ScriptLoader {
    /// Create a loader, failing if the script cannot be executed.
    pub fn new(script: impl Into<PathBuf>) -> LoadResult<Self> {
        let script = script.into();
        if !is_executable(&script) {
            return Err(LoadError::ScriptUnavailable {
                path: script.display().to_string(),
            });
        }
        Ok(Self { script })
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

impl DatasetLoader for ScriptLoader {
    fn load(&mut self, path: &Path) -> LoadResult<()> {
        // The script may have vanished since construction.
        if !is_executable(&self.script) {
            return Err(LoadError::ScriptUnavailable {
                path: self.script.display().to_string(),
            });
        }
        if !path.is_file() {
            return Err(LoadError::MissingDataset {
                path: path.display().to_string(),
            });
        }
        let (dir, file_name) = split_dataset_path(path);

        tracing::debug!(script = %self.script.display(), dir = %dir, file = %file_name, "running loader");
        let output = Command::new(&self.script)
            .arg(&dir)
            .arg(&file_name)
            .output()
            .map_err(|e| LoadError::Io {
                path: path.display().to_string(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(LoadError::ScriptFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        tracing::info!(dataset = %path.display(), "loaded dataset");
        Ok(())
    }
}

/// Split into (`directory/`, `file name`). A bare file name lives in `./`.
fn split_dataset_path(path: &Path) -> (String, String) {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            let mut dir = parent.display().to_string();
            if !dir.ends_with('/') {
                dir.push('/');
            }
            dir
        }
        _ => "./".to_string(),
    };
    (dir, file_name)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
