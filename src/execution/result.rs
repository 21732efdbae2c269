//! Execution result types.

use std::path::PathBuf;

use serde::Serialize;

/// Result of a bridge command.
///
/// A non-zero exit code is data, not failure. `exit_code` is absent only
/// when the process terminated abnormally (e.g. by a signal).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Local file produced by the command (screen capture).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl CommandResult {
    /// Create a result from decoded output.
    pub fn new(stdout: String, stderr: String, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            file_path: None,
        }
    }

    /// Result of a successful capture written to `path`.
    pub fn captured(path: PathBuf) -> Self {
        Self {
            stdout: path.display().to_string(),
            stderr: String::new(),
            exit_code: Some(0),
            file_path: Some(path),
        }
    }

    /// Check if command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}
