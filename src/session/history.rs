//! Cumulative log history and saving it to disk.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::Result;

/// Append-only record of every delivered line; cleared only on request.
#[derive(Debug, Default, Clone)]
pub struct LogHistory {
    lines: Vec<String>,
}

impl LogHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Whole history joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Default log file name: `device-log-<UTC timestamp>.log`.
pub fn default_log_file_name() -> String {
    let stamp = chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("device-log-{}.log", stamp)
}

/// Fallback directory: documents, then home, then the current directory.
pub fn default_log_directory() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Write `content` to `directory/file_name`, creating the directory.
///
/// Returns `None` without touching the disk when `content` is empty.
pub async fn save_log(
    content: &str,
    directory: Option<&Path>,
    file_name: Option<&str>,
) -> Result<Option<PathBuf>> {
    if content.is_empty() {
        return Ok(None);
    }

    let directory = directory
        .map(Path::to_path_buf)
        .unwrap_or_else(default_log_directory);
    let file_name = file_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(default_log_file_name);

    tokio::fs::create_dir_all(&directory).await?;
    let path = directory.join(file_name);
    tokio::fs::write(&path, content).await?;

    info!("Saved {} bytes of log to {}", content.len(), path.display());
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_join_and_clear() {
        let mut history = LogHistory::new();
        history.push("one");
        history.push("two");
        assert_eq!(history.text(), "one\ntwo");
        assert_eq!(history.len(), 2);

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.text(), "");
    }

    #[test]
    fn test_default_file_name_shape() {
        let name = default_log_file_name();
        assert!(name.starts_with("device-log-"));
        assert!(name.ends_with("Z.log"));
        let stem = name.trim_end_matches(".log");
        assert!(!stem.contains(':'));
        assert!(!stem.contains('.'));
    }

    #[tokio::test]
    async fn test_save_empty_content_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("logs");
        let saved = save_log("", Some(&target), None).await.unwrap();
        assert!(saved.is_none());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("logs");
        let path = save_log("a\nb", Some(&target), Some("capture.log"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path, target.join("capture.log"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a\nb");
    }

    #[tokio::test]
    async fn test_save_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_log("x", Some(dir.path()), Some("  "))
            .await
            .unwrap()
            .unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("device-log-"));
    }
}
