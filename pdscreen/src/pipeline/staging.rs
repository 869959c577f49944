//! Upload staging
//!
//! Uploads are written to a temporary directory before analysis. Each staged
//! file is owned by a [`StagedUpload`] and removed when that handle drops, so
//! cleanup happens exactly once on every exit path.

use chrono::Utc;
use pdscreen_common::config::ensure_directory;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Longest sanitized original name kept in a staged file name
const MAX_NAME_CHARS: usize = 64;

/// Directory that holds request-scoped upload files
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the staging directory if needed
    pub fn prepare(&self) -> pdscreen_common::Result<()> {
        ensure_directory(&self.dir)
    }

    /// Write `bytes` to a uniquely named file
    ///
    /// A partially written file is removed if the write fails.
    pub async fn stage(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<StagedUpload> {
        let staged = StagedUpload::new(self.dir.join(staged_file_name(original_name)));
        tokio::fs::write(staged.path(), bytes).await?;

        debug!(
            path = %staged.path().display(),
            bytes = bytes.len(),
            "Upload staged"
        );

        Ok(staged)
    }
}

/// `<unix-millis>-<uuid>-<sanitized original name>`
pub fn staged_file_name(original_name: &str) -> String {
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4(),
        sanitize_file_name(original_name)
    )
}

/// Keep only the final path component, restricted to `[A-Za-z0-9._-]`
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_CHARS)
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Lowercased extension of a file name, if any
pub fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Handle to one staged file; dropping it deletes the file
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    /// Take ownership of the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extension used as the decoder's container hint
    pub fn extension(&self) -> Option<String> {
        self.path.file_name().and_then(|n| n.to_str()).and_then(file_extension)
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Staged upload removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove staged upload"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_strips_directories_and_odd_chars() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\my voice.wav"), "my_voice.wav");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(&"a".repeat(200)).len(), MAX_NAME_CHARS);
    }

    #[test]
    fn test_staged_names_are_unique() {
        let a = staged_file_name("clip.wav");
        let b = staged_file_name("clip.wav");
        assert_ne!(a, b);
        assert!(a.ends_with("-clip.wav"));
    }

    #[test]
    fn test_file_extension_lowercased() {
        assert_eq!(file_extension("Recording.WAV").as_deref(), Some("wav"));
        assert_eq!(file_extension("noext"), None);
    }

    #[tokio::test]
    async fn test_drop_removes_staged_file() {
        let dir = TempDir::new().unwrap();
        let area = StagingArea::new(dir.path().join("staging"));
        area.prepare().unwrap();

        let staged = area.stage("voice.m4a", b"abc").await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(staged.extension().as_deref(), Some("m4a"));

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_of_missing_file_is_quiet() {
        let dir = TempDir::new().unwrap();
        let staged = StagedUpload::new(dir.path().join("never-written.wav"));
        drop(staged);
    }
}
