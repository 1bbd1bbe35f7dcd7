//! Temporary on-disk staging of uploaded files.
//!
//! Every upload is written to a named temp file as it streams in and removed
//! when the [`StagedFile`] is released or dropped, whichever comes first.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{trace, warn};

use noteport_core::{sanitize_filename, Error, Result, SourceFile};

use crate::encoding;

/// An upload held in temporary storage.
#[derive(Debug)]
pub struct StagedFile {
    original_name: String,
    size_bytes: usize,
    file: Option<NamedTempFile>,
}

impl StagedFile {
    /// Create an empty staged file under `dir`, creating `dir` if needed.
    ///
    /// The client-supplied name is repaired if it arrived mis-decoded and
    /// reduced to a safe final path component.
    pub fn create(dir: &Path, original_name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let original_name = sanitize_filename(&encoding::repair_filename(original_name));
        let file = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(dir)
            .map_err(|e| Error::Internal(format!("Failed to create temp file: {}", e)))?;
        trace!(file_name = %original_name, path = %file.path().display(), "Staged upload");
        Ok(Self {
            original_name,
            size_bytes: 0,
            file: Some(file),
        })
    }

    /// Stage a complete in-memory upload.
    pub fn from_bytes(dir: &Path, original_name: &str, content: &[u8]) -> Result<Self> {
        let mut staged = Self::create(dir, original_name)?;
        staged.write_chunk(content)?;
        Ok(staged)
    }

    /// Append bytes to the staged file.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Internal("Staged file already released".to_string()))?;
        file.write_all(chunk)?;
        self.size_bytes += chunk.len();
        Ok(())
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path())
    }

    /// Read the staged bytes back as a [`SourceFile`].
    pub async fn read_source(&mut self) -> Result<SourceFile> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Internal("Staged file already released".to_string()))?;
        file.flush()?;
        let content = tokio::fs::read(file.path()).await?;
        Ok(SourceFile::new(self.original_name.clone(), content))
    }

    /// Remove the temporary file. Failures are logged, never returned.
    pub fn release(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        if let Some(file) = self.file.take() {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                warn!(
                    file_name = %self.original_name,
                    path = %path.display(),
                    error = %e,
                    "Failed to remove staged upload"
                );
            }
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stage_read_release() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedFile::from_bytes(dir.path(), "note.html", b"<p>x</p>").unwrap();
        let path = staged.path().unwrap().to_path_buf();
        assert!(path.exists());
        assert_eq!(staged.size_bytes(), 8);

        let source = staged.read_source().await.unwrap();
        assert_eq!(source.original_name, "note.html");
        assert_eq!(source.content, b"<p>x</p>");

        staged.release();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_chunks_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedFile::create(dir.path(), "a.pdf").unwrap();
        staged.write_chunk(b"%PDF").unwrap();
        staged.write_chunk(b"-1.4").unwrap();
        assert_eq!(staged.size_bytes(), 8);
        assert_eq!(staged.read_source().await.unwrap().content, b"%PDF-1.4");
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::from_bytes(dir.path(), "x.mht", b"data").unwrap();
        let path = staged.path().unwrap().to_path_buf();
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_name_reduced_to_final_component() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), "../../etc/notes.html").unwrap();
        assert_eq!(staged.original_name(), "notes.html");
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("noteport-imports");
        let staged = StagedFile::create(&nested, "a.html").unwrap();
        assert!(nested.is_dir());
        assert!(staged.path().unwrap().starts_with(&nested));
    }
}
