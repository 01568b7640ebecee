use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::submission::reference::ReferenceId;

/// Where generated documents are written, keyed by reference id.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write the rendered sign-off document.
    async fn persist(&self, reference: &ReferenceId, pdf: &[u8]) -> std::io::Result<PathBuf>;

    /// Write the uploaded companion PDF.
    async fn persist_companion(
        &self,
        reference: &ReferenceId,
        pdf: &[u8],
    ) -> std::io::Result<PathBuf>;
}

/// Flat output directory: `OSD_<ref>.pdf` and `OSD_<ref>_BOL.pdf`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    async fn write(&self, filename: String, bytes: &[u8]) -> std::io::Result<PathBuf> {
        self.ensure_dir().await?;
        let path = self.dir.join(filename);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[async_trait]
impl ArtifactStore for DirectoryStore {
    async fn persist(&self, reference: &ReferenceId, pdf: &[u8]) -> std::io::Result<PathBuf> {
        self.write(reference.document_filename(), pdf).await
    }

    async fn persist_companion(
        &self,
        reference: &ReferenceId,
        pdf: &[u8],
    ) -> std::io::Result<PathBuf> {
        self.write(reference.companion_filename(), pdf).await
    }
}
