//! Source side of a load: where the bytes come from.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::debug;

use crate::loader::MountOperation;

/// An opened byte stream.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Metadata returned by [`Location::query_info`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Total size in bytes, when the backend knows it.
    pub size: Option<u64>,
}

/// Error of a metadata query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The volume holding the location is not mounted.
    #[error("{0}")]
    NotMounted(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A readable storage location, possibly on a volume that has to be
/// mounted first.
#[async_trait]
pub trait Location: Send + Sync + fmt::Debug {
    /// Human-readable name, used in log messages.
    fn display_name(&self) -> String;

    async fn query_info(&self) -> Result<FileInfo, QueryError>;

    async fn open(&self) -> io::Result<ByteStream>;

    /// Mount the volume enclosing this location, asking the user through
    /// `operation` when needed.
    async fn mount_enclosing_volume(&self, operation: &dyn MountOperation) -> io::Result<()>;
}

/// The document a loader fills, as far as the loader is concerned.
pub trait SourceFile: Send + Sync {
    fn location(&self) -> Option<Arc<dyn Location>>;

    /// Called after the enclosing volume was mounted on behalf of this file.
    fn mark_mounted(&self);
}

/// A path on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalLocation {
    path: PathBuf,
}

impl LocalLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Location for LocalLocation {
    fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    async fn query_info(&self) -> Result<FileInfo, QueryError> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        // Character devices and pipes report a size of zero.
        let size = metadata.is_file().then(|| metadata.len());
        Ok(FileInfo { size })
    }

    async fn open(&self) -> io::Result<ByteStream> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(Box::pin(file))
    }

    async fn mount_enclosing_volume(&self, _operation: &dyn MountOperation) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "local paths cannot be mounted",
        ))
    }
}

/// A document backed by a local file.
#[derive(Debug)]
pub struct LocalFile {
    location: Arc<LocalLocation>,
    mounted: AtomicBool,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Arc::new(LocalLocation::new(path)),
            mounted: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        self.location.path()
    }

    pub fn is_marked_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }
}

impl SourceFile for LocalFile {
    fn location(&self) -> Option<Arc<dyn Location>> {
        Some(self.location.clone())
    }

    fn mark_mounted(&self) {
        debug!(path = %self.location.display_name(), "file marked as mounted");
        self.mounted.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn test_local_location_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello local").unwrap();

        let location = LocalLocation::new(file.path());
        let info = location.query_info().await.unwrap();
        assert_eq!(info.size, Some(11));

        let mut stream = location.open().await.unwrap();
        let mut content = String::new();
        stream.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "hello local");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let location = LocalLocation::new(dir.path().join("absent.txt"));
        let err = location.query_info().await.unwrap_err();
        assert!(matches!(err, QueryError::Io(e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn test_local_file_exposes_location() {
        let file = LocalFile::new("/tmp/some.txt");
        let location = file.location().unwrap();
        assert_eq!(location.display_name(), "/tmp/some.txt");
        assert!(!file.is_marked_mounted());
        file.mark_mounted();
        assert!(file.is_marked_mounted());
    }
}
