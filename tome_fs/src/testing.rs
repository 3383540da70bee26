//! In-memory collaborators with fault injection, for tests and demos.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};

use crate::loader::MountOperation;
use crate::location::{ByteStream, FileInfo, Location, QueryError, SourceFile};

/// Counters shared between a [`MemoryLocation`] and the streams it opens.
#[derive(Debug, Default)]
struct Counters {
    queries: AtomicUsize,
    opens: AtomicUsize,
    reads: AtomicUsize,
    mounts: AtomicUsize,
}

/// A byte stream over an in-memory buffer.
#[derive(Debug)]
pub struct MemoryStream {
    data: Arc<[u8]>,
    pos: usize,
    fail_after: Option<usize>,
    stall_after: Option<usize>,
    max_read: Option<usize>,
    reads: usize,
    counters: Arc<Counters>,
}

impl MemoryStream {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self::with_counters(data.into(), Arc::default())
    }

    fn with_counters(data: Arc<[u8]>, counters: Arc<Counters>) -> Self {
        Self {
            data,
            pos: 0,
            fail_after: None,
            stall_after: None,
            max_read: None,
            reads: 0,
            counters,
        }
    }

    /// Fail every read after the first `reads` successful ones.
    pub fn fail_after_reads(mut self, reads: usize) -> Self {
        self.fail_after = Some(reads);
        self
    }

    /// Never complete a read after the first `reads` ones.
    pub fn stall_after_reads(mut self, reads: usize) -> Self {
        self.stall_after = Some(reads);
        self
    }

    /// Return at most `len` bytes per read, like a slow remote source.
    pub fn max_read_len(mut self, len: usize) -> Self {
        self.max_read = Some(len.max(1));
        self
    }
}

impl AsyncRead for MemoryStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.stall_after.is_some_and(|n| self.reads >= n) {
            return Poll::Pending;
        }
        if self.fail_after.is_some_and(|n| self.reads >= n) {
            return Poll::Ready(Err(io::Error::other("injected read failure")));
        }

        self.reads += 1;
        self.counters.reads.fetch_add(1, Ordering::SeqCst);

        let start = self.pos;
        let len = buf
            .remaining()
            .min(self.data.len() - start)
            .min(self.max_read.unwrap_or(usize::MAX));
        buf.put_slice(&self.data[start..start + len]);
        self.pos += len;
        Poll::Ready(Ok(()))
    }
}

/// A [`Location`] serving a fixed byte buffer.
#[derive(Debug)]
pub struct MemoryLocation {
    data: Arc<[u8]>,
    reported_size: Option<Option<u64>>,
    not_mounted: AtomicUsize,
    fail_mount: bool,
    fail_query: bool,
    fail_open: bool,
    fail_after_reads: Option<usize>,
    stall_after_reads: Option<usize>,
    max_read_len: Option<usize>,
    counters: Arc<Counters>,
}

impl MemoryLocation {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            reported_size: None,
            not_mounted: AtomicUsize::new(0),
            fail_mount: false,
            fail_query: false,
            fail_open: false,
            fail_after_reads: None,
            stall_after_reads: None,
            max_read_len: None,
            counters: Arc::default(),
        }
    }

    /// Report this size instead of the real one; `None` hides the size.
    pub fn report_size(mut self, size: Option<u64>) -> Self {
        self.reported_size = Some(size);
        self
    }

    /// Answer the first `times` metadata queries with "not mounted".
    pub fn not_mounted_times(self, times: usize) -> Self {
        self.not_mounted.store(times, Ordering::SeqCst);
        self
    }

    pub fn fail_mount(mut self) -> Self {
        self.fail_mount = true;
        self
    }

    pub fn fail_query(mut self) -> Self {
        self.fail_query = true;
        self
    }

    pub fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn fail_after_reads(mut self, reads: usize) -> Self {
        self.fail_after_reads = Some(reads);
        self
    }

    pub fn stall_after_reads(mut self, reads: usize) -> Self {
        self.stall_after_reads = Some(reads);
        self
    }

    /// Cap every read of opened streams at `len` bytes.
    pub fn max_read_len(mut self, len: usize) -> Self {
        self.max_read_len = Some(len);
        self
    }

    pub fn query_count(&self) -> usize {
        self.counters.queries.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    /// Completed reads over every stream opened so far.
    pub fn read_count(&self) -> usize {
        self.counters.reads.load(Ordering::SeqCst)
    }

    pub fn mount_count(&self) -> usize {
        self.counters.mounts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Location for MemoryLocation {
    fn display_name(&self) -> String {
        "memory".to_string()
    }

    async fn query_info(&self) -> Result<FileInfo, QueryError> {
        self.counters.queries.fetch_add(1, Ordering::SeqCst);

        let not_mounted = self
            .not_mounted
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if not_mounted {
            return Err(QueryError::NotMounted("memory is not mounted".to_string()));
        }
        if self.fail_query {
            return Err(QueryError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected query failure",
            )));
        }

        let size = self.reported_size.unwrap_or(Some(self.data.len() as u64));
        Ok(FileInfo { size })
    }

    async fn open(&self) -> io::Result<ByteStream> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(io::Error::new(io::ErrorKind::NotFound, "injected open failure"));
        }

        let mut stream = MemoryStream::with_counters(self.data.clone(), self.counters.clone());
        stream.fail_after = self.fail_after_reads;
        stream.stall_after = self.stall_after_reads;
        if let Some(len) = self.max_read_len {
            stream = stream.max_read_len(len);
        }
        Ok(Box::pin(stream))
    }

    async fn mount_enclosing_volume(&self, _operation: &dyn MountOperation) -> io::Result<()> {
        self.counters.mounts.fetch_add(1, Ordering::SeqCst);
        if self.fail_mount {
            return Err(io::Error::other("injected mount failure"));
        }
        Ok(())
    }
}

/// A [`SourceFile`] pointing at an arbitrary location.
#[derive(Debug)]
pub struct MemoryFile {
    location: Option<Arc<dyn Location>>,
    mounted: AtomicBool,
}

impl MemoryFile {
    pub fn new(location: Arc<dyn Location>) -> Self {
        Self { location: Some(location), mounted: AtomicBool::new(false) }
    }

    /// A file that has no location yet.
    pub fn unsaved() -> Self {
        Self { location: None, mounted: AtomicBool::new(false) }
    }

    pub fn is_marked_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }
}

impl SourceFile for MemoryFile {
    fn location(&self) -> Option<Arc<dyn Location>> {
        self.location.clone()
    }

    fn mark_mounted(&self) {
        self.mounted.store(true, Ordering::SeqCst);
    }
}
