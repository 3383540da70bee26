//! Sequential chunk reads, pipelined one read ahead of the consumer.

use std::io;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::location::ByteStream;

/// Default read size, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Reads an opened stream in fixed-size chunks on a background task.
///
/// The task issues the next read as soon as the previous chunk is handed
/// over, so the consumer's per-chunk work overlaps with I/O. Reads are still
/// strictly sequential. The task ends at end of stream or on the first error,
/// and is aborted when the reader is dropped.
pub(crate) struct ChunkReader {
    chunks: mpsc::Receiver<io::Result<Bytes>>,
    task: JoinHandle<()>,
}

impl ChunkReader {
    pub(crate) fn spawn(stream: ByteStream, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(pump(stream, chunk_size, tx));
        Self { chunks: rx, task }
    }

    /// Next chunk, or `None` at end of stream.
    pub(crate) async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        match self.chunks.recv().await {
            Some(Ok(chunk)) if chunk.is_empty() => Ok(None),
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(e),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "chunk reader stopped unexpectedly",
            )),
        }
    }
}

impl Drop for ChunkReader {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Reads into one reusable buffer and sends a right-sized copy of each read.
async fn pump(mut stream: ByteStream, chunk_size: usize, tx: mpsc::Sender<io::Result<Bytes>>) {
    let mut buf = vec![0u8; chunk_size];
    loop {
        let item = stream
            .read(&mut buf)
            .await
            .map(|n| Bytes::copy_from_slice(&buf[..n]));

        // An empty chunk marks end of stream.
        let last = !matches!(&item, Ok(chunk) if !chunk.is_empty());
        if let Ok(chunk) = &item {
            trace!(len = chunk.len(), "chunk read");
        }
        if tx.send(item).await.is_err() || last {
            break;
        }
    }
}
