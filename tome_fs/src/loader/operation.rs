use std::fmt;
use std::future::Future;
use std::io;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::detect::{CharsetDetector, ChunkBuffer};
use super::mount::{MountOperationFactory, MountRecovery};
use super::progress::ProgressState;
use super::reader::ChunkReader;
use super::size::SizeGuard;
use super::transcode::StreamTranscoder;
use super::{ActiveGuard, LoadRequest};
use crate::encoding::{DetectionConfig, Encoding};
use crate::error::{LoadError, LoadResult};
use crate::location::{QueryError, SourceFile};
use crate::sink::TextSink;

/// Where a [`LoadOperation`] is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    SizingUp,
    Mounting,
    Opening,
    Reading,
    Detecting,
    Converting,
    Succeeded,
    Failed,
    Cancelled,
}

/// The non-terminal states, the only ones `drive` can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    SizingUp,
    Mounting,
    Opening,
    Reading,
    Detecting,
    Converting,
}

impl From<Step> for LoadState {
    fn from(step: Step) -> Self {
        match step {
            Step::SizingUp => LoadState::SizingUp,
            Step::Mounting => LoadState::Mounting,
            Step::Opening => LoadState::Opening,
            Step::Reading => LoadState::Reading,
            Step::Detecting => LoadState::Detecting,
            Step::Converting => LoadState::Converting,
        }
    }
}

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub charset: String,
    pub bytes_read: u64,
}

/// One in-flight load, created by [`FileLoader::start`](super::FileLoader::start).
///
/// Holds the loader's single-flight claim until dropped.
pub struct LoadOperation<S: TextSink> {
    request: LoadRequest,
    sink: Weak<Mutex<S>>,
    file: Weak<dyn SourceFile>,
    mount_factory: Arc<dyn MountOperationFactory>,
    detector: CharsetDetector,
    step: Step,
    mount: MountRecovery,
    progress: ProgressState,
    chunks: ChunkBuffer,
    reader: Option<ChunkReader>,
    charset: Option<Encoding>,
    _active: ActiveGuard,
}

impl<S: TextSink> fmt::Debug for LoadOperation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOperation")
            .field("location", &self.request.location)
            .field("state", &self.state())
            .field("progress", &self.progress)
            .field("blocks", &self.chunks.len())
            .finish_non_exhaustive()
    }
}

impl<S: TextSink> LoadOperation<S> {
    pub(super) fn new(
        request: LoadRequest,
        sink: Weak<Mutex<S>>,
        file: Weak<dyn SourceFile>,
        mount_factory: Arc<dyn MountOperationFactory>,
        detection: DetectionConfig,
        active: ActiveGuard,
    ) -> Self {
        Self {
            request,
            sink,
            file,
            mount_factory,
            detector: CharsetDetector::new(detection),
            step: Step::SizingUp,
            mount: MountRecovery::new(),
            progress: ProgressState::default(),
            chunks: ChunkBuffer::new(),
            reader: None,
            charset: None,
            _active: active,
        }
    }

    pub fn state(&self) -> LoadState {
        self.step.into()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.request.cancel
    }

    /// Drive the operation to its terminal state.
    pub async fn run(mut self) -> LoadResult<LoadSummary> {
        let result = self.drive().await;
        self.finish(result)
    }

    async fn drive(&mut self) -> LoadResult<LoadSummary> {
        loop {
            let next = match self.step {
                Step::SizingUp => self.query_size().await?,
                Step::Mounting => self.mount_volume().await?,
                Step::Opening => self.open_stream().await?,
                Step::Reading => self.read_chunk().await?,
                Step::Detecting => self.detect_charset()?,
                Step::Converting => {
                    let charset = self.convert()?;
                    return Ok(LoadSummary {
                        charset: charset.to_string(),
                        bytes_read: self.progress.bytes_read(),
                    });
                }
            };
            if next != self.step {
                self.log_transition(next.into());
            }
            self.step = next;
        }
    }

    fn log_transition(&self, to: LoadState) {
        debug!(
            location = %self.request.location.display_name(),
            from = ?self.state(),
            ?to,
            "load state transition"
        );
    }

    fn check_cancelled(&self) -> LoadResult<()> {
        if self.request.cancel.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        Ok(())
    }

    async fn query_size(&mut self) -> LoadResult<Step> {
        let location = self.request.location.clone();
        let info = suspend(&self.request.cancel, location.query_info()).await?;
        self.check_cancelled()?;

        match info {
            Ok(info) => {
                let total = SizeGuard::new(self.request.max_size).check(&info)?;
                self.progress = ProgressState::new(total);
                Ok(Step::Opening)
            }
            Err(QueryError::NotMounted(_)) if self.mount.can_attempt() => Ok(Step::Mounting),
            Err(QueryError::NotMounted(message)) => Err(LoadError::NotMounted(message)),
            Err(QueryError::Io(e)) => Err(LoadError::QueryFailed(e)),
        }
    }

    async fn mount_volume(&mut self) -> LoadResult<Step> {
        let location = self.request.location.clone();
        let recovery = self.mount.recover(
            location.as_ref(),
            &self.file,
            self.mount_factory.as_ref(),
        );
        suspend(&self.request.cancel, recovery).await??;
        self.check_cancelled()?;
        Ok(Step::SizingUp)
    }

    async fn open_stream(&mut self) -> LoadResult<Step> {
        let location = self.request.location.clone();
        let stream = suspend(&self.request.cancel, location.open())
            .await?
            .map_err(LoadError::ReadFailed)?;
        self.check_cancelled()?;

        self.reader = Some(ChunkReader::spawn(stream, self.request.chunk_size));
        Ok(Step::Reading)
    }

    async fn read_chunk(&mut self) -> LoadResult<Step> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(LoadError::ReadFailed(io::Error::new(
                io::ErrorKind::NotConnected,
                "stream is not open",
            )));
        };
        let chunk = suspend(&self.request.cancel, reader.next_chunk())
            .await?
            .map_err(LoadError::ReadFailed)?;
        self.check_cancelled()?;

        let Some(chunk) = chunk else {
            self.reader = None;
            return Ok(Step::Detecting);
        };

        self.progress.record(chunk.len());
        trace!(len = chunk.len(), bytes_read = self.progress.bytes_read(), "chunk buffered");
        self.chunks.push_back(chunk);

        // the reader task is already waiting on the next read
        if self.progress.is_reportable() {
            if let Some(callback) = self.request.progress.as_mut() {
                callback(self.progress.bytes_read(), self.progress.total());
            }
        }
        Ok(Step::Reading)
    }

    fn detect_charset(&mut self) -> LoadResult<Step> {
        self.check_cancelled()?;
        let encoding = self
            .detector
            .detect(&self.chunks)
            .ok_or(LoadError::EncodingAutoDetectionFailed)?;
        self.charset = Some(encoding);
        Ok(Step::Converting)
    }

    fn convert(&mut self) -> LoadResult<&'static str> {
        let charset = self
            .charset
            .map(Encoding::charset)
            .ok_or(LoadError::EncodingAutoDetectionFailed)?;
        let mut transcoder = StreamTranscoder::open(charset)?;

        while let Some(block) = self.chunks.pop_front() {
            self.check_cancelled()?;
            let fragment = transcoder.feed(&block)?;
            self.append(&fragment);
        }
        self.check_cancelled()?;

        let (fragment, terminator) = transcoder.close()?;
        self.append(&fragment);

        if let Some(sink) = self.sink.upgrade() {
            let mut sink = sink.lock();
            if terminator > 0 && sink.implicit_trailing_newline() {
                sink.remove_suffix(terminator);
            }
            sink.place_cursor_at_start();
            sink.mark_unmodified();
        }
        Ok(charset)
    }

    fn append(&self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if let Some(sink) = self.sink.upgrade() {
            sink.lock().append_text(fragment);
        }
    }

    /// Log the terminal state. Dropping the operation afterwards stops the
    /// reader, frees the buffered blocks and releases the single-flight claim.
    fn finish(self, result: LoadResult<LoadSummary>) -> LoadResult<LoadSummary> {
        let terminal = match &result {
            Ok(_) => LoadState::Succeeded,
            Err(e) if e.is_cancelled() => LoadState::Cancelled,
            Err(_) => LoadState::Failed,
        };
        self.log_transition(terminal);

        let location = self.request.location.display_name();
        match &result {
            Ok(summary) => info!(
                %location,
                charset = %summary.charset,
                bytes = summary.bytes_read,
                "file loaded"
            ),
            Err(LoadError::Cancelled) => debug!(%location, "load cancelled"),
            Err(e) => warn!(%location, error = %e, "load failed"),
        }
        result
    }
}

/// Await `future` unless the token fires first.
async fn suspend<F: Future>(cancel: &CancellationToken, future: F) -> LoadResult<F::Output> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(LoadError::Cancelled),
        output = future => Ok(output),
    }
}
