//! Asynchronous file loading.
//!
//! A [`FileLoader`] connects a [`SourceFile`] to a [`TextSink`]. Each call
//! to [`FileLoader::start`] produces a [`LoadOperation`] that, when run,
//! walks the pipeline:
//!
//! 1. query the size and enforce the ceiling, mounting the enclosing volume
//!    once if the location is not mounted;
//! 2. open the stream and read it in chunks;
//! 3. sniff the charset over the whole stream;
//! 4. convert the chunks to UTF-8, appending fragments to the sink.
//!
//! Only one operation per loader can be active at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tome_config::LoaderSettings;
use tracing::debug;

use crate::buffer::TextBuffer;
use crate::encoding::DetectionConfig;
use crate::error::{LoadError, LoadResult};
use crate::location::{Location, SourceFile};
use crate::sink::TextSink;

mod detect;
mod mount;
mod operation;
mod progress;
mod reader;
mod size;
mod transcode;

pub use detect::ChunkBuffer;
pub use mount::{MountCredentials, MountOperation, MountOperationFactory, NoInteraction};
pub use operation::{LoadOperation, LoadState, LoadSummary};
pub use progress::{ProgressCallback, ProgressState};
pub use reader::DEFAULT_CHUNK_SIZE;
pub use size::{DEFAULT_MAX_SIZE, format_size};
pub use transcode::{ConversionSession, trailing_line_terminator_len};

/// Per-load options.
#[derive(Default)]
pub struct LoadOptions {
    pub cancel: CancellationToken,
    pub progress: Option<ProgressCallback>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: impl FnMut(u64, u64) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }
}

/// Everything one operation needs, fixed when it starts.
pub(crate) struct LoadRequest {
    pub(crate) location: Arc<dyn Location>,
    pub(crate) max_size: Option<u64>,
    pub(crate) chunk_size: usize,
    pub(crate) cancel: CancellationToken,
    pub(crate) progress: Option<ProgressCallback>,
}

/// Single-flight claim, released on drop.
pub(crate) struct ActiveGuard(Arc<AtomicBool>);

impl ActiveGuard {
    fn claim(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Loads the content of a source file into a text sink.
///
/// The loader holds only weak references to both: the caller owns the sink
/// and the file. If the sink goes away during a load, the load still runs to
/// its end but writes nothing.
pub struct FileLoader<S: TextSink = TextBuffer> {
    sink: Weak<Mutex<S>>,
    file: Weak<dyn SourceFile>,
    location: Option<Arc<dyn Location>>,
    max_size: Option<u64>,
    chunk_size: usize,
    detection: DetectionConfig,
    mount_factory: Arc<dyn MountOperationFactory>,
    active: Arc<AtomicBool>,
}

impl<S: TextSink> FileLoader<S> {
    /// Create a loader. The location is taken from `file` now; a file
    /// without a location can still be given one with
    /// [`set_location`](Self::set_location).
    pub fn new(sink: Weak<Mutex<S>>, file: Weak<dyn SourceFile>) -> Self {
        let location = file.upgrade().and_then(|file| file.location());
        Self {
            sink,
            file,
            location,
            max_size: Some(DEFAULT_MAX_SIZE),
            chunk_size: DEFAULT_CHUNK_SIZE,
            detection: DetectionConfig::default(),
            mount_factory: Arc::new(NoInteraction),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Convenience constructor from strong references.
    pub fn for_file<F: SourceFile + 'static>(sink: &Arc<Mutex<S>>, file: &Arc<F>) -> Self {
        let file: Arc<dyn SourceFile> = file.clone();
        Self::new(Arc::downgrade(sink), Arc::downgrade(&file))
    }

    pub fn location(&self) -> Option<&Arc<dyn Location>> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: Option<Arc<dyn Location>>) {
        self.location = location;
    }

    pub fn max_size(&self) -> Option<u64> {
        self.max_size
    }

    /// Set the ceiling in its signed form: -1 means unbounded.
    pub fn set_max_size(&mut self, max_size: i64) -> LoadResult<()> {
        let limit = match max_size {
            -1 => None,
            n => Some(u64::try_from(n).map_err(|_| {
                LoadError::InvalidSetting(format!("max_size must be -1 or greater, got {n}"))
            })?),
        };
        self.set_max_size_limit(limit)
    }

    pub fn set_max_size_limit(&mut self, max_size: Option<u64>) -> LoadResult<()> {
        self.ensure_idle("max_size")?;
        self.max_size = max_size;
        Ok(())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn set_chunk_size(&mut self, chunk_size: usize) -> LoadResult<()> {
        if chunk_size == 0 {
            return Err(LoadError::InvalidSetting(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        self.ensure_idle("chunk_size")?;
        self.chunk_size = chunk_size;
        Ok(())
    }

    pub fn set_detection_config(&mut self, detection: DetectionConfig) {
        self.detection = detection;
    }

    pub fn set_mount_operation_factory(&mut self, factory: Arc<dyn MountOperationFactory>) {
        self.mount_factory = factory;
    }

    /// Apply the `[loader]` configuration section.
    pub fn configure(&mut self, settings: &LoaderSettings) -> LoadResult<()> {
        let chunk_size = usize::try_from(settings.chunk_size)
            .map_err(|_| LoadError::InvalidSetting(format!("chunk_size {} is too large", settings.chunk_size)))?;
        self.set_max_size(settings.max_size)?;
        self.set_chunk_size(chunk_size)
    }

    pub fn is_loading(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn ensure_idle(&self, setting: &str) -> LoadResult<()> {
        if self.is_loading() {
            return Err(LoadError::InvalidSetting(format!(
                "{setting} cannot change while a load is in progress"
            )));
        }
        Ok(())
    }

    /// Begin a load: claim the loader, clear the sink and return the
    /// operation ready to [`run`](LoadOperation::run).
    pub fn start(&self, options: LoadOptions) -> LoadResult<LoadOperation<S>> {
        let active = ActiveGuard::claim(&self.active).ok_or(LoadError::AlreadyInProgress)?;
        let location = self.location.clone().ok_or(LoadError::NoLocation)?;

        if let Some(sink) = self.sink.upgrade() {
            sink.lock().clear();
        }

        debug!(
            location = %location.display_name(),
            max_size = ?self.max_size,
            chunk_size = self.chunk_size,
            "starting load"
        );

        let request = LoadRequest {
            location,
            max_size: self.max_size,
            chunk_size: self.chunk_size,
            cancel: options.cancel,
            progress: options.progress,
        };
        Ok(LoadOperation::new(
            request,
            self.sink.clone(),
            self.file.clone(),
            self.mount_factory.clone(),
            self.detection,
            active,
        ))
    }

    /// Start a load and run it to completion.
    pub async fn load(&self, options: LoadOptions) -> LoadResult<LoadSummary> {
        self.start(options)?.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryFile, MemoryLocation};

    fn loader_for(content: &[u8]) -> (Arc<Mutex<TextBuffer>>, Arc<MemoryFile>, FileLoader) {
        let sink = Arc::new(Mutex::new(TextBuffer::new()));
        let file = Arc::new(MemoryFile::new(Arc::new(MemoryLocation::new(content.to_vec()))));
        let loader = FileLoader::for_file(&sink, &file);
        (sink, file, loader)
    }

    #[test]
    fn test_defaults() {
        let (_sink, _file, loader) = loader_for(b"");
        assert_eq!(loader.max_size(), Some(DEFAULT_MAX_SIZE));
        assert_eq!(loader.chunk_size(), DEFAULT_CHUNK_SIZE);
        assert!(loader.location().is_some());
        assert!(!loader.is_loading());
    }

    #[test]
    fn test_setting_validation() {
        let (_sink, _file, mut loader) = loader_for(b"");
        assert!(matches!(loader.set_max_size(-2), Err(LoadError::InvalidSetting(_))));
        assert!(matches!(loader.set_chunk_size(0), Err(LoadError::InvalidSetting(_))));

        loader.set_max_size(-1).unwrap();
        assert_eq!(loader.max_size(), None);
        loader.set_max_size(0).unwrap();
        assert_eq!(loader.max_size(), Some(0));
        loader.set_chunk_size(1).unwrap();
        assert_eq!(loader.chunk_size(), 1);

        loader.set_max_size_limit(Some(1024)).unwrap();
        assert_eq!(loader.max_size(), Some(1024));
        loader.set_max_size_limit(None).unwrap();
        assert_eq!(loader.max_size(), None);
    }

    #[test]
    fn test_settings_locked_while_loading() {
        let (_sink, _file, mut loader) = loader_for(b"abc");
        let operation = loader.start(LoadOptions::new()).unwrap();
        assert!(loader.is_loading());
        assert!(matches!(loader.set_max_size(10), Err(LoadError::InvalidSetting(_))));

        drop(operation);
        assert!(!loader.is_loading());
        loader.set_max_size(10).unwrap();
    }

    #[test]
    fn test_configure_applies_settings() {
        let (_sink, _file, mut loader) = loader_for(b"");
        let settings = LoaderSettings { max_size: -1, chunk_size: 7 };
        loader.configure(&settings).unwrap();
        assert_eq!(loader.max_size(), None);
        assert_eq!(loader.chunk_size(), 7);

        let invalid = LoaderSettings { max_size: -5, chunk_size: 7 };
        assert!(matches!(loader.configure(&invalid), Err(LoadError::InvalidSetting(_))));
        assert_eq!(loader.max_size(), None);
    }

    #[test]
    fn test_start_without_location() {
        let sink = Arc::new(Mutex::new(TextBuffer::new()));
        let loader: FileLoader = FileLoader::new(Arc::downgrade(&sink), Weak::<MemoryFile>::new());
        assert!(matches!(loader.start(LoadOptions::new()), Err(LoadError::NoLocation)));
        assert!(!loader.is_loading());
    }

    #[test]
    fn test_start_clears_sink() {
        let (sink, _file, loader) = loader_for(b"new");
        sink.lock().append_text("old content");
        let _operation = loader.start(LoadOptions::new()).unwrap();
        assert!(sink.lock().is_empty());
    }
}
