//! # tome_fs - Asynchronous text file loading for tome
//!
//! Streams a file from a possibly unmounted location into a text buffer,
//! detecting its character encoding along the way.
//!
//! Modules:
//! - `bom` for BOM detection (UTF-8/16/32)
//! - `encoding` for the incremental charset sniffer (BOMs, UTF-16, UTF-8, legacy charsets via chardetng)
//! - `loader` for the load pipeline and [`FileLoader`]
//! - `location` for the source side ([`Location`], [`SourceFile`])
//! - `sink` and `buffer` for the destination side
//! - `testing` for in-memory collaborators

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod bom;
mod buffer;
pub mod encoding;
mod error;
pub mod loader;
mod location;
mod sink;
pub mod testing;

pub use bom::{BomDetectionResult, detect_bom};
pub use buffer::TextBuffer;
pub use encoding::{CharsetSniffer, DetectionConfig, Encoding, sniff};
pub use error::{ConversionError, LoadError, LoadResult};
pub use loader::{
    ConversionSession, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_SIZE, FileLoader, LoadOperation,
    LoadOptions, LoadState, LoadSummary, MountCredentials, MountOperation,
    MountOperationFactory, NoInteraction, ProgressCallback, ProgressState, format_size,
};
pub use location::{ByteStream, FileInfo, LocalFile, LocalLocation, Location, QueryError, SourceFile};
pub use sink::TextSink;
