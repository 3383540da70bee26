use std::io;

use thiserror::Error;

/// Result type for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Terminal errors of a load operation.
///
/// `AlreadyInProgress`, `NoLocation` and `InvalidSetting` are returned
/// synchronously by [`FileLoader`](crate::FileLoader) methods; every other
/// variant is the outcome of an asynchronous step.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The file is too big. Maximum {max} can be loaded.")]
    TooBig { size: u64, max: String },

    #[error("The location is not mounted: {0}")]
    NotMounted(String),

    #[error("Mounting the enclosing volume failed: {0}")]
    MountFailed(#[source] io::Error),

    #[error("Querying file information failed: {0}")]
    QueryFailed(#[source] io::Error),

    #[error("Reading the file failed: {0}")]
    ReadFailed(#[source] io::Error),

    #[error("It is not possible to detect the character encoding automatically.")]
    EncodingAutoDetectionFailed,

    #[error("Conversion failed: {0}")]
    ConversionFailed(#[from] ConversionError),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Several load operations in parallel with the same loader are not possible")]
    AlreadyInProgress,

    #[error("No location to load from")]
    NoLocation,

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

impl LoadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoadError::Cancelled)
    }
}

/// Errors of a charset conversion session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Conversion from character set '{0}' to 'UTF-8' is not supported")]
    UnsupportedCharset(String),

    #[error("Invalid byte sequence in conversion input at offset {offset}")]
    InvalidSequence { offset: u64 },

    #[error("Partial character sequence at end of input")]
    PartialInput,
}
