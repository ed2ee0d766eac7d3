//! Error types for replay decoding
//!
//! Every decode returns a typed [`ReplayError`]. A failing file is skipped by
//! the selector; it never aborts the scan of other candidates.

use std::io;

/// Errors produced while reading or validating a replay
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// File missing or unreadable
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Bad magic, unsupported version, bad section tag or corrupt string
    #[error("format error: {0}")]
    Format(String),

    /// Decoded content that is internally inconsistent
    #[error("data error: {0}")]
    Data(String),

    /// LZMA stream could not be decompressed
    #[error("decompression failed: {0}")]
    Decompress(String),
}

impl ReplayError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        ReplayError::Format(msg.into())
    }

    pub(crate) fn data(msg: impl Into<String>) -> Self {
        ReplayError::Data(msg.into())
    }

    /// True for errors caused by the file contents rather than the filesystem
    pub fn is_format(&self) -> bool {
        matches!(self, ReplayError::Format(_) | ReplayError::Decompress(_))
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ReplayError>;
