use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnpackError {
    /// No `ANDROID!` signature within the first `limit` bytes.
    #[error("Android boot magic not found within {limit} bytes")]
    MagicNotFound { limit: u64 },
    #[error("Invalid magic number")]
    InvalidMagic,
    /// A header or segment declares more bytes than the stream still holds.
    #[error("Truncated input: {what} at offset {offset} needs {expected} bytes, {available} available")]
    TruncatedInput {
        what:      String,
        offset:    u64,
        expected:  u64,
        available: u64,
    },
    #[error("Invalid page size: {0} (must be a non-zero power of two)")]
    InvalidPageSize(u32),
    /// The sink refused a commit.
    #[error("Cannot write {name}: {source}")]
    InvalidOutputTarget {
        name:   String,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl UnpackError {
    pub(crate) fn truncated(what: impl Into<String>, offset: u64, expected: u64, available: u64) -> Self {
        UnpackError::TruncatedInput {
            what: what.into(),
            offset,
            expected,
            available,
        }
    }
}
