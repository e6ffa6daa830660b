//! Error types for archive parsing and entry extraction.
//!
//! Parse errors abort construction of an [`Archive`](super::Archive)
//! entirely. Extraction errors are scoped to one entry and always carry
//! its directory index and name.

use thiserror::Error;

use crate::codec::{CodecError, DecodeError};

use super::structures::Compression;

/// Errors raised while parsing the header and directory.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A fixed-width field or byte span would read past the buffer end.
    #[error("truncated input: needed {needed} bytes at offset {offset}, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A directory name has no null terminator before the buffer end.
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    /// No header interpretation yields a data block inside the buffer.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A directory record is structurally invalid.
    #[error("invalid directory entry #{index} ({name}): {reason}")]
    InvalidDirectory {
        index: usize,
        name: String,
        reason: String,
    },

    /// An entry's region extends past the end of the buffer.
    #[error("entry #{index} ({name}) ends at {end}, past the archive end at {len}")]
    EntryOutOfBounds {
        index: usize,
        name: String,
        end: u64,
        len: usize,
    },
}

/// A name lookup found no matching entry.
#[derive(Debug, Error)]
#[error("no entry named {0:?}")]
pub struct NotFound(pub String);

/// Errors raised while extracting a single entry.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// The entry's region does not fit inside the current byte source.
    #[error("entry #{index} ({name}) ends at {end}, past the source end at {len}")]
    OutOfBounds {
        index: usize,
        name: String,
        end: u64,
        len: usize,
    },

    /// The declared expanded size disagrees with the decoded length.
    #[error("entry #{index} ({name}): declared size {declared} but decoded {actual} bytes")]
    SizeMismatch {
        index: usize,
        name: String,
        declared: u32,
        actual: usize,
    },

    /// The decompressor rejected the stored bytes.
    #[error("entry #{index} ({name}): {codec} decoding failed: {source}")]
    CodecFailure {
        index: usize,
        name: String,
        codec: Compression,
        #[source]
        source: CodecError,
    },
}

impl ExtractError {
    /// Attach entry context to a dispatcher failure.
    pub(crate) fn from_decode(index: usize, name: &str, err: DecodeError) -> Self {
        let name = name.to_owned();
        match err {
            DecodeError::SizeMismatch { declared, actual } => ExtractError::SizeMismatch {
                index,
                name,
                declared,
                actual,
            },
            DecodeError::Codec { codec, source } => ExtractError::CodecFailure {
                index,
                name,
                codec,
                source,
            },
        }
    }
}
