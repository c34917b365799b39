//! Error and Result types for Fennec codec operations.

use thiserror::Error;

/// A convenience `Result` type for Fennec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// The error type for codec operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Output window exhausted. Recoverable: the element count backfilled
    /// into the block header reflects the samples that did fit, so the
    /// caller can persist the prefix and resume with the next block.
    #[error("Output buffer overflow after {written} bytes")]
    Overflow {
        /// Bytes successfully written before the overflow.
        written: usize,
    },

    /// Read past the end of the input window. Indicates a truncated or
    /// corrupted stream.
    #[error("Unexpected end of stream at offset {offset}")]
    UnexpectedEof {
        /// Reader position at the failed read.
        offset: usize,
    },

    /// Decode destination cannot hold the block's samples. Returned without
    /// touching the destination.
    #[error("Destination has room for {available} samples, block holds {required}")]
    DestinationTooSmall {
        /// Samples the block holds.
        required: usize,
        /// Samples the destination can accept.
        available: usize,
    },

    /// The compressed stream is structurally malformed.
    #[error("Malformed compressed stream: {0}")]
    BadData(String),

    /// The block carries a version tag this reader does not understand.
    #[error("Unsupported block version: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version this reader writes and accepts.
        expected: u16,
        /// Version found in the block header.
        actual: u16,
    },

    /// Chunk columns have diverging lengths.
    #[error("Column length mismatch: {paramids} ids, {timestamps} timestamps, {values} values")]
    ColumnMismatch {
        /// Length of the paramid column.
        paramids: usize,
        /// Length of the timestamp column.
        timestamps: usize,
        /// Length of the value column.
        values: usize,
    },
}
