//! Fennec - Alopex Time Series Compression Core
//!
//! This crate provides the codec layer of the Alopex storage engine: it
//! packs `(series id, timestamp, value)` triples into compact byte blocks
//! and reconstructs them bit-exactly.
//!
//! # Components
//!
//! - [`ByteStreamWriter`] / [`ByteStreamReader`]: bounded byte windows
//! - [`DeltaRleWriter`] / [`DeltaRleReader`]: delta + run-length integers
//! - [`FcmStreamWriter`] / [`FcmStreamReader`]: predictive XOR doubles
//! - [`encode_block`] / [`decode_block`]: single-series containers
//! - [`encode_chunk`] / [`decode_chunk`]: multi-series column containers
//!
//! # Example
//!
//! ```rust,ignore
//! use fennec::{encode_block, decode_block, SeriesSlice, SeriesSliceMut};
//!
//! let ts = [1000u64, 1010, 1020];
//! let values = [0.5f64, 0.5, 0.75];
//! let mut slice = SeriesSlice::new(42, &ts, &values);
//!
//! // Encode into a page-sized window; the returned count and the advanced
//! // slice offset tell the caller how far the block got.
//! let mut block = vec![0u8; 4096];
//! let count = encode_block(&mut slice, &mut block)?;
//!
//! // Decode into caller-owned columns.
//! let mut out_ts = [0u64; 3];
//! let mut out_values = [0.0f64; 3];
//! let mut dest = SeriesSliceMut::new(&mut out_ts, &mut out_values);
//! decode_block(&block, &mut dest)?;
//! ```
//!
//! The codec is single-threaded and synchronous. It never allocates for the
//! compressed representation; every encoded byte lands in a window the
//! caller supplies.

#![deny(missing_docs)]

pub mod codec;
pub mod error;

pub use codec::{
    compress_doubles, convert_from_chunk_order, convert_from_time_order, decode_block,
    decode_chunk, decompress_doubles, encode_block, encode_chunk, number_of_elements_in_block,
    ByteStreamReader, ByteStreamWriter, ChunkSummary, ChunkWriter, DataBlockReader,
    DataBlockWriter, DeltaRleReader, DeltaRleWriter, DfcmPredictor, FcmPredictor, FcmStreamReader,
    FcmStreamWriter, ParamId, SeriesSlice, SeriesSliceMut, Timestamp, UncompressedChunk,
    BLOCK_VERSION, PREDICTOR_TABLE_SIZE,
};
pub use error::{CodecError, Result};
