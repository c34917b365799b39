//! Compression codecs for time series columns.
//!
//! A sample is a `(series id, timestamp, value)` triple. Two containers pack
//! samples into caller-provided byte windows:
//!
//! - [`encode_block`] / [`decode_block`]: one series, timestamps and values
//!   interleaved in batches;
//! - [`encode_chunk`] / [`decode_chunk`]: many series, column-oriented with
//!   size-prefixed streams.
//!
//! Timestamps and series ids go through a delta + run-length codec
//! ([`delta`]); values go through a predictive XOR codec ([`fcm`]). Both sit
//! on the bounded byte stream of [`stream`]. Row reordering helpers
//! ([`convert_from_chunk_order`], [`convert_from_time_order`]) prepare chunk
//! data for encoding.
//!
//! Everything here is single-threaded and synchronous; no codec owns memory
//! beyond its own small state, and two encodes over distinct windows never
//! share state.

pub mod block;
pub mod chunk;
pub mod delta;
pub mod fcm;
pub mod stream;

pub use block::{
    decode_block, encode_block, number_of_elements_in_block, DataBlockReader, DataBlockWriter,
    BATCH_SIZE,
};
pub use chunk::{
    convert_from_chunk_order, convert_from_time_order, decode_chunk, encode_chunk, ChunkSummary,
    ChunkWriter,
};
pub use delta::{DeltaRleReader, DeltaRleWriter};
pub use fcm::{
    compress_doubles, decompress_doubles, DfcmPredictor, FcmPredictor, FcmStreamReader,
    FcmStreamWriter, PREDICTOR_TABLE_SIZE,
};
pub use stream::{ByteStreamReader, ByteStreamWriter, ReservedSlot};

/// Series identifier.
pub type ParamId = u64;

/// Timestamp, monotone within a series.
pub type Timestamp = u64;

/// Version tag written into every block header. Readers reject any block
/// whose tag differs.
pub const BLOCK_VERSION: u16 = 2;

/// Read-only view over one series' parallel columns.
///
/// `offset` is the resume cursor: the encoder advances it by the number of
/// samples that made it into the output window, so a caller whose slice did
/// not fit one block hands the same slice to the next block and continues
/// where the previous encode stopped.
#[derive(Debug)]
pub struct SeriesSlice<'a> {
    /// Series identifier.
    pub id: ParamId,
    /// Timestamp column.
    pub ts: &'a [Timestamp],
    /// Value column, parallel to `ts`.
    pub values: &'a [f64],
    /// Index of the first sample not yet encoded.
    pub offset: usize,
}

impl<'a> SeriesSlice<'a> {
    /// Creates a slice over two parallel columns with the cursor at zero.
    pub fn new(id: ParamId, ts: &'a [Timestamp], values: &'a [f64]) -> Self {
        debug_assert_eq!(ts.len(), values.len());
        Self {
            id,
            ts,
            values,
            offset: 0,
        }
    }

    /// Logical length of the slice.
    pub fn len(&self) -> usize {
        self.ts.len()
    }

    /// Returns true when the slice holds no samples.
    pub fn is_empty(&self) -> bool {
        self.ts.is_empty()
    }

    /// Samples between the cursor and the end of the slice.
    pub fn remaining(&self) -> usize {
        self.ts.len().saturating_sub(self.offset)
    }
}

/// Mutable counterpart of [`SeriesSlice`], the destination of a block
/// decode. The decoder advances `offset` past the samples it produced.
#[derive(Debug)]
pub struct SeriesSliceMut<'a> {
    /// Series identifier, filled in from the block header.
    pub id: ParamId,
    /// Timestamp column.
    pub ts: &'a mut [Timestamp],
    /// Value column, parallel to `ts`.
    pub values: &'a mut [f64],
    /// Index of the first free sample slot.
    pub offset: usize,
}

impl<'a> SeriesSliceMut<'a> {
    /// Creates a destination slice with the cursor at zero.
    pub fn new(ts: &'a mut [Timestamp], values: &'a mut [f64]) -> Self {
        debug_assert_eq!(ts.len(), values.len());
        Self {
            id: 0,
            ts,
            values,
            offset: 0,
        }
    }

    /// Logical capacity of the destination.
    pub fn len(&self) -> usize {
        self.ts.len()
    }

    /// Returns true when the destination has no capacity.
    pub fn is_empty(&self) -> bool {
        self.ts.is_empty()
    }

    /// Free sample slots past the cursor.
    pub fn remaining(&self) -> usize {
        self.ts.len().saturating_sub(self.offset)
    }
}

/// Column-oriented, uncompressed multi-series data: three parallel columns
/// of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UncompressedChunk {
    /// Series id of each row.
    pub paramids: Vec<ParamId>,
    /// Timestamp of each row.
    pub timestamps: Vec<Timestamp>,
    /// Value of each row.
    pub values: Vec<f64>,
}

impl UncompressedChunk {
    /// Creates an empty chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty chunk with reserved capacity in all three columns.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            paramids: Vec::with_capacity(capacity),
            timestamps: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Appends one row, keeping the columns parallel.
    pub fn push(&mut self, paramid: ParamId, timestamp: Timestamp, value: f64) {
        self.paramids.push(paramid);
        self.timestamps.push(timestamp);
        self.values.push(value);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.paramids.len()
    }

    /// Returns true when the chunk holds no rows.
    pub fn is_empty(&self) -> bool {
        self.paramids.is_empty()
    }
}
