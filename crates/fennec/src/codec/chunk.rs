//! Multi-series, column-oriented chunk container and row reordering.
//!
//! Chunk layout inside the window a [`ChunkWriter`] provides:
//!
//! ```text
//! u32  paramid stream size in bytes (backfilled)
//!      paramid body (delta-RLE)
//! u32  timestamp stream size in bytes (backfilled)
//!      timestamp body (delta-RLE)
//! u32  ncolumns (always 1)
//! u32  value element count (backfilled)
//!      value body (FCM)
//! ```
//!
//! The element count itself travels out-of-band: the encoder hands it back
//! in the [`ChunkSummary`] and a higher-level index stores it next to the
//! chunk. The decoder therefore reads exactly `nelements` values from each
//! stream and uses the byte-size prefixes only to validate that it consumed
//! what the encoder wrote.
//!
//! Chunk rows are expected ordered by `(paramid, timestamp)` when encoding;
//! the reordering helpers convert between that order and plain timestamp
//! order. Both sorts are stable, which keeps per-series timestamp order
//! intact when sorting by paramid.

use crate::codec::delta::{DeltaRleReader, DeltaRleWriter};
use crate::codec::fcm::{compress_doubles, decompress_doubles};
use crate::codec::stream::{ByteStreamReader, ByteStreamWriter};
use crate::codec::{Timestamp, UncompressedChunk};
use crate::error::{CodecError, Result};

/// Destination of an encoded chunk: a page (or any other owner of a byte
/// range) that hands out its free window and accepts a commit once the
/// encoder knows how many bytes it used.
pub trait ChunkWriter {
    /// The writable window for the next chunk.
    fn buffer(&mut self) -> &mut [u8];

    /// Seals `nbytes` of the window as the finished chunk.
    fn commit(&mut self, nbytes: usize) -> Result<()>;
}

/// What the encoder learned about a chunk, stored out-of-band by the
/// caller's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Number of rows in the chunk.
    pub n_elements: u32,
    /// Smallest timestamp across all rows.
    pub ts_begin: Timestamp,
    /// Largest timestamp across all rows.
    pub ts_end: Timestamp,
}

/// Encodes a chunk into the writer's window and commits it.
///
/// Returns the row count and the timestamp range. Fails with
/// [`CodecError::Overflow`] when the window is too small and
/// [`CodecError::ColumnMismatch`] when the columns are not parallel;
/// nothing is committed on failure.
pub fn encode_chunk<W: ChunkWriter>(
    writer: &mut W,
    data: &UncompressedChunk,
) -> Result<ChunkSummary> {
    if data.paramids.len() != data.timestamps.len() || data.paramids.len() != data.values.len() {
        return Err(CodecError::ColumnMismatch {
            paramids: data.paramids.len(),
            timestamps: data.timestamps.len(),
            values: data.values.len(),
        });
    }

    let mut ts_begin = Timestamp::MAX;
    let mut ts_end = Timestamp::MIN;
    let nbytes;
    {
        let mut stream = ByteStreamWriter::new(writer.buffer());

        // ParamId stream.
        let size_slot = stream.reserve_u32()?;
        let body_start = stream.size();
        let mut paramid_stream = DeltaRleWriter::new();
        for &id in &data.paramids {
            paramid_stream.put(&mut stream, id)?;
        }
        paramid_stream.commit(&mut stream)?;
        stream.fill_u32(&size_slot, (stream.size() - body_start) as u32);

        // Timestamp stream.
        let size_slot = stream.reserve_u32()?;
        let body_start = stream.size();
        let mut timestamp_stream = DeltaRleWriter::new();
        for &ts in &data.timestamps {
            ts_begin = ts_begin.min(ts);
            ts_end = ts_end.max(ts);
            timestamp_stream.put(&mut stream, ts)?;
        }
        timestamp_stream.commit(&mut stream)?;
        stream.fill_u32(&size_slot, (stream.size() - body_start) as u32);

        // Payload: column count, then the single doubles column.
        stream.put_u32(1)?;
        let count_slot = stream.reserve_u32()?;
        let nvalues = compress_doubles(&data.values, &mut stream)?;
        stream.fill_u32(&count_slot, nvalues);

        nbytes = stream.size();
    }
    writer.commit(nbytes)?;

    Ok(ChunkSummary {
        n_elements: data.paramids.len() as u32,
        ts_begin,
        ts_end,
    })
}

/// Decodes a chunk of `nelements` rows out of `buffer`.
///
/// `nelements` comes from the caller's index (or a block header); the chunk
/// itself only carries byte sizes. Any stream error surfaces as
/// [`CodecError::BadData`] or [`CodecError::UnexpectedEof`].
pub fn decode_chunk(buffer: &[u8], nelements: u32) -> Result<UncompressedChunk> {
    let mut stream = ByteStreamReader::new(buffer);
    let mut chunk = UncompressedChunk::with_capacity(nelements as usize);

    // ParamId stream.
    let declared = stream.read_u32()? as usize;
    let body_start = stream.pos();
    let mut paramid_stream = DeltaRleReader::new();
    for _ in 0..nelements {
        chunk.paramids.push(paramid_stream.next(&mut stream)?);
    }
    let consumed = stream.pos() - body_start;
    if consumed != declared {
        return Err(CodecError::BadData(format!(
            "paramid stream declared {declared} bytes, decoded {consumed}"
        )));
    }

    // Timestamp stream.
    let declared = stream.read_u32()? as usize;
    let body_start = stream.pos();
    let mut timestamp_stream = DeltaRleReader::new();
    for _ in 0..nelements {
        chunk.timestamps.push(timestamp_stream.next(&mut stream)?);
    }
    let consumed = stream.pos() - body_start;
    if consumed != declared {
        return Err(CodecError::BadData(format!(
            "timestamp stream declared {declared} bytes, decoded {consumed}"
        )));
    }

    // Payload.
    let _ncolumns = stream.read_u32()?;
    let nvalues = stream.read_u32()?;
    if nvalues != nelements {
        return Err(CodecError::BadData(format!(
            "value stream holds {nvalues} elements, index promised {nelements}"
        )));
    }
    decompress_doubles(&mut stream, nvalues, &mut chunk.values)?;

    Ok(chunk)
}

fn reorder_chunk<K, F>(input: &UncompressedChunk, key: F) -> Result<UncompressedChunk>
where
    K: Ord,
    F: Fn(usize) -> K,
{
    let len = input.timestamps.len();
    if len != input.paramids.len() || len != input.values.len() {
        return Err(CodecError::ColumnMismatch {
            paramids: input.paramids.len(),
            timestamps: input.timestamps.len(),
            values: input.values.len(),
        });
    }
    let mut index: Vec<usize> = (0..len).collect();
    // Stable: rows with equal keys keep their input order.
    index.sort_by_key(|&row| key(row));

    let mut out = UncompressedChunk::with_capacity(len);
    for row in index {
        out.push(input.paramids[row], input.timestamps[row], input.values[row]);
    }
    Ok(out)
}

/// Permutes `(paramid, timestamp)`-ordered rows into plain timestamp order.
pub fn convert_from_chunk_order(input: &UncompressedChunk) -> Result<UncompressedChunk> {
    reorder_chunk(input, |row| input.timestamps[row])
}

/// Permutes timestamp-ordered rows into `(paramid, timestamp)` order. The
/// stable sort preserves each series' internal timestamp order.
pub fn convert_from_time_order(input: &UncompressedChunk) -> Result<UncompressedChunk> {
    reorder_chunk(input, |row| input.paramids[row])
}
