//! Single-series block container.
//!
//! A block packs one series' samples into a caller-provided byte window:
//!
//! ```text
//! Offset  Size    Field
//! ------  ----    -----
//! 0x00    2       version (u16 LE)
//! 0x02    4       count (u32 LE, backfilled)
//! 0x06    8       series_id (u64 LE)
//! 0x0E    ...     timestamps (delta-RLE) interleaved with values (FCM)
//! ```
//!
//! Samples travel in batches of [`BATCH_SIZE`]: a batch of compressed
//! timestamps, then the matching batch of compressed values, repeated; the
//! leftover tail goes one by one, timestamps first. A batch that does not
//! fit ends the block early and the backfilled count tells the reader how
//! many samples the stream actually holds, so a too-small window costs a
//! short block rather than an error.
//!
//! The v2 writer ([`DataBlockWriter`]) accepts samples one at a time,
//! buffering one column batch in memory. When the window can no longer
//! absorb a worst-case batch, further samples are appended raw behind the
//! compressed portion; the header tracks both element counts.

use crate::codec::delta::{DeltaRleReader, DeltaRleWriter};
use crate::codec::fcm::{FcmStreamReader, FcmStreamWriter};
use crate::codec::stream::{ByteStreamReader, ByteStreamWriter, ReservedSlot};
use crate::codec::{ParamId, SeriesSlice, SeriesSliceMut, Timestamp, BLOCK_VERSION};
use crate::error::{CodecError, Result};
use tracing::{debug, warn};

/// Samples per interleaved batch.
pub const BATCH_SIZE: usize = 16;

/// Samples per v2 column buffer. Must be a power of two.
const CHUNK_SIZE: usize = 16;
const CHUNK_MASK: usize = CHUNK_SIZE - 1;

/// Worst case output for one buffered batch: ten-byte varint frames for
/// every timestamp plus eight flag bytes and sixteen full diffs for the
/// values. A window that still has this much room cannot overflow on flush.
const CHUNK_MARGIN: usize = 10 * CHUNK_SIZE + 9 * CHUNK_SIZE;

/// Encodes samples from `slice` into `buffer`, starting at `slice.offset`.
///
/// Returns the number of samples encoded and advances `slice.offset` by the
/// same amount. The count lands in the header, so the block stays
/// self-describing even when the window fills early; a window too small for
/// the 14-byte header is the only hard failure.
pub fn encode_block(slice: &mut SeriesSlice<'_>, buffer: &mut [u8]) -> Result<u32> {
    let mut stream = ByteStreamWriter::new(buffer);
    stream.put_u16(BLOCK_VERSION)?;
    let count_slot = stream.reserve_u32()?;
    stream.put_u64(slice.id)?;

    let mut tstream = DeltaRleWriter::new();
    let mut vstream = FcmStreamWriter::new();

    let remaining = slice.remaining();
    let nbatches = remaining / BATCH_SIZE;
    let tailsize = remaining % BATCH_SIZE;
    let mut count = 0usize;
    let mut filled = false;

    for batch in 0..nbatches {
        let start = slice.offset + batch * BATCH_SIZE;
        let ts = &slice.ts[start..start + BATCH_SIZE];
        let values = &slice.values[start..start + BATCH_SIZE];
        if tstream.tput(&mut stream, ts).is_err() || vstream.tput(&mut stream, values).is_err() {
            filled = true;
            break;
        }
        count += BATCH_SIZE;
    }

    if !filled && tailsize > 0 {
        let start = slice.offset + count;
        if write_tail(
            &mut stream,
            &mut tstream,
            &mut vstream,
            &slice.ts[start..start + tailsize],
            &slice.values[start..start + tailsize],
        )
        .is_ok()
        {
            count += tailsize;
        }
    }

    if count != remaining {
        debug!(count, requested = remaining, "block filled before slice was exhausted");
    }

    stream.fill_u32(&count_slot, count as u32);
    slice.offset += count;
    Ok(count as u32)
}

/// The tail is all-or-nothing: timestamps for samples the value stream
/// cannot hold would desynchronize the interleaved layout, so a tail that
/// overflows anywhere contributes nothing to the count and the bytes it
/// left behind sit past everything the header admits to.
fn write_tail(
    stream: &mut ByteStreamWriter<'_>,
    tstream: &mut DeltaRleWriter,
    vstream: &mut FcmStreamWriter,
    ts: &[Timestamp],
    values: &[f64],
) -> Result<()> {
    for &t in ts {
        tstream.put(stream, t)?;
    }
    tstream.commit(stream)?;
    for &v in values {
        vstream.put(stream, v)?;
    }
    vstream.commit(stream)
}

/// Decodes a block into `dest`, starting at `dest.offset`.
///
/// Returns the sample count from the header and advances `dest.offset` by
/// it. Fails with [`CodecError::VersionMismatch`] on an unknown version tag
/// and [`CodecError::DestinationTooSmall`] (without touching `dest`) when
/// the destination cannot hold the block's samples.
pub fn decode_block(buffer: &[u8], dest: &mut SeriesSliceMut<'_>) -> Result<u32> {
    let mut stream = ByteStreamReader::new(buffer);
    let version = stream.read_u16()?;
    if version != BLOCK_VERSION {
        warn!(version, expected = BLOCK_VERSION, "rejecting block with unknown version");
        return Err(CodecError::VersionMismatch {
            expected: BLOCK_VERSION,
            actual: version,
        });
    }
    let count = stream.read_u32()?;
    let id = stream.read_u64()?;

    let nitems = count as usize;
    if dest.remaining() < nitems {
        return Err(CodecError::DestinationTooSmall {
            required: nitems,
            available: dest.remaining(),
        });
    }
    dest.id = id;

    let mut tstream = DeltaRleReader::new();
    let mut vstream = FcmStreamReader::new();

    let nbatches = nitems / BATCH_SIZE;
    let tailsize = nitems % BATCH_SIZE;
    let base = dest.offset;

    for batch in 0..nbatches {
        let start = base + batch * BATCH_SIZE;
        for i in 0..BATCH_SIZE {
            dest.ts[start + i] = tstream.next(&mut stream)?;
        }
        for i in 0..BATCH_SIZE {
            dest.values[start + i] = vstream.next(&mut stream)?;
        }
    }

    let start = base + nbatches * BATCH_SIZE;
    for i in 0..tailsize {
        dest.ts[start + i] = tstream.next(&mut stream)?;
    }
    for i in 0..tailsize {
        dest.values[start + i] = vstream.next(&mut stream)?;
    }

    dest.offset += nitems;
    Ok(count)
}

/// Reads the element count out of a block header without decoding the body.
pub fn number_of_elements_in_block(buffer: &[u8]) -> Result<u32> {
    let mut stream = ByteStreamReader::new(buffer);
    let _version = stream.read_u16()?;
    stream.read_u32()
}

/// Incremental single-series block writer with a column write buffer.
///
/// Header layout:
///
/// ```text
/// Offset  Size    Field
/// ------  ----    -----
/// 0x00    2       version (u16 LE)
/// 0x02    2       main_size (u16 LE, backfilled by close)
/// 0x04    2       tail_size (u16 LE, backfilled by close)
/// 0x06    8       series_id (u64 LE)
/// ```
///
/// `main_size` counts compressed samples (always a whole number of
/// batches), `tail_size` counts raw `(u64, f64)` samples appended after the
/// compressed portion once the window is nearly full.
#[derive(Debug)]
pub struct DataBlockWriter<'a> {
    stream: ByteStreamWriter<'a>,
    ts_stream: DeltaRleWriter,
    val_stream: FcmStreamWriter,
    ts_writebuf: [Timestamp; CHUNK_SIZE],
    val_writebuf: [f64; CHUNK_SIZE],
    write_index: usize,
    main_slot: ReservedSlot,
    tail_slot: ReservedSlot,
    main_size: u16,
    tail_size: u16,
}

impl<'a> DataBlockWriter<'a> {
    /// Creates a writer and emits the header. Fails with
    /// [`CodecError::Overflow`] when the window cannot hold the header.
    pub fn new(id: ParamId, buffer: &'a mut [u8]) -> Result<Self> {
        let mut stream = ByteStreamWriter::new(buffer);
        stream.put_u16(BLOCK_VERSION)?;
        let main_slot = stream.reserve_u16()?;
        let tail_slot = stream.reserve_u16()?;
        stream.put_u64(id)?;
        Ok(Self {
            stream,
            ts_stream: DeltaRleWriter::new(),
            val_stream: FcmStreamWriter::new(),
            ts_writebuf: [0; CHUNK_SIZE],
            val_writebuf: [0.0; CHUNK_SIZE],
            write_index: 0,
            main_slot,
            tail_slot,
            main_size: 0,
            tail_size: 0,
        })
    }

    /// Appends one sample.
    ///
    /// While the window has room for a worst-case batch the sample goes
    /// through the column buffer and the compressors; afterwards it is
    /// appended raw. [`CodecError::Overflow`] means the block is full and
    /// the sample was not accepted.
    pub fn put(&mut self, ts: Timestamp, value: f64) -> Result<()> {
        if self.room_for_chunk() {
            self.ts_writebuf[self.write_index & CHUNK_MASK] = ts;
            self.val_writebuf[self.write_index & CHUNK_MASK] = value;
            self.write_index += 1;
            if self.write_index & CHUNK_MASK == 0 {
                // room_for_chunk guaranteed space for a full flush.
                self.ts_stream.tput(&mut self.stream, &self.ts_writebuf)?;
                self.val_stream.tput(&mut self.stream, &self.val_writebuf)?;
                self.main_size += CHUNK_SIZE as u16;
            }
            Ok(())
        } else {
            // Raw writes begin only once the column buffer is empty: the
            // free space is constant between flushes, so the margin check
            // cannot flip while a batch is partially buffered.
            debug_assert_eq!(self.write_index & CHUNK_MASK, 0);
            self.stream.put_u64(ts)?;
            self.stream.put_f64(value)?;
            self.tail_size += 1;
            Ok(())
        }
    }

    /// Finalizes the block: flushes buffered samples as raw tail entries
    /// and backfills both header counts. Returns the total element count.
    pub fn close(&mut self) -> Result<u32> {
        let leftover = self.write_index & CHUNK_MASK;
        for i in 0..leftover {
            // The margin that admitted these samples covers their raw size.
            self.stream.put_u64(self.ts_writebuf[i])?;
            self.stream.put_f64(self.val_writebuf[i])?;
            self.tail_size += 1;
        }
        self.write_index -= leftover;
        self.stream.fill_u16(&self.main_slot, self.main_size);
        self.stream.fill_u16(&self.tail_slot, self.tail_size);
        Ok(self.count())
    }

    /// Total samples accepted so far, compressed plus raw.
    pub fn count(&self) -> u32 {
        u32::from(self.main_size) + u32::from(self.tail_size) + (self.write_index & CHUNK_MASK) as u32
    }

    /// Bytes written to the window.
    pub fn size(&self) -> usize {
        self.stream.size()
    }

    fn room_for_chunk(&self) -> bool {
        self.stream.space_left() >= CHUNK_MARGIN
    }
}

/// Reader for blocks produced by [`DataBlockWriter`]. Decompresses the main
/// portion batch by batch, then yields the raw tail.
#[derive(Debug)]
pub struct DataBlockReader<'a> {
    stream: ByteStreamReader<'a>,
    ts_stream: DeltaRleReader,
    val_stream: FcmStreamReader,
    ts_readbuf: [Timestamp; CHUNK_SIZE],
    val_readbuf: [f64; CHUNK_SIZE],
    read_index: usize,
    id: ParamId,
    main_size: u16,
    tail_size: u16,
}

impl<'a> DataBlockReader<'a> {
    /// Creates a reader over an encoded block, validating the version tag.
    pub fn new(buffer: &'a [u8]) -> Result<Self> {
        let mut stream = ByteStreamReader::new(buffer);
        let version = stream.read_u16()?;
        if version != BLOCK_VERSION {
            return Err(CodecError::VersionMismatch {
                expected: BLOCK_VERSION,
                actual: version,
            });
        }
        let main_size = stream.read_u16()?;
        let tail_size = stream.read_u16()?;
        let id = stream.read_u64()?;
        Ok(Self {
            stream,
            ts_stream: DeltaRleReader::new(),
            val_stream: FcmStreamReader::new(),
            ts_readbuf: [0; CHUNK_SIZE],
            val_readbuf: [0.0; CHUNK_SIZE],
            read_index: 0,
            id,
            main_size,
            tail_size,
        })
    }

    /// Series id from the header.
    pub fn id(&self) -> ParamId {
        self.id
    }

    /// Total samples in the block, compressed plus raw.
    pub fn count(&self) -> u32 {
        u32::from(self.main_size) + u32::from(self.tail_size)
    }

    /// Yields the next sample, or `None` past the end of the block.
    pub fn next(&mut self) -> Result<Option<(Timestamp, f64)>> {
        if self.read_index < usize::from(self.main_size) {
            let slot = self.read_index & CHUNK_MASK;
            if slot == 0 {
                for i in 0..CHUNK_SIZE {
                    self.ts_readbuf[i] = self.ts_stream.next(&mut self.stream)?;
                }
                for i in 0..CHUNK_SIZE {
                    self.val_readbuf[i] = self.val_stream.next(&mut self.stream)?;
                }
            }
            self.read_index += 1;
            Ok(Some((self.ts_readbuf[slot], self.val_readbuf[slot])))
        } else if self.read_index < self.count() as usize {
            let ts = self.stream.read_u64()?;
            let value = self.stream.read_f64()?;
            self.read_index += 1;
            Ok(Some((ts, value)))
        } else {
            Ok(None)
        }
    }
}
