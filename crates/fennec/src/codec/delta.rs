//! Delta + run-length codec for unsigned integer sequences.
//!
//! Timestamps and series ids are monotone or near-monotone, so consecutive
//! deltas repeat heavily. The writer subtracts the previous value (wrapping)
//! and collapses equal deltas into runs; each run goes to the byte stream as
//! a `[LEB128 run length][LEB128 delta]` frame.
//!
//! `commit` flushes the pending run and never lets a run span a commit
//! boundary. The block container interleaves timestamp and value batches in
//! one byte stream, so a reader that consumes exactly the values written
//! between two commits also consumes exactly the bytes written between them
//! and stays in lock-step with the other stream.
//!
//! The previous-value register survives commits: deltas chain across batch
//! boundaries on both sides of the wire.

use crate::codec::stream::{ByteStreamReader, ByteStreamWriter};
use crate::error::{CodecError, Result};

/// Longest LEB128 encoding of a `u64`.
const MAX_VARINT_LEN: usize = 10;

fn encode_varint(mut value: u64, buf: &mut [u8]) -> usize {
    let mut len = 0;
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf[len] = byte;
            len += 1;
            return len;
        }
        buf[len] = byte | 0x80;
        len += 1;
    }
}

fn read_varint(stream: &mut ByteStreamReader<'_>) -> Result<u64> {
    let mut value = 0u64;
    for shift in 0..MAX_VARINT_LEN {
        let byte = stream.read_u8()?;
        value |= u64::from(byte & 0x7F) << (shift * 7);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::BadData(
        "varint exceeds 10 bytes in delta stream".to_string(),
    ))
}

/// Streaming delta + run-length writer.
///
/// The writer holds no reference to the output; every call takes the byte
/// stream it shares with the other codecs of the block.
#[derive(Debug, Default)]
pub struct DeltaRleWriter {
    prev: u64,
    run_delta: u64,
    run_len: u64,
}

impl DeltaRleWriter {
    /// Creates a writer with a zero previous-value register.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one value.
    ///
    /// A value that extends the current run costs no output bytes; a value
    /// that breaks it flushes the run first. On overflow the pending run and
    /// the previous-value register are left untouched and the value is not
    /// consumed.
    pub fn put(&mut self, stream: &mut ByteStreamWriter<'_>, value: u64) -> Result<()> {
        let delta = value.wrapping_sub(self.prev);
        if self.run_len > 0 && delta == self.run_delta {
            self.run_len += 1;
        } else {
            self.flush_run(stream)?;
            self.run_delta = delta;
            self.run_len = 1;
        }
        self.prev = value;
        Ok(())
    }

    /// Appends a batch of values and commits, producing a self-delimiting
    /// frame sequence for the batch.
    pub fn tput(&mut self, stream: &mut ByteStreamWriter<'_>, values: &[u64]) -> Result<()> {
        for &value in values {
            self.put(stream, value)?;
        }
        self.commit(stream)
    }

    /// Flushes the pending run.
    pub fn commit(&mut self, stream: &mut ByteStreamWriter<'_>) -> Result<()> {
        self.flush_run(stream)
    }

    fn flush_run(&mut self, stream: &mut ByteStreamWriter<'_>) -> Result<()> {
        if self.run_len == 0 {
            return Ok(());
        }
        let mut frame = [0u8; 2 * MAX_VARINT_LEN];
        let mut len = encode_varint(self.run_len, &mut frame);
        len += encode_varint(self.run_delta, &mut frame[len..]);
        stream.put_bytes(&frame[..len])?;
        self.run_len = 0;
        Ok(())
    }
}

/// Streaming delta + run-length reader. Yields values in write order.
#[derive(Debug, Default)]
pub struct DeltaRleReader {
    prev: u64,
    run_delta: u64,
    run_left: u64,
}

impl DeltaRleReader {
    /// Creates a reader with a zero previous-value register.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the next value.
    pub fn next(&mut self, stream: &mut ByteStreamReader<'_>) -> Result<u64> {
        if self.run_left == 0 {
            let run_len = read_varint(stream)?;
            if run_len == 0 {
                return Err(CodecError::BadData(
                    "zero length run in delta stream".to_string(),
                ));
            }
            self.run_left = run_len;
            self.run_delta = read_varint(stream)?;
        }
        self.run_left -= 1;
        self.prev = self.prev.wrapping_add(self.run_delta);
        Ok(self.prev)
    }
}
