//! Property-based tests for the Fennec codecs.
//!
//! Uses proptest to verify lossless round-trips for arbitrary data. Values
//! are compared through their bit patterns: the codec contract is bit-exact
//! reconstruction, not numeric equality.

use fennec::{
    convert_from_chunk_order, convert_from_time_order, decode_block, decode_chunk, encode_block,
    encode_chunk, number_of_elements_in_block, ChunkWriter, DataBlockReader, DataBlockWriter,
    Result, SeriesSlice, SeriesSliceMut, Timestamp, UncompressedChunk,
};
use proptest::prelude::*;

/// Chunk writer over a plain in-memory window, standing in for a page.
struct VecChunkWriter {
    buf: Vec<u8>,
    committed: Option<usize>,
}

impl VecChunkWriter {
    fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            committed: None,
        }
    }

    fn chunk(&self) -> &[u8] {
        &self.buf[..self.committed.expect("commit was called")]
    }
}

impl ChunkWriter for VecChunkWriter {
    fn buffer(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    fn commit(&mut self, nbytes: usize) -> Result<()> {
        self.committed = Some(nbytes);
        Ok(())
    }
}

/// Strategy for monotone timestamps with bounded deltas.
fn timestamp_strategy() -> impl Strategy<Value = Vec<Timestamp>> {
    (
        0u64..1_000_000_000_000u64,
        prop::collection::vec(1u64..1_000_000_000, 1..100),
    )
        .prop_map(|(base, deltas)| {
            let mut timestamps = vec![base];
            let mut current = base;
            for delta in deltas {
                current = current.saturating_add(delta);
                timestamps.push(current);
            }
            timestamps
        })
}

/// Strategy for arbitrary finite and non-finite values, by bit pattern.
fn value_bits_strategy(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(any::<u64>().prop_map(f64::from_bits), len)
}

/// Strategy for chunks in `(paramid, timestamp)` order.
fn chunk_strategy() -> impl Strategy<Value = UncompressedChunk> {
    (
        prop::collection::vec((1u64..8, 1u64..100), 1..64),
        0u64..1_000_000,
    )
        .prop_map(|(rows, base)| {
            let mut sorted = rows;
            sorted.sort();
            let mut chunk = UncompressedChunk::new();
            for (i, (id, tick)) in sorted.into_iter().enumerate() {
                chunk.push(id, base + tick, (i as f64) * 1.25 - 7.0);
            }
            chunk
        })
}

fn block_roundtrip(id: u64, ts: &[Timestamp], values: &[f64]) -> (u64, Vec<Timestamp>, Vec<f64>) {
    let mut slice = SeriesSlice::new(id, ts, values);
    let mut buffer = vec![0u8; 64 + ts.len() * 20];
    let count = encode_block(&mut slice, &mut buffer).expect("encode");
    assert_eq!(count as usize, ts.len(), "window was large enough");

    let mut out_ts = vec![0u64; ts.len()];
    let mut out_values = vec![0.0f64; ts.len()];
    let mut dest = SeriesSliceMut::new(&mut out_ts, &mut out_values);
    let decoded = decode_block(&buffer, &mut dest).expect("decode");
    assert_eq!(decoded, count);
    let dest_id = dest.id;
    (dest_id, out_ts, out_values)
}

proptest! {
    /// Block round-trips are lossless for monotone timestamps.
    #[test]
    fn test_block_timestamp_roundtrip(ts in timestamp_strategy()) {
        let values = vec![1.0f64; ts.len()];
        let (id, out_ts, _) = block_roundtrip(17, &ts, &values);
        prop_assert_eq!(id, 17);
        prop_assert_eq!(out_ts, ts);
    }

    /// Block round-trips preserve arbitrary bit patterns, NaN included.
    #[test]
    fn test_block_value_bits_roundtrip(
        (ts, values) in timestamp_strategy().prop_flat_map(|ts| {
            let len = ts.len();
            (Just(ts), value_bits_strategy(len))
        })
    ) {
        let (_, out_ts, out_values) = block_roundtrip(3, &ts, &values);
        prop_assert_eq!(out_ts, ts);
        for (expected, actual) in values.iter().zip(out_values.iter()) {
            prop_assert_eq!(expected.to_bits(), actual.to_bits());
        }
    }

    /// The count readable without decoding matches the decoded count.
    #[test]
    fn test_block_element_count(ts in timestamp_strategy()) {
        let values = vec![0.25f64; ts.len()];
        let mut slice = SeriesSlice::new(1, &ts, &values);
        let mut buffer = vec![0u8; 64 + ts.len() * 20];
        let count = encode_block(&mut slice, &mut buffer).expect("encode");
        prop_assert_eq!(number_of_elements_in_block(&buffer).expect("count"), count);
    }

    /// Chunk round-trips preserve all three columns in row order.
    #[test]
    fn test_chunk_roundtrip(chunk in chunk_strategy()) {
        let mut writer = VecChunkWriter::new(128 + chunk.len() * 32);
        let summary = encode_chunk(&mut writer, &chunk).expect("encode");
        prop_assert_eq!(summary.n_elements as usize, chunk.len());

        let decoded = decode_chunk(writer.chunk(), summary.n_elements).expect("decode");
        prop_assert_eq!(decoded, chunk);
    }

    /// The summary's timestamp range brackets every row.
    #[test]
    fn test_chunk_summary_range(chunk in chunk_strategy()) {
        let mut writer = VecChunkWriter::new(128 + chunk.len() * 32);
        let summary = encode_chunk(&mut writer, &chunk).expect("encode");
        let min = chunk.timestamps.iter().min().copied().unwrap_or(0);
        let max = chunk.timestamps.iter().max().copied().unwrap_or(0);
        prop_assert_eq!(summary.ts_begin, min);
        prop_assert_eq!(summary.ts_end, max);
    }

    /// Reordering is a permutation and encoding after sorting round-trips
    /// to the sorted rows.
    #[test]
    fn test_reorder_encode_roundtrip(chunk in chunk_strategy()) {
        let time_ordered = convert_from_chunk_order(&chunk).expect("reorder");
        prop_assert!(time_ordered.timestamps.windows(2).all(|w| w[0] <= w[1]));

        // Stable sorts make the pair of conversions a bijection on chunks
        // that start in (paramid, timestamp) order.
        let back = convert_from_time_order(&time_ordered).expect("reorder back");
        prop_assert_eq!(&back, &chunk);

        let mut writer = VecChunkWriter::new(128 + chunk.len() * 32);
        let summary = encode_chunk(&mut writer, &time_ordered).expect("encode");
        let decoded = decode_chunk(writer.chunk(), summary.n_elements).expect("decode");
        prop_assert_eq!(decoded, time_ordered);
    }

    /// Random byte windows never panic or write out of bounds; they decode
    /// or fail with an error.
    #[test]
    fn test_decode_arbitrary_bytes_is_safe(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut out_ts = vec![0u64; 64];
        let mut out_values = vec![0.0f64; 64];
        let mut dest = SeriesSliceMut::new(&mut out_ts, &mut out_values);
        let _ = decode_block(&bytes, &mut dest);
        let _ = decode_chunk(&bytes, 16);
        let _ = number_of_elements_in_block(&bytes);
        if let Ok(mut reader) = DataBlockReader::new(&bytes) {
            for _ in 0..reader.count() {
                if reader.next().is_err() {
                    break;
                }
            }
        }
    }

    /// The v2 writer accepts samples until the window is genuinely full and
    /// everything accepted reads back.
    #[test]
    fn test_data_block_writer_roundtrip(
        window in 64usize..2048,
        ts in timestamp_strategy(),
    ) {
        let mut buffer = vec![0u8; window];
        let writer = DataBlockWriter::new(11, &mut buffer);
        let mut writer = match writer {
            Ok(writer) => writer,
            // Window too small for the header.
            Err(_) => return Ok(()),
        };
        let mut accepted = Vec::new();
        for (i, &t) in ts.iter().enumerate() {
            let value = (i as f64).cos();
            match writer.put(t, value) {
                Ok(()) => accepted.push((t, value)),
                Err(_) => break,
            }
        }
        let total = writer.close().expect("close");
        prop_assert_eq!(total as usize, accepted.len());
        let size = writer.size();

        let mut reader = DataBlockReader::new(&buffer[..size]).expect("reader");
        prop_assert_eq!(reader.count() as usize, accepted.len());
        for &(t, v) in &accepted {
            let (rt, rv) = reader.next().expect("next").expect("sample");
            prop_assert_eq!(rt, t);
            prop_assert_eq!(rv.to_bits(), v.to_bits());
        }
        prop_assert_eq!(reader.next().expect("next"), None);
    }
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    /// A slice split across several blocks decodes to the original sequence.
    #[test]
    fn test_multi_block_resume() {
        let ts: Vec<u64> = (0..48).map(|i| 5000 + i * 7).collect();
        let values = vec![1.5f64; 48];
        let mut slice = SeriesSlice::new(21, &ts, &values);

        let mut blocks = 0;
        let mut decoded_ts = Vec::new();
        let mut decoded_values = Vec::new();
        while slice.remaining() > 0 {
            // Big enough for the header plus one batch, too small for two.
            let mut buffer = vec![0u8; 64];
            let count = encode_block(&mut slice, &mut buffer).expect("encode");
            assert!(count > 0, "no forward progress");
            blocks += 1;

            let mut out_ts = vec![0u64; count as usize];
            let mut out_values = vec![0.0f64; count as usize];
            let mut dest = SeriesSliceMut::new(&mut out_ts, &mut out_values);
            decode_block(&buffer, &mut dest).expect("decode");
            decoded_ts.extend_from_slice(&out_ts);
            decoded_values.extend_from_slice(&out_values);
        }
        assert!(blocks >= 2, "window was large enough for the whole slice");
        assert_eq!(decoded_ts, ts);
        assert_eq!(decoded_values, values);
    }

    /// Encoding the same chunk twice produces identical bytes.
    #[test]
    fn test_chunk_encoding_is_deterministic() {
        let mut chunk = UncompressedChunk::new();
        for i in 0..100u64 {
            chunk.push(i % 4, 10_000 + i, (i as f64).sqrt());
        }
        let chunk = convert_from_time_order(&chunk).expect("reorder");

        let mut first = VecChunkWriter::new(8192);
        let mut second = VecChunkWriter::new(8192);
        encode_chunk(&mut first, &chunk).expect("encode");
        encode_chunk(&mut second, &chunk).expect("encode");
        assert_eq!(first.chunk(), second.chunk());
    }
}
