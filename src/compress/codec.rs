//! Literal / automatic bucket encoding (§4.8): runs of fully-empty buckets
//! are collapsed to a run-length code, populated buckets are written out
//! literally as their eight 64-bit records.

use crate::config::RECORDS_PER_BUCKET;
use crate::error::BuildError;
use crate::hash::record::HashRecord;

use super::bitio::{BitReader, BitWriter};

const TAG_AUTOMATIC: u64 = 0;
const TAG_LITERAL: u64 = 1;

/// Encode `buckets` (each exactly `RECORDS_PER_BUCKET` records) into the
/// literal/automatic bit stream. `run_bits` selects the run-length field
/// width (`COMP_NOLITERAL_RUN_BITS_HASH` for the hash table,
/// `COMP_NOLITERAL_RUN_BITS_EXT` for the extension table).
pub fn encode_buckets(buckets: &[Vec<HashRecord>], run_bits: u32) -> Vec<u8> {
    let max_run = (1u64 << run_bits) - 1;
    let mut w = BitWriter::new();
    let mut i = 0usize;
    while i < buckets.len() {
        if buckets[i].iter().all(HashRecord::is_empty) {
            let mut run = 0u64;
            while i < buckets.len()
                && buckets[i].iter().all(HashRecord::is_empty)
                && run < max_run
            {
                run += 1;
                i += 1;
            }
            w.write_bits(TAG_AUTOMATIC, 1);
            w.write_bits(run - 1, run_bits);
        } else {
            w.write_bits(TAG_LITERAL, 1);
            for slot in 0..RECORDS_PER_BUCKET {
                let bits = buckets[i].get(slot).map(HashRecord::to_bits).unwrap_or(0);
                w.write_bits(bits, 64);
            }
            i += 1;
        }
    }
    w.finish()
}

/// Decode `num_buckets` buckets of `RECORDS_PER_BUCKET` records each from
/// an `encode_buckets` stream.
pub fn decode_buckets(data: &[u8], num_buckets: usize, run_bits: u32) -> Result<Vec<Vec<HashRecord>>, BuildError> {
    let mut r = BitReader::new(data);
    let mut out = Vec::with_capacity(num_buckets);
    while out.len() < num_buckets {
        let tag = r
            .read_bits(1)
            .ok_or_else(|| BuildError::DecompressIntegrity("truncated bucket tag".into()))?;
        if tag == TAG_AUTOMATIC {
            let run = r
                .read_bits(run_bits)
                .ok_or_else(|| BuildError::DecompressIntegrity("truncated run length".into()))?
                + 1;
            for _ in 0..run {
                if out.len() >= num_buckets {
                    break;
                }
                out.push(vec![HashRecord::Empty; RECORDS_PER_BUCKET]);
            }
        } else {
            let mut bucket = Vec::with_capacity(RECORDS_PER_BUCKET);
            for _ in 0..RECORDS_PER_BUCKET {
                let bits = r
                    .read_bits(64)
                    .ok_or_else(|| BuildError::DecompressIntegrity("truncated literal record".into()))?;
                let rec = HashRecord::from_bits(bits)
                    .ok_or_else(|| BuildError::DecompressIntegrity("unrecognized opcode in literal record".into()))?;
                bucket.push(rec);
            }
            out.push(bucket);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::COMP_NOLITERAL_RUN_BITS_HASH;
    use crate::hash::record::Hit;

    fn hit_bucket(seed: u32) -> Vec<HashRecord> {
        let mut v = vec![HashRecord::Empty; RECORDS_PER_BUCKET];
        v[0] = HashRecord::Hit(Hit { seed_index: seed, rc: false, last_of_thread: false, extended: false, hash_bits: 0, thread_id: 0 });
        v
    }

    #[test]
    fn empty_run_round_trips() {
        let buckets: Vec<Vec<HashRecord>> = (0..10).map(|_| vec![HashRecord::Empty; RECORDS_PER_BUCKET]).collect();
        let bytes = encode_buckets(&buckets, COMP_NOLITERAL_RUN_BITS_HASH);
        let decoded = decode_buckets(&bytes, 10, COMP_NOLITERAL_RUN_BITS_HASH).unwrap();
        assert_eq!(decoded, buckets);
    }

    #[test]
    fn mixed_buckets_round_trip() {
        let buckets: Vec<Vec<HashRecord>> = vec![
            vec![HashRecord::Empty; RECORDS_PER_BUCKET],
            hit_bucket(7),
            vec![HashRecord::Empty; RECORDS_PER_BUCKET],
            hit_bucket(99),
        ];
        let bytes = encode_buckets(&buckets, COMP_NOLITERAL_RUN_BITS_HASH);
        let decoded = decode_buckets(&bytes, 4, COMP_NOLITERAL_RUN_BITS_HASH).unwrap();
        assert_eq!(decoded, buckets);
    }

    #[test]
    fn run_longer_than_max_splits_into_multiple_tokens() {
        let max_run = (1usize << COMP_NOLITERAL_RUN_BITS_HASH) + 5;
        let buckets: Vec<Vec<HashRecord>> = (0..max_run).map(|_| vec![HashRecord::Empty; RECORDS_PER_BUCKET]).collect();
        let bytes = encode_buckets(&buckets, COMP_NOLITERAL_RUN_BITS_HASH);
        let decoded = decode_buckets(&bytes, max_run, COMP_NOLITERAL_RUN_BITS_HASH).unwrap();
        assert_eq!(decoded.len(), max_run);
    }

    #[test]
    fn truncated_stream_is_a_decompress_integrity_error() {
        let buckets = vec![hit_bucket(1)];
        let mut bytes = encode_buckets(&buckets, COMP_NOLITERAL_RUN_BITS_HASH);
        bytes.truncate(bytes.len() / 2);
        assert!(decode_buckets(&bytes, 1, COMP_NOLITERAL_RUN_BITS_HASH).is_err());
    }
}
