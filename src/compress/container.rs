//! Compressed hash-table file container (§4.8–4.9): a magic-delimited
//! layout of independently-decodable chunks, decompressed in parallel
//! through a bounded work queue.

use std::sync::{Arc, Mutex};

use crate::config::{COMP_NOLITERAL_RUN_BITS_HASH, INDEPENDENT_ADDR_BITS};
use crate::error::BuildError;
use crate::hash::extend::ExtendHit;
use crate::hash::record::HashRecord;
use crate::hash::crc32c_digest;
use crate::threadpool::TPool;

use super::bitio::{BitReader, BitWriter};
use super::codec::{decode_buckets, encode_buckets};

const MAGIC: u32 = 0x4852_4448; // "HRDH" in little-endian byte order

/// One independently-addressable chunk of the hash table (§4.9
/// "independently decodable in 2^30-bucket-addressed units").
pub struct Chunk {
    pub buckets: Vec<Vec<HashRecord>>,
}

/// Variable-width extension-table encoding: each entry is written using
/// its own `literal_bit_width()` (§4.8 "Literal extension-table records").
fn encode_ext_table(entries: &[ExtendHit]) -> Vec<u8> {
    let mut w = BitWriter::new();
    for e in entries {
        w.write_bits(e.to_bits(), e.literal_bit_width());
    }
    w.finish()
}

fn decode_ext_table(data: &[u8], widths: &[u32]) -> Result<Vec<ExtendHit>, BuildError> {
    let mut r = BitReader::new(data);
    let mut out = Vec::with_capacity(widths.len());
    for &width in widths {
        let bits = r
            .read_bits(width)
            .ok_or_else(|| BuildError::DecompressIntegrity("truncated extension table entry".into()))?;
        out.push(ExtendHit::from_bits(bits));
    }
    Ok(out)
}

/// Serialize chunks + the extension table into the on-disk container:
/// `magic | chunk count | per-chunk (bucket count | byte length | bytes) |
/// ext table (entry count | width-table length | width bytes | body length
/// | body bytes) | trailing CRC32C digest`.
pub fn write_container(chunks: &[Chunk], ext_table: &[ExtendHit]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&(chunks.len() as u32).to_le_bytes());

    for chunk in chunks {
        let encoded = encode_buckets(&chunk.buckets, COMP_NOLITERAL_RUN_BITS_HASH);
        out.extend_from_slice(&(chunk.buckets.len() as u64).to_le_bytes());
        out.extend_from_slice(&(encoded.len() as u64).to_le_bytes());
        out.extend_from_slice(&encoded);
    }

    let widths: Vec<u8> = ext_table.iter().map(|e| e.literal_bit_width() as u8).collect();
    let encoded_ext = encode_ext_table(ext_table);
    out.extend_from_slice(&(ext_table.len() as u64).to_le_bytes());
    out.extend_from_slice(&(widths.len() as u64).to_le_bytes());
    out.extend_from_slice(&widths);
    out.extend_from_slice(&(encoded_ext.len() as u64).to_le_bytes());
    out.extend_from_slice(&encoded_ext);

    let digest = crc32c_digest(&out[8..]);
    out.extend_from_slice(&digest.to_le_bytes());
    out
}

/// Parse and decompress a container produced by `write_container`,
/// fanning chunk decompression out across a bounded work queue
/// (§4.9 "parallel decompression via a bounded work-queue").
pub fn read_container(data: &[u8], num_threads: usize) -> Result<(Vec<Chunk>, Vec<ExtendHit>), BuildError> {
    if data.len() < 12 {
        return Err(BuildError::DecompressIntegrity("file too short to contain a header".into()));
    }
    let magic = u32::from_le_bytes(data[0..4].try_into().unwrap());
    if magic != MAGIC {
        return Err(BuildError::DecompressIntegrity("bad magic number".into()));
    }
    let num_chunks = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;

    let mut offset = 8usize;
    let mut chunk_specs = Vec::with_capacity(num_chunks);
    for _ in 0..num_chunks {
        let (num_buckets, len, body_start) = read_section_header(data, offset)?;
        chunk_specs.push((num_buckets as usize, body_start, len as usize));
        offset = body_start + len as usize;
    }

    let (ext_count, widths_len, widths_start) = read_section_header(data, offset)?;
    let widths_end = widths_start + widths_len as usize;
    let widths: Vec<u32> = data
        .get(widths_start..widths_end)
        .ok_or_else(|| BuildError::DecompressIntegrity("truncated extension-table width array".into()))?
        .iter()
        .map(|&b| b as u32)
        .collect();
    let (_ext_count2, ext_body_len, ext_body_start) = read_section_header(data, widths_end)?;
    offset = ext_body_start + ext_body_len as usize;

    let expected_digest = u32::from_le_bytes(
        data.get(offset..offset + 4)
            .ok_or_else(|| BuildError::DecompressIntegrity("missing trailing digest".into()))?
            .try_into()
            .unwrap(),
    );
    let body_for_digest = &data[8..offset];
    if crc32c_digest(body_for_digest) != expected_digest {
        return Err(BuildError::DecompressIntegrity("CRC32C digest mismatch".into()));
    }

    let pool = TPool::new(num_threads.max(1), num_chunks.max(1) + 1)
        .ok_or_else(|| BuildError::DecompressIntegrity("failed to start decompression work queue".into()))?;
    let results: Arc<Mutex<Vec<Option<Result<Chunk, BuildError>>>>> =
        Arc::new(Mutex::new((0..num_chunks).map(|_| None).collect()));

    for (i, (num_buckets, start, len)) in chunk_specs.into_iter().enumerate() {
        let bytes = data[start..start + len].to_vec();
        let results = Arc::clone(&results);
        pool.submit_job(Box::new(move || {
            let decoded = decode_buckets(&bytes, num_buckets, COMP_NOLITERAL_RUN_BITS_HASH).map(|buckets| Chunk { buckets });
            results.lock().unwrap()[i] = Some(decoded);
        }));
    }
    pool.jobs_completed();

    let mut chunks = Vec::with_capacity(num_chunks);
    for slot in Arc::try_unwrap(results).unwrap().into_inner().unwrap() {
        chunks.push(slot.expect("every chunk slot is filled before jobs_completed returns")?);
    }

    let ext_bytes = &data[ext_body_start..ext_body_start + ext_body_len as usize];
    let ext_table = decode_ext_table(ext_bytes, &widths)?;
    debug_assert_eq!(ext_table.len(), ext_count as usize);

    Ok((chunks, ext_table))
}

fn read_section_header(data: &[u8], offset: usize) -> Result<(u64, u64, usize), BuildError> {
    let count = u64::from_le_bytes(
        data.get(offset..offset + 8)
            .ok_or_else(|| BuildError::DecompressIntegrity("truncated section header".into()))?
            .try_into()
            .unwrap(),
    );
    let len = u64::from_le_bytes(
        data.get(offset + 8..offset + 16)
            .ok_or_else(|| BuildError::DecompressIntegrity("truncated section header".into()))?
            .try_into()
            .unwrap(),
    );
    Ok((count, len, offset + 16))
}

/// Chunk-address width check (§4.9): every chunk's bucket count must fit
/// under the independent-addressing budget.
pub fn chunk_fits_independent_addressing(num_buckets: usize) -> bool {
    (num_buckets as u64) < (1u64 << INDEPENDENT_ADDR_BITS)
}
