//! The 512-byte binary config header (§6) written ahead of the compressed
//! hash table, plus the companion text `hash_table.cfg`.

use crate::config::HASH_TABLE_HEADER_VERSION;
use crate::error::BuildError;
use crate::options::BuildConfig;
use crate::sizer::Geometry;

pub const HEADER_BYTES: usize = crate::config::HASH_TABLE_HEADER_BYTES;

/// Fixed-layout header identifying the hash table's addressing geometry
/// and the configuration it was built under, so a decompressor or aligner
/// can validate compatibility before trusting the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashTableHeader {
    pub version: u32,
    pub pri_seed_length: u32,
    pub max_seed_bases: u32,
    pub table_addr_bits: u32,
    pub table_size_64ths: u32,
    pub ref_seed_interval_16ths: u32,
    pub pri_crc_bits: u32,
    pub sec_crc_bits: u32,
    pub chunks: u32,
    pub ext_table_reserve: u64,
    pub num_ref_seqs: u32,
    pub total_ref_bases: u64,
    pub code_stream_digest: u32,
    pub index_stream_digest: u32,
}

impl HashTableHeader {
    pub fn from_build(config: &BuildConfig, geometry: &Geometry, num_ref_seqs: u32, total_ref_bases: u64, code_stream_digest: u32, index_stream_digest: u32) -> Self {
        let _ = config;
        HashTableHeader {
            version: HASH_TABLE_HEADER_VERSION,
            pri_seed_length: geometry.pri_seed_length,
            max_seed_bases: geometry.max_seed_bases,
            table_addr_bits: geometry.table_addr_bits,
            table_size_64ths: geometry.table_size_64ths,
            ref_seed_interval_16ths: geometry.ref_seed_interval_16ths,
            pri_crc_bits: geometry.pri_crc_bits,
            sec_crc_bits: geometry.sec_crc_bits,
            chunks: geometry.chunks,
            ext_table_reserve: geometry.ext_table_reserve,
            num_ref_seqs,
            total_ref_bases,
            code_stream_digest,
            index_stream_digest,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_BYTES] {
        let mut out = [0u8; HEADER_BYTES];
        let mut w = 0usize;
        macro_rules! put_u32 {
            ($v:expr) => {{
                out[w..w + 4].copy_from_slice(&$v.to_le_bytes());
                w += 4;
            }};
        }
        macro_rules! put_u64 {
            ($v:expr) => {{
                out[w..w + 8].copy_from_slice(&$v.to_le_bytes());
                w += 8;
            }};
        }
        put_u32!(self.version);
        put_u32!(self.pri_seed_length);
        put_u32!(self.max_seed_bases);
        put_u32!(self.table_addr_bits);
        put_u32!(self.table_size_64ths);
        put_u32!(self.ref_seed_interval_16ths);
        put_u32!(self.pri_crc_bits);
        put_u32!(self.sec_crc_bits);
        put_u32!(self.chunks);
        put_u64!(self.ext_table_reserve);
        put_u32!(self.num_ref_seqs);
        put_u64!(self.total_ref_bases);
        put_u32!(self.code_stream_digest);
        put_u32!(self.index_stream_digest);
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, BuildError> {
        if data.len() < HEADER_BYTES {
            return Err(BuildError::DecompressIntegrity("header shorter than 512 bytes".into()));
        }
        let mut r = 0usize;
        macro_rules! get_u32 {
            () => {{
                let v = u32::from_le_bytes(data[r..r + 4].try_into().unwrap());
                r += 4;
                v
            }};
        }
        macro_rules! get_u64 {
            () => {{
                let v = u64::from_le_bytes(data[r..r + 8].try_into().unwrap());
                r += 8;
                v
            }};
        }
        let version = get_u32!();
        if version != HASH_TABLE_HEADER_VERSION {
            return Err(BuildError::DecompressIntegrity(format!(
                "unsupported hash table header version {version}, expected {HASH_TABLE_HEADER_VERSION}"
            )));
        }
        Ok(HashTableHeader {
            version,
            pri_seed_length: get_u32!(),
            max_seed_bases: get_u32!(),
            table_addr_bits: get_u32!(),
            table_size_64ths: get_u32!(),
            ref_seed_interval_16ths: get_u32!(),
            pri_crc_bits: get_u32!(),
            sec_crc_bits: get_u32!(),
            chunks: get_u32!(),
            ext_table_reserve: get_u64!(),
            num_ref_seqs: get_u32!(),
            total_ref_bases: get_u64!(),
            code_stream_digest: get_u32!(),
            index_stream_digest: get_u32!(),
        })
    }

    /// Render the human-readable `hash_table.cfg` companion file.
    pub fn to_cfg_text(&self) -> String {
        format!(
            "hash_table_version\t{}\n\
             pri_seed_length\t{}\n\
             max_seed_bases\t{}\n\
             table_addr_bits\t{}\n\
             table_size_64ths\t{}\n\
             ref_seed_interval_16ths\t{}\n\
             pri_crc_bits\t{}\n\
             sec_crc_bits\t{}\n\
             chunks\t{}\n\
             ext_table_reserve\t{}\n\
             num_ref_seqs\t{}\n\
             total_ref_bases\t{}\n\
             code_stream_digest\t{:#010x}\n\
             index_stream_digest\t{:#010x}\n",
            self.version,
            self.pri_seed_length,
            self.max_seed_bases,
            self.table_addr_bits,
            self.table_size_64ths,
            self.ref_seed_interval_16ths,
            self.pri_crc_bits,
            self.sec_crc_bits,
            self.chunks,
            self.ext_table_reserve,
            self.num_ref_seqs,
            self.total_ref_bases,
            self.code_stream_digest,
            self.index_stream_digest,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HashTableHeader {
        HashTableHeader {
            version: HASH_TABLE_HEADER_VERSION,
            pri_seed_length: 21,
            max_seed_bases: 64,
            table_addr_bits: 28,
            table_size_64ths: 50,
            ref_seed_interval_16ths: 16,
            pri_crc_bits: 47,
            sec_crc_bits: 48,
            chunks: 4,
            ext_table_reserve: 1_000_000,
            num_ref_seqs: 25,
            total_ref_bases: 3_100_000_000,
            code_stream_digest: 0x1234_5678,
            index_stream_digest: 0x9abc_def0,
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let h = sample();
        let bytes = h.to_bytes();
        assert_eq!(bytes.len(), HEADER_BYTES);
        assert_eq!(HashTableHeader::from_bytes(&bytes).unwrap(), h);
    }

    #[test]
    fn rejects_wrong_version() {
        let h = sample();
        let mut bytes = h.to_bytes();
        bytes[0..4].copy_from_slice(&999u32.to_le_bytes());
        assert!(HashTableHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn cfg_text_contains_every_field_name() {
        let text = sample().to_cfg_text();
        assert!(text.contains("pri_seed_length"));
        assert!(text.contains("code_stream_digest"));
    }
}
