//! Sizer & Planner (§4.3): hash-table byte size, extension-table reserve,
//! addressing geometry.

use crate::config::{MAX_NET_SEED_EXTENSION, MAX_REF_SEED_INTERVAL_16THS, MAX_SEC_CRC_BITS, RECORDS_PER_BUCKET};
use crate::error::BuildError;
use crate::options::BuildConfig;

#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub ref_seed_interval_16ths: u32,
    pub table_addr_bits: u32,
    pub table_size_64ths: u32,
    pub ext_table_reserve: u64,
    pub chunks: u32,
    pub threads_per_pass: usize,
    pub chunks_in_memory: u32,
    pub pri_crc_bits: u32,
    pub sec_crc_bits: u32,
    pub pri_seed_length: u32,
    pub max_seed_bases: u32,
    pub anchor_bin_bits: u32,
}

/// Record size in bytes for occupancy calculations.
const HASH_RECORD_BYTES: u64 = 8;

fn align_up_u64(v: u64, align: u64) -> u64 {
    v.div_ceil(align) * align
}

/// Decide geometry per §4.3. `non_n_bases` is the reference base count
/// adjusted for alt-contig-liftover dedup; `extended_seeds` is the count
/// from the STR scanner's seed pre-hash pass.
pub fn plan(config: &BuildConfig, non_n_bases: u64, extended_seeds: u64) -> Result<Geometry, BuildError> {
    if non_n_bases == 0 {
        return Err(BuildError::Input("reference has no non-N bases".into()));
    }

    let mem_limit_bytes = config.mem_limit_bytes();
    let sj_reserve = config.sj_size_bytes;
    let ext_table_reserve = if config.ext_table_alloc_records > 0 {
        config.ext_table_alloc_records
    } else {
        align_up_u64((extended_seeds as f64 * 1.01) as u64 + 8192, 1024)
    };
    let ext_reserve_bytes = ext_table_reserve * 8;

    let available_for_table = mem_limit_bytes
        .saturating_sub(non_n_bases / 2) // packed reference, ~4 bits/base
        .saturating_sub(sj_reserve)
        .saturating_sub(ext_reserve_bytes);

    if available_for_table == 0 {
        return Err(BuildError::Capacity(
            "memory budget leaves no room for the hash table; raise --ht-mem-limit".into(),
        ));
    }

    // refSeedInterval: start at 1.0 (16 sixteenths), raise until occupancy
    // at the configured or default table size would not exceed 80%.
    let target_occupancy = 0.75f64;
    let mut interval_16ths: u32 = 16;
    let table_bytes_for = |size: u64| size;
    let table_bytes = if config.hash_table_size_bytes > 0 {
        config.hash_table_size_bytes
    } else {
        available_for_table
    };
    loop {
        let sampled = (non_n_bases as f64) * 16.0 / interval_16ths as f64;
        let occupancy = sampled * HASH_RECORD_BYTES as f64 / table_bytes_for(table_bytes) as f64;
        if occupancy <= 0.80 || interval_16ths >= MAX_REF_SEED_INTERVAL_16THS {
            break;
        }
        interval_16ths += 1;
        let _ = target_occupancy;
    }

    let final_occupancy =
        (non_n_bases as f64) * 16.0 / interval_16ths as f64 * HASH_RECORD_BYTES as f64 / table_bytes_for(table_bytes) as f64;
    if final_occupancy > 1.0 {
        return Err(BuildError::Capacity(
            "hash table needs to be larger; raise --ht-size or --ht-mem-limit".into(),
        ));
    }

    // tableAddrBits maximized first, then the 64ths squeeze factor.
    let mut addr_bits = 15u32;
    while (1u64 << (addr_bits + 1)) * RECORDS_PER_BUCKET as u64 * HASH_RECORD_BYTES <= table_bytes
        && addr_bits < 34
    {
        addr_bits += 1;
    }
    let bucket_bytes_at_addr_bits = (1u64 << addr_bits) * RECORDS_PER_BUCKET as u64 * HASH_RECORD_BYTES;
    let mut size_64ths = 64u32;
    while size_64ths > 33 {
        let candidate_bytes = bucket_bytes_at_addr_bits * size_64ths as u64 / 64;
        if candidate_bytes <= table_bytes {
            break;
        }
        size_64ths -= 1;
    }

    let chunk_cap_bytes: u64 = 1 << 30; // 1 GB
    let table_total_bytes = bucket_bytes_at_addr_bits * size_64ths as u64 / 64;
    let mut chunks = 1u32;
    while table_total_bytes / chunks as u64 > chunk_cap_bytes {
        chunks *= 2;
    }
    let threads_per_pass = config.num_threads.min(chunks as usize).max(1);
    let chunks_in_memory = (chunks as u64).min(config.mem_limit_bytes() / (1 << 30).max(1)).max(1) as u32;

    let pri_crc_bits = addr_bits + 19;
    let sec_crc_bits = (pri_crc_bits + 16).min(MAX_SEC_CRC_BITS);

    let pri_seed_length = (pri_crc_bits / 2).min(config.seed_len.max(1));
    let max_seed_bases = (pri_seed_length + MAX_NET_SEED_EXTENSION).min(config.max_ext_seed_len.max(pri_seed_length));

    Ok(Geometry {
        ref_seed_interval_16ths: interval_16ths,
        table_addr_bits: addr_bits,
        table_size_64ths: size_64ths,
        ext_table_reserve,
        chunks,
        threads_per_pass,
        chunks_in_memory,
        pri_crc_bits,
        sec_crc_bits,
        pri_seed_length,
        max_seed_bases,
        anchor_bin_bits: config.anchor_bin_bits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildConfig;

    #[test]
    fn plan_succeeds_for_reasonable_inputs() {
        let config = BuildConfig::default();
        let geom = plan(&config, 3_000_000_000, 10_000_000).unwrap();
        assert!(geom.table_addr_bits >= 15);
        assert!(geom.ref_seed_interval_16ths >= 16);
    }

    #[test]
    fn zero_bases_is_an_input_error() {
        let config = BuildConfig::default();
        assert!(matches!(plan(&config, 0, 0), Err(BuildError::Input(_))));
    }

    #[test]
    fn undersized_explicit_table_is_a_capacity_error() {
        let mut config = BuildConfig::default();
        config.seed_len = 17;
        config.hash_table_size_bytes = 64 * (1 << 20); // 64 MB, far too small for a 3 Gb reference
        let result = plan(&config, 3_000_000_000, 10_000_000);
        assert!(matches!(result, Err(BuildError::Capacity(_))));
    }

    #[test]
    fn tiny_memory_budget_is_a_capacity_error() {
        let mut config = BuildConfig::default();
        config.mem_limit_gb = 0; // forces mem_limit_bytes() toward a floor that still won't fit
        config.sj_size_bytes = u64::MAX / 2;
        let result = plan(&config, 3_000_000_000, 10_000_000);
        assert!(result.is_err());
    }
}
