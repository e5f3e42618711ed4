//! `hash_table_stats.txt` emission (§6).

use crate::displaylevel;
use crate::sizer::Geometry;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildStats {
    pub total_seeds_sampled: u64,
    pub hit_records: u64,
    pub extend_records: u64,
    pub interval_records: u64,
    pub chain_records: u64,
    pub str_records: u64,
    pub extended_seed_groups: u64,
    pub max_bucket_depth: u32,
    pub wrap_blocks_needing_chain_escape: u32,
}

/// Render the `hash_table_stats.txt` report, and echo a short summary at
/// the current display level (§6 "progress and summary output").
pub fn render(stats: &BuildStats, geometry: &Geometry) -> String {
    displaylevel!(
        2,
        "hash table: {} buckets, {} hit records, {} chains\n",
        1u64 << geometry.table_addr_bits,
        stats.hit_records,
        stats.chain_records,
    );

    format!(
        "total_seeds_sampled\t{}\n\
         hit_records\t{}\n\
         extend_records\t{}\n\
         interval_records\t{}\n\
         chain_records\t{}\n\
         str_records\t{}\n\
         extended_seed_groups\t{}\n\
         max_bucket_depth\t{}\n\
         wrap_blocks_needing_chain_escape\t{}\n\
         table_addr_bits\t{}\n\
         table_size_64ths\t{}\n\
         pri_seed_length\t{}\n",
        stats.total_seeds_sampled,
        stats.hit_records,
        stats.extend_records,
        stats.interval_records,
        stats.chain_records,
        stats.str_records,
        stats.extended_seed_groups,
        stats.max_bucket_depth,
        stats.wrap_blocks_needing_chain_escape,
        geometry.table_addr_bits,
        geometry.table_size_64ths,
        geometry.pri_seed_length,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildConfig;
    use crate::sizer;

    #[test]
    fn report_contains_every_counter() {
        let config = BuildConfig::default();
        let geometry = sizer::plan(&config, 100_000, 10).unwrap();
        let stats = BuildStats { hit_records: 42, ..Default::default() };
        let text = render(&stats, &geometry);
        assert!(text.contains("hit_records\t42"));
        assert!(text.contains("table_addr_bits"));
    }
}
