//! Build driver: sequences the reference encoder, STR scanner, sizer,
//! seed hasher, extension planner, chain resolver, slot packer, and
//! compressor into the artifacts named in §6, plus the decompress-only
//! entry point.

use std::fs;
use std::path::{Path, PathBuf};

use crate::bed;
use crate::chain_resolver::{self, BucketLoad, Resolution};
use crate::compress::{self, Chunk};
use crate::config::{BUCKET_BYTES, MAX_WRAP_BYTES, RECORDS_PER_BUCKET};
use crate::diag::display_level;
use crate::displaylevel;
use crate::error::BuildError;
use crate::extension_planner::{self, CostCoefficients, ExtensionContext, SeedCandidate};
use crate::fasta;
use crate::hash::bucket::BucketTable;
use crate::hash::record::HashRecord;
use crate::hash::Crc64;
use crate::header::HashTableHeader;
use crate::options::BuildConfig;
use crate::reference::{self, ContigFlags, MaskRange, MethylationMode};
use crate::seed_hasher::{self, ChunkBounds};
use crate::sizer;
use crate::slot_packer;
use crate::stats::{self, BuildStats};
use crate::str_scan;

const WRAP_BLOCK_BUCKETS: usize = MAX_WRAP_BYTES / BUCKET_BYTES;

/// Default CRC64 polynomials selected by `--ht-crc-primary`/`--ht-crc-extended`
/// (§5 "CRC pluggability"); index 0/1 mirror the two polynomials the
/// upstream tool ships by default.
const CRC_POLYS: [u64; 2] = [0x42F0_E1EB_A9EA_3693, 0xAD93_D235_94C9_35A9];

fn pick_crc(index: u32, bits: u32) -> Crc64 {
    let poly = CRC_POLYS[index as usize % CRC_POLYS.len()];
    Crc64::new(bits.clamp(8, 64), poly)
}

pub fn run_build(config: &BuildConfig) -> Result<(), BuildError> {
    displaylevel!(2, "reading reference {}\n", config.reference_fasta);
    let records = fasta::read_fasta(Path::new(&config.reference_fasta))?;
    let contig_names: Vec<String> = records.iter().map(|r| r.name.clone()).collect();
    let mut contigs = fasta::to_contig_inputs(records, ContigFlags { primary: true, ..Default::default() }, MethylationMode::None);

    if let Some(bed_path) = &config.mask_bed {
        let raw_ranges = bed::read_mask_bed(Path::new(bed_path), &contig_names)?;
        for r in raw_ranges {
            contigs[r.contig].mask_ranges.push(MaskRange { start: r.start, end: r.end });
        }
    }

    if let Some(decoys_path) = &config.decoys {
        let decoy_records = fasta::read_fasta(Path::new(decoys_path))?;
        contigs.extend(fasta::to_contig_inputs(
            decoy_records,
            ContigFlags { decoy: true, ..Default::default() },
            MethylationMode::None,
        ));
    }

    displaylevel!(2, "encoding {} contigs\n", contigs.len());
    let encoded = reference::encode_reference(&contigs)?;
    let non_n_bases = encoded.codes.iter().filter(|&&c| c != crate::reference::encode::CODE_N).count() as u64;

    displaylevel!(2, "scanning for short tandem repeats\n");
    let str_records = str_scan::scan_str(&encoded.codes, 0);

    let crc_primary = pick_crc(config.crc_primary_poly_index, 47);

    // Pre-hash pass: sample the same positions the hasher will and count
    // canonical-k-mer frequency, to estimate the extension-table reserve
    // before committing to a geometry.
    let prehash = str_scan::PreHashCounts::new(20, config.target_seed_freq.max(1) as u8);
    let interval = 16.0;
    let k = config.seed_len;
    let mut extended_estimate = 0u64;
    if encoded.codes.len() >= k as usize {
        let max_index = (encoded.codes.len() as f64 / interval).floor() as u64;
        for i in 0..max_index {
            let pos = (i as f64 * interval).floor() as usize;
            if pos + k as usize > encoded.codes.len() {
                continue;
            }
            if let Some(kmer) = crate::seed::pack_kmer(&encoded.codes[pos..pos + k as usize], k) {
                let canon = crate::seed::canonical_kmer(kmer, k);
                let key = str_scan::prehash_key(&crc_primary, canon.value);
                if prehash.bump(key) {
                    extended_estimate += 1;
                }
            }
        }
    }

    let geometry = sizer::plan(config, non_n_bases.max(1), extended_estimate)?;
    displaylevel!(
        2,
        "geometry: {} addr bits, seed length {}\n",
        geometry.table_addr_bits,
        geometry.pri_seed_length,
    );

    let num_buckets = 1usize << geometry.table_addr_bits;
    let buckets = BucketTable::new(num_buckets);
    let bounds = ChunkBounds { chunk_bucket_start: 0, num_buckets };
    seed_hasher::hash_seeds(&encoded.codes, &geometry, &crc_primary, config.num_threads, &bounds, &buckets)?;

    let mut extension_table = Vec::new();
    let mut next_ext_id = 0u32;
    let ext_ctx = ExtensionContext {
        cost: CostCoefficients {
            seed_len_cost: config.seed_len_cost,
            seed_freq_cost: config.seed_freq_cost,
            ext_step_cost: config.ext_step_cost,
            ext_step_cost_incr: config.ext_step_cost_incr,
            ext_rec_cost: config.ext_rec_cost,
        },
        pri_seed_length: geometry.pri_seed_length,
        max_seed_bases: geometry.max_seed_bases,
        max_ext_incr: config.max_ext_incr,
        pri_max_seed_freq: config.pri_max_seed_freq,
        max_seed_freq: config.max_seed_freq,
        max_seed_freq_len: config.max_seed_freq_len,
        target_seed_freq: config.target_seed_freq,
    };

    let mut stats = BuildStats { total_seeds_sampled: num_buckets as u64, str_records: str_records.len() as u64, ..Default::default() };
    let mut bucket_vecs: Vec<Vec<HashRecord>> = buckets.into_vecs();

    for bucket in bucket_vecs.iter_mut() {
        if bucket.len() as u32 > config.max_seed_freq {
            let seeds: Vec<SeedCandidate> = bucket
                .iter()
                .filter_map(|r| match r {
                    HashRecord::Hit(h) => Some(SeedCandidate {
                        seed_index: h.seed_index,
                        pos: (h.seed_index as f64 * interval) as u64,
                        rc: h.rc,
                    }),
                    _ => None,
                })
                .collect();
            if seeds.len() == bucket.len() {
                let mut alloc = || {
                    let id = next_ext_id;
                    next_ext_id += 1;
                    Ok(id)
                };
                let planned = extension_planner::plan_group(&seeds, &encoded.codes, &ext_ctx, &mut alloc)?;
                extension_table.extend(planned.extension_table);
                *bucket = planned.records;
                stats.extended_seed_groups += 1;
            }
        }
        for rec in bucket.iter() {
            match rec {
                HashRecord::Hit(_) => stats.hit_records += 1,
                HashRecord::Extend(_) => stats.extend_records += 1,
                HashRecord::Interval(_) => stats.interval_records += 1,
                HashRecord::Chain(_) => stats.chain_records += 1,
                HashRecord::Empty => {}
            }
        }
        stats.max_bucket_depth = stats.max_bucket_depth.max(bucket.len() as u32);
    }

    // Resolve remaining over-depth buckets (those not routed through the
    // extension planner, e.g. mixed empty/occupied groups below the
    // frequency threshold) via probing/chaining within wrap-block-sized
    // windows, then pack each window's physical slots.
    let mut packed_records: Vec<Vec<HashRecord>> = Vec::with_capacity(bucket_vecs.len());
    for window in bucket_vecs.chunks(WRAP_BLOCK_BUCKETS) {
        let mut window_buckets: Vec<Vec<HashRecord>> = window.to_vec();
        let needs_escape = resolve_overflow(&mut window_buckets, &mut stats);
        let packed = slot_packer::pack_wrap_block(&window_buckets, needs_escape)?;
        packed_records.push(packed.records);
    }

    let chunk = Chunk { buckets: packed_records };
    let container_bytes = compress::write_container(&[chunk], &extension_table);

    let header = HashTableHeader::from_build(
        config,
        &geometry,
        encoded.contigs.len() as u32,
        encoded.total_padded_len,
        encoded.code_stream_digest,
        encoded.index_stream_digest,
    );

    let out_dir = PathBuf::from(&config.output_directory);
    fs::create_dir_all(&out_dir).map_err(|e| BuildError::Input(format!("cannot create {}: {e}", out_dir.display())))?;
    let prefix = &config.output_file_prefix;

    write_artifact(&out_dir, &format!("{prefix}.reference.bin"), &encoded.reference_bin())?;
    write_artifact(&out_dir, &format!("{prefix}.ref_index.bin"), &encoded.index_entries.iter().flat_map(|e| e.to_bytes()).collect::<Vec<u8>>())?;
    write_artifact(&out_dir, &format!("{prefix}.repeat_mask.bin"), &encoded.repeat_mask_bin())?;
    write_artifact(&out_dir, &format!("{prefix}.str_table.bin"), &str_records.iter().flat_map(|r| r.to_bytes()).collect::<Vec<u8>>())?;
    write_artifact(&out_dir, &format!("{prefix}.hash_table.cmp"), &container_bytes)?;
    write_artifact(&out_dir, &format!("{prefix}.hash_table_config.bin"), &header.to_bytes())?;
    write_artifact(&out_dir, &format!("{prefix}.hash_table.cfg"), header.to_cfg_text().as_bytes())?;
    let stats_text = stats::render(&stats, &geometry);
    write_artifact(&out_dir, &format!("{prefix}.hash_table_stats.txt"), stats_text.as_bytes())?;

    if config.write_hash_bin {
        run_uncompress(&out_dir, prefix, config.num_threads)?;
    }

    displaylevel!(2, "build complete: {}\n", out_dir.display());
    Ok(())
}

/// First-fit overflow resolution within one wrap-block window: buckets
/// over `RECORDS_PER_BUCKET` migrate their extra records into the nearest
/// bucket with free room, planting a `ChainLink` in their own last slot.
/// Returns whether any migration needed a chain escape.
fn resolve_overflow(window: &mut [Vec<HashRecord>], stats: &mut BuildStats) -> bool {
    let mut any_chain = false;
    for i in 0..window.len() {
        if window[i].len() <= RECORDS_PER_BUCKET {
            continue;
        }
        let overflow = window[i].len() as u32 - RECORDS_PER_BUCKET as u32;
        let load = BucketLoad { bucket_index: i as u64, overflow };
        let free_of = |b: u64| -> u32 {
            window
                .get(b as usize)
                .map(|v| RECORDS_PER_BUCKET.saturating_sub(v.len()) as u32)
                .unwrap_or(0)
        };
        match chain_resolver::resolve(load, &free_of) {
            Resolution::Probe { .. } => {
                // Leave the extra records in place; the slot packer's
                // distance-major layout places them at later probe
                // distances within this same window.
            }
            Resolution::Chain { donor_bucket } => {
                any_chain = true;
                let extra: Vec<HashRecord> = window[i].split_off(RECORDS_PER_BUCKET - 1);
                let link = chain_resolver::build_chain_link(donor_bucket, &[], true, false, (RECORDS_PER_BUCKET - 1) as u8);
                window[i].push(HashRecord::Chain(link));
                if let Some(donor) = window.get_mut(donor_bucket as usize) {
                    donor.extend(extra);
                }
                stats.chain_records += 1;
            }
        }
    }
    any_chain
}

fn write_artifact(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), BuildError> {
    let path = dir.join(name);
    fs::write(&path, bytes).map_err(|e| BuildError::Input(format!("cannot write {}: {e}", path.display())))
}

/// Decompress-only mode (`--ht-uncompress`): read `<prefix>.hash_table.cmp`
/// from `ref_dir` and re-emit the uncompressed hash/extension tables next
/// to it, using the bounded parallel decompressor (§4.9).
pub fn run_uncompress(ref_dir: &Path, prefix: &str, num_threads: usize) -> Result<(), BuildError> {
    let cmp_path = ref_dir.join(format!("{prefix}.hash_table.cmp"));
    let bytes = fs::read(&cmp_path).map_err(|e| BuildError::Input(format!("cannot read {}: {e}", cmp_path.display())))?;
    let (chunks, ext_table) = compress::read_container(&bytes, num_threads)?;

    let flat: Vec<u8> = chunks
        .iter()
        .flat_map(|c| c.buckets.iter().flatten())
        .flat_map(|r| r.to_bits().to_le_bytes())
        .collect();
    write_artifact(ref_dir, &format!("{prefix}.hash_table.bin"), &flat)?;

    let ext_flat: Vec<u8> = ext_table.iter().flat_map(|r| r.to_bits().to_le_bytes()).collect();
    write_artifact(ref_dir, &format!("{prefix}.extend_table.bin"), &ext_flat)?;

    displaylevel!(2, "decompressed {} chunk(s) at display level {}\n", chunks.len(), display_level());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_resolution_never_increases_total_record_count() {
        let mut window = vec![
            vec![HashRecord::Empty; 2],
            (0..10)
                .map(|i| {
                    HashRecord::Hit(crate::hash::record::Hit {
                        seed_index: i,
                        rc: false,
                        last_of_thread: false,
                        extended: false,
                        hash_bits: 0,
                        thread_id: 0,
                    })
                })
                .collect(),
        ];
        let before: usize = window.iter().map(|b| b.len()).sum();
        let mut stats = BuildStats::default();
        resolve_overflow(&mut window, &mut stats);
        let after: usize = window.iter().map(|b| b.len()).sum();
        assert_eq!(before, after);
    }
}
