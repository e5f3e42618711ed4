//! Black-box end-to-end scenarios driving the public `run_build` /
//! `run_uncompress` entry points, mirroring the seed cases and invariants
//! named for the build pipeline. Each build pins `hash_table_size_bytes`
//! explicitly so fixtures stay small; production builds leave it at 0 (auto).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use refhash::options::BuildConfig;
use refhash::{run_build, run_uncompress, BuildError};

fn write_fasta(dir: &Path, name: &str, records: &[(&str, String)]) -> PathBuf {
    let path = dir.join(name);
    let mut f = fs::File::create(&path).unwrap();
    for (header, bases) in records {
        writeln!(f, ">{header}").unwrap();
        writeln!(f, "{bases}").unwrap();
    }
    path
}

fn base_config(reference_fasta: String, out_dir: &Path) -> BuildConfig {
    let mut config = BuildConfig::default();
    config.reference_fasta = reference_fasta;
    config.output_directory = out_dir.to_string_lossy().into_owned();
    config.output_file_prefix = "ht".to_string();
    // Floor the table at its minimum practical size so test fixtures don't
    // inherit the 16 GiB default memory budget's addressing width.
    config.hash_table_size_bytes = 1 << 20;
    config.num_threads = 2;
    config
}

fn artifact(dir: &Path, name: &str) -> Vec<u8> {
    fs::read(dir.join(name)).unwrap_or_else(|e| panic!("missing artifact {name}: {e}"))
}

/// S1: a single contig builds cleanly and emits every named artifact, and
/// the embedded tandem run of Gs surfaces in the STR table.
#[test]
fn single_tiny_contig_emits_every_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let mut bases = "A".repeat(1000);
    bases.push_str(&"G".repeat(32));
    bases.push_str(&"A".repeat(1016));
    let fasta = write_fasta(tmp.path(), "ref.fa", &[("chr1", bases)]);

    let out_dir = tmp.path().join("out");
    let config = base_config(fasta.to_string_lossy().into_owned(), &out_dir);
    run_build(&config).expect("build should succeed on a small clean reference");

    for name in [
        "ht.reference.bin",
        "ht.ref_index.bin",
        "ht.repeat_mask.bin",
        "ht.str_table.bin",
        "ht.hash_table.cmp",
        "ht.hash_table_config.bin",
        "ht.hash_table.cfg",
        "ht.hash_table_stats.txt",
    ] {
        let bytes = artifact(&out_dir, name);
        assert!(!bytes.is_empty(), "{name} should be non-empty");
    }

    let str_table = artifact(&out_dir, "ht.str_table.bin");
    assert!(!str_table.is_empty(), "the 32-base G run should produce at least one STR record");

    let cfg_text = String::from_utf8(artifact(&out_dir, "ht.hash_table.cfg")).unwrap();
    assert!(cfg_text.contains("pri_seed_length"));
}

/// S2: a palindromic reference makes every seed position emit two HIT
/// records with opposite `rc` flags and the same seed index.
#[test]
fn palindrome_reference_produces_matching_rc_pairs() {
    let tmp = tempfile::tempdir().unwrap();
    let bases = "ACGT".repeat(8); // 32 bases, itself its own reverse complement
    let fasta = write_fasta(tmp.path(), "ref.fa", &[("chr1", bases)]);

    let out_dir = tmp.path().join("out");
    let mut config = base_config(fasta.to_string_lossy().into_owned(), &out_dir);
    config.seed_len = 16;
    run_build(&config).expect("build should succeed on a palindromic reference");

    run_uncompress(&out_dir, "ht", config.num_threads).expect("decompress-only pass should succeed");
    let flat = artifact(&out_dir, "ht.hash_table.bin");
    assert_eq!(flat.len() % 8, 0);

    let mut by_seed: std::collections::HashMap<u32, Vec<bool>> = std::collections::HashMap::new();
    for chunk in flat.chunks_exact(8) {
        let bits = u64::from_le_bytes(chunk.try_into().unwrap());
        if let Some(refhash::hash::HashRecord::Hit(h)) = refhash::hash::HashRecord::from_bits(bits) {
            by_seed.entry(h.seed_index).or_default().push(h.rc);
        }
    }
    assert!(
        by_seed.values().any(|rcs| rcs.len() == 2 && rcs.contains(&true) && rcs.contains(&false)),
        "at least one seed index should carry both an rc=false and an rc=true HIT"
    );
}

/// S3: a mask-BED range shrinks the emitted reference relative to the same
/// contig built without it.
#[test]
fn mask_bed_shrinks_the_encoded_reference() {
    let tmp = tempfile::tempdir().unwrap();
    let bases = "A".repeat(2048);

    let fasta_plain = write_fasta(tmp.path(), "plain.fa", &[("chr1", bases.clone())]);
    let out_plain = tmp.path().join("out_plain");
    let config_plain = base_config(fasta_plain.to_string_lossy().into_owned(), &out_plain);
    run_build(&config_plain).unwrap();
    let plain_ref = artifact(&out_plain, "ht.reference.bin");

    let fasta_masked = write_fasta(tmp.path(), "masked.fa", &[("chr1", bases)]);
    let bed_path = tmp.path().join("mask.bed");
    fs::write(&bed_path, "chr1\t0\t300\n").unwrap();
    let out_masked = tmp.path().join("out_masked");
    let mut config_masked = base_config(fasta_masked.to_string_lossy().into_owned(), &out_masked);
    config_masked.mask_bed = Some(bed_path.to_string_lossy().into_owned());
    run_build(&config_masked).unwrap();
    let masked_ref = artifact(&out_masked, "ht.reference.bin");

    assert!(
        masked_ref.len() < plain_ref.len(),
        "masking the first 300 bases should trim the encoded reference"
    );
}

/// S5: running the decompressor against a build's own `hash_table.cmp`
/// reproduces a hash table whose record count matches what was written.
#[test]
fn decompress_only_reproduces_the_hash_and_extension_tables() {
    let tmp = tempfile::tempdir().unwrap();
    let bases = "ACGTACGTACGTACGTACGTACGTACGTACGT".repeat(4);
    let fasta = write_fasta(tmp.path(), "ref.fa", &[("chr1", bases)]);

    let out_dir = tmp.path().join("out");
    let config = base_config(fasta.to_string_lossy().into_owned(), &out_dir);
    run_build(&config).unwrap();

    let before_cmp = artifact(&out_dir, "ht.hash_table.cmp");
    run_uncompress(&out_dir, "ht", config.num_threads).unwrap();
    let hash_bin = artifact(&out_dir, "ht.hash_table.bin");
    let ext_bin = artifact(&out_dir, "ht.extend_table.bin");
    assert_eq!(hash_bin.len() % 8, 0);
    assert_eq!(ext_bin.len() % 8, 0);

    // Running uncompress again against the same .cmp is idempotent.
    run_uncompress(&out_dir, "ht", config.num_threads).unwrap();
    let after_cmp = artifact(&out_dir, "ht.hash_table.cmp");
    assert_eq!(before_cmp, after_cmp, "decompress-only must not rewrite the compressed container");
}

/// S6 (scaled down): an explicit `--ht-size` far too small for the
/// reference fails with a capacity error and leaves no compressed
/// hash table behind.
#[test]
fn undersized_explicit_table_fails_with_capacity_error_and_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let bases = "A".repeat(3_000_000);
    let fasta = write_fasta(tmp.path(), "ref.fa", &[("chr1", bases)]);

    let out_dir = tmp.path().join("out");
    let mut config = base_config(fasta.to_string_lossy().into_owned(), &out_dir);
    config.hash_table_size_bytes = 16 * 1024;
    config.seed_len = 17;

    let err = run_build(&config).expect_err("a hash table this small should be rejected before any writes");
    assert!(matches!(err, BuildError::Capacity(_)));
    assert_eq!(err.exit_code(), 3);
    assert!(!out_dir.join("ht.hash_table.cmp").exists());
}
