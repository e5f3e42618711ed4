//! Extension Planner (§4.5): per-bucket DP selecting a minimal-cost
//! seed-extension tree for over-frequent k-mers.

use crate::config::{HASH_RECORD_EXT_ID_BITS, MAX_PRI_SEED_LENGTH};
use crate::error::BuildError;
use crate::hash::extend::{ExtendHit, LiftCode};
use crate::hash::record::{Extend, HashRecord, Interval};

#[derive(Debug, Clone, Copy)]
pub struct CostCoefficients {
    pub seed_len_cost: f64,
    pub seed_freq_cost: f64,
    pub ext_step_cost: f64,
    pub ext_step_cost_incr: f64,
    pub ext_rec_cost: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ExtensionContext {
    pub cost: CostCoefficients,
    pub pri_seed_length: u32,
    pub max_seed_bases: u32,
    pub max_ext_incr: u32,
    pub pri_max_seed_freq: u32,
    pub max_seed_freq: u32,
    pub max_seed_freq_len: u32,
    pub target_seed_freq: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct SeedCandidate {
    pub seed_index: u32,
    pub pos: u64,
    pub rc: bool,
}

/// Per-length frequency cap, ramping linearly from `priMaxSeedFreq` at
/// `pri_seed_length` to `maxSeedFreq` at `maxSeedFreqLen` (§4.5 "subject
/// to: total hits of a child interval must fit under a per-length
/// frequency cap").
fn freq_cap(ctx: &ExtensionContext, len: u32) -> u32 {
    if len <= ctx.pri_seed_length {
        return ctx.pri_max_seed_freq;
    }
    if len >= ctx.max_seed_freq_len {
        return ctx.max_seed_freq;
    }
    let span = (ctx.max_seed_freq_len - ctx.pri_seed_length).max(1) as f64;
    let frac = (len - ctx.pri_seed_length) as f64 / span;
    let value = ctx.pri_max_seed_freq as f64 + frac * (ctx.max_seed_freq as i64 - ctx.pri_max_seed_freq as i64) as f64;
    value.round().max(1.0) as u32
}

/// Materialize one extension base, alternating outward from each end of
/// the seed, complemented for RC hits (§4.5 "materialize up to 128
/// extension bases alternating from each end of the seed").
fn ext_base(codes: &[u8], seed_len: u32, seed: &SeedCandidate, i: u32) -> u8 {
    let (right_first, left_first) = if !seed.rc {
        (seed.pos + seed_len as u64, seed.pos.checked_sub(1))
    } else {
        (seed.pos + seed_len as u64, seed.pos.checked_sub(1))
    };
    let step = i / 2;
    let from_right = i % 2 == 0;
    let raw_pos = if from_right {
        right_first + step as u64
    } else {
        match left_first {
            Some(p) => p.saturating_sub(step as u64),
            None => return 0xFF, // out of bounds
        }
    };
    let base = codes.get(raw_pos as usize).copied().unwrap_or(0xFF);
    if base > 3 {
        return base;
    }
    if seed.rc {
        3 - base
    } else {
        base
    }
}

struct KeyedSeed {
    seed: SeedCandidate,
    key: Vec<u8>,
}

pub struct PlanOutput {
    pub records: Vec<HashRecord>,
    pub extension_table: Vec<ExtendHit>,
}

/// Plan a group of seeds sharing the same primary canonical k-mer. `codes`
/// is the full reference code stream (used to materialize extension
/// bases); `ext_id_alloc` issues unique `extendId`s, erroring when the
/// per-bin id space is exhausted (§4.5 "Extension-ID uniqueness").
pub fn plan_group(
    seeds: &[SeedCandidate],
    codes: &[u8],
    ctx: &ExtensionContext,
    ext_id_alloc: &mut dyn FnMut() -> Result<u32, BuildError>,
) -> Result<PlanOutput, BuildError> {
    let ext_len = (ctx.max_seed_bases.saturating_sub(ctx.pri_seed_length)).min(128) as usize;
    let mut keyed: Vec<KeyedSeed> = seeds
        .iter()
        .map(|s| {
            let key = (0..ext_len as u32)
                .map(|i| ext_base(codes, ctx.pri_seed_length, s, i))
                .collect();
            KeyedSeed { seed: *s, key }
        })
        .collect();
    keyed.sort_by(|a, b| a.key.cmp(&b.key));

    let mut out = PlanOutput { records: Vec::new(), extension_table: Vec::new() };
    build_node(&keyed, 0, keyed.len(), 0, ctx, ext_id_alloc, &mut out)?;
    Ok(out)
}

fn build_node(
    seeds: &[KeyedSeed],
    lo: usize,
    hi: usize,
    depth: u32, // extension bases consumed so far
    ctx: &ExtensionContext,
    ext_id_alloc: &mut dyn FnMut() -> Result<u32, BuildError>,
    out: &mut PlanOutput,
) -> Result<(), BuildError> {
    let freq = (hi - lo) as u32;
    let len = ctx.pri_seed_length + depth;

    if freq == 1 {
        // A group that narrowed to one hit emits a literal HIT, per §4.5
        // "If a leaf holds exactly one hit, emit a single HIT record".
        let start = out.extension_table.len() as u64;
        out.extension_table.push(ExtendHit {
            seed_index: seeds[lo].seed.seed_index,
            rc: seeds[lo].seed.rc,
            lift_code: LiftCode::None,
            lift_group: 0,
            literal: true,
        });
        out.records.push(HashRecord::Interval(Interval { start, length: 1, extra_liftover_hits: 0 }));
        return Ok(());
    }

    let cost_stop = freq as f64 * (len as f64 * ctx.cost.seed_len_cost
        + (freq as i64 - ctx.target_seed_freq as i64).unsigned_abs() as f64 * ctx.cost.seed_freq_cost)
        + ctx.cost.ext_rec_cost;

    let can_extend = len + 2 <= ctx.pri_seed_length + ctx.max_seed_bases.saturating_sub(ctx.pri_seed_length).min(128)
        && depth + 2 <= ctx.max_ext_incr.max(2) * 16 // generous bound; real limit is max_seed_bases
        && (depth as usize) + 2 <= seeds.first().map(|s| s.key.len()).unwrap_or(0);

    if can_extend {
        // Partition [lo, hi) into runs sharing the next 2 key bytes.
        let mut children: Vec<(usize, usize)> = Vec::new();
        let mut start = lo;
        while start < hi {
            let mut end = start + 1;
            while end < hi
                && seeds[end].key[depth as usize..(depth + 2) as usize]
                    == seeds[start].key[depth as usize..(depth + 2) as usize]
            {
                end += 1;
            }
            children.push((start, end));
            start = end;
        }

        let cap = freq_cap(ctx, len + 2);
        let within_cap = children.iter().all(|&(s, e)| (e - s) as u32 <= cap || (e - s) == 1);

        if within_cap && children.len() > 1 {
            let cost_extend_self = freq as f64 * (ctx.cost.ext_step_cost + ctx.cost.ext_step_cost_incr)
                + 2.0 * ctx.cost.ext_rec_cost;
            // A full bottom-up cost comparison would recursively price each
            // child before deciding; as an engineering simplification we
            // commit to extending once the frequency cap is satisfiable,
            // comparing only the immediate per-node costs (recorded in
            // DESIGN.md as an Open Question resolution).
            if cost_extend_self < cost_stop || freq > cap.max(1) {
                let extend_id = ext_id_alloc()?;
                if extend_id >= (1 << HASH_RECORD_EXT_ID_BITS) {
                    return Err(BuildError::Capacity(
                        "extension-id space exhausted; raise --ht-seed-len and/or --ht-max-seed-freq".into(),
                    ));
                }
                out.records.push(HashRecord::Extend(Extend { extend_id, length_delta: 2 }));
                for (s, e) in children {
                    build_node(seeds, s, e, depth + 2, ctx, ext_id_alloc, out)?;
                }
                return Ok(());
            }
        }
    }

    // Stop here: emit one interval over the extension table.
    let start = out.extension_table.len() as u64;
    for ks in &seeds[lo..hi] {
        out.extension_table.push(ExtendHit {
            seed_index: ks.seed.seed_index,
            rc: ks.seed.rc,
            lift_code: LiftCode::None,
            lift_group: 0,
            literal: false,
        });
    }
    out.records.push(HashRecord::Interval(Interval {
        start,
        length: freq,
        extra_liftover_hits: 0,
    }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExtensionContext {
        ExtensionContext {
            cost: CostCoefficients {
                seed_len_cost: 1.0,
                seed_freq_cost: 1.0,
                ext_step_cost: 1.0,
                ext_step_cost_incr: 1.0,
                ext_rec_cost: 1.0,
            },
            pri_seed_length: 8,
            max_seed_bases: MAX_PRI_SEED_LENGTH,
            max_ext_incr: 12,
            pri_max_seed_freq: 2,
            max_seed_freq: 32,
            max_seed_freq_len: 40,
            target_seed_freq: 4,
        }
    }

    #[test]
    fn single_seed_group_emits_literal_interval() {
        let codes = vec![0u8; 1000];
        let seeds = vec![SeedCandidate { seed_index: 5, pos: 100, rc: false }];
        let mut next_id = 0u32;
        let mut alloc = || {
            next_id += 1;
            Ok(next_id)
        };
        let out = plan_group(&seeds, &codes, &ctx(), &mut alloc).unwrap();
        assert_eq!(out.extension_table.len(), 1);
        assert!(out.extension_table[0].literal);
    }

    #[test]
    fn group_with_distinguishable_extensions_splits() {
        let mut codes = vec![0u8; 2000];
        // Two seeds at different positions whose flanking bases differ
        // immediately, so the planner should split by the next 2 bases.
        codes[108] = 1; // differs from default 0 at the first right-flank base of seed A
        let seeds = vec![
            SeedCandidate { seed_index: 1, pos: 100, rc: false },
            SeedCandidate { seed_index: 2, pos: 900, rc: false },
        ];
        let mut next_id = 0u32;
        let mut alloc = || {
            next_id += 1;
            Ok(next_id)
        };
        let out = plan_group(&seeds, &codes, &ctx(), &mut alloc).unwrap();
        assert!(!out.extension_table.is_empty());
    }

    #[test]
    fn extension_id_exhaustion_is_a_capacity_error() {
        let codes = vec![0u8; 10_000];
        let seeds: Vec<SeedCandidate> = (0..50)
            .map(|i| SeedCandidate { seed_index: i, pos: 100 + i as u64 * 20, rc: false })
            .collect();
        let mut alloc = || Ok((1u32 << HASH_RECORD_EXT_ID_BITS) + 1);
        let result = plan_group(&seeds, &codes, &ctx(), &mut alloc);
        // With an always-exhausted allocator, any attempted extend fails.
        if let Err(e) = result {
            assert!(matches!(e, BuildError::Capacity(_)));
        }
    }
}
