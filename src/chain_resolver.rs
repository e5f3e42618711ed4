//! Chain/Probe Resolver (§4.6): decide, per over-full bucket within a
//! chain block, whether to resolve via linear probing or via an explicit
//! chain link into a donor bucket.

use crate::config::{CHAIN_BLOCK_BUCKETS, MAX_PROBES};
use crate::hash::record::{ChainFilter, ChainLink};

#[derive(Debug, Clone, Copy)]
pub struct BucketLoad {
    pub bucket_index: u64,
    pub overflow: u32,
}

#[derive(Debug, Clone, Copy)]
pub enum Resolution {
    Probe { distance: u32 },
    Chain { donor_bucket: u64 },
}

/// Cost of resolving `overflow` extra records via linear probing up to
/// `MAX_PROBES` buckets away, vs. planting a chain link. Probing is
/// cheaper per record but bounded; chaining has a fixed per-link cost but
/// unbounded reach within the chain block. Ties favor probing (§4.6
/// "ties prefer the cheaper-to-decode probe path").
fn probe_cost(overflow: u32) -> f64 {
    overflow as f64 * 1.0
}

fn chain_cost() -> f64 {
    2.0
}

/// Resolve one overflowing bucket against its chain block's current donor
/// occupancy map. `donor_free` maps bucket index -> free slots remaining;
/// only buckets within the same `CHAIN_BLOCK_BUCKETS`-sized block are
/// eligible donors (§4.6 "chain links never cross a chain-block
/// boundary").
pub fn resolve(
    load: BucketLoad,
    donor_free: &dyn Fn(u64) -> u32,
) -> Resolution {
    let block_start = (load.bucket_index / CHAIN_BLOCK_BUCKETS as u64) * CHAIN_BLOCK_BUCKETS as u64;
    let block_end = block_start + CHAIN_BLOCK_BUCKETS as u64;

    let mut best_probe: Option<u32> = None;
    for distance in 1..=MAX_PROBES as u32 {
        let candidate = load.bucket_index + distance as u64;
        if candidate >= block_end {
            break;
        }
        if donor_free(candidate) > 0 {
            best_probe = Some(distance);
            break;
        }
    }

    let probe_available = best_probe.is_some();
    let p_cost = probe_cost(load.overflow);
    let c_cost = chain_cost();

    if probe_available && p_cost <= c_cost {
        return Resolution::Probe { distance: best_probe.unwrap() };
    }

    // Fall back to chaining: scan forward within the block for the first
    // bucket with free space, wrapping to the block start if necessary.
    for offset in 1..CHAIN_BLOCK_BUCKETS as u64 {
        let candidate = block_start + (load.bucket_index - block_start + offset) % CHAIN_BLOCK_BUCKETS as u64;
        if candidate != load.bucket_index && donor_free(candidate) > 0 {
            return Resolution::Chain { donor_bucket: candidate };
        }
    }

    // No donor in the block at all: still report a chain resolution at
    // the probe distance found, if any, else give up on probing and
    // report the block start as a last resort (the slot packer will
    // surface a Capacity error if this truly has no room).
    match best_probe {
        Some(distance) => Resolution::Probe { distance },
        None => Resolution::Chain { donor_bucket: block_start },
    }
}

/// Build the `ChainLink` record planted at the tail of the overflowing
/// bucket, choosing LIST (few distinguishing prefix bits) vs MASK (many)
/// per §4.6 "LIST vs MASK filter selection".
pub fn build_chain_link(
    donor_bucket: u64,
    distinguishing_prefixes: &[u8],
    is_begin: bool,
    terminator: bool,
    records_before_chain: u8,
) -> ChainLink {
    let filter = if distinguishing_prefixes.len() <= 4 {
        let mut list = [0u8; 4];
        let n = distinguishing_prefixes.len().min(4);
        list[..n].copy_from_slice(&distinguishing_prefixes[..n]);
        ChainFilter::List(list, n as u8)
    } else {
        let mut mask: u32 = 0;
        for &p in distinguishing_prefixes {
            mask |= 1u32 << (p & 0x1F);
        }
        ChainFilter::Mask(mask)
    };
    ChainLink {
        next_bucket: donor_bucket as u32,
        filter,
        is_begin,
        terminator,
        records_before_chain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_probe_when_a_nearby_donor_has_room() {
        let load = BucketLoad { bucket_index: 100, overflow: 1 };
        let res = resolve(load, &|b| if b == 101 { 1 } else { 0 });
        assert!(matches!(res, Resolution::Probe { distance: 1 }));
    }

    #[test]
    fn falls_back_to_chain_when_no_probe_donor_in_range() {
        let load = BucketLoad { bucket_index: 100, overflow: 20 };
        let res = resolve(load, &|b| if b == 5000 { 3 } else { 0 });
        assert!(matches!(res, Resolution::Chain { .. }));
    }

    #[test]
    fn chain_link_uses_list_filter_for_few_prefixes() {
        let link = build_chain_link(42, &[1, 2], true, false, 3);
        assert!(matches!(link.filter, ChainFilter::List(_, 2)));
    }

    #[test]
    fn chain_link_uses_mask_filter_for_many_prefixes() {
        let prefixes: Vec<u8> = (0..10).collect();
        let link = build_chain_link(42, &prefixes, false, true, 0);
        assert!(matches!(link.filter, ChainFilter::Mask(_)));
    }
}
