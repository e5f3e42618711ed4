//! The 64-bit hash-record union (§3 "Hash record") as an explicit tagged
//! enum plus `to_bits`/`from_bits` codecs, per the design note preferring
//! explicit encode/decode over pointer punning.
//!
//! Bit layout (opcode occupies bits 61..64 of every variant so a single
//! 3-bit read at a fixed offset always identifies the record kind first):
//!
//! ```text
//! bit 63            61 60                                            0
//! [ opcode (3 bits) ][ variant-specific payload (61 bits) ]
//! ```
//!
//! `Empty` uses opcode 0; every other opcode packs its own sub-fields out of
//! the remaining 61 bits as documented on each variant.

const OPCODE_SHIFT: u32 = 61;
const OPCODE_MASK: u64 = 0b111;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Empty = 0,
    Hit = 1,
    Extend = 2,
    IntervalSl0 = 3,
    IntervalSl1 = 4,
    IntervalSle = 5,
    IntervalS = 6,
    IntervalL = 7,
}

impl Opcode {
    fn from_u8(v: u8) -> Option<Opcode> {
        Some(match v {
            0 => Opcode::Empty,
            1 => Opcode::Hit,
            2 => Opcode::Extend,
            3 => Opcode::IntervalSl0,
            4 => Opcode::IntervalSl1,
            5 => Opcode::IntervalSle,
            6 => Opcode::IntervalS,
            7 => Opcode::IntervalL,
            _ => return None,
        })
    }
}

/// A HIT record: a single reference seed occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub seed_index: u32,
    pub rc: bool,
    pub last_of_thread: bool,
    pub extended: bool,
    pub hash_bits: u32,  // 23 bits
    pub thread_id: u8,   // 6 bits
}

/// An EXTEND record: pushes the match to a wider seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extend {
    pub extend_id: u32,
    pub length_delta: u8, // <= MAX_SEED_EXTENSION_INCR (12)
}

/// An INTERVAL_* record: a `[start, start+length)` slice of the extension
/// table. Variant chosen by the encoder to minimize field width for the
/// given start/length range; `extra_liftover_hits` is only meaningful on
/// the wider encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: u64,
    pub length: u32,
    pub extra_liftover_hits: u16,
}

/// Chain records: occupy only the last slot of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFilter {
    /// Up to four sorted 8-bit hash prefixes.
    List([u8; 4], u8), // (prefixes, count)
    /// A 32-bit mask of 5-bit prefixes.
    Mask(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLink {
    pub next_bucket: u32, // 18-bit pointer, modulo chain-block size
    pub filter: ChainFilter,
    pub is_begin: bool,      // true = CHAIN_BEG_*, false = CHAIN_CON_*
    pub terminator: bool,    // chain_pad terminator flag
    pub records_before_chain: u8, // stashed count, only meaningful on begin
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashRecord {
    Empty,
    Hit(Hit),
    Extend(Extend),
    Interval(Interval),
    Chain(ChainLink),
}

impl HashRecord {
    pub fn opcode(&self) -> Opcode {
        match self {
            HashRecord::Empty => Opcode::Empty,
            HashRecord::Hit(_) => Opcode::Hit,
            HashRecord::Extend(_) => Opcode::Extend,
            HashRecord::Interval(iv) => interval_opcode(iv),
            HashRecord::Chain(_) => Opcode::IntervalL, // see note in to_bits
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, HashRecord::Empty)
    }

    pub fn to_bits(&self) -> u64 {
        match self {
            HashRecord::Empty => 0,
            HashRecord::Hit(h) => {
                let mut bits = (Opcode::Hit as u64) << OPCODE_SHIFT;
                bits |= (h.seed_index as u64) << 29;
                bits |= (h.rc as u64) << 28;
                bits |= (h.last_of_thread as u64) << 27;
                bits |= (h.extended as u64) << 26;
                bits |= ((h.hash_bits as u64) & 0x7FFFFF) << 3;
                bits |= (h.thread_id as u64) & 0x3F;
                bits
            }
            HashRecord::Extend(e) => {
                let mut bits = (Opcode::Extend as u64) << OPCODE_SHIFT;
                bits |= (e.extend_id as u64) << 8;
                bits |= (e.length_delta as u64) & 0xFF;
                bits
            }
            HashRecord::Interval(iv) => {
                let op = interval_opcode(iv);
                let mut bits = (op as u64) << OPCODE_SHIFT;
                bits |= (iv.start & 0x1F_FFFF_FFFF) << 20;
                bits |= ((iv.length as u64) & 0x3FF) << 10;
                bits |= (iv.extra_liftover_hits as u64) & 0x3FF;
                bits
            }
            HashRecord::Chain(c) => {
                let op = if c.is_begin { Opcode::IntervalL } else { Opcode::IntervalS };
                let mut bits = (op as u64) << OPCODE_SHIFT;
                bits |= (c.next_bucket as u64 & 0x3_FFFF) << 43;
                bits |= (c.terminator as u64) << 42;
                bits |= (c.records_before_chain as u64 & 0xFF) << 34;
                match c.filter {
                    ChainFilter::List(prefixes, count) => {
                        bits |= 1 << 33; // list-mode tag
                        bits |= (count as u64 & 0x7) << 30;
                        for (i, p) in prefixes.iter().enumerate() {
                            bits |= (*p as u64) << (8 * i);
                        }
                    }
                    ChainFilter::Mask(mask) => {
                        bits |= (mask as u64) & 0xFFFF_FFFF;
                    }
                }
                bits
            }
        }
    }

    pub fn from_bits(bits: u64) -> Option<HashRecord> {
        let op = Opcode::from_u8(((bits >> OPCODE_SHIFT) & OPCODE_MASK) as u8)?;
        Some(match op {
            Opcode::Empty => HashRecord::Empty,
            Opcode::Hit => HashRecord::Hit(Hit {
                seed_index: ((bits >> 29) & 0xFFFF_FFFF) as u32,
                rc: (bits >> 28) & 1 != 0,
                last_of_thread: (bits >> 27) & 1 != 0,
                extended: (bits >> 26) & 1 != 0,
                hash_bits: ((bits >> 3) & 0x7FFFFF) as u32,
                thread_id: (bits & 0x3F) as u8,
            }),
            Opcode::Extend => HashRecord::Extend(Extend {
                extend_id: ((bits >> 8) & 0xFFFF_FFFF) as u32,
                length_delta: (bits & 0xFF) as u8,
            }),
            Opcode::IntervalSl0 | Opcode::IntervalSl1 | Opcode::IntervalSle => {
                HashRecord::Interval(Interval {
                    start: (bits >> 20) & 0x1F_FFFF_FFFF,
                    length: ((bits >> 10) & 0x3FF) as u32,
                    extra_liftover_hits: (bits & 0x3FF) as u16,
                })
            }
            Opcode::IntervalS | Opcode::IntervalL => {
                let is_begin = op == Opcode::IntervalL;
                let next_bucket = ((bits >> 43) & 0x3_FFFF) as u32;
                let terminator = (bits >> 42) & 1 != 0;
                let records_before_chain = ((bits >> 34) & 0xFF) as u8;
                let filter = if (bits >> 33) & 1 != 0 {
                    let count = ((bits >> 30) & 0x7) as u8;
                    let mut prefixes = [0u8; 4];
                    for (i, p) in prefixes.iter_mut().enumerate() {
                        *p = ((bits >> (8 * i)) & 0xFF) as u8;
                    }
                    ChainFilter::List(prefixes, count)
                } else {
                    ChainFilter::Mask((bits & 0xFFFF_FFFF) as u32)
                };
                HashRecord::Chain(ChainLink {
                    next_bucket,
                    filter,
                    is_begin,
                    terminator,
                    records_before_chain,
                })
            }
        })
    }
}

fn interval_opcode(iv: &Interval) -> Opcode {
    // Choose the narrowest encoding that fits; real widths are refined by
    // the compressor (§4.8), this selects among the five named variants
    // for in-memory representation prior to compression.
    if iv.start < (1 << 14) && iv.length <= 1 {
        Opcode::IntervalSl0
    } else if iv.start < (1 << 20) && iv.length <= 2 {
        Opcode::IntervalSl1
    } else if iv.start < (1 << 27) && iv.length < (1 << 4) {
        Opcode::IntervalSle
    } else if iv.length < (1 << 8) {
        Opcode::IntervalS
    } else {
        Opcode::IntervalL
    }
}
