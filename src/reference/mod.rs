//! Reference Encoder (§4.1): trims Ns, pads, 4-bit-packs, and emits
//! `reference.bin` + `ref_index.bin` + an optional `repeat_mask.bin`.

pub mod encode;
pub mod index;

use crate::config::{MAX_REF_SEQS, REF_SEQ_ALIGN_BASES, REF_SEQ_END_PAD_BASES, REF_SEQ_POPALT_ALIGN_BASES};
use crate::error::BuildError;
use crate::hash::Crc32cAccumulator;
use encode::{code_to_2bit, encode_base, pack_nibbles, CODE_N};
use index::RefIndexEntry;

pub use encode::MethylationMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContigFlags {
    pub primary: bool,
    pub alt: bool,
    pub decoy: bool,
    pub pop_alt: bool,
}

/// Half-open base range, 0-based, within one contig's raw sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskRange {
    pub start: u64,
    pub end: u64,
}

pub struct ContigInput {
    pub name: String,
    /// Raw ASCII bases, case preserved (lowercase marks the repeat mask).
    pub bases: Vec<u8>,
    pub flags: ContigFlags,
    pub methylation: MethylationMode,
    pub mask_ranges: Vec<MaskRange>,
}

#[derive(Debug, Clone)]
pub struct EncodedContig {
    pub name: String,
    pub raw_length: u64,
    pub leading_trim: u64,
    pub trailing_trim: u64,
    pub trimmed_length: u64,
    pub end_pad: u64,
    pub block_length: u64,
    pub flags: ContigFlags,
}

pub struct EncodedReference {
    pub contigs: Vec<EncodedContig>,
    /// One 4-bit code per emitted base, including padding (code 0).
    pub codes: Vec<u8>,
    /// `true` where the original base was lowercase (repeat mask).
    pub repeat_mask: Vec<bool>,
    pub index_entries: Vec<RefIndexEntry>,
    pub total_padded_len: u64,
    pub code_stream_digest: u32,
    pub index_stream_digest: u32,
}

impl EncodedReference {
    pub fn reference_bin(&self) -> Vec<u8> {
        pack_nibbles(&self.codes)
    }

    pub fn packed_2bit(&self) -> Vec<u8> {
        let two_bit: Vec<u8> = self.codes.iter().map(|&c| code_to_2bit(c)).collect();
        pack_2bit(&two_bit)
    }

    pub fn repeat_mask_bin(&self) -> Vec<u8> {
        pack_bits(&self.repeat_mask)
    }

    pub fn masked_bitmap(&self) -> Vec<u8> {
        let masked: Vec<bool> = self.codes.iter().map(|&c| c > 3).collect();
        pack_bits(&masked)
    }
}

fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, &b) in bits.iter().enumerate() {
        if b {
            out[i / 8] |= 1 << (i % 8);
        }
    }
    out
}

fn pack_2bit(codes: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; codes.len().div_ceil(4)];
    for (i, &c) in codes.iter().enumerate() {
        out[i / 4] |= (c & 0b11) << ((i % 4) * 2);
    }
    out
}

/// Leading/trailing trim of a per-base boolean "trim-eligible" mask,
/// rounding the leading trim down to a 256-base multiple per §4.1 step 3.
fn compute_trim(trim_eligible: &[bool]) -> (u64, u64) {
    let n = trim_eligible.len();
    let mut lead = 0usize;
    while lead < n && trim_eligible[lead] {
        lead += 1;
    }
    let mut trail = 0usize;
    while trail < n - lead && trim_eligible[n - 1 - trail] {
        trail += 1;
    }
    let lead_rounded = (lead as u64 / 256) * 256;
    (lead_rounded, trail as u64)
}

fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

/// Translate, trim, pad, and concatenate all contigs into one encoded
/// reference, per §4.1.
pub fn encode_reference(contigs: &[ContigInput]) -> Result<EncodedReference, BuildError> {
    if contigs.len() > MAX_REF_SEQS {
        return Err(BuildError::Input(format!(
            "reference has {} contigs, exceeds MAX_REF_SEQS ({})",
            contigs.len(),
            MAX_REF_SEQS
        )));
    }

    let mut seen_names = std::collections::HashSet::new();
    for c in contigs {
        if !seen_names.insert(c.name.clone()) {
            return Err(BuildError::Input(format!("duplicate contig name: {}", c.name)));
        }
        if c.bases.len() as u64 > u32::MAX as u64 {
            return Err(BuildError::Input(format!("contig {} exceeds 2^32-1 bases", c.name)));
        }
    }

    let mut all_codes: Vec<u8> = Vec::new();
    let mut all_mask: Vec<bool> = Vec::new();
    let mut encoded_contigs = Vec::with_capacity(contigs.len());

    for c in contigs {
        let mut codes = Vec::with_capacity(c.bases.len());
        let mut lowercase = Vec::with_capacity(c.bases.len());
        for &b in &c.bases {
            let code = encode_base(b, c.methylation)
                .ok_or_else(|| BuildError::Input(format!("unrecognized base {:#x} in contig {}", b, c.name)))?;
            codes.push(code);
            lowercase.push(b.is_ascii_lowercase());
        }

        // Mark BED-masked ranges as trim-eligible alongside N, then re-trim.
        let mut trim_eligible: Vec<bool> = codes.iter().map(|&c| c == CODE_N).collect();
        for r in &c.mask_ranges {
            let start = r.start.min(codes.len() as u64) as usize;
            let end = r.end.min(codes.len() as u64) as usize;
            for flag in trim_eligible.iter_mut().take(end).skip(start) {
                *flag = true;
            }
        }

        let (leading_trim, trailing_trim) = compute_trim(&trim_eligible);
        let raw_length = codes.len() as u64;
        let trimmed_length = raw_length.saturating_sub(leading_trim).saturating_sub(trailing_trim);

        let lo = leading_trim as usize;
        let hi = (leading_trim + trimmed_length) as usize;
        let trimmed_codes = &codes[lo.min(codes.len())..hi.min(codes.len())];
        let trimmed_lowercase = &lowercase[lo.min(lowercase.len())..hi.min(lowercase.len())];

        let align = if c.flags.pop_alt { REF_SEQ_POPALT_ALIGN_BASES } else { REF_SEQ_ALIGN_BASES };
        let block_length = align_up(trimmed_length, align);
        let end_pad = block_length - trimmed_length;

        all_codes.extend_from_slice(trimmed_codes);
        all_codes.extend(std::iter::repeat_n(0u8, end_pad as usize));
        all_mask.extend_from_slice(trimmed_lowercase);
        all_mask.extend(std::iter::repeat_n(false, end_pad as usize));

        encoded_contigs.push(EncodedContig {
            name: c.name.clone(),
            raw_length,
            leading_trim,
            trailing_trim,
            trimmed_length,
            end_pad,
            block_length,
            flags: c.flags,
        });
    }

    // Pad total to 1024-alignment, then append the fixed end-pad block.
    let pre_pad_len = all_codes.len() as u64;
    let total_aligned = align_up(pre_pad_len, REF_SEQ_ALIGN_BASES);
    let tail_pad = total_aligned - pre_pad_len;
    all_codes.extend(std::iter::repeat_n(0u8, tail_pad as usize));
    all_mask.extend(std::iter::repeat_n(false, tail_pad as usize));

    all_codes.extend(std::iter::repeat_n(0u8, REF_SEQ_END_PAD_BASES as usize));
    all_mask.extend(std::iter::repeat_n(false, REF_SEQ_END_PAD_BASES as usize));

    let total_padded_len = all_codes.len() as u64;
    if total_padded_len >= (1u64 << 36) {
        return Err(BuildError::Capacity(format!(
            "total padded reference length {total_padded_len} overflows 36 bits"
        )));
    }

    // Emit one 16-byte index entry per 1024 output bases, attributing each
    // block to the contig whose [start, end) range it falls in.
    let mut index_entries = Vec::new();
    let mut base_offset = 0u64;
    for (id, ec) in encoded_contigs.iter().enumerate() {
        let start = base_offset;
        let end = base_offset + ec.block_length;
        let trim_adjusted_start = start; // trim already applied before concatenation
        let mut pos = start;
        while pos < end {
            index_entries.push(RefIndexEntry {
                contig_id: id as u32,
                start_div_256: (pos / 256) as u32,
                end_div_256: ((pos + 1024).min(end) / 256) as u32,
                trim_adjusted_start_div_256: (trim_adjusted_start / 256) as u32,
            });
            pos += 1024;
        }
        base_offset = end;
    }
    // Cover the trailing alignment/end-pad region with duplicated entries
    // attributed to a sentinel contig id so every 1024-base block in the
    // output has a descriptor, per §4.1 step 5.
    let sentinel_id = encoded_contigs.len() as u32;
    let mut pos = base_offset;
    while pos < total_padded_len {
        index_entries.push(RefIndexEntry {
            contig_id: sentinel_id,
            start_div_256: (pos / 256) as u32,
            end_div_256: ((pos + 1024).min(total_padded_len) / 256) as u32,
            trim_adjusted_start_div_256: (pos / 256) as u32,
        });
        pos += 1024;
    }

    let mut code_digest = Crc32cAccumulator::new();
    code_digest.update(&pack_nibbles(&all_codes));
    let mut index_digest = Crc32cAccumulator::new();
    for e in &index_entries {
        index_digest.update(&e.to_bytes());
    }

    Ok(EncodedReference {
        contigs: encoded_contigs,
        codes: all_codes,
        repeat_mask: all_mask,
        index_entries,
        total_padded_len,
        code_stream_digest: code_digest.finish(),
        index_stream_digest: index_digest.finish(),
    })
}
