//! Mask-BED ingestion (§4.0): simple tab-separated `chrom start end` ranges
//! used to force additional repeat-mask / trim-eligible regions.

use std::fs;
use std::path::Path;

use crate::error::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskRange {
    pub contig: usize, // filled in by the caller once contig order is known
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone)]
struct RawEntry {
    contig_name: String,
    start: u64,
    end: u64,
}

/// Parse a BED file's first three columns per line; blank lines and
/// `#`-prefixed comments are skipped.
fn parse_bed(text: &str) -> Result<Vec<RawEntry>, BuildError> {
    let mut entries = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("track") {
            continue;
        }
        let mut fields = line.split('\t');
        let contig_name = fields
            .next()
            .ok_or_else(|| BuildError::Input(format!("BED line {}: missing chrom column", lineno + 1)))?
            .to_string();
        let start: u64 = fields
            .next()
            .ok_or_else(|| BuildError::Input(format!("BED line {}: missing start column", lineno + 1)))?
            .parse()
            .map_err(|_| BuildError::Input(format!("BED line {}: non-numeric start", lineno + 1)))?;
        let end: u64 = fields
            .next()
            .ok_or_else(|| BuildError::Input(format!("BED line {}: missing end column", lineno + 1)))?
            .parse()
            .map_err(|_| BuildError::Input(format!("BED line {}: non-numeric end", lineno + 1)))?;
        if end < start {
            return Err(BuildError::Input(format!("BED line {}: end < start", lineno + 1)));
        }
        entries.push(RawEntry { contig_name, start, end });
    }
    Ok(entries)
}

/// Read a mask BED file, resolving each entry's contig name against
/// `contig_names` (in the reference's declared order).
pub fn read_mask_bed(path: &Path, contig_names: &[String]) -> Result<Vec<MaskRange>, BuildError> {
    let text = fs::read_to_string(path)
        .map_err(|e| BuildError::Input(format!("cannot read {}: {e}", path.display())))?;
    let raw = parse_bed(&text)?;
    let mut out = Vec::with_capacity(raw.len());
    for entry in raw {
        let contig = contig_names
            .iter()
            .position(|n| n == &entry.contig_name)
            .ok_or_else(|| BuildError::Input(format!("BED references unknown contig {}", entry.contig_name)))?;
        out.push(MaskRange { contig, start: entry.start, end: entry.end });
    }
    Ok(out)
}
