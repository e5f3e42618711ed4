//! `ref_index.bin` descriptor (§3 "Packed reference": "one 16-byte index
//! entry per 1024 output bases").

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefIndexEntry {
    pub contig_id: u32,
    pub start_div_256: u32,
    pub end_div_256: u32,
    pub trim_adjusted_start_div_256: u32,
}

impl RefIndexEntry {
    pub const BYTES: usize = 16;

    pub fn to_bytes(&self) -> [u8; Self::BYTES] {
        let mut out = [0u8; Self::BYTES];
        out[0..4].copy_from_slice(&self.contig_id.to_le_bytes());
        out[4..8].copy_from_slice(&self.start_div_256.to_le_bytes());
        out[8..12].copy_from_slice(&self.end_div_256.to_le_bytes());
        out[12..16].copy_from_slice(&self.trim_adjusted_start_div_256.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<RefIndexEntry> {
        if bytes.len() < Self::BYTES {
            return None;
        }
        Some(RefIndexEntry {
            contig_id: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            start_div_256: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            end_div_256: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            trim_adjusted_start_div_256: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let e = RefIndexEntry {
            contig_id: 7,
            start_div_256: 4,
            end_div_256: 8,
            trim_adjusted_start_div_256: 4,
        };
        assert_eq!(RefIndexEntry::from_bytes(&e.to_bytes()), Some(e));
    }

    #[test]
    fn entry_is_sixteen_bytes() {
        assert_eq!(RefIndexEntry::BYTES, 16);
    }
}
