//! Extension-table record (`extend_hit_t`, §3 "Extension table").
//!
//! Flat array referenced by `Interval` hash records for seeds too frequent
//! to encode inline. Each entry is 64 bits: `{seed_index: 32, rc: 1,
//! lift_code: 2, lift_group: 28, literal: 1}`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftCode {
    None = 0,
    Pri = 1,
    Alt = 2,
}

impl LiftCode {
    fn from_u8(v: u8) -> LiftCode {
        match v {
            1 => LiftCode::Pri,
            2 => LiftCode::Alt,
            _ => LiftCode::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendHit {
    pub seed_index: u32,
    pub rc: bool,
    pub lift_code: LiftCode,
    pub lift_group: u32, // 28 bits
    pub literal: bool,
}

impl ExtendHit {
    pub fn to_bits(&self) -> u64 {
        let mut bits = 0u64;
        bits |= self.seed_index as u64;
        bits |= (self.rc as u64) << 32;
        bits |= (self.lift_code as u64 & 0b11) << 33;
        bits |= (self.lift_group as u64 & 0x0FFF_FFFF) << 35;
        bits |= (self.literal as u64) << 63;
        bits
    }

    pub fn from_bits(bits: u64) -> ExtendHit {
        ExtendHit {
            seed_index: (bits & 0xFFFF_FFFF) as u32,
            rc: (bits >> 32) & 1 != 0,
            lift_code: LiftCode::from_u8(((bits >> 33) & 0b11) as u8),
            lift_group: ((bits >> 35) & 0x0FFF_FFFF) as u32,
            literal: (bits >> 63) & 1 != 0,
        }
    }

    /// Bit width of the literal encoding for this record: 35 bits when
    /// `lift_code == None`, else 63 (§4.8 "Literal extension-table records").
    pub fn literal_bit_width(&self) -> u32 {
        if matches!(self.lift_code, LiftCode::None) {
            35
        } else {
            63
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let h = ExtendHit {
            seed_index: 999_999,
            rc: true,
            lift_code: LiftCode::Alt,
            lift_group: 0x0AB_CDEF,
            literal: true,
        };
        assert_eq!(ExtendHit::from_bits(h.to_bits()), h);
    }

    #[test]
    fn literal_width_depends_on_lift_code() {
        let none = ExtendHit { seed_index: 0, rc: false, lift_code: LiftCode::None, lift_group: 0, literal: false };
        let pri = ExtendHit { lift_code: LiftCode::Pri, ..none };
        assert_eq!(none.literal_bit_width(), 35);
        assert_eq!(pri.literal_bit_width(), 63);
    }
}
