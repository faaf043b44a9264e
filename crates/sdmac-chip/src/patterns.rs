//! Bit-pattern batteries.
//!
//! The verification battery exercises alternating bits, walking nibbles,
//! split halves and all-ones/all-zeros. Narrower registers use the low
//! bits of each pattern.

/// Verification battery (20 entries).
pub const TEST_PATTERNS: [u32; 20] = [
    0x0000_0000, 0xffff_ffff, 0xa5a5_a5a5, 0x5a5a_5a5a, 0xc3c3_c3c3,
    0x3c3c_3c3c, 0xd2d2_d2d2, 0x2d2d_2d2d, 0x4b4b_4b4b, 0xb4b4_b4b4,
    0xe1e1_e1e1, 0x1e1e_1e1e, 0x8787_8787, 0x7878_7878, 0xffff_0000,
    0x0000_ffff, 0xff00_ff00, 0x00ff_00ff, 0xf0f0_f0f0, 0x0f0f_0f0f,
];

/// DMA engine generation probe battery, written to the word transfer count.
pub const DMAC_PROBE_PATTERNS: [u32; 6] = [
    0x0000_0000, 0xffff_ffff, 0xa5a5_a5a5, 0x5a5a_5a5a, 0xc2c2_c3c3, 0x3c3c_3c3c,
];

/// Queue tag round-trip battery (WD33C93B detection).
pub const QUETAG_PATTERNS: [u8; 4] = [0x00, 0xff, 0xa5, 0x5a];

/// Command phase scratch round-trip battery.
pub const CMDPHASE_PATTERNS: [u8; 2] = [0x5a, 0xa5];

/// Low byte of a verification pattern.
#[must_use]
pub const fn low_byte(pattern: u32) -> u8 {
    (pattern & 0xff) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_has_no_duplicates() {
        for (i, a) in TEST_PATTERNS.iter().enumerate() {
            for b in &TEST_PATTERNS[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn dmac_battery_exercises_probe_bit_both_ways() {
        let bit = crate::regs::sdmac::WTC_PROBE_BIT;
        assert!(DMAC_PROBE_PATTERNS.iter().any(|p| p & bit != 0));
        assert!(DMAC_PROBE_PATTERNS.iter().any(|p| p & bit == 0));
    }

    #[test]
    fn low_bytes_cover_both_extremes() {
        let bytes: Vec<u8> = TEST_PATTERNS.iter().map(|&p| low_byte(p)).collect();
        assert!(bytes.contains(&0x00));
        assert!(bytes.contains(&0xff));
    }
}
