//! Clock and calibration constants.
//!
//! The select-overhead figures were taken against the CIA E-clock and are
//! kept in E-clock ticks; convert with [`eclock_to_ticks`] before applying
//! them to another reference timer. They are calibration values, to be
//! re-measured on other silicon rather than derived.

/// E-clock frequency the overhead figures were measured with (Hz).
pub const ECLOCK_HZ: u64 = 709_379;

/// WD33C93 input clock on an NTSC A3000 (kHz): 28.63636 MHz / 2.
pub const INCLK_NTSC_KHZ: u32 = 28_636 / 2;
/// WD33C93 input clock on a PAL A3000 (kHz): 28.37516 MHz / 2.
pub const INCLK_PAL_KHZ: u32 = 28_375 / 2;

/// Divisor in the timeout formula `TPERIOD = period_ms * clk_MHz / 80`.
pub const TIMEOUT_DIVISOR: u32 = 80;

/// Timeout period used for the clock measurement. At the slowest supported
/// input clock (8 MHz) this times out in 40 ms, inside one 16-bit E-clock
/// wrap (92 ms).
pub const CLOCK_PROBE_TPERIOD: u8 = 4;

/// Timeout period used per target by the bus walk (~250 ms at 14 MHz).
pub const SCAN_TPERIOD: u8 = 44;

/// Target/LUN that never answers a select: ID 7 is the host adapter.
pub const ABSENT_TARGET: u8 = 7;

/// Select-command overhead of the WD33C93 (E-clock ticks).
pub const SELECT_OVERHEAD_WD33C93: u64 = 430;
/// Select-command overhead of the WD33C93A (E-clock ticks).
pub const SELECT_OVERHEAD_WD33C93A: u64 = 380;
/// Select-command overhead of the WD33C93B (E-clock ticks).
pub const SELECT_OVERHEAD_WD33C93B: u64 = 340;

/// Convert E-clock ticks to ticks of a timer running at `frequency` Hz.
#[must_use]
pub const fn eclock_to_ticks(eclocks: u64, frequency: u64) -> u64 {
    ((eclocks as u128 * frequency as u128) / ECLOCK_HZ as u128) as u64
}

/// Timeout length in milliseconds for a TPERIOD value at `clock_khz`.
#[must_use]
pub const fn timeout_ms(tperiod: u8, clock_khz: u32) -> u32 {
    if clock_khz == 0 {
        return 0;
    }
    tperiod as u32 * TIMEOUT_DIVISOR * 1000 / clock_khz
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eclock_conversion_to_nanoseconds() {
        // 380 E-clocks is about 535.7 us
        let ns = eclock_to_ticks(SELECT_OVERHEAD_WD33C93A, 1_000_000_000);
        assert!((535_000..537_000).contains(&ns), "{ns}");
        assert_eq!(eclock_to_ticks(ECLOCK_HZ, ECLOCK_HZ), ECLOCK_HZ);
    }

    #[test]
    fn timeout_formula() {
        assert_eq!(timeout_ms(CLOCK_PROBE_TPERIOD, INCLK_NTSC_KHZ), 22);
        assert_eq!(timeout_ms(SCAN_TPERIOD, INCLK_NTSC_KHZ), 245);
        assert_eq!(timeout_ms(1, 0), 0);
    }
}
