//! Save and restore of the registers the probers disturb
//!
//! Identification and clock measurement reset the controller and rewrite
//! own-ID, control, timeout period, command phase and synchronous transfer.
//! Callers bracket a run with [`Session::save_registers`] and
//! [`Session::restore_registers`]; the core never does it on its own.

use crate::session::Session;
use sdmac_chip::regs::wdc;
use tracing::{debug, warn};

/// Registers captured by a snapshot, in restore order
pub const SNAPSHOT_REGISTERS: [u8; 5] = [
    wdc::OWN_ID,
    wdc::CONTROL,
    wdc::TPERIOD,
    wdc::CMDPHASE,
    wdc::SYNC_TX,
];

/// Pre-probe register values and save nesting depth
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterSnapshot {
    values: Option<[u8; SNAPSHOT_REGISTERS.len()]>,
    depth: u32,
}

impl RegisterSnapshot {
    /// Outstanding saves
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Captured (register, value) pairs
    pub fn values(&self) -> Option<impl Iterator<Item = (u8, u8)> + '_> {
        self.values
            .as_ref()
            .map(|v| SNAPSHOT_REGISTERS.iter().copied().zip(v.iter().copied()))
    }
}

impl Session {
    /// Capture the registers; nested saves only count
    ///
    /// Returns true when the hardware was read.
    pub fn save_registers(&mut self) -> bool {
        self.snapshot.depth += 1;
        if self.snapshot.depth > 1 {
            warn!(depth = self.snapshot.depth, "Registers already saved");
            return false;
        }
        let irq = self.exclude();
        let values = SNAPSHOT_REGISTERS.map(|reg| self.wdc_read(reg));
        drop(irq);
        debug!(?values, "WDC registers saved");
        self.snapshot.values = Some(values);
        true
    }

    /// Put the registers back once the outermost save is matched
    ///
    /// Own-ID is written first and the controller reset so the feature bits
    /// it latches match the saved value again. Returns true when the hardware
    /// was written.
    pub fn restore_registers(&mut self) -> bool {
        if self.snapshot.depth == 0 {
            warn!("Restore without a saved snapshot");
            return false;
        }
        self.snapshot.depth -= 1;
        if self.snapshot.depth > 0 {
            return false;
        }
        let Some(values) = self.snapshot.values.take() else {
            return false;
        };
        let _irq = self.exclude();
        self.wdc_reset(values[0]);
        for (&reg, &value) in SNAPSHOT_REGISTERS.iter().zip(&values).skip(1) {
            self.wdc_write(reg, value);
        }
        debug!(?values, "WDC registers restored");
        true
    }

    /// Current snapshot
    pub fn snapshot(&self) -> &RegisterSnapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{BoardProfile, SimulatedBoard};
    use crate::config::ProbeConfig;

    #[test]
    fn nested_saves_restore_once() {
        let board = SimulatedBoard::new(BoardProfile::default());
        let mut s = Session::new(board.platform(), ProbeConfig::default());
        board.set_wdc_register(wdc::SYNC_TX, 0x23);

        assert!(s.save_registers());
        assert!(!s.save_registers());
        board.set_wdc_register(wdc::SYNC_TX, 0x00);

        assert!(!s.restore_registers());
        assert_eq!(board.wdc_register(wdc::SYNC_TX), 0x00);
        assert!(s.restore_registers());
        assert_eq!(board.wdc_register(wdc::SYNC_TX), 0x23);
        assert!(!s.restore_registers());
    }

    #[test]
    fn restore_without_save_touches_nothing() {
        let board = SimulatedBoard::new(BoardProfile::default());
        let mut s = Session::new(board.platform(), ProbeConfig::default());
        board.set_wdc_register(wdc::CONTROL, 0x42);
        assert!(!s.restore_registers());
        assert_eq!(board.wdc_register(wdc::CONTROL), 0x42);
        assert!(s.snapshot().values().is_none());
    }
}
