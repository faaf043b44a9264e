//! WD33C93 SCSI status register encoding.
//!
//! The upper nibble selects a status group; only five groups are defined.
//!
//! ```text
//! 0x0_  reset                0x00 reset, 0x01 reset with advanced features
//! 0x1_  command complete     0x11 select complete
//! 0x2_  paused / aborted
//! 0x4_  error                0x40 invalid command, 0x42 select timeout
//! 0x8_  bus service required 0x85 target disconnected
//! ```

/// Reset completed, advanced features disabled or unsupported.
pub const RESET: u8 = 0x00;
/// Reset completed with advanced features enabled.
pub const RESET_ADVANCED: u8 = 0x01;
/// Select completed.
pub const SELECT_COMPLETE: u8 = 0x11;
/// Invalid command.
pub const INVALID_COMMAND: u8 = 0x40;
/// Timeout during select or reselect.
pub const SELECT_TIMEOUT: u8 = 0x42;
/// Target disconnected.
pub const DISCONNECTED: u8 = 0x85;

/// Status group encoded in the upper nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusGroup {
    /// Reset state.
    Reset,
    /// Command completed successfully.
    Complete,
    /// Command paused or aborted.
    Paused,
    /// Command error.
    Error,
    /// Bus service required.
    Service,
}

impl StatusGroup {
    /// Decode the group of a status byte, or `None` for an undefined group.
    #[must_use]
    pub const fn from_status(status: u8) -> Option<Self> {
        match status >> 4 {
            0 => Some(Self::Reset),
            1 => Some(Self::Complete),
            2 => Some(Self::Paused),
            4 => Some(Self::Error),
            8 => Some(Self::Service),
            _ => None,
        }
    }
}

/// Status a successful mailbox command reports: command complete, with the
/// command's low nibble echoed.
#[must_use]
pub const fn command_echo(command: u8) -> u8 {
    0x10 | (command & 0x0f)
}

/// Command phase values the chip can hold after any documented sequence.
pub const VALID_COMMAND_PHASES: &[u8] = &[
    0x00, 0x10, 0x20, 0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x3b,
    0x3c, 0x3d, 0x3e, 0x3f, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x50, 0x60, 0x61,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_five_groups_are_defined() {
        let defined = (0u8..16).filter(|n| StatusGroup::from_status(n << 4).is_some()).count();
        assert_eq!(defined, 5);
        assert_eq!(StatusGroup::from_status(SELECT_TIMEOUT), Some(StatusGroup::Error));
        assert_eq!(StatusGroup::from_status(0x30), None);
    }

    #[test]
    fn echo_keeps_low_nibble() {
        assert_eq!(command_echo(crate::regs::wdc::cmd::GET_REGISTER), 0x1c);
        assert_eq!(command_echo(crate::regs::wdc::cmd::SET_REGISTER), 0x1d);
    }
}
